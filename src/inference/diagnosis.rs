//! Diagnosis rules
//!
//! Turns raw network scores into a [`Diagnosis`]: softmax, argmax (lowest
//! index wins ties), label split, then severity and advice lookup.
//! Everything here is deterministic and independent of the model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::{is_healthy_condition, split_label};
use crate::utils::error::{CropError, Result};

/// Advice returned for healthy crops
pub const HEALTHY_ADVICE: &str = "Your crop looks healthy!";

/// Advice returned when no table entry matches the condition
pub const FALLBACK_ADVICE: &str = "Remove infected leaves and avoid excess watering.";

/// Disease name reported for healthy crops
pub const NO_DISEASE: &str = "None";

/// Confidence above which a disease is reported as severe
pub const SEVERE_THRESHOLD: f64 = 0.75;

/// Confidence above which a disease is reported as moderate
pub const MODERATE_THRESHOLD: f64 = 0.4;

/// Ordered (pattern, advice) pairs; the first pattern contained in the
/// condition wins, so `Bacterial` must stay behind `Bacterial_spot`.
pub const ADVICE_TABLE: [(&str, &str); 10] = [
    (
        "Bacterial_spot",
        "Use copper-based fungicide and avoid overhead watering.",
    ),
    ("Early_blight", "Remove infected leaves and use fungicide."),
    ("Late_blight", "Destroy infected plants and avoid wet conditions."),
    ("Leaf_Mold", "Improve air circulation and reduce humidity."),
    (
        "Septoria_leaf_spot",
        "Remove infected leaves and apply fungicide.",
    ),
    ("Spider_mites", "Use insecticidal soap or neem oil."),
    ("Target_Spot", "Use fungicide and avoid wet leaves."),
    (
        "Tomato_mosaic_virus",
        "Remove infected plants and disinfect tools.",
    ),
    (
        "Tomato_Yellow_Leaf_Curl_Virus",
        "Remove infected plants and control whiteflies.",
    ),
    ("Bacterial", "Use recommended pesticide."),
];

/// Overall plant status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Healthy,
    Diseased,
}

/// Severity bucket derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Bucket a confidence value; both thresholds are exclusive
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence > SEVERE_THRESHOLD {
            Severity::Severe
        } else if confidence > MODERATE_THRESHOLD {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Healthy => write!(f, "Healthy"),
            Status::Diseased => write!(f, "Diseased"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::None => write!(f, "None"),
            Severity::Mild => write!(f, "Mild"),
            Severity::Moderate => write!(f, "Moderate"),
            Severity::Severe => write!(f, "Severe"),
        }
    }
}

/// Classification result returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub crop: String,
    pub status: Status,
    pub disease: String,
    pub severity: Severity,
    /// Top-class probability from one softmax over the network logits.
    ///
    /// Deployments that applied softmax to already-normalized outputs
    /// reported much flatter values, so confidences (and the severity buckets
    /// derived from them) are not comparable with theirs.
    pub confidence: f64,
    pub advice: String,
}

/// Normalized model output
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Softmax probabilities, one per class
    pub probabilities: Vec<f64>,
    /// Index of the most probable class
    pub index: usize,
    /// Probability of that class
    pub confidence: f64,
}

/// Numerically stable softmax over raw scores
pub fn softmax(scores: &[f32]) -> Vec<f64> {
    let max = scores
        .iter()
        .map(|&s| s as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the lowest index wins ties
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Softmax + argmax over raw scores
pub fn predict(scores: &[f32]) -> Result<Prediction> {
    if scores.is_empty() {
        return Err(CropError::Inference("model returned no scores".to_string()));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(CropError::Inference(
            "model returned non-finite scores".to_string(),
        ));
    }

    let probabilities = softmax(scores);
    let index = argmax(&probabilities)
        .ok_or_else(|| CropError::Inference("empty probability vector".to_string()))?;
    let confidence = probabilities[index];

    Ok(Prediction {
        probabilities,
        index,
        confidence,
    })
}

/// Advice for a disease condition, matched case-insensitively in table order
pub fn advice_for(condition: &str) -> &'static str {
    let condition = condition.to_lowercase();
    ADVICE_TABLE
        .iter()
        .find(|(pattern, _)| condition.contains(&pattern.replace(' ', "_").to_lowercase()))
        .map(|(_, advice)| *advice)
        .unwrap_or(FALLBACK_ADVICE)
}

/// Build a diagnosis for a predicted label and its confidence
pub fn diagnose(label: &str, confidence: f64) -> Diagnosis {
    let (crop, condition) = split_label(label);

    if is_healthy_condition(condition) {
        return Diagnosis {
            crop: crop.to_string(),
            status: Status::Healthy,
            disease: NO_DISEASE.to_string(),
            severity: Severity::None,
            confidence,
            advice: HEALTHY_ADVICE.to_string(),
        };
    }

    Diagnosis {
        crop: crop.to_string(),
        status: Status::Diseased,
        disease: condition.replace('_', " "),
        severity: Severity::from_confidence(confidence),
        confidence,
        advice: advice_for(condition).to_string(),
    }
}

/// Full pipeline from raw scores to a diagnosis against a label list
pub fn diagnose_scores(scores: &[f32], labels: &[&str]) -> Result<(Prediction, Diagnosis)> {
    if scores.len() != labels.len() {
        return Err(CropError::Inference(format!(
            "model returned {} scores for {} labels",
            scores.len(),
            labels.len()
        )));
    }

    let prediction = predict(scores)?;
    let diagnosis = diagnose(labels[prediction.index], prediction.confidence);
    Ok((prediction, diagnosis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CLASS_NAMES;

    #[test]
    fn test_softmax_sums_to_one_and_confidence_is_max() {
        let scores = [1.0f32, -2.0, 3.5, 0.0, 3.4];
        let prediction = predict(&scores).unwrap();

        let sum: f64 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let max = prediction
            .probabilities
            .iter()
            .cloned()
            .fold(f64::MIN, f64::max);
        assert_eq!(prediction.confidence, max);
        assert_eq!(prediction.index, 2);
    }

    #[test]
    fn test_softmax_handles_large_scores() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert!((probs[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);

        let prediction = predict(&[2.0, 2.0, 2.0]).unwrap();
        assert_eq!(prediction.index, 0);
    }

    #[test]
    fn test_predict_rejects_bad_scores() {
        assert!(predict(&[]).is_err());
        assert!(predict(&[1.0, f32::NAN]).is_err());
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::from_confidence(0.40), Severity::Mild);
        assert_eq!(Severity::from_confidence(0.399), Severity::Mild);
        assert_eq!(Severity::from_confidence(0.41), Severity::Moderate);
        assert_eq!(Severity::from_confidence(0.75), Severity::Moderate);
        assert_eq!(Severity::from_confidence(0.751), Severity::Severe);
    }

    #[test]
    fn test_healthy_ignores_confidence() {
        for confidence in [0.1, 0.5, 0.99] {
            let diagnosis = diagnose("Pepper__bell___healthy", confidence);
            assert_eq!(diagnosis.crop, "Pepper__bell");
            assert_eq!(diagnosis.status, Status::Healthy);
            assert_eq!(diagnosis.disease, "None");
            assert_eq!(diagnosis.severity, Severity::None);
            assert_eq!(diagnosis.advice, HEALTHY_ADVICE);
        }
    }

    #[test]
    fn test_diseased_diagnosis() {
        let diagnosis = diagnose("Tomato___Early_blight", 0.55);
        assert_eq!(diagnosis.crop, "Tomato");
        assert_eq!(diagnosis.status, Status::Diseased);
        assert_eq!(diagnosis.disease, "Early blight");
        assert_eq!(diagnosis.severity, Severity::Moderate);
        assert_eq!(diagnosis.advice, "Remove infected leaves and use fungicide.");
    }

    #[test]
    fn test_advice_first_match_wins() {
        assert_eq!(
            advice_for("Bacterial_spot"),
            "Use copper-based fungicide and avoid overhead watering."
        );
        assert_eq!(advice_for("bacterial_wilt"), "Use recommended pesticide.");
        assert_eq!(advice_for("TARGET_SPOT"), "Use fungicide and avoid wet leaves.");
        assert_eq!(advice_for("Powdery_mildew"), FALLBACK_ADVICE);
    }

    #[test]
    fn test_every_served_disease_has_specific_advice() {
        for label in CLASS_NAMES {
            let diagnosis = diagnose(label, 0.9);
            if diagnosis.status == Status::Diseased {
                assert_ne!(diagnosis.advice, FALLBACK_ADVICE, "{}", label);
            }
        }
    }

    #[test]
    fn test_diagnosis_json_shape() {
        let value = serde_json::to_value(diagnose("Potato___Late_blight", 0.8)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "crop": "Potato",
                "status": "Diseased",
                "disease": "Late blight",
                "severity": "Severe",
                "confidence": 0.8,
                "advice": "Destroy infected plants and avoid wet conditions."
            })
        );
    }

    #[test]
    fn test_diagnose_scores_checks_length() {
        assert!(diagnose_scores(&[0.0; 3], &CLASS_NAMES).is_err());

        let mut scores = [0.0f32; 15];
        scores[7] = 5.0;
        let (prediction, diagnosis) = diagnose_scores(&scores, &CLASS_NAMES).unwrap();
        assert_eq!(prediction.index, 7);
        assert_eq!(diagnosis.status, Status::Healthy);
        assert_eq!(diagnosis.crop, "Tomato");
    }

    #[test]
    fn test_confidence_uses_a_single_softmax() {
        let mut scores = [0.0f32; 15];
        scores[6] = 4.0;
        let (_, diagnosis) = diagnose_scores(&scores, &CLASS_NAMES).unwrap();

        let once = 4f64.exp() / (4f64.exp() + 14.0);
        assert!((diagnosis.confidence - once).abs() < 1e-9);

        let twice = once.exp() / (once.exp() + 14.0 * ((1.0 - once) / 14.0).exp());
        assert!(twice < 0.2);
        assert_eq!(diagnosis.severity, Severity::Severe);
    }
}
