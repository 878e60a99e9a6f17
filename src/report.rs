//! Diagnostic report rendering
//!
//! Builds a one-page A4 PDF from a diagnosis. The layout is a bold title,
//! the generation time, one line per diagnosis field, then the advice text
//! wrapped to the page width. Reports are always written to the same file
//! name ([`REPORT_FILENAME`]), replacing the previous one.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inference::diagnosis::Diagnosis;
use crate::utils::error::{CropError, Result};

/// Fixed output file name, overwritten on every call
pub const REPORT_FILENAME: &str = "crop_report.pdf";

/// Report title
pub const REPORT_TITLE: &str = "Crop Health Diagnostic Report";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 10.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;
const LINE_HEIGHT_MM: f32 = 10.0;
const GAP_MM: f32 = 5.0;
const ADVICE_LINE_HEIGHT_MM: f32 = 8.0;

/// Characters per advice line at the body font size
const WRAP_WIDTH: usize = 90;

/// Body of a report request; every field is required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub crop: String,
    pub status: String,
    pub disease: String,
    pub severity: String,
    pub confidence: f64,
    pub advice: String,
}

impl From<&Diagnosis> for ReportRequest {
    fn from(diagnosis: &Diagnosis) -> Self {
        Self {
            crop: diagnosis.crop.clone(),
            status: diagnosis.status.to_string(),
            disease: diagnosis.disease.clone(),
            severity: diagnosis.severity.to_string(),
            confidence: diagnosis.confidence,
            advice: diagnosis.advice.clone(),
        }
    }
}

/// Text content of a report, independent of the PDF encoding
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub date_line: String,
    pub field_lines: Vec<String>,
    pub advice_lines: Vec<String>,
}

impl ReportDocument {
    pub fn new(request: &ReportRequest, generated_at: DateTime<Local>) -> Self {
        let mut advice_lines = vec!["Advice:".to_string()];
        advice_lines.extend(wrap_text(&request.advice, WRAP_WIDTH));

        Self {
            title: REPORT_TITLE.to_string(),
            date_line: format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
            field_lines: vec![
                format!("Crop: {}", request.crop),
                format!("Status: {}", request.status),
                format!("Disease: {}", request.disease),
                format!("Severity: {}", request.severity),
                format!("Confidence: {}%", format_confidence(request.confidence)),
            ],
            advice_lines,
        }
    }

    /// Render the document as PDF bytes
    pub fn render_pdf(&self) -> Result<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new(
            &self.title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);

        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| CropError::Report(format!("{:?}", e)))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| CropError::Report(format!("{:?}", e)))?;

        let mut y = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM;
        layer.use_text(self.title.as_str(), TITLE_SIZE, Mm(MARGIN_MM), Mm(y), &bold);
        y -= LINE_HEIGHT_MM;

        layer.use_text(self.date_line.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &regular);
        y -= LINE_HEIGHT_MM + GAP_MM;

        for line in &self.field_lines {
            layer.use_text(line.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &regular);
            y -= LINE_HEIGHT_MM;
        }
        y -= GAP_MM;

        for line in &self.advice_lines {
            layer.use_text(line.as_str(), BODY_SIZE, Mm(MARGIN_MM), Mm(y), &regular);
            y -= ADVICE_LINE_HEIGHT_MM;
        }

        doc.save_to_bytes()
            .map_err(|e| CropError::Report(format!("{:?}", e)))
    }
}

/// Render a report for `request` into `dir/crop_report.pdf`
pub fn write_report(request: &ReportRequest, dir: &Path) -> Result<PathBuf> {
    let document = ReportDocument::new(request, Local::now());
    let bytes = document.render_pdf()?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(REPORT_FILENAME);
    std::fs::write(&path, bytes)?;

    debug!("Wrote report to {:?}", path);
    Ok(path)
}

/// Percentage with at most two decimals, always showing one
/// (`0.55` -> `55.0`, `0.5556` -> `55.56`)
///
/// Rounding goes through the decimal rendering of `confidence * 100`, so
/// halves resolve on the exact binary value (`0.83695` -> `83.69`).
pub fn format_confidence(confidence: f64) -> String {
    let scaled = confidence * 100.0;
    let percent: f64 = format!("{:.2}", scaled).parse().unwrap_or(scaled);
    if percent.is_finite() && percent.fract() == 0.0 {
        format!("{:.1}", percent)
    } else {
        format!("{}", percent)
    }
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_request() -> ReportRequest {
        ReportRequest {
            crop: "Tomato".to_string(),
            status: "Diseased".to_string(),
            disease: "Early blight".to_string(),
            severity: "Moderate".to_string(),
            confidence: 0.55,
            advice: "Remove infected leaves and use fungicide.".to_string(),
        }
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.55), "55.0");
        assert_eq!(format_confidence(0.5556), "55.56");
        assert_eq!(format_confidence(1.0), "100.0");
        assert_eq!(format_confidence(0.123456), "12.35");
        assert_eq!(format_confidence(0.83695), "83.69");
        assert_eq!(format_confidence(0.28545), "28.54");
    }

    #[test]
    fn test_document_lines() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let document = ReportDocument::new(&sample_request(), at);

        assert_eq!(document.title, "Crop Health Diagnostic Report");
        assert_eq!(document.date_line, "Date: 2024-03-09 14:05:07");
        assert_eq!(
            document.field_lines,
            vec![
                "Crop: Tomato",
                "Status: Diseased",
                "Disease: Early blight",
                "Severity: Moderate",
                "Confidence: 55.0%",
            ]
        );
        assert_eq!(
            document.advice_lines,
            vec!["Advice:", "Remove infected leaves and use fungicide."]
        );
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
        assert_eq!(wrap_text("", 10), Vec::<String>::new());
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn test_long_advice_is_wrapped_without_losing_words() {
        let mut request = sample_request();
        request.advice = "water ".repeat(40).trim().to_string();
        let document = ReportDocument::new(&request, Local::now());

        assert!(document.advice_lines.len() > 2);
        assert!(document.advice_lines.iter().all(|l| l.len() <= WRAP_WIDTH));
        assert_eq!(document.advice_lines[1..].join(" "), request.advice);
    }

    #[test]
    fn test_write_report_overwrites_fixed_file() {
        let tmp = tempfile::TempDir::new().unwrap();

        let first = write_report(&sample_request(), tmp.path()).unwrap();
        let mut other = sample_request();
        other.crop = "Potato".to_string();
        let second = write_report(&other, tmp.path()).unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with(REPORT_FILENAME));
        let bytes = std::fs::read(&second).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = serde_json::from_str::<ReportRequest>(
            r#"{"status":"Healthy","disease":"None","severity":"None","confidence":0.9,"advice":"ok"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing field `crop`"));
    }
}
