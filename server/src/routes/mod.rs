//! API route handlers

pub mod diagnosis;
pub mod health;
pub mod report;
