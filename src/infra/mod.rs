//! Runtime bootstrap: telemetry installation and its errors.

pub mod error;
pub mod telemetry;
