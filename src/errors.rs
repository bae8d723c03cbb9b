//! Error types for campaign analysis.
//!
//! The engine distinguishes three failure classes: malformed input that must
//! be rejected before analysis (`Validation`), an empty record set for a
//! period (`InsufficientData`), and tunable values that make the scoring
//! model undefined (`Configuration`). Configuration problems are detected at
//! construction time and are fatal immediately; they are never silently
//! repaired.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A record failed ingestion validation (bad range, missing required
    /// field, duplicate identifier). Fatal for the whole batch.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No call records in the analyzed period. Callers may fall back to an
    /// empty, flagged metrics snapshot and skip issue detection.
    #[error("insufficient data: no call records in period")]
    InsufficientData,

    /// Weights, thresholds, or campaign targets that leave a ratio
    /// denominator at zero or break the weight-sum invariant.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
