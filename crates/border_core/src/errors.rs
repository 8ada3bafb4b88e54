//! Structured diagnostics (spec §7: configuration / data / numerical-degeneracy errors).
//!
//! Configuration errors are fatal and pre-run; they carry enough structure
//! (category, path, message) for a caller to render or log programmatically
//! rather than matching on a formatted string.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    Configuration,
    Data,
}

/// A fatal, pre-run configuration or data problem.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{category:?} error at '{path}': {message}")]
pub struct ConfigError {
    pub category: ErrorCategory,
    pub path: String,
    pub message: String,
}

impl ConfigError {
    #[must_use]
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Configuration,
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn data(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: ErrorCategory::Data,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A recoverable condition worth surfacing in the aggregate (spec §7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Requested subset larger than available items; clamped to the population.
    ClampedToPopulation { requested: usize, available: usize },
    /// A beta/gamma draw landed exactly on a degenerate boundary (0 or 1).
    DegenerateDraw { distribution: &'static str, value: f64 },
    /// Hypergeometric sample-size formula saw `K == 0`.
    ZeroDetectableUnits,
    /// `B == 0` (and therefore `N == 0`); contamination/inspection were both skipped.
    EmptyConsignment,
    /// An input row (scenario-table row, F280/AQIM CSV row) was rejected
    /// under non-strict input handling and skipped rather than aborting the
    /// whole read.
    RowRejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
