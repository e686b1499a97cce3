//! Error types for limn-scene
//!
//! Provides error handling for:
//! - Collection folding (fatal configuration errors)
//! - Path encoding (fatal stream errors)
//! - Recoverable export degradations, recorded as warnings

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for export operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Collection folding errors
    #[error("Collection folding failed: {0}")]
    Fold(#[from] FoldError),

    /// Path encoding errors
    #[error("Path encoding failed: {0}")]
    Path(#[from] PathError),

    /// Invalid figure configuration
    #[error("Invalid figure: {0}")]
    InvalidFigure(String),
}

/// Errors raised while folding per-item collection properties.
///
/// These are fatal: partially folded data would silently misrepresent
/// the figure, so the whole export aborts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FoldError {
    /// A property was absent or empty and no default was supplied
    #[error("property '{key}' has no value and no default")]
    MissingDefault { key: String },

    /// A property array length matched neither 0, 1, nor the item count
    #[error("property '{key}' has length {len}, expected {expected}")]
    LengthMismatch {
        key: String,
        len: usize,
        expected: usize,
    },
}

/// Errors raised while encoding a vertex/opcode stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// An opcode required more vertices than the stream holds
    #[error("opcode {opcode} at index {index} needs {needed} vertices, {available} available")]
    VertexUnderrun {
        opcode: &'static str,
        index: usize,
        needed: usize,
        available: usize,
    },

    /// A multi-vertex opcode was not repeated for each vertex it consumes
    #[error("opcode run for {opcode} broken at index {index}")]
    BrokenOpcodeRun { opcode: &'static str, index: usize },
}

/// Result type alias for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type alias for folding operations
pub type FoldResult<T> = Result<T, FoldError>;

/// Result type alias for path encoding
pub type PathResult<T> = Result<T, PathError>;

/// Category of a recoverable export degradation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// An unrecognized style value was replaced by a documented default
    StyleFallback,

    /// A host feature category the exporter does not support was skipped
    UnsupportedFeature,
}

/// A recoverable degradation recorded during export.
///
/// Warnings never abort an export; they reduce fidelity and are
/// collected on the export output for the caller to inspect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// Collector for recoverable degradations.
///
/// Every warning is also emitted through `tracing` at the point of
/// recovery, so exports degrade visibly even when the caller discards
/// the collected list.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a style fallback
    pub fn style_fallback(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "limn_scene::style", "{message}");
        self.items.push(Warning {
            kind: WarningKind::StyleFallback,
            message,
        });
    }

    /// Record a skipped unsupported feature
    pub fn unsupported(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "limn_scene::export", "{message}");
        self.items.push(Warning {
            kind: WarningKind::UnsupportedFeature,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    /// Consume the collector, returning the recorded warnings
    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
