//! Error types for limn-view
//!
//! The client fails loudly: a malformed payload or a plugin pointing
//! at a missing element produces an error before anything renders,
//! because a silent partial render is visually indistinguishable from
//! a correct sparse plot.

use thiserror::Error;

/// Main error type for client-side operations
#[derive(Error, Debug)]
pub enum ViewError {
    /// The payload could not be parsed into a scene graph
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but is internally inconsistent
    #[error("malformed payload: {0}")]
    Payload(String),

    /// An element references a data table entry that does not exist
    #[error("element '{element}' references missing dataset '{data}'")]
    MissingData { element: String, data: String },

    /// A plugin attaches to an element id that is not in the figure
    #[error("plugin '{kind}' references missing element id '{id}'")]
    MissingElement { kind: String, id: String },

    /// An axes referenced by index or id does not exist
    #[error("no such axes: {0}")]
    NoSuchAxes(String),

    /// A scale was given a domain it cannot represent
    #[error("invalid domain for {scale} scale: [{lo}, {hi}]")]
    InvalidDomain {
        scale: &'static str,
        lo: f64,
        hi: f64,
    },
}

/// Result type alias for client operations
pub type ViewResult<T> = Result<T, ViewError>;
