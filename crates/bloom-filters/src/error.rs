//! Error types for the Bloom filter crate

use thiserror::Error;

use crate::domain::FilterParameters;

/// Errors that can occur when building, combining or decoding filters
///
/// Every fallible operation either applies fully or leaves its inputs
/// untouched, so none of these leave a filter in a corrupt state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    /// Construction parameters out of range (m = 0, k = 0, n = 0, p outside (0,1))
    #[error("Invalid filter parameters: {0}")]
    InvalidParameters(String),

    /// Union/intersection between filters of differing (m, k, seed)
    #[error("Filter shape mismatch: {left} vs {right}")]
    ShapeMismatch {
        left: FilterParameters,
        right: FilterParameters,
    },

    /// Counting filter removal hit a counter that is already zero
    #[error("Element not present: a targeted counter is already zero")]
    NotPresent,

    /// Wire bytes could not be decoded into a filter
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FilterError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FilterError::InvalidParameters(msg.into())
    }

    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        FilterError::Decode(msg.into())
    }
}
