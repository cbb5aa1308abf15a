//! Error taxonomy for the dispatch core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("invalid configuration: {field} {message}")]
    InvalidConfiguration {
        field: &'static str,
        message: String,
    },
    #[error("invalid observation: {field} {message}")]
    InvalidObservation {
        field: &'static str,
        message: String,
    },
    #[error("price series goes back in time at index {index}")]
    UnorderedSeries { index: usize },
    #[error("access denied: session is not authenticated")]
    AccessDenied,
}

impl DispatchError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn observation(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidObservation {
            field,
            message: message.into(),
        }
    }
}

/// Rejects negative or non-finite capacities.
pub(crate) fn ensure_capacity(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(DispatchError::config(field, "must be finite"));
    }
    if value < 0.0 {
        return Err(DispatchError::config(field, format!("must be >= 0, got {value}")));
    }
    Ok(())
}

/// Rejects NaN and infinite observations.
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DispatchError::observation(field, format!("must be finite, got {value}")))
    }
}
