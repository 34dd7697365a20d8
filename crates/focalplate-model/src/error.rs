// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for survey ingestion and backend interaction

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, InputError>;

/// Errors raised while reading or normalising a survey point cloud
///
/// All of these are fatal: they are reported before any modeling intent is
/// produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// A record could not be parsed
    #[error("Malformed record on line {line}: {message}")]
    Format { line: usize, message: String },

    /// The input contained no records at all
    #[error("Point cloud contains no records")]
    Empty,

    /// The scalar z-offset was requested a second time
    #[error("Z offset already applied ({0} m)")]
    OffsetAlreadyApplied(f64),

    /// Unknown length unit name
    #[error("Unknown length unit: {0}")]
    UnknownUnit(String),
}

impl InputError {
    /// Create a new format error
    pub fn format(line: usize, msg: impl Into<String>) -> Self {
        InputError::Format {
            line,
            message: msg.into(),
        }
    }

    /// Line number of the offending record, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            InputError::Format { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Error returned by a modeling backend that could not realise an intent
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Backend rejected intent {position} ({op}): {message}")]
pub struct BackendError {
    /// Position of the intent in the stream
    pub position: usize,
    /// Operation name of the rejected intent
    pub op: &'static str,
    /// Backend-specific reason
    pub message: String,
}

impl BackendError {
    /// Create a new backend error
    pub fn new(position: usize, op: &'static str, msg: impl Into<String>) -> Self {
        Self {
            position,
            op,
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message() {
        let err = InputError::format(7, "expected 4 fields");
        assert_eq!(err.line(), Some(7));
        assert_eq!(
            err.to_string(),
            "Malformed record on line 7: expected 4 fields"
        );
        assert_eq!(InputError::Empty.line(), None);
    }
}
