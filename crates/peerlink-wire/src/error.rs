//! Error types for the configuration field-dispatch parser.

use thiserror::Error;

/// Result type alias for wire parsing operations.
pub type WireResult<T> = Result<T, ParseError>;

/// Errors raised while applying a configuration stream.
///
/// A parse error aborts the stream; fields applied before the failing
/// one remain applied.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A recognized field carried a value its handler could not decode.
    #[error("field `{field}` could not be decoded: {reason}")]
    Field { field: String, reason: String },

    /// A factory-reference field named a factory that is not registered.
    #[error("field `{field}` references unknown factory `{reference}`")]
    UnknownFactory { field: String, reference: String },
}

impl ParseError {
    /// The name of the field that caused the error.
    pub fn field(&self) -> &str {
        match self {
            ParseError::Field { field, .. } => field,
            ParseError::UnknownFactory { field, .. } => field,
        }
    }
}
