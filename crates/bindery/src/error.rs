//! Binding error types.
//!
//! Every error aborts the decode call that raised it. [`crate::Decoder`]
//! stages the walk on a copy, so a failed decode leaves its target unchanged;
//! a hand-driven [`crate::StructWalker`] keeps whatever it assigned before the
//! failure.

use http::StatusCode;
use thiserror::Error;

use crate::resolve::ResolveError;
use crate::schema::SourceKind;

/// Error raised while binding a request into a target record.
///
/// # Example
///
/// ```rust
/// use bindery::BindError;
/// use http::StatusCode;
///
/// let err = BindError::InvalidTarget { type_name: "u32" };
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.error_code(), "INVALID_TARGET");
/// assert!(err.to_string().contains("u32"));
/// ```
#[derive(Debug, Error)]
pub enum BindError {
    /// The decode target is not a record.
    #[error("invalid decode target: {type_name} is not a record")]
    InvalidTarget {
        /// Target type name.
        type_name: &'static str,
    },

    /// A field's type has no coercion rule for the sources bound to it.
    #[error("unsupported type {type_name} for field '{field}'")]
    UnsupportedFieldType {
        /// Dotted field path.
        field: String,
        /// Declared field type.
        type_name: &'static str,
    },

    /// A raw value failed strict parsing for its destination type.
    #[error("invalid {origin} value for field '{field}' ({type_name}): {cause}")]
    MalformedValue {
        /// Dotted field path.
        field: String,
        /// Source the raw value came from.
        origin: SourceKind,
        /// Declared field type.
        type_name: &'static str,
        /// Underlying parse failure, carrying the raw value.
        #[source]
        cause: ResolveError,
    },

    /// The request body could not be parsed into the target.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The request body exceeds the configured limit.
    #[error("request body too large: max {limit} bytes, got at least {actual} bytes")]
    PayloadTooLarge {
        /// Configured maximum.
        limit: usize,
        /// Bytes seen before reading stopped.
        actual: usize,
    },

    /// Reading the request body failed.
    #[error("failed to read request body: {0}")]
    Io(#[from] std::io::Error),
}

impl BindError {
    /// Wraps a resolver failure with field context.
    #[must_use]
    pub fn malformed_value(
        field: impl Into<String>,
        origin: SourceKind,
        type_name: &'static str,
        cause: ResolveError,
    ) -> Self {
        Self::MalformedValue {
            field: field.into(),
            origin,
            type_name,
            cause,
        }
    }

    /// Returns the dotted field path, if the error concerns one field.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnsupportedFieldType { field, .. } | Self::MalformedValue { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// Returns the raw value that failed to parse, if any.
    #[must_use]
    pub fn raw_value(&self) -> Option<&str> {
        match self {
            Self::MalformedValue { cause, .. } => Some(cause.raw()),
            _ => None,
        }
    }

    /// Returns the HTTP status a caller would typically answer with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidTarget { .. }
            | Self::UnsupportedFieldType { .. }
            | Self::MalformedValue { .. }
            | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns an error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "INVALID_TARGET",
            Self::UnsupportedFieldType { .. } => "UNSUPPORTED_FIELD_TYPE",
            Self::MalformedValue { .. } => "MALFORMED_VALUE",
            Self::MalformedBody(_) => "MALFORMED_BODY",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Io(_) => "BODY_READ_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ScalarKind;
    use std::error::Error as _;

    #[test]
    fn test_malformed_value() {
        let cause = ResolveError::new(ScalarKind::I32, "abc", "invalid syntax");
        let err = BindError::malformed_value("filter.limit", SourceKind::Query, "i32", cause);

        assert_eq!(err.field(), Some("filter.limit"));
        assert_eq!(err.raw_value(), Some("abc"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MALFORMED_VALUE");
        let message = err.to_string();
        assert!(message.contains("query"), "{message}");
        assert!(message.contains("filter.limit"), "{message}");
        assert!(message.contains("\"abc\""), "{message}");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unsupported_field_type() {
        let err = BindError::UnsupportedFieldType {
            field: "filter".into(),
            type_name: "Filter",
        };

        assert_eq!(err.field(), Some("filter"));
        assert_eq!(err.error_code(), "UNSUPPORTED_FIELD_TYPE");
        assert!(err.to_string().contains("Filter"));
    }

    #[test]
    fn test_malformed_body() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = BindError::MalformedBody(json_err);

        assert_eq!(err.field(), None);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("malformed request body"));
    }

    #[test]
    fn test_payload_too_large() {
        let err = BindError::PayloadTooLarge {
            limit: 1024,
            actual: 2048,
        };

        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn test_io_error() {
        let err: BindError = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline").into();

        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "BODY_READ_FAILED");
    }
}
