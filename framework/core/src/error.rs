/// Outcome of an HTTP call that did not meet expectations.
///
/// Connection level problems and unexpected status codes are kept apart so that they can be
/// reported separately, but both count towards the HTTP error rate.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Connection refused, DNS failure, timeout or a broken response body.
    #[display("network error: {message}")]
    Network { message: String },
    /// A response arrived but its status was not the one expected.
    #[display("unexpected HTTP status {status}")]
    HttpStatus { status: u16 },
}

impl RequestError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

/// A step could not be turned into a request because something it depends on is missing.
///
/// This is fatal to the current iteration only.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum TemplateResolutionError {
    #[display("required value `{name}` is not available")]
    MissingValue { name: String },
    #[display("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[display("{reason}")]
    Invalid { reason: String },
}

impl TemplateResolutionError {
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingValue { name: name.into() }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// Turn an optional value produced by setup or an earlier step into a template input.
///
/// ```rust
/// use gale_core::prelude::{required, TemplateResolutionError};
///
/// let id: Option<u64> = None;
/// assert_eq!(required(id, "activity_id"), Err(TemplateResolutionError::missing("activity_id")));
/// ```
pub fn required<T>(value: Option<T>, name: &str) -> Result<T, TemplateResolutionError> {
    value.ok_or_else(|| TemplateResolutionError::missing(name))
}
