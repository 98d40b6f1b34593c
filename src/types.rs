//! Crate-wide error taxonomy.
//!
//! Four failure classes cross the service boundary: not-found, forbidden,
//! validation (a list of field-tagged errors, rejected before any
//! mutation), and internal crypto/push failures. The routing layer maps
//! these onto transport status codes; this crate never does.

use serde::Serialize;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ConclaveError>;

/// Validation error categories with their stable wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request not allowed in the current lifecycle state.
    BadRequest,
    /// Username already registered.
    UsernameTaken,
    /// Suggestion title already exists within the consensus.
    DuplicateSuggestionTitle,
    /// Voting-start deadline lies after the end deadline.
    VotingStartAfterEnd,
    /// Title shorter than the minimum length.
    TitleTooShort,
    /// End deadline missing or in the past.
    EndDateInvalid,
    /// Acceptance value outside the 0..=10 range.
    AcceptanceOutOfRange,
}

impl ErrorKind {
    /// Stable numeric code consumed by API clients.
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::UsernameTaken => 406,
            ErrorKind::DuplicateSuggestionTitle => 409,
            ErrorKind::VotingStartAfterEnd => 444,
            ErrorKind::TitleTooShort => 445,
            ErrorKind::EndDateInvalid => 446,
            ErrorKind::AcceptanceOutOfRange => 477,
        }
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Request not allowed in the current state",
            ErrorKind::UsernameTaken => "Username is already taken",
            ErrorKind::DuplicateSuggestionTitle => "Suggestion title already exists",
            ErrorKind::VotingStartAfterEnd => "Voting start date too late",
            ErrorKind::TitleTooShort => "Title not long enough",
            ErrorKind::EndDateInvalid => "End date invalid",
            ErrorKind::AcceptanceOutOfRange => "Bad voting range (not 0-10)",
        }
    }
}

/// A single validation failure, optionally attributed to an input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub kind: ErrorKind,
    /// Input field the error refers to, when one applies.
    pub parameter: Option<&'static str>,
}

impl FieldError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            parameter: None,
        }
    }

    pub fn on(kind: ErrorKind, parameter: &'static str) -> Self {
        Self {
            kind,
            parameter: Some(parameter),
        }
    }
}

/// Marshaling-ready form of a [`FieldError`], as serialized to API clients.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub description: &'static str,
    pub parameter: Option<&'static str>,
}

impl From<&FieldError> for ApiError {
    fn from(err: &FieldError) -> Self {
        Self {
            code: err.kind.code(),
            description: err.kind.description(),
            parameter: err.parameter,
        }
    }
}

/// Error envelope returned by the routing layer for rejected requests.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub errors: Vec<ApiError>,
}

impl ApiErrorResponse {
    pub fn from_errors(errors: &[FieldError]) -> Self {
        Self {
            errors: errors.iter().map(ApiError::from).collect(),
        }
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum ConclaveError {
    /// Referenced consensus or suggestion is absent, or not owned by the
    /// expected parent.
    #[error("resource not found")]
    NotFound,

    /// Caller lacks admin or accessor standing for the requested mutation.
    #[error("forbidden")]
    Forbidden,

    /// Input rejected before any mutation took place.
    #[error("validation failed ({count} error(s))", count = .0.len())]
    Validation(Vec<FieldError>),

    /// Secret hashing or verification failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Push delivery failure; logged by the trigger, never escalated.
    #[error("push delivery failed: {0}")]
    Push(String),
}

impl ConclaveError {
    /// Single-field validation failure.
    pub fn validation(kind: ErrorKind, parameter: &'static str) -> Self {
        ConclaveError::Validation(vec![FieldError::on(kind, parameter)])
    }

    /// Generic "not allowed in the current state" rejection.
    pub fn bad_request() -> Self {
        ConclaveError::Validation(vec![FieldError::new(ErrorKind::BadRequest)])
    }
}
