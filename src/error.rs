// Error types for the search / validate / book pipeline

use crate::enrichment::EnrichmentCategory;
use crate::manifest::MissingField;
use thiserror::Error;

// Transport-level errors returned by a FlightApi implementation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Authentication rejected by backend")]
    Unauthorized,

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::NetworkError(_) | ApiError::Timeout(_) => true,
            ApiError::ApiResponseError { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }
}

// Caller-facing errors; every variant is meant to become visible UI state
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("Search failed: {0}")]
    Search(String),

    #[error("Invalid search: {0}")]
    InvalidSearch(String),

    #[error("Price validation failed: {0}")]
    Validation(String),

    #[error("{category} lookup failed: {message}")]
    Enrichment {
        category: EnrichmentCategory,
        message: String,
    },

    #[error("Passenger details incomplete ({} missing field(s))", .0.len())]
    IncompleteManifest(Vec<MissingField>),

    #[error("Booking submission failed: {message}")]
    Submission { message: String, retryable: bool },

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Invalid payment details: {0}")]
    InvalidPayment(String),

    #[error("Cannot {action} during the {step} step")]
    InvalidTransition {
        action: &'static str,
        step: &'static str,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Session expired, please sign in again")]
    SessionExpired,
}

impl FlowError {
    pub fn search(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => FlowError::SessionExpired,
            other => FlowError::Search(other.to_string()),
        }
    }

    pub fn validation(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => FlowError::SessionExpired,
            other => FlowError::Validation(other.to_string()),
        }
    }

    pub fn enrichment(category: EnrichmentCategory, error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => FlowError::SessionExpired,
            other => FlowError::Enrichment {
                category,
                message: other.to_string(),
            },
        }
    }

    pub fn submission(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => FlowError::SessionExpired,
            other => FlowError::Submission {
                // A failed booking call keeps entered data, so the user can always resubmit
                retryable: true,
                message: other.to_string(),
            },
        }
    }

    pub fn lookup(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized => FlowError::SessionExpired,
            ApiError::MalformedResponse(message) => FlowError::MalformedResponse(message),
            other => FlowError::Submission {
                retryable: other.is_retryable(),
                message: other.to_string(),
            },
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, FlowError::SessionExpired)
    }
}
