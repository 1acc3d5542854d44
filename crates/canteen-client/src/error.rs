//! Canteen client error types.

use crate::auth::CasRetry;
use crate::menu::MealKind;
use crate::order::OrderError;

/// Which postback of an order submission failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    /// A do-not-order checkbox toggle for the given meal.
    Toggle { meal: MealKind },
    /// The final course-quantity callback.
    Final,
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toggle { meal } => write!(f, "do-not-order toggle for {meal}"),
            Self::Final => f.write_str("final quantity submission"),
        }
    }
}

/// Errors from portal calls.
#[derive(Debug, thiserror::Error)]
pub enum CanteenError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The portal answered with a non-2xx status.
    #[error("portal {endpoint} returned {status}")]
    Status { endpoint: String, status: u16 },
    /// The request was silently redirected to the CAS login page.
    /// The caller must log in again from scratch.
    #[error("session expired while calling {endpoint}")]
    SessionExpired { endpoint: String },
    /// An expected marker or field was absent from the page.
    #[error("could not parse {what} from {endpoint}")]
    Parse { endpoint: String, what: String },
    /// CAS rejected the credentials. `retry` resumes the handshake without
    /// re-fetching the login page.
    #[error("authentication failed: CAS rejected the credentials")]
    AuthenticationFailed { retry: CasRetry },
    /// A postback did not produce the expected confirmation.
    #[error("{stage} was not accepted by the portal")]
    SubmissionFailed { stage: SubmissionStage },
    /// Order rejected locally; nothing was sent.
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderError),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl CanteenError {
    pub(crate) fn parse(endpoint: impl Into<String>, what: impl Into<String>) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            what: what.into(),
        }
    }
}
