//! Error types for the login bridge.

use axum::http::StatusCode;

use crate::identity::IdentityError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors raised along the exchange pipeline, one variant per stage.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The inbound request was missing its input.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The provider rejected the authorization code or the token call failed.
    #[error("Token exchange failed: {0}")]
    UpstreamAuth(String),

    /// The profile lookup failed.
    #[error("Profile fetch failed: {0}")]
    UpstreamProfile(String),

    /// The membership lookup failed (including "not a member").
    #[error("Membership fetch failed: {0}")]
    UpstreamMembership(String),

    /// The identity service could not look up, create or update the record.
    #[error("Provisioning failed: {0}")]
    Provisioning(#[source] IdentityError),

    /// The identity service could not sign a custom token.
    #[error("Credential minting failed: {0}")]
    Mint(#[source] IdentityError),
}

impl BridgeError {
    /// Short stage name used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validate",
            BridgeError::UpstreamAuth(_) => "token",
            BridgeError::UpstreamProfile(_) => "profile",
            BridgeError::UpstreamMembership(_) => "membership",
            BridgeError::Provisioning(_) => "provision",
            BridgeError::Mint(_) => "mint",
        }
    }

    /// HTTP status reported to the caller for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the underlying cause looks transient.
    ///
    /// Only identity-service failures carry enough classification to tell.
    /// Nothing retries on this; it only selects the log level.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::Provisioning(e) | BridgeError::Mint(e) => e.is_transient(),
            _ => false,
        }
    }
}
