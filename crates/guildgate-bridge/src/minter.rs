//! Custom credential minting.

use std::fmt;

use crate::error::{BridgeError, Result};
use crate::identity::SharedIdentityService;
use crate::role::RoleClaim;

/// Signed token handed to the client. Never logged or stored.
#[derive(Clone, PartialEq, Eq)]
pub struct CustomCredential(String);

impl CustomCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the response body only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CustomCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomCredential([redacted])")
    }
}

/// Asks the identity service for a fresh custom token. One attempt per call.
#[derive(Clone)]
pub struct CredentialMinter {
    identities: SharedIdentityService,
}

impl CredentialMinter {
    pub fn new(identities: SharedIdentityService) -> Self {
        Self { identities }
    }

    pub async fn mint(&self, external_id: &str, role: &RoleClaim) -> Result<CustomCredential> {
        self.identities
            .create_custom_token(external_id, role)
            .await
            .map(CustomCredential::new)
            .map_err(BridgeError::Mint)
    }
}
