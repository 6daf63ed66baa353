//! Custom token signing.
//!
//! Tokens follow the Firebase custom-token layout so a client SDK can
//! exchange them for an ID token: `iss`/`sub` are the service account,
//! `aud` is the Identity Toolkit audience, `uid` is the external id and
//! `claims` carries the role (omitted when empty).

use std::fmt;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use crate::identity::IdentityError;
use crate::role::RoleClaim;

/// Audience expected by the identity toolkit for custom tokens.
pub const CUSTOM_TOKEN_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Upper bound on custom token lifetime, in seconds.
pub const MAX_TOKEN_TTL_SECS: i64 = 3600;

/// Google service-account key file.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    /// Parse the JSON key file contents.
    pub fn from_json(json: &str) -> Result<Self, IdentityError> {
        serde_json::from_str(json)
            .map_err(|e| IdentityError::Signing(format!("Invalid service account JSON: {}", e)))
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"[redacted]")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Claims carried by a custom token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomTokenClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,
}

/// Signs custom tokens with a service-account key or a shared secret.
#[derive(Clone)]
pub struct CustomTokenSigner {
    issuer: String,
    algorithm: Algorithm,
    key: EncodingKey,
    ttl_secs: i64,
}

impl CustomTokenSigner {
    /// RS256 signer from a service-account key.
    pub fn from_service_account(account: &ServiceAccountKey) -> Result<Self, IdentityError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| IdentityError::Signing(format!("Invalid service account key: {}", e)))?;
        Ok(Self {
            issuer: account.client_email.clone(),
            algorithm: Algorithm::RS256,
            key,
            ttl_secs: MAX_TOKEN_TTL_SECS,
        })
    }

    /// HS256 signer for local development. Tokens are not accepted by a real
    /// identity toolkit.
    pub fn from_secret(issuer: impl Into<String>, secret: &[u8]) -> Self {
        Self {
            issuer: issuer.into(),
            algorithm: Algorithm::HS256,
            key: EncodingKey::from_secret(secret),
            ttl_secs: MAX_TOKEN_TTL_SECS,
        }
    }

    /// Set the token lifetime; clamped to `1..=MAX_TOKEN_TTL_SECS`.
    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs.clamp(1, MAX_TOKEN_TTL_SECS);
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign a token for `uid` carrying `role`.
    pub fn sign(&self, uid: &str, role: &RoleClaim) -> Result<String, IdentityError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = CustomTokenClaims {
            iss: self.issuer.clone(),
            sub: self.issuer.clone(),
            aud: CUSTOM_TOKEN_AUDIENCE.to_string(),
            iat,
            exp: iat + self.ttl_secs,
            uid: uid.to_string(),
            claims: if role.is_empty() {
                None
            } else {
                Some(
                    serde_json::to_value(role)
                        .map_err(|e| IdentityError::Signing(e.to_string()))?,
                )
            },
        };

        encode(&Header::new(self.algorithm), &claims, &self.key)
            .map_err(|e| IdentityError::Signing(format!("Failed to sign custom token: {}", e)))
    }
}

impl fmt::Debug for CustomTokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTokenSigner")
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
