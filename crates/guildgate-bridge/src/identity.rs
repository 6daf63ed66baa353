//! Internal identity service interface.
//!
//! The bridge only needs four operations from the identity backend: look a
//! user up, create one, update one, and mint a custom token. Storage and
//! concurrency control belong to the backend.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;

use crate::role::RoleClaim;
use crate::signer::CustomTokenSigner;

/// Failures reported by an identity backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// No record for this uid. Expected on first login.
    #[error("Identity not found: {0}")]
    NotFound(String),

    /// A record with this uid already exists.
    #[error("Identity already exists: {0}")]
    AlreadyExists(String),

    /// Backend unreachable or overloaded; the same call could succeed later.
    #[error("Identity service unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request (bad field, quota, permissions).
    #[error("Identity service rejected request: {0}")]
    Rejected(String),

    /// Token signing failed.
    #[error("Signing error: {0}")]
    Signing(String),
}

impl IdentityError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, IdentityError::NotFound(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }
}

/// Stored identity, keyed by the provider's external id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRecord {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Fields for a first-login create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
}

/// Fields written on every login.
///
/// `None` in an optional field means "leave the stored value unchanged";
/// an update never clears a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUpdate {
    pub email: Option<String>,
    pub display_name: String,
    pub photo_url: Option<String>,
}

/// Identity-and-token backend.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn get_user(&self, uid: &str) -> Result<IdentityRecord, IdentityError>;

    async fn create_user(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError>;

    async fn update_user(
        &self,
        uid: &str,
        update: IdentityUpdate,
    ) -> Result<IdentityRecord, IdentityError>;

    /// Mint a signed custom token for `uid` embedding `role`.
    async fn create_custom_token(
        &self,
        uid: &str,
        role: &RoleClaim,
    ) -> Result<String, IdentityError>;
}

/// Shared identity service handle.
pub type SharedIdentityService = Arc<dyn IdentityService>;

// ============================================================================
// InMemoryIdentityService
// ============================================================================

/// Process-local identity store with a local token signer.
///
/// Concurrent updates to the same uid are last-write-wins.
#[derive(Debug)]
pub struct InMemoryIdentityService {
    users: RwLock<HashMap<String, IdentityRecord>>,
    signer: CustomTokenSigner,
}

impl InMemoryIdentityService {
    pub fn new(signer: CustomTokenSigner) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            signer,
        }
    }

    /// Current stored record, if any.
    pub fn snapshot(&self, uid: &str) -> Option<IdentityRecord> {
        self.users.read().get(uid).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn get_user(&self, uid: &str) -> Result<IdentityRecord, IdentityError> {
        self.snapshot(uid)
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))
    }

    async fn create_user(&self, identity: NewIdentity) -> Result<IdentityRecord, IdentityError> {
        let mut users = self.users.write();
        if users.contains_key(&identity.uid) {
            return Err(IdentityError::AlreadyExists(identity.uid));
        }

        let record = IdentityRecord {
            uid: identity.uid.clone(),
            email: identity.email,
            display_name: Some(identity.display_name),
            photo_url: identity.photo_url,
        };
        users.insert(identity.uid, record.clone());
        Ok(record)
    }

    async fn update_user(
        &self,
        uid: &str,
        update: IdentityUpdate,
    ) -> Result<IdentityRecord, IdentityError> {
        let mut users = self.users.write();
        let record = users
            .get_mut(uid)
            .ok_or_else(|| IdentityError::NotFound(uid.to_string()))?;

        if let Some(email) = update.email {
            record.email = Some(email);
        }
        record.display_name = Some(update.display_name);
        if let Some(photo_url) = update.photo_url {
            record.photo_url = Some(photo_url);
        }
        Ok(record.clone())
    }

    async fn create_custom_token(
        &self,
        uid: &str,
        role: &RoleClaim,
    ) -> Result<String, IdentityError> {
        self.signer.sign(uid, role)
    }
}
