//! Identity provisioning.
//!
//! Look the external id up; create on first login; then always update so the
//! stored record mirrors the latest profile.

use crate::error::{BridgeError, Result};
use crate::identity::{
    IdentityError, IdentityRecord, IdentityUpdate, NewIdentity, SharedIdentityService,
};
use crate::provider::ExternalProfile;

/// Outcome of a provisioning call.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub identity: IdentityRecord,
    /// `true` when this call performed the create.
    pub created: bool,
}

/// Keeps internal identities in sync with external profiles.
#[derive(Clone)]
pub struct IdentityProvisioner {
    identities: SharedIdentityService,
    cdn_base_url: String,
}

impl IdentityProvisioner {
    pub fn new(identities: SharedIdentityService, cdn_base_url: impl Into<String>) -> Self {
        Self {
            identities,
            cdn_base_url: cdn_base_url.into(),
        }
    }

    pub async fn provision(&self, profile: &ExternalProfile) -> Result<Provisioned> {
        let uid = profile.external_id.as_str();
        let photo_url = profile.photo_url(&self.cdn_base_url);

        let created = match self.identities.get_user(uid).await {
            Ok(_) => false,
            Err(e) if e.is_not_found() => self.create(profile, photo_url.clone()).await?,
            Err(e) => return Err(BridgeError::Provisioning(e)),
        };

        let identity = self
            .identities
            .update_user(
                uid,
                IdentityUpdate {
                    email: profile.email.clone(),
                    display_name: profile.display_name.clone(),
                    photo_url,
                },
            )
            .await
            .map_err(BridgeError::Provisioning)?;

        Ok(Provisioned { identity, created })
    }

    /// Returns `false` if a concurrent login created the record first.
    async fn create(&self, profile: &ExternalProfile, photo_url: Option<String>) -> Result<bool> {
        let new_identity = NewIdentity {
            uid: profile.external_id.clone(),
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            photo_url,
        };

        match self.identities.create_user(new_identity).await {
            Ok(_) => {
                tracing::info!(external_id = %profile.external_id, "Created identity");
                Ok(true)
            }
            Err(IdentityError::AlreadyExists(_)) => {
                tracing::debug!(
                    external_id = %profile.external_id,
                    "Identity created concurrently, updating instead"
                );
                Ok(false)
            }
            Err(e) => Err(BridgeError::Provisioning(e)),
        }
    }
}
