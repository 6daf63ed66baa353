//! Login exchange orchestration.
//!
//! One linear pipeline per request:
//! validate → token → profile → membership → role → provision → mint.
//! Each stage completes before the next starts. Any failure after
//! validation is logged with its cause and collapsed into one generic
//! client-facing message.

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::identity::SharedIdentityService;
use crate::minter::{CredentialMinter, CustomCredential};
use crate::provider::{DISCORD_CDN_URL, IdentityProvider};
use crate::provisioner::IdentityProvisioner;
use crate::role::{RoleClaim, derive_role};

/// Body message for a request without a code.
pub const MISSING_CODE_MESSAGE: &str = "missing authorization code";

/// Body message for every failure past validation.
pub const GENERIC_FAILURE_MESSAGE: &str = "authentication with the identity provider failed";

/// Deployment-specific identifiers used by the pipeline.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    /// Guild whose membership is checked.
    pub community_id: String,
    /// Guild role that grants the admin claim.
    pub privileged_role_id: String,
    /// CDN used to build avatar URLs.
    pub cdn_base_url: String,
}

impl ExchangeSettings {
    pub fn new(community_id: impl Into<String>, privileged_role_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            privileged_role_id: privileged_role_id.into(),
            cdn_base_url: DISCORD_CDN_URL.to_string(),
        }
    }

    pub fn with_cdn_base_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_base_url = url.into();
        self
    }
}

/// Result of a successful exchange.
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub external_id: String,
    pub role: RoleClaim,
    /// Whether the identity was created by this exchange.
    pub created: bool,
    pub credential: CustomCredential,
}

/// Status and JSON body returned to the ingress layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ExchangeResponse {
    fn success(credential: &CustomCredential) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({ "token": credential.expose() }),
        }
    }

    fn failure(err: &BridgeError) -> Self {
        let message = match err {
            BridgeError::Validation(_) => MISSING_CODE_MESSAGE,
            _ => GENERIC_FAILURE_MESSAGE,
        };
        Self {
            status: err.status(),
            body: json!({ "error": message }),
        }
    }

    /// The `token` field of a success body.
    pub fn token(&self) -> Option<&str> {
        self.body.get("token").and_then(Value::as_str)
    }

    /// The `error` field of a failure body.
    pub fn error(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

/// The login exchange orchestrator.
///
/// Holds injected handles only; no per-request state survives a call, so one
/// instance serves concurrent requests.
#[derive(Clone)]
pub struct LoginExchange {
    provider: Arc<dyn IdentityProvider>,
    provisioner: IdentityProvisioner,
    minter: CredentialMinter,
    settings: ExchangeSettings,
}

impl LoginExchange {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        identities: SharedIdentityService,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            provider,
            provisioner: IdentityProvisioner::new(identities.clone(), &settings.cdn_base_url),
            minter: CredentialMinter::new(identities),
            settings,
        }
    }

    /// Run the exchange and shape the response. Never fails.
    pub async fn handle_exchange(&self, code: Option<&str>) -> ExchangeResponse {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("exchange", %request_id);

        async move {
            match self.exchange(code).await {
                Ok(outcome) => {
                    tracing::info!(
                        external_id = %outcome.external_id,
                        created = outcome.created,
                        admin = outcome.role.is_admin(),
                        "Login exchange succeeded"
                    );
                    ExchangeResponse::success(&outcome.credential)
                }
                Err(err) => {
                    log_failure(&err);
                    ExchangeResponse::failure(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the exchange, returning the typed outcome or the failing stage.
    pub async fn exchange(&self, code: Option<&str>) -> Result<ExchangeOutcome> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| BridgeError::Validation(MISSING_CODE_MESSAGE.to_string()))?;

        let token = self.provider.exchange_code(code).await?;
        let profile = self.provider.fetch_profile(&token).await?;
        let membership = self
            .provider
            .fetch_membership(&token, &self.settings.community_id)
            .await?;

        let role = derive_role(&membership, &self.settings.privileged_role_id);
        tracing::debug!(
            external_id = %profile.external_id,
            admin = role.is_admin(),
            "Role derived"
        );

        let provisioned = self.provisioner.provision(&profile).await?;
        let credential = self.minter.mint(&profile.external_id, &role).await?;

        Ok(ExchangeOutcome {
            external_id: profile.external_id,
            role,
            created: provisioned.created,
            credential,
        })
    }
}

fn log_failure(err: &BridgeError) {
    match err {
        BridgeError::Validation(_) => {
            tracing::debug!(stage = err.stage(), "Rejected exchange without code");
        }
        _ if err.is_transient() => {
            tracing::warn!(
                stage = err.stage(),
                transient = true,
                error = %err,
                "Login exchange failed"
            );
        }
        _ => {
            tracing::error!(
                stage = err.stage(),
                transient = false,
                error = %err,
                "Login exchange failed"
            );
        }
    }
}
