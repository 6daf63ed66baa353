//! Common test doubles for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use guildgate_bridge::{
    AccessToken, BridgeError, CustomTokenSigner, ExchangeSettings, ExternalProfile,
    IdentityError, IdentityProvider, IdentityRecord, IdentityService, IdentityUpdate,
    InMemoryIdentityService, LoginExchange, MembershipRecord, NewIdentity, Result, RoleClaim,
};

pub const SIGNING_SECRET: &[u8] = b"integration-test-secret";
pub const GUILD_ID: &str = "guild-1";
pub const ADMIN_ROLE: &str = "roleA";
pub const CDN: &str = "https://cdn.discordapp.com";

/// Message planted in injected failures; must never reach a response body.
pub const INJECTED: &str = "injected-upstream-detail";

/// A call observed by [`FakeProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    ExchangeCode { code: String },
    FetchProfile { token: String },
    FetchMembership { token: String, community_id: String },
}

/// Which provider stage should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    Token,
    Profile,
    Membership,
}

/// Scripted identity provider that records every call.
pub struct FakeProvider {
    pub token: String,
    pub profile: ExternalProfile,
    pub membership: MembershipRecord,
    pub fail_at: Option<ProviderFailure>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl FakeProvider {
    pub fn new(profile: ExternalProfile, membership: MembershipRecord) -> Self {
        Self {
            token: "tok1".to_string(),
            profile,
            membership,
            fail_at: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(mut self, stage: ProviderFailure) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        self.calls.lock().push(ProviderCall::ExchangeCode {
            code: code.to_string(),
        });
        if self.fail_at == Some(ProviderFailure::Token) {
            return Err(BridgeError::UpstreamAuth(INJECTED.to_string()));
        }
        Ok(AccessToken::new(self.token.clone()))
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ExternalProfile> {
        self.calls.lock().push(ProviderCall::FetchProfile {
            token: token.as_str().to_string(),
        });
        if self.fail_at == Some(ProviderFailure::Profile) {
            return Err(BridgeError::UpstreamProfile(INJECTED.to_string()));
        }
        Ok(self.profile.clone())
    }

    async fn fetch_membership(
        &self,
        token: &AccessToken,
        community_id: &str,
    ) -> Result<MembershipRecord> {
        self.calls.lock().push(ProviderCall::FetchMembership {
            token: token.as_str().to_string(),
            community_id: community_id.to_string(),
        });
        if self.fail_at == Some(ProviderFailure::Membership) {
            return Err(BridgeError::UpstreamMembership(INJECTED.to_string()));
        }
        Ok(self.membership.clone())
    }
}

/// Which identity-service operation should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityFailure {
    Lookup,
    Create,
    Update,
    Mint,
}

/// In-memory identity service that records mint inputs and can inject failures.
pub struct RecordingIdentityService {
    pub inner: InMemoryIdentityService,
    pub fail_at: Option<IdentityFailure>,
    minted: Mutex<Vec<(String, RoleClaim)>>,
    creates: Mutex<usize>,
}

impl RecordingIdentityService {
    pub fn new() -> Self {
        Self {
            inner: InMemoryIdentityService::new(CustomTokenSigner::from_secret(
                "bridge@test",
                SIGNING_SECRET,
            )),
            fail_at: None,
            minted: Mutex::new(Vec::new()),
            creates: Mutex::new(0),
        }
    }

    pub fn failing_at(mut self, op: IdentityFailure) -> Self {
        self.fail_at = Some(op);
        self
    }

    pub fn minted(&self) -> Vec<(String, RoleClaim)> {
        self.minted.lock().clone()
    }

    pub fn create_count(&self) -> usize {
        *self.creates.lock()
    }

    fn injected(&self, op: IdentityFailure) -> std::result::Result<(), IdentityError> {
        if self.fail_at == Some(op) {
            return Err(IdentityError::Unavailable(INJECTED.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityService for RecordingIdentityService {
    async fn get_user(&self, uid: &str) -> std::result::Result<IdentityRecord, IdentityError> {
        self.injected(IdentityFailure::Lookup)?;
        self.inner.get_user(uid).await
    }

    async fn create_user(
        &self,
        identity: NewIdentity,
    ) -> std::result::Result<IdentityRecord, IdentityError> {
        self.injected(IdentityFailure::Create)?;
        *self.creates.lock() += 1;
        self.inner.create_user(identity).await
    }

    async fn update_user(
        &self,
        uid: &str,
        update: IdentityUpdate,
    ) -> std::result::Result<IdentityRecord, IdentityError> {
        self.injected(IdentityFailure::Update)?;
        self.inner.update_user(uid, update).await
    }

    async fn create_custom_token(
        &self,
        uid: &str,
        role: &RoleClaim,
    ) -> std::result::Result<String, IdentityError> {
        self.injected(IdentityFailure::Mint)?;
        self.minted.lock().push((uid.to_string(), *role));
        self.inner.create_custom_token(uid, role).await
    }
}

pub fn alice() -> ExternalProfile {
    ExternalProfile {
        external_id: "u1".to_string(),
        email: Some("a@b.com".to_string()),
        display_name: "alice".to_string(),
        avatar: Some("hash1".to_string()),
    }
}

pub fn settings() -> ExchangeSettings {
    ExchangeSettings::new(GUILD_ID, ADMIN_ROLE).with_cdn_base_url(CDN)
}

pub fn exchange(
    provider: Arc<FakeProvider>,
    identities: Arc<RecordingIdentityService>,
) -> LoginExchange {
    LoginExchange::new(provider, identities, settings())
}
