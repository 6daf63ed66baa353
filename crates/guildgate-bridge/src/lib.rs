//! Discord login bridge.
//!
//! Exchanges a Discord authorization code for an access token, reads the
//! user's profile and guild membership, derives an admin claim from a
//! configured guild role, provisions the matching internal identity, and
//! returns a signed custom token.
//!
//! # Components
//!
//! - [`provider`]: Discord OAuth2/REST client (token, profile, membership)
//! - [`role`]: Role claim derivation
//! - [`identity`]: Identity service interface and in-memory backend
//! - [`signer`]: Custom token signing
//! - [`provisioner`]: Create-then-update identity sync
//! - [`minter`]: Custom credential minting
//! - [`exchange`]: Pipeline orchestration and response shaping
//! - [`http`]: Axum routes and server

pub mod error;
pub mod exchange;
pub mod http;
pub mod identity;
pub mod minter;
pub mod provider;
pub mod provisioner;
pub mod role;
pub mod signer;

pub use error::{BridgeError, Result};
pub use exchange::{
    ExchangeOutcome, ExchangeResponse, ExchangeSettings, GENERIC_FAILURE_MESSAGE,
    LoginExchange, MISSING_CODE_MESSAGE,
};
pub use http::{BridgeServer, ServerConfig};
pub use identity::{
    IdentityError, IdentityRecord, IdentityService, IdentityUpdate, InMemoryIdentityService,
    NewIdentity, SharedIdentityService,
};
pub use minter::{CredentialMinter, CustomCredential};
pub use provider::{
    AccessToken, DiscordClient, ExternalProfile, IdentityProvider, MembershipRecord,
    ProviderConfig,
};
pub use provisioner::{IdentityProvisioner, Provisioned};
pub use role::{RoleClaim, derive_role};
pub use signer::{CustomTokenClaims, CustomTokenSigner, ServiceAccountKey};
