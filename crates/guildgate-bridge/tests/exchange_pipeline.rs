//! Exchange pipeline integration tests.
//!
//! Drive `LoginExchange` with scripted provider and identity doubles and
//! check call ordering, failure collapsing, and the claims handed to the
//! minter.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use common::*;
use guildgate_bridge::signer::CUSTOM_TOKEN_AUDIENCE;
use guildgate_bridge::{
    CustomTokenClaims, GENERIC_FAILURE_MESSAGE, MISSING_CODE_MESSAGE, MembershipRecord, RoleClaim,
};

fn member_with(roles: &[&str]) -> MembershipRecord {
    MembershipRecord::new(roles.iter().copied())
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_code_is_rejected_without_upstream_calls() {
    for code in [None, Some(""), Some("   ")] {
        let provider = Arc::new(FakeProvider::new(alice(), member_with(&[])));
        let identities = Arc::new(RecordingIdentityService::new());
        let exchange = exchange(provider.clone(), identities.clone());

        let response = exchange.handle_exchange(code).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.error(), Some(MISSING_CODE_MESSAGE));
        assert!(provider.calls().is_empty());
        assert!(identities.minted().is_empty());
        assert!(identities.inner.is_empty());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Happy path
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_calls_happen_once_in_order_with_access_token() {
    let provider = Arc::new(FakeProvider::new(alice(), member_with(&["roleX"])));
    let identities = Arc::new(RecordingIdentityService::new());
    let exchange = exchange(provider.clone(), identities);

    let response = exchange.handle_exchange(Some("abc123")).await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(
        provider.calls(),
        vec![
            ProviderCall::ExchangeCode {
                code: "abc123".to_string()
            },
            ProviderCall::FetchProfile {
                token: "tok1".to_string()
            },
            ProviderCall::FetchMembership {
                token: "tok1".to_string(),
                community_id: GUILD_ID.to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_end_to_end_regular_member() {
    let provider = Arc::new(FakeProvider::new(alice(), member_with(&["roleX"])));
    let identities = Arc::new(RecordingIdentityService::new());
    let exchange = exchange(provider, identities.clone());

    let response = exchange.handle_exchange(Some("abc123")).await;

    assert_eq!(response.status, StatusCode::OK);
    let token = response.token().unwrap();
    assert!(!token.is_empty());

    assert_eq!(identities.minted(), vec![("u1".to_string(), RoleClaim::None)]);
    assert_eq!(identities.create_count(), 1);

    let record = identities.inner.snapshot("u1").unwrap();
    assert_eq!(record.email.as_deref(), Some("a@b.com"));
    assert_eq!(record.display_name.as_deref(), Some("alice"));
    assert_eq!(
        record.photo_url.as_deref(),
        Some("https://cdn.discordapp.com/avatars/u1/hash1.png")
    );

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[CUSTOM_TOKEN_AUDIENCE]);
    let claims = decode::<CustomTokenClaims>(
        token,
        &DecodingKey::from_secret(SIGNING_SECRET),
        &validation,
    )
    .unwrap()
    .claims;
    assert_eq!(claims.uid, "u1");
    assert!(claims.claims.is_none());
}

#[tokio::test]
async fn test_privileged_role_grants_admin_claim() {
    let provider = Arc::new(FakeProvider::new(alice(), member_with(&["roleX", ADMIN_ROLE])));
    let identities = Arc::new(RecordingIdentityService::new());
    let exchange = exchange(provider, identities.clone());

    let outcome = exchange.exchange(Some("abc123")).await.unwrap();

    assert!(outcome.role.is_admin());
    assert!(outcome.created);
    assert_eq!(identities.minted(), vec![("u1".to_string(), RoleClaim::Admin)]);
}

#[tokio::test]
async fn test_role_is_recomputed_on_every_login() {
    let identities = Arc::new(RecordingIdentityService::new());

    let admin = Arc::new(FakeProvider::new(alice(), member_with(&[ADMIN_ROLE])));
    exchange(admin, identities.clone())
        .handle_exchange(Some("first"))
        .await;

    let demoted = Arc::new(FakeProvider::new(alice(), member_with(&["roleX"])));
    exchange(demoted, identities.clone())
        .handle_exchange(Some("second"))
        .await;

    assert_eq!(
        identities.minted(),
        vec![
            ("u1".to_string(), RoleClaim::Admin),
            ("u1".to_string(), RoleClaim::None),
        ]
    );
    assert_eq!(identities.create_count(), 1);
}

#[tokio::test]
async fn test_second_login_without_avatar_keeps_photo() {
    let identities = Arc::new(RecordingIdentityService::new());

    let first = Arc::new(FakeProvider::new(alice(), member_with(&[])));
    exchange(first, identities.clone())
        .handle_exchange(Some("first"))
        .await;

    let mut no_avatar = alice();
    no_avatar.avatar = None;
    let second = Arc::new(FakeProvider::new(no_avatar, member_with(&[])));
    let response = exchange(second, identities.clone())
        .handle_exchange(Some("second"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        identities
            .inner
            .snapshot("u1")
            .unwrap()
            .photo_url
            .unwrap()
            .ends_with("/hash1.png")
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure injection
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_provider_failures_collapse_to_generic_error() {
    let cases = [
        (ProviderFailure::Token, 1),
        (ProviderFailure::Profile, 2),
        (ProviderFailure::Membership, 3),
    ];

    for (stage, expected_calls) in cases {
        let provider = Arc::new(FakeProvider::new(alice(), member_with(&[])).failing_at(stage));
        let identities = Arc::new(RecordingIdentityService::new());
        let exchange = exchange(provider.clone(), identities.clone());

        let response = exchange.handle_exchange(Some("abc123")).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{:?}", stage);
        assert_eq!(response.error(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(!response.body.to_string().contains(INJECTED));
        assert_eq!(provider.calls().len(), expected_calls, "{:?}", stage);
        assert!(identities.inner.is_empty());
        assert!(identities.minted().is_empty());
    }
}

#[tokio::test]
async fn test_identity_failures_collapse_to_generic_error() {
    for op in [
        IdentityFailure::Lookup,
        IdentityFailure::Create,
        IdentityFailure::Update,
        IdentityFailure::Mint,
    ] {
        let provider = Arc::new(FakeProvider::new(alice(), member_with(&[ADMIN_ROLE])));
        let identities = Arc::new(RecordingIdentityService::new().failing_at(op));
        let exchange = exchange(provider, identities.clone());

        let response = exchange.handle_exchange(Some("abc123")).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR, "{:?}", op);
        assert_eq!(response.error(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(response.token().is_none());
        assert!(!response.body.to_string().contains(INJECTED));
        assert!(identities.minted().is_empty(), "{:?}", op);
    }
}

#[tokio::test]
async fn test_typed_exchange_reports_failing_stage() {
    let provider = Arc::new(
        FakeProvider::new(alice(), member_with(&[])).failing_at(ProviderFailure::Membership),
    );
    let identities = Arc::new(RecordingIdentityService::new());

    let err = exchange(provider, identities)
        .exchange(Some("abc123"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), "membership");
}
