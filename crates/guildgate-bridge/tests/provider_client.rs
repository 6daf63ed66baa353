//! Discord client tests against a mock HTTP server.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guildgate_bridge::{
    AccessToken, BridgeError, DiscordClient, IdentityProvider, MembershipRecord, ProviderConfig,
};

async fn client() -> (MockServer, DiscordClient) {
    let server = MockServer::start().await;
    let config = ProviderConfig::discord("cid", "csecret", "https://app.example/callback")
        .with_base_url(&server.uri());
    (server, DiscordClient::new(config))
}

#[tokio::test]
async fn test_exchange_code_posts_form() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("client_id=cid"))
        .and(body_string_contains("client_secret=csecret"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains(
            "redirect_uri=https%3A%2F%2Fapp.example%2Fcallback",
        ))
        .and(body_string_contains("scope=identify+email"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok1",
            "token_type": "Bearer",
            "expires_in": 604800,
            "scope": "identify email"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client.exchange_code("abc123").await.unwrap();
    assert_eq!(token.as_str(), "tok1");
}

#[tokio::test]
async fn test_rejected_code_is_upstream_auth_error() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({ "error": "invalid_grant" })),
        )
        .mount(&server)
        .await;

    let err = client.exchange_code("used-code").await.unwrap_err();
    match err {
        BridgeError::UpstreamAuth(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("invalid_grant"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_token_body_is_upstream_auth_error() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.exchange_code("abc123").await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamAuth(_)));
}

#[tokio::test]
async fn test_fetch_profile_uses_bearer_token() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "u1",
            "username": "alice",
            "email": "a@b.com",
            "avatar": "hash1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = client.fetch_profile(&AccessToken::new("tok1")).await.unwrap();
    assert_eq!(profile.external_id, "u1");
    assert_eq!(profile.display_name, "alice");
    assert_eq!(profile.email.as_deref(), Some("a@b.com"));
}

#[tokio::test]
async fn test_profile_error_status() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.fetch_profile(&AccessToken::new("bad")).await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamProfile(_)));
}

#[tokio::test]
async fn test_fetch_membership_for_guild() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/users/@me/guilds/guild-1/member"))
        .and(header("authorization", "Bearer tok1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "roles": ["roleX", "roleA"],
            "nick": null,
            "joined_at": "2024-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let membership = client
        .fetch_membership(&AccessToken::new("tok1"), "guild-1")
        .await
        .unwrap();
    assert_eq!(membership, MembershipRecord::new(["roleX", "roleA"]));
}

#[tokio::test]
async fn test_non_member_is_upstream_membership_error() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/users/@me/guilds/guild-1/member"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "message": "Unknown Guild",
            "code": 10004
        })))
        .mount(&server)
        .await;

    let err = client
        .fetch_membership(&AccessToken::new("tok1"), "guild-1")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamMembership(_)));
}

#[tokio::test]
async fn test_network_failure_is_upstream_auth_error() {
    // Nothing listens on port 9 on loopback.
    let config = ProviderConfig::discord("cid", "csecret", "cb").with_base_url("http://127.0.0.1:9");
    let client = DiscordClient::new(config);

    let err = client.exchange_code("abc123").await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamAuth(_)));
}
