//! Discord OAuth2 and REST client.
//!
//! Three calls, each a single request with no retry and no caching:
//! code-for-token exchange, profile fetch, and guild membership fetch.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Discord token endpoint.
pub const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";

/// Discord REST API base.
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Discord CDN base, used to build avatar URLs.
pub const DISCORD_CDN_URL: &str = "https://cdn.discordapp.com";

/// Scopes needed for identity, email and guild member reads.
pub const DEFAULT_SCOPES: &str = "identify email guilds guilds.members.read";

/// Upstream error bodies are cut to this many bytes before logging.
const MAX_ERROR_BODY: usize = 512;

/// OAuth client configuration for the identity provider.
#[derive(Clone)]
pub struct ProviderConfig {
    pub token_url: String,
    pub api_base_url: String,
    pub cdn_base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: String,
}

impl ProviderConfig {
    /// Discord endpoints with the given application credentials.
    pub fn discord(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            token_url: DISCORD_TOKEN_URL.to_string(),
            api_base_url: DISCORD_API_URL.to_string(),
            cdn_base_url: DISCORD_CDN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    /// Point every endpoint at a different host (tests, proxies).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.token_url = format!("{}/oauth2/token", base);
        self.api_base_url = base.to_string();
        self
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("cdn_base_url", &self.cdn_base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Bearer token returned by the provider. Lives for one exchange only.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// The user as the provider describes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProfile {
    #[serde(rename = "id")]
    pub external_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "username")]
    pub display_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ExternalProfile {
    /// Avatar image URL on the provider CDN, if the user has an avatar.
    pub fn photo_url(&self, cdn_base_url: &str) -> Option<String> {
        self.avatar.as_deref().filter(|a| !a.is_empty()).map(|hash| {
            format!(
                "{}/avatars/{}/{}.png",
                cdn_base_url.trim_end_matches('/'),
                self.external_id,
                hash
            )
        })
    }
}

/// Role ids held by the user in one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MembershipRecord {
    #[serde(rename = "roles", default)]
    pub role_ids: HashSet<String>,
}

impl MembershipRecord {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role_ids: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outbound calls to the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Trade a single-use authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken>;

    /// Fetch the profile of the token's owner.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<ExternalProfile>;

    /// Fetch the token owner's membership in `community_id`.
    async fn fetch_membership(
        &self,
        token: &AccessToken,
        community_id: &str,
    ) -> Result<MembershipRecord>;
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// `reqwest`-backed Discord client.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: Client,
    config: ProviderConfig,
}

impl DiscordClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Reuse an existing HTTP client (connection pool owned by the caller).
    pub fn with_client(http: Client, config: ProviderConfig) -> Self {
        Self { http, config }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &AccessToken,
    ) -> std::result::Result<T, String> {
        let response = self
            .http
            .get(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.as_str()))
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {}", e))
    }
}

#[async_trait]
impl IdentityProvider for DiscordClient {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        let form = TokenExchangeRequest {
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            grant_type: "authorization_code",
            code,
            redirect_uri: &self.config.redirect_uri,
            scope: &self.config.scopes,
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamAuth(format!("request failed: {}", e)))?;

        let response = check_status(response)
            .await
            .map_err(BridgeError::UpstreamAuth)?;

        let body: TokenExchangeResponse = response.json().await.map_err(|e| {
            BridgeError::UpstreamAuth(format!("failed to parse token response: {}", e))
        })?;

        tracing::debug!("Authorization code exchanged");
        Ok(AccessToken::new(body.access_token))
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ExternalProfile> {
        let url = format!("{}/users/@me", self.config.api_base_url);
        self.get_json(&url, token)
            .await
            .map_err(BridgeError::UpstreamProfile)
    }

    async fn fetch_membership(
        &self,
        token: &AccessToken,
        community_id: &str,
    ) -> Result<MembershipRecord> {
        let url = format!(
            "{}/users/@me/guilds/{}/member",
            self.config.api_base_url, community_id
        );
        self.get_json(&url, token)
            .await
            .map_err(BridgeError::UpstreamMembership)
    }
}

/// Pass 2xx responses through; turn anything else into a log-safe message.
async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(format!(
        "HTTP {}: {}",
        status.as_u16(),
        truncate(&body, MAX_ERROR_BODY)
    ))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
