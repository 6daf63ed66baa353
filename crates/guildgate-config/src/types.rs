//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [server]      # bind address, request logging
//! [provider]    # Discord application and guild
//! [identity]    # token signing key
//! [logging]     # level, format, optional file directory
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::{ResolvedSecret, SecretSource, resolve_secret};
use crate::{ConfigError, Result};

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8888";

/// Default custom token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Issuer used for HS256 development tokens.
pub const DEFAULT_DEV_ISSUER: &str = "guildgate@localhost";

// Environment overrides.
pub const ENV_CLIENT_ID: &str = "DISCORD_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "DISCORD_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "DISCORD_REDIRECT_URI";
pub const ENV_GUILD_ID: &str = "DISCORD_GUILD_ID";
pub const ENV_ADMIN_ROLE_ID: &str = "DISCORD_ADMIN_ROLE_ID";
pub const ENV_SERVICE_ACCOUNT: &str = "FIREBASE_SERVICE_ACCOUNT";
pub const ENV_SIGNING_SECRET: &str = "GUILDGATE_SIGNING_SECRET";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so partial files can be layered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildgateConfig {
    pub server: Option<ServerSection>,
    pub provider: Option<ProviderSection>,
    pub identity: Option<IdentitySection>,
    pub logging: Option<LoggingSection>,
}

impl GuildgateConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// `[server]`, `[provider]` and `[identity]` merge field by field, so a
    /// project file can set `guild_id` without dropping a user-level
    /// `client_secret`. `[logging]` has no optional fields and is replaced
    /// whole.
    pub fn merge(&mut self, other: GuildgateConfig) {
        merge_section(&mut self.server, other.server, ServerSection::merge);
        merge_section(&mut self.provider, other.provider, ProviderSection::merge);
        merge_section(&mut self.identity, other.identity, IdentitySection::merge);
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Apply environment overrides, check required fields, and resolve secrets.
    pub fn resolve(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<ResolvedConfig> {
        let mut warnings = Vec::new();
        let provider = self.provider.clone().unwrap_or_default();
        let identity = self.identity.clone().unwrap_or_default();
        let server = self.server.clone().unwrap_or_default();

        let required = |field: &str, env_var: &str, value: &Option<String>| -> Result<String> {
            env(env_var)
                .filter(|v| !v.is_empty())
                .or_else(|| value.clone().filter(|v| !v.is_empty()))
                .ok_or_else(|| ConfigError::MissingField {
                    field: field.to_string(),
                    context: "[provider]".to_string(),
                    env_var: env_var.to_string(),
                })
        };

        let client_id = required("client_id", ENV_CLIENT_ID, &provider.client_id)?;
        let redirect_uri = required("redirect_uri", ENV_REDIRECT_URI, &provider.redirect_uri)?;
        let guild_id = required("guild_id", ENV_GUILD_ID, &provider.guild_id)?;
        let admin_role_id = required("admin_role_id", ENV_ADMIN_ROLE_ID, &provider.admin_role_id)?;

        let client_secret =
            resolve_secret(ENV_CLIENT_SECRET, provider.client_secret.as_deref(), env).ok_or_else(
                || ConfigError::MissingField {
                    field: "client_secret".to_string(),
                    context: "[provider]".to_string(),
                    env_var: ENV_CLIENT_SECRET.to_string(),
                },
            )?;
        note_plaintext(&client_secret, "[provider] client_secret", &mut warnings);

        let signing = resolve_signing(&identity, env, &mut warnings)?;

        let bind = server.bind.as_deref().unwrap_or(DEFAULT_BIND);
        let bind: SocketAddr = bind.parse().map_err(|e| ConfigError::Invalid {
            field: "server.bind".to_string(),
            message: format!("{}", e),
        })?;

        let token_ttl_secs = identity.token_ttl_secs.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        if !(1..=DEFAULT_TOKEN_TTL_SECS).contains(&token_ttl_secs) {
            return Err(ConfigError::Invalid {
                field: "identity.token_ttl_secs".to_string(),
                message: format!("must be between 1 and {}", DEFAULT_TOKEN_TTL_SECS),
            });
        }

        Ok(ResolvedConfig {
            bind,
            request_logging: server.request_logging.unwrap_or(true),
            provider: ResolvedProvider {
                client_id,
                client_secret,
                redirect_uri,
                guild_id,
                admin_role_id,
                token_url: provider.token_url,
                api_base_url: provider.api_base_url,
                cdn_base_url: provider.cdn_base_url,
                scopes: provider.scopes,
            },
            signing,
            token_ttl_secs,
            logging: self.logging.clone().unwrap_or_default(),
            warnings,
        })
    }
}

fn merge_section<T>(base: &mut Option<T>, overlay: Option<T>, merge: fn(&mut T, T)) {
    let Some(overlay) = overlay else {
        return;
    };
    *base = Some(match base.take() {
        Some(mut current) => {
            merge(&mut current, overlay);
            current
        }
        None => overlay,
    });
}

/// Overwrite `base` only where `overlay` has a value.
macro_rules! merge_fields {
    ($base:expr, $overlay:expr, $($field:ident),+ $(,)?) => {
        $(
            if $overlay.$field.is_some() {
                $base.$field = $overlay.$field;
            }
        )+
    };
}

fn note_plaintext(secret: &ResolvedSecret, name: &str, warnings: &mut Vec<String>) {
    if secret.source == SecretSource::ConfigFile {
        warnings.push(format!(
            "{} is read from the config file in plaintext. Consider an environment variable instead.",
            name
        ));
    }
}

fn resolve_signing(
    identity: &IdentitySection,
    env: &dyn Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
) -> Result<SigningKeySource> {
    if let Some(json) = env(ENV_SERVICE_ACCOUNT).filter(|v| !v.is_empty()) {
        return Ok(SigningKeySource::ServiceAccountJson(json));
    }

    if let Some(path) = &identity.service_account_file {
        return Ok(SigningKeySource::ServiceAccountFile(path.clone()));
    }

    let secret = resolve_secret(ENV_SIGNING_SECRET, identity.signing_secret.as_deref(), env)
        .ok_or(ConfigError::NoSigningKey)?;
    note_plaintext(&secret, "[identity] signing_secret", warnings);

    Ok(SigningKeySource::Secret {
        issuer: identity
            .issuer
            .clone()
            .unwrap_or_else(|| DEFAULT_DEV_ISSUER.to_string()),
        secret: secret.value,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Socket address to bind, e.g. `"0.0.0.0:8888"`.
    pub bind: Option<String>,
    /// Per-request HTTP tracing.
    pub request_logging: Option<bool>,
}

impl ServerSection {
    fn merge(&mut self, other: ServerSection) {
        merge_fields!(self, other, bind, request_logging);
    }
}

/// `[provider]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Guild whose membership is checked.
    pub guild_id: Option<String>,
    /// Guild role that grants the admin claim.
    pub admin_role_id: Option<String>,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
    pub cdn_base_url: Option<String>,
    pub scopes: Option<String>,
}

impl ProviderSection {
    fn merge(&mut self, other: ProviderSection) {
        merge_fields!(
            self,
            other,
            client_id,
            client_secret,
            redirect_uri,
            guild_id,
            admin_role_id,
            token_url,
            api_base_url,
            cdn_base_url,
            scopes,
        );
    }
}

/// `[identity]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    /// Google service-account key file (RS256 signing).
    pub service_account_file: Option<PathBuf>,
    /// Shared secret for HS256 development tokens.
    pub signing_secret: Option<String>,
    /// Issuer for HS256 tokens.
    pub issuer: Option<String>,
    pub token_ttl_secs: Option<i64>,
}

impl IdentitySection {
    fn merge(&mut self, other: IdentitySection) {
        merge_fields!(
            self,
            other,
            service_account_file,
            signing_secret,
            issuer,
            token_ttl_secs,
        );
    }
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines on the console instead of human-readable output.
    pub json: bool,
    /// Directory for a daily-rolling JSON log file.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolved config
// ─────────────────────────────────────────────────────────────────────────────

/// Where the custom token signing key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SigningKeySource {
    /// Service-account JSON passed inline through the environment.
    ServiceAccountJson(String),
    /// Service-account JSON file on disk.
    ServiceAccountFile(PathBuf),
    /// HS256 shared secret.
    Secret { issuer: String, secret: String },
}

impl std::fmt::Debug for SigningKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningKeySource::ServiceAccountJson(_) => f.write_str("ServiceAccountJson([redacted])"),
            SigningKeySource::ServiceAccountFile(path) => {
                f.debug_tuple("ServiceAccountFile").field(path).finish()
            }
            SigningKeySource::Secret { issuer, .. } => f
                .debug_struct("Secret")
                .field("issuer", issuer)
                .field("secret", &"[redacted]")
                .finish(),
        }
    }
}

/// Provider settings with every required field present.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub client_id: String,
    pub client_secret: ResolvedSecret,
    pub redirect_uri: String,
    pub guild_id: String,
    pub admin_role_id: String,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
    pub cdn_base_url: Option<String>,
    pub scopes: Option<String>,
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.source)
            .field("redirect_uri", &self.redirect_uri)
            .field("guild_id", &self.guild_id)
            .field("admin_role_id", &self.admin_role_id)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("cdn_base_url", &self.cdn_base_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Fully validated configuration, ready to wire up the bridge.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub bind: SocketAddr,
    pub request_logging: bool,
    pub provider: ResolvedProvider,
    pub signing: SigningKeySource,
    pub token_ttl_secs: i64,
    pub logging: LoggingSection,
    /// Non-fatal findings, e.g. plaintext secrets.
    pub warnings: Vec<String>,
}
