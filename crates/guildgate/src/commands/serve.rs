//! Serve command - runs the login bridge HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;

use guildgate_bridge::{
    BridgeServer, CustomTokenSigner, DiscordClient, ExchangeSettings, InMemoryIdentityService,
    LoginExchange, ProviderConfig, ServerConfig, ServiceAccountKey,
};
use guildgate_config::{ResolvedConfig, SigningKeySource};

use super::Context;

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    let signer = build_signer(&config.signing)?.with_ttl_secs(config.token_ttl_secs);
    tracing::info!(
        issuer = %signer.issuer(),
        ttl_secs = signer.ttl_secs(),
        "Custom token signer ready"
    );

    let identities = Arc::new(InMemoryIdentityService::new(signer));
    tracing::info!("Using process-local identity store");

    let provider_config = build_provider_config(config);
    let settings = ExchangeSettings::new(
        config.provider.guild_id.clone(),
        config.provider.admin_role_id.clone(),
    )
    .with_cdn_base_url(provider_config.cdn_base_url.clone());
    let provider = Arc::new(DiscordClient::new(provider_config));

    let exchange = LoginExchange::new(provider, identities, settings);

    let bind = args.bind.unwrap_or(config.bind);
    let server_config = ServerConfig::new(bind).with_request_logging(config.request_logging);

    BridgeServer::new(server_config, exchange)
        .run_with_shutdown(shutdown_signal())
        .await
        .context("server stopped")
}

/// Resolves on Ctrl-C. A failed signal handler keeps the server running.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown requested"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Discord defaults with any endpoint overrides from config.
pub fn build_provider_config(config: &ResolvedConfig) -> ProviderConfig {
    let provider = &config.provider;
    let mut out = ProviderConfig::discord(
        provider.client_id.clone(),
        provider.client_secret.value.clone(),
        provider.redirect_uri.clone(),
    );
    if let Some(url) = &provider.token_url {
        out.token_url = url.clone();
    }
    if let Some(url) = &provider.api_base_url {
        out.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(url) = &provider.cdn_base_url {
        out.cdn_base_url = url.clone();
    }
    if let Some(scopes) = &provider.scopes {
        out = out.with_scopes(scopes.clone());
    }
    out
}

/// Build the custom token signer from the configured key source.
pub fn build_signer(source: &SigningKeySource) -> Result<CustomTokenSigner> {
    match source {
        SigningKeySource::ServiceAccountJson(json) => {
            let account = ServiceAccountKey::from_json(json)?;
            Ok(CustomTokenSigner::from_service_account(&account)?)
        }
        SigningKeySource::ServiceAccountFile(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading service account {}", path.display()))?;
            let account = ServiceAccountKey::from_json(&json)?;
            Ok(CustomTokenSigner::from_service_account(&account)?)
        }
        SigningKeySource::Secret { issuer, secret } => {
            tracing::warn!("Signing with a shared secret; tokens are for local development only");
            Ok(CustomTokenSigner::from_secret(issuer.clone(), secret.as_bytes()))
        }
    }
}
