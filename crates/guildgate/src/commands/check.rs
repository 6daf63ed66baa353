//! Check command - validates configuration without starting the server.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use guildgate_config::SigningKeySource;

use super::Context;
use super::serve::{build_provider_config, build_signer};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

/// Resolved settings, without secrets.
#[derive(Debug, Serialize)]
struct CheckOutput {
    config_files: Vec<String>,
    bind: String,
    token_url: String,
    api_base_url: String,
    guild_id: String,
    admin_role_id: String,
    client_secret_source: String,
    signing: String,
    token_ttl_secs: i64,
    warnings: Vec<String>,
}

/// Run the check command.
pub fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    // Fails on unreadable or malformed keys.
    build_signer(&config.signing)?;
    let provider = build_provider_config(config);

    let output = CheckOutput {
        config_files: ctx
            .sources
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        bind: config.bind.to_string(),
        token_url: provider.token_url,
        api_base_url: provider.api_base_url,
        guild_id: config.provider.guild_id.clone(),
        admin_role_id: config.provider.admin_role_id.clone(),
        client_secret_source: config.provider.client_secret.source.to_string(),
        signing: match &config.signing {
            SigningKeySource::ServiceAccountJson(_) => "service account (environment)".to_string(),
            SigningKeySource::ServiceAccountFile(path) => {
                format!("service account ({})", path.display())
            }
            SigningKeySource::Secret { .. } => "shared secret (development)".to_string(),
        },
        token_ttl_secs: config.token_ttl_secs,
        warnings: config.warnings.clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Configuration OK");
        for file in &output.config_files {
            println!("  config file:    {}", file);
        }
        println!("  bind:           {}", output.bind);
        println!("  token url:      {}", output.token_url);
        println!("  api base url:   {}", output.api_base_url);
        println!("  guild:          {}", output.guild_id);
        println!("  admin role:     {}", output.admin_role_id);
        println!("  client secret:  {}", output.client_secret_source);
        println!("  signing:        {}", output.signing);
        println!("  token ttl:      {}s", output.token_ttl_secs);
        for warning in &output.warnings {
            println!("  warning: {}", warning);
        }
        if ctx.verbose {
            println!("  scopes:         {}", provider.scopes);
        }
    }

    Ok(())
}
