//! Configuration management commands.

use std::fs;

use anyhow::{bail, Context as _, Result};
use serde_json::json;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, TOKEN_ENV};
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init { force } => init_config(force, ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;
    let session = config.auth_session();
    let source = ctx
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    if ctx.output.is_json() {
        ctx.output.json(&json!({
            "source": source,
            "api": config.api,
            "cart": config.cart,
            "session": {
                "user_id": session.as_ref().map(|s| s.user_id.as_str()),
                "token": session.as_ref().map(|_| "***"),
                "expires_at": session.as_ref().and_then(|s| s.expires_at),
                "valid": session.as_ref().is_some_and(|s| s.is_valid()),
            },
        }));
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    ctx.output.kv("source", &source);

    ctx.output.info("");
    ctx.output.info("[api]");
    ctx.output.kv("base_url", &config.api.base_url);
    ctx.output.kv("timeout_ms", &config.api.timeout_ms.to_string());
    ctx.output.kv("retry.max_attempts", &config.api.retry.max_attempts.to_string());
    ctx.output.kv("retry.backoff_ms", &config.api.retry.backoff_ms.to_string());
    ctx.output.kv("retry.max_backoff_ms", &config.api.retry.max_backoff_ms.to_string());

    ctx.output.info("");
    ctx.output.info("[cart]");
    ctx.output.kv("currency", &config.cart.currency);

    ctx.output.info("");
    ctx.output.info("[session]");
    match session {
        Some(session) => {
            ctx.output.kv("user_id", session.user_id.as_str());
            ctx.output.kv("token", "***");
            if let Some(at) = session.expires_at {
                ctx.output.kv("expires_at", &at.to_rfc3339());
            }
            if !session.is_valid() {
                ctx.output.warn("Session token is expired");
            }
        }
        None => ctx.output.kv("user_id", "(not signed in)"),
    }
    if std::env::var_os(TOKEN_ENV).is_some() {
        ctx.output.kv("token source", TOKEN_ENV);
    }

    Ok(())
}

async fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, generate_default_config())
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}
