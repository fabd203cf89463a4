//! CLI configuration.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use learnhub_commerce::Currency;
use learnhub_data::HttpRemoteConfig;
use learnhub_store::AuthSession;
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `session.token`.
pub const TOKEN_ENV: &str = "LEARNHUB_TOKEN";

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnhubConfig {
    /// Cart API connection.
    #[serde(default)]
    pub api: HttpRemoteConfig,

    #[serde(default)]
    pub cart: CartSettings,

    /// Signed-in learner.
    #[serde(default)]
    pub session: SessionSettings,
}

impl LearnhubConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Cart currency, validated.
    pub fn currency(&self) -> Result<Currency> {
        Currency::from_code(&self.cart.currency)
            .ok_or_else(|| anyhow!("Unsupported currency in [cart]: {}", self.cart.currency))
    }

    /// Session from the config file, with `LEARNHUB_TOKEN` taking precedence.
    pub fn auth_session(&self) -> Option<AuthSession> {
        self.session.resolve(std::env::var(TOKEN_ENV).ok())
    }
}

/// `[cart]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartSettings {
    /// ISO code, e.g. `INR`.
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    Currency::default().code().to_string()
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
        }
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionSettings {
    fn resolve(&self, token_override: Option<String>) -> Option<AuthSession> {
        let user_id = self.user_id.as_deref()?.trim();
        let token = token_override
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone())?;
        if user_id.is_empty() {
            return None;
        }

        let session = AuthSession::new(user_id, token);
        Some(match self.expires_at {
            Some(at) => session.with_expiry(at),
            None => session,
        })
    }
}

/// Generate a default learnhub.toml config file.
pub fn generate_default_config() -> String {
    format!(
        r#"# LearnHub CLI configuration

[api]
base_url = "{base_url}"
timeout_ms = 10000

[api.retry]
max_attempts = 2
backoff_ms = 100
max_backoff_ms = 2000

[cart]
currency = "{currency}"

[session]
# user_id = "your-user-id"
# token = "paste a token here or set {token_env}"
# expires_at = "2030-01-01T00:00:00Z"
"#,
        base_url = HttpRemoteConfig::default().base_url,
        currency = default_currency(),
        token_env = TOKEN_ENV,
    )
}
