//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use learnhub_data::HttpCartRemote;
use learnhub_store::{CartStore, SdkPaymentInitiator};
use tracing::debug;

use crate::config::LearnhubConfig;
use crate::output::Output;
use crate::payment::ConsoleCheckout;

/// Config file names, in lookup order.
pub const CONFIG_NAMES: [&str; 3] = ["learnhub.toml", ".learnhub.toml", "learnhub.json"];

pub type CliStore = CartStore<HttpCartRemote, SdkPaymentInitiator<ConsoleCheckout>>;

/// Execution context for CLI commands.
pub struct Context {
    pub config: LearnhubConfig,
    /// Where `config` was read from, if anywhere.
    pub config_path: Option<PathBuf>,
    pub output: Output,
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = if let Some(path) = config_path {
            (LearnhubConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            match find_config(&cwd) {
                Some((path, config)) => (config, Some(path)),
                None => (LearnhubConfig::default(), None),
            }
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Build a cart store for the configured API, signed in when the config
    /// carries a session.
    pub fn store(&self, assume_yes: bool) -> Result<CliStore> {
        let remote = HttpCartRemote::new(&self.config.api)
            .with_context(|| format!("Failed to set up client for {}", self.config.api.base_url))?;
        let payment = SdkPaymentInitiator::new(ConsoleCheckout::new(self.output.clone(), assume_yes));
        let store = CartStore::new(remote, payment).with_currency(self.config.currency()?);
        debug!(base_url = %self.config.api.base_url, "cart store ready");

        match self.config.auth_session() {
            Some(session) => store.login(session),
            None => self
                .output
                .warn("No session configured; set [session] in learnhub.toml or LEARNHUB_TOKEN"),
        }

        Ok(store)
    }
}

/// Find config file in directory tree.
fn find_config(start: &Path) -> Option<(PathBuf, LearnhubConfig)> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let config_path = current.join(name);
            if config_path.exists() {
                if let Ok(config) = LearnhubConfig::load(config_path.to_str()?) {
                    return Some((config_path, config));
                }
            }
        }

        if !current.pop() {
            break;
        }
    }

    None
}
