//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod config;

use clap::{Args, Subcommand};
use learnhub_commerce::CartError;

/// Arguments for the cart command.
#[derive(Args)]
pub struct CartArgs {
    #[command(subcommand)]
    pub command: Option<CartCommand>,
}

#[derive(Subcommand)]
pub enum CartCommand {
    /// Show the cart (default).
    Show,
    /// Add a course to the cart.
    Add {
        /// Course ID.
        course_id: String,

        /// Course title.
        #[arg(short, long)]
        name: String,

        /// Price in major units, e.g. 499.
        #[arg(short, long)]
        price: f64,

        /// List price before discount.
        #[arg(long)]
        original_price: Option<f64>,

        /// Instructor name.
        #[arg(long)]
        instructor: Option<String>,

        /// Thumbnail URL.
        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Remove a course from the cart.
    Remove {
        /// Course ID.
        course_id: String,
    },
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Skip confirmation prompts.
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Turn a cart error into a message for the terminal.
pub fn cart_failure(error: CartError) -> anyhow::Error {
    let hint = if error.requires_login() {
        " (set [session] in learnhub.toml or LEARNHUB_TOKEN)"
    } else if error.is_retryable() {
        " (try again)"
    } else {
        ""
    };
    let message = format!("{}{}", error.user_message(), hint);
    anyhow::Error::new(error).context(message)
}
