//! CLI configuration

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::config::{
    api::{ApiSettings, SessionSettings, StorageSettings},
    observability::LoggingConfig,
};

pub(crate) mod api;
pub(crate) mod observability;

/// Cartsync command line
#[derive(Debug, Parser)]
#[command(name = "cartsync", about = "Inspect and edit a shopping cart", long_about = None)]
pub struct CliConfig {
    /// Cart API settings.
    #[command(flatten)]
    pub api: ApiSettings,

    /// Who is shopping.
    #[command(flatten)]
    pub session: SessionSettings,

    /// Guest cart and display settings.
    #[command(flatten)]
    pub storage: StorageSettings,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// What to do with the cart.
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Cart operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the cart and its totals.
    Show,

    /// Add a variant to the cart.
    Add(AddArgs),

    /// Remove a line from the cart.
    Remove {
        /// Line item id
        item_id: u64,
    },

    /// Set the quantity of a line.
    SetQuantity {
        /// Line item id
        item_id: u64,

        /// Variant held by the line
        variant_id: u64,

        /// New quantity (at least 1)
        quantity: u32,
    },

    /// Validate and apply a coupon code.
    Coupon {
        /// Code as entered
        code: String,
    },

    /// Empty the cart.
    Clear {
        /// Also delete the stored guest cart and coupon
        #[arg(long)]
        purge: bool,
    },

    /// Move the guest cart into the signed-in user's server cart.
    Adopt,
}

/// Variant details for `add`.
#[derive(Debug, clap::Args)]
pub struct AddArgs {
    /// Variant id
    #[arg(long = "variant")]
    pub variant_id: u64,

    /// Units to add
    #[arg(long, default_value_t = 1)]
    pub quantity: u32,

    /// Unit price in major units, e.g. 24.99
    #[arg(long)]
    pub price: Decimal,

    /// Units in stock
    #[arg(long)]
    pub stock: u32,

    /// Product name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Brand name
    #[arg(long, default_value = "")]
    pub brand: String,

    /// Color name
    #[arg(long, default_value = "")]
    pub color: String,

    /// Size name
    #[arg(long, default_value = "")]
    pub size: String,

    /// Image URL
    #[arg(long, default_value = "")]
    pub image: String,
}
