//! Cartsync command line

use std::{process, sync::Arc};

use cartsync::{
    api::HttpCartApi,
    prices::currency_from_code,
    storage::FileStorage,
    store::{CartStore, StoreConfig},
};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    commands::CommandError,
    config::CliConfig,
    observability::ObservabilityError,
};

mod commands;
mod config;
mod observability;

/// Errors that end the process.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Cartsync entry point
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = CliConfig::load().unwrap_or_else(|error| error.exit());

    if let Err(error) = run(&config).await {
        error!(%error, "command failed");

        #[expect(
            clippy::print_stderr,
            reason = "the user needs the failure even when logging is filtered out"
        )]
        {
            eprintln!("error: {error}");
        }

        process::exit(1);
    }
}

async fn run(config: &CliConfig) -> Result<(), CliError> {
    observability::init_subscriber(&config.logging)?;

    let currency = currency_from_code(&config.storage.currency)
        .ok_or_else(|| CliError::UnknownCurrency(config.storage.currency.clone()))?;

    let session = config.session.session();

    info!(
        authenticated = session.is_authenticated(),
        storage = %config.storage.storage_path.display(),
        "opening cart"
    );

    let store = CartStore::new(
        StoreConfig {
            currency,
            ..StoreConfig::default()
        },
        Arc::new(HttpCartApi::new(config.api.api_config())),
        Arc::new(FileStorage::new(&config.storage.storage_path)),
    );

    let snapshot = commands::execute(&config.command, &store, &session).await?;

    #[expect(clippy::print_stdout, reason = "command output")]
    {
        println!("{}", commands::render(&snapshot, &store));
    }

    Ok(())
}
