//! Cart API, session & storage config

use std::path::PathBuf;

use cartsync::{api::ApiConfig, session::Session};
use clap::Args;

/// Cart API endpoints.
#[derive(Debug, Args)]
pub struct ApiSettings {
    /// Base URL of the cart API
    #[arg(long, env = "CART_API_BASE_URL", default_value = "http://localhost:8000/api")]
    pub api_base_url: String,

    /// Base URL that relative image paths are resolved against
    #[arg(long, env = "CART_ASSET_BASE_URL", default_value = "http://localhost:8000")]
    pub asset_base_url: String,
}

impl ApiSettings {
    /// Client settings for the HTTP API.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.api_base_url, &self.asset_base_url)
    }
}

/// Credentials of the signed-in user, if any.
#[derive(Debug, Args)]
pub struct SessionSettings {
    /// Bearer token; without it the guest cart is used
    #[arg(long, env = "CART_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the signed-in user
    #[arg(long, env = "CART_USER_ID")]
    pub user_id: Option<u64>,
}

impl SessionSettings {
    /// Authenticated when both a token and a user id are set, guest otherwise.
    #[must_use]
    pub fn session(&self) -> Session {
        Session::from_parts(self.token.clone(), self.user_id)
    }
}

/// Guest cart location and display currency.
#[derive(Debug, Args)]
pub struct StorageSettings {
    /// File holding the guest cart and coupon
    #[arg(long, env = "CART_STORAGE_PATH", default_value = ".cartsync.json")]
    pub storage_path: PathBuf,

    /// ISO currency code used to display amounts
    #[arg(long, env = "CART_CURRENCY", default_value = "USD")]
    pub currency: String,
}
