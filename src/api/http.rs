//! HTTP client for the storefront cart API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::{
    errors::CartError,
    ids::{LineItemId, VariantId},
    items::CartLineItem,
    session::Credentials,
};

use super::{
    ApplyCouponRequest, CartApi, CouponQuote, CouponTarget,
    wire::{
        AddItemBody, ApplyCouponBody, CartResponse, CouponResponse, UpdateQuantityBody,
        rejection_message,
    },
};

/// Image shown for variants without any product images.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "/images/placeholder.png";

/// Where the storefront API and its assets live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// API root, e.g. `"https://api.example.com/api"`.
    pub base_url: String,

    /// Prefix for relative image paths returned by the API.
    pub asset_base_url: String,

    /// Image used when a variant has none.
    pub placeholder_image: String,
}

impl ApiConfig {
    /// Configuration with the default placeholder image.
    #[must_use]
    pub fn new(base_url: impl Into<String>, asset_base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            asset_base_url: asset_base_url.into(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }

    /// Resolve an image path from the API into an absolute URL.
    #[must_use]
    pub fn resolve_image_url(&self, path: Option<&str>) -> String {
        match path.map(str::trim) {
            None | Some("") => self.placeholder_image.clone(),
            Some(path) if path.starts_with("http://") || path.starts_with("https://") => {
                path.to_string()
            }
            Some(path) => format!(
                "{}/{}",
                self.asset_base_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// [`CartApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCartApi {
    config: ApiConfig,
    http: Client,
}

impl HttpCartApi {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Create a client sharing an existing connection pool.
    #[must_use]
    pub fn with_client(config: ApiConfig, http: Client) -> Self {
        Self { config, http }
    }

    fn authorized(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request.bearer_auth(credentials.token.expose())
    }
}

/// Pass successful responses through; turn anything else into [`CartError::Rejected`].
async fn ensure_success(response: Response) -> Result<Response, CartError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = rejection_message(status.as_u16(), &text);

    warn!(status = status.as_u16(), %message, "cart api rejected request");

    Err(CartError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CartApi for HttpCartApi {
    async fn fetch_cart(&self, credentials: &Credentials) -> Result<Vec<CartLineItem>, CartError> {
        let url = self
            .config
            .endpoint(&format!("/cart/{}", credentials.user_id));

        let response = self
            .authorized(self.http.get(&url), credentials)
            .send()
            .await?;

        let parsed: CartResponse = ensure_success(response).await?.json().await?;
        let items = parsed.into_line_items(&self.config)?;

        debug!(user_id = %credentials.user_id, lines = items.len(), "fetched server cart");

        Ok(items)
    }

    async fn add_item(
        &self,
        credentials: &Credentials,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let body = AddItemBody {
            user_id: credentials.user_id.get(),
            variant_id: variant_id.get(),
            quantity,
        };

        let response = self
            .authorized(self.http.post(self.config.endpoint("/cart/add")), credentials)
            .json(&body)
            .send()
            .await?;

        ensure_success(response).await?;

        Ok(())
    }

    async fn remove_item(
        &self,
        credentials: &Credentials,
        item_id: LineItemId,
    ) -> Result<(), CartError> {
        let url = self.config.endpoint(&format!("/cart/{item_id}"));

        let response = self
            .authorized(self.http.delete(&url), credentials)
            .send()
            .await?;

        ensure_success(response).await?;

        Ok(())
    }

    async fn update_quantity(
        &self,
        credentials: &Credentials,
        item_id: LineItemId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<(), CartError> {
        let body = UpdateQuantityBody {
            cart_item_id: item_id.get(),
            variant_id: variant_id.get(),
            quantity,
        };

        let response = self
            .authorized(self.http.put(self.config.endpoint("/cart/update")), credentials)
            .json(&body)
            .send()
            .await?;

        ensure_success(response).await?;

        Ok(())
    }

    async fn apply_coupon(&self, request: ApplyCouponRequest) -> Result<CouponQuote, CartError> {
        let body = match &request.target {
            CouponTarget::User(user_id) => ApplyCouponBody {
                user_id: Some(user_id.get()),
                cart: None,
                coupon: &request.code,
            },
            CouponTarget::Cart(items) => ApplyCouponBody {
                user_id: None,
                cart: Some(items.as_slice()),
                coupon: &request.code,
            },
        };

        let mut builder = self.http.post(self.config.endpoint("/coupon/apply")).json(&body);

        if let Some(token) = &request.token {
            builder = builder.bearer_auth(token.expose());
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            return Err(CartError::CouponRejected {
                message: rejection_message(status.as_u16(), &text),
            });
        }

        let parsed: CouponResponse = response.json().await?;

        parsed.into_quote()
    }
}
