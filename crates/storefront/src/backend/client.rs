//! HTTP implementation of [`ShopBackend`].

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use shopfront_core::{Cart, CartKey, Product, ProductId};
use tracing::{debug, instrument};

use super::wire::{Ack, CartPayload, Envelope, ProductPayload, TokenPayload, parse_product_list};
use super::{BackendError, Credentials, PaymentVerification, Registration, ShopBackend};
use crate::config::StorefrontConfig;
use crate::session::AuthToken;

/// Header the backend reads the auth token from.
const TOKEN_HEADER: &str = "token";

/// Cache key for product data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Products,
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Products(Arc<Vec<Product>>),
    Product(Box<Product>),
}

/// Client for the shop backend REST API.
///
/// Cheap to clone. Product reads are cached for the configured TTL; a zero
/// TTL disables caching.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    config: StorefrontConfig,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = (!config.catalog_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(config.catalog_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                config: config.clone(),
                cache,
            }),
        })
    }

    /// Backend base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.backend_url
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }

    /// POST a JSON body and decode the reply envelope.
    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&AuthToken>,
        body: serde_json::Value,
    ) -> Result<T, BackendError> {
        let mut request = self
            .inner
            .client
            .post(self.inner.config.endpoint(path))
            .json(&body);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token.expose());
        }

        let text = self.send(request).await?;
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })?;
        envelope.into_success()
    }
}

#[async_trait]
impl ShopBackend for BackendClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) = self.cached(&CacheKey::Products).await {
            debug!("Cache hit for product list");
            return Ok(products.as_ref().clone());
        }

        let request = self
            .inner
            .client
            .get(self.inner.config.endpoint("/api/product/list"));
        let text = self.send(request).await?;
        let body: serde_json::Value = serde_json::from_str(&text)?;
        let products = Arc::new(parse_product_list(body)?);

        debug!(count = products.len(), "Fetched product list");
        self.remember(CacheKey::Products, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(Arc::unwrap_or_clone(products))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let payload: ProductPayload = self
            .post("/api/product/single", None, json!({ "productId": id }))
            .await?;
        let product = payload
            .product
            .ok_or_else(|| BackendError::UnexpectedFormat("reply without `product`".to_string()))?;

        self.remember(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self, token), fields(product_id = %key.product_id, size = %key.size))]
    async fn add_to_cart(&self, token: &AuthToken, key: &CartKey) -> Result<(), BackendError> {
        let _: Ack = self
            .post(
                "/api/cart/add",
                Some(token),
                json!({ "itemId": key.product_id, "size": key.size }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %key.product_id, size = %key.size))]
    async fn update_cart(
        &self,
        token: &AuthToken,
        key: &CartKey,
        quantity: i64,
    ) -> Result<(), BackendError> {
        let _: Ack = self
            .post(
                "/api/cart/update",
                Some(token),
                json!({ "itemId": key.product_id, "size": key.size, "quantity": quantity }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn get_cart(&self, token: &AuthToken) -> Result<Cart, BackendError> {
        let payload: CartPayload = self.post("/api/cart/get", Some(token), json!({})).await?;
        Ok(payload.cart_data.unwrap_or_default())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, BackendError> {
        let payload: TokenPayload = self
            .post(
                "/api/user/login",
                None,
                json!({
                    "email": credentials.email,
                    "password": credentials.password.expose_secret(),
                }),
            )
            .await?;

        payload
            .token
            .and_then(AuthToken::new)
            .ok_or_else(|| BackendError::UnexpectedFormat("login reply without token".to_string()))
    }

    #[instrument(skip(self, registration), fields(email = %registration.email))]
    async fn register(&self, registration: &Registration) -> Result<(), BackendError> {
        let _: Ack = self
            .post(
                "/api/user/register",
                None,
                json!({
                    "name": registration.name,
                    "email": registration.email,
                    "password": registration.password.expose_secret(),
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(order_id = %verification.order_id))]
    async fn verify_payment(
        &self,
        token: &AuthToken,
        verification: &PaymentVerification,
    ) -> Result<bool, BackendError> {
        // The gateway redirect carries `success` as a query string value
        let success = if verification.success { "true" } else { "false" };
        let result: Result<Ack, BackendError> = self
            .post(
                "/api/order/verifyStripe",
                Some(token),
                json!({ "success": success, "orderId": verification.order_id }),
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(BackendError::Rejected(message)) => {
                debug!(%message, "Payment not verified");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn invalidate_catalog(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.invalidate_all();
        }
    }
}

/// Best-effort error text from a failed response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}
