//! Shop backend API: the collaborator seam and its HTTP implementation.
//!
//! # Architecture
//!
//! - [`ShopBackend`] is the only way the state container talks to the outside
//!   world. Tests substitute in-memory fakes; production uses [`BackendClient`].
//! - The backend is source of truth for products and for the persisted cart.
//! - Product lists are cached in memory via `moka` (TTL from configuration).
//!
//! # Endpoints
//!
//! | Operation        | Request                                          |
//! |------------------|--------------------------------------------------|
//! | product list     | `GET  /api/product/list`                         |
//! | single product   | `POST /api/product/single {productId}`           |
//! | cart increment   | `POST /api/cart/add {itemId, size}`              |
//! | cart set         | `POST /api/cart/update {itemId, size, quantity}` |
//! | cart snapshot    | `POST /api/cart/get {}`                          |
//! | login            | `POST /api/user/login {email, password}`         |
//! | register         | `POST /api/user/register {name, email, password}`|
//! | verify payment   | `POST /api/order/verifyStripe {success, orderId}`|
//!
//! Authenticated requests carry the auth token in a `token` header. Every
//! reply is a JSON envelope with a `success` flag and an optional `message`.

mod client;
mod wire;

pub use client::BackendClient;

use async_trait::async_trait;
use secrecy::SecretString;
use shopfront_core::{Cart, CartKey, Email, OrderId, Product, ProductId};
use thiserror::Error;

use crate::session::AuthToken;

/// Errors that can occur when talking to the shop backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status code.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend answered `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Response body did not have the expected shape.
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BackendError {
    /// Whether this failure points at the transport or the backend itself
    /// rather than at the request.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Rejected(_) => false,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(_) | Self::UnexpectedFormat(_) | Self::Parse(_) => true,
        }
    }

    /// Message suitable for a user-visible notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Api { status, message } if message.is_empty() => {
                format!("Request failed with status code {status}")
            }
            Self::Api { message, .. } => message.clone(),
            Self::UnexpectedFormat(_) | Self::Parse(_) => {
                "Received unexpected data format from server".to_string()
            }
            Self::Http(e) => e.to_string(),
        }
    }
}

/// Sign-in credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// New account details.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

/// Outcome reported by the payment gateway redirect, relayed for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentVerification {
    pub success: bool,
    pub order_id: OrderId,
}

/// Remote catalog, cart, user and order services.
#[async_trait]
pub trait ShopBackend: Send + Sync {
    /// Fetch the full product list.
    async fn list_products(&self) -> Result<Vec<Product>, BackendError>;

    /// Fetch a single product.
    async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError>;

    /// Persist a one-unit increment of `key`.
    async fn add_to_cart(&self, token: &AuthToken, key: &CartKey) -> Result<(), BackendError>;

    /// Persist an absolute quantity for `key`.
    async fn update_cart(
        &self,
        token: &AuthToken,
        key: &CartKey,
        quantity: i64,
    ) -> Result<(), BackendError>;

    /// Fetch the full server-side cart.
    async fn get_cart(&self, token: &AuthToken) -> Result<Cart, BackendError>;

    /// Exchange credentials for an auth token.
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken, BackendError>;

    /// Create an account.
    async fn register(&self, registration: &Registration) -> Result<(), BackendError>;

    /// Ask the backend to confirm a payment. Returns whether it was accepted.
    async fn verify_payment(
        &self,
        token: &AuthToken,
        verification: &PaymentVerification,
    ) -> Result<bool, BackendError>;

    /// Drop any cached product data so the next list goes to the network.
    fn invalidate_catalog(&self) {}
}
