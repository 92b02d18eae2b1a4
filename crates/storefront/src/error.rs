//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for callers that drive the storefront
//! end to end (the CLI), plus helpers that capture server-class failures to
//! Sentry. Without a configured DSN the Sentry calls are no-ops.

use shopfront_core::EmailError;
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::session::TokenStoreError;
use crate::state::CartError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Cart operation rejected locally.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Email address failed validation.
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    /// Token persistence failed.
    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStoreError),

    /// Input from the presentation layer was invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Log a backend failure and, for server-class errors, capture it to Sentry.
///
/// Client-class failures (the backend answered with `success: false`) are
/// expected in normal use and only logged at warn level.
pub fn report_backend_error(operation: &str, error: &BackendError) {
    if error.is_server_error() {
        let event_id = sentry::capture_error(error);
        tracing::error!(
            operation,
            error = %error,
            sentry_event_id = %event_id,
            "Backend request failed"
        );
    } else {
        tracing::warn!(operation, error = %error, "Backend rejected request");
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item to cart", Some(&[("product_id", "p1"), ("size", "M")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
