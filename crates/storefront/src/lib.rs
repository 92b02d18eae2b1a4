//! Shopfront storefront client core.
//!
//! Keeps a local product catalog, an optimistically updated cart and the
//! shopper's session consistent with the shop backend. Presentation layers
//! drive everything through [`ShopState`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod state;
pub mod sync;

pub use backend::{BackendClient, BackendError, ShopBackend};
pub use config::{StorefrontConfig, SyncFailurePolicy};
pub use error::{AppError, Result};
pub use state::{CartError, CartSummary, PaymentStatus, ShopSettings, ShopState};
pub use sync::{PendingSync, SyncOutcome};
