//! Route changes requested by the state container.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use shopfront_core::ProductId;

/// Screens the container can send the shopper to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Cart,
    Orders,
    Product(ProductId),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Login => f.write_str("/login"),
            Self::Cart => f.write_str("/cart"),
            Self::Orders => f.write_str("/orders"),
            Self::Product(id) => write!(f, "/product/{id}"),
        }
    }
}

/// Fire-and-forget navigation sink.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Ignores navigation; for headless callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(%route, "navigation ignored");
    }
}

/// Records every requested route.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent route, if any.
    #[must_use]
    pub fn last(&self) -> Option<Route> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }
}
