//! Shop state container.
//!
//! [`ShopState`] owns the product catalog cache, the local cart and the
//! session. It is cheaply cloneable via `Arc` and is the only sanctioned way
//! for presentation code to read or change any of them.
//!
//! # Cart consistency
//!
//! Cart mutations are optimistic: the new cart is swapped in under a short
//! write lock, then the remote write is queued in the background. Remote
//! writes for the same `(product, size)` key go out in call order. A failed
//! write keeps the local value, notifies the shopper and marks the cart stale;
//! with [`SyncFailurePolicy::Reconcile`] the server cart is fetched right away.
//!
//! Every session change bumps an epoch. A cart fetch started under an older
//! epoch is discarded when it lands, so a late reply can never resurrect the
//! cart of a signed-out shopper.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use secrecy::SecretString;
use shopfront_core::{Cart, CartKey, Catalog, Email, OrderId, Price, Product, ProductId, Size};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::backend::{BackendError, Credentials, PaymentVerification, Registration, ShopBackend};
use crate::config::{StorefrontConfig, SyncFailurePolicy};
use crate::error::{AppError, add_breadcrumb, report_backend_error};
use crate::navigation::{Navigator, NoopNavigator, Route};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::session::{AuthToken, FileTokenStore, MemoryTokenStore, Session, TokenStore};
use crate::sync::{KeyedQueue, PendingSync, SyncOutcome};

const SIZE_REQUIRED_MESSAGE: &str = "Select Product Size";
const LOGGED_OUT_MESSAGE: &str = "Logged out successfully";
const LOGGED_IN_MESSAGE: &str = "Logged in successfully!";
const REGISTERED_MESSAGE: &str = "Account created successfully! Please log in.";
const PAYMENT_VERIFIED_MESSAGE: &str = "Payment verified successfully!";
const PAYMENT_FAILED_MESSAGE: &str = "Payment verification failed.";

/// Cart mutations rejected before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("select a product size")]
    SizeRequired,
}

/// Checkout totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub count: u64,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    /// Zero when nothing billable is in the cart, otherwise subtotal plus fee.
    pub total: Decimal,
}

/// Result of relaying a payment gateway redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    /// The order was paid; the local cart has been cleared.
    Verified,
    /// The backend did not confirm the payment.
    Declined,
    /// The verification request itself failed.
    Failed,
    /// No session; the shopper was sent to the login screen.
    SignInRequired,
}

/// Store-wide presentation settings.
#[derive(Debug, Clone)]
pub struct ShopSettings {
    pub currency: String,
    pub delivery_fee: Price,
    pub sync_failure_policy: SyncFailurePolicy,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            currency: "$".to_string(),
            delivery_fee: Price::new(Decimal::TEN).unwrap_or(Price::ZERO),
            sync_failure_policy: SyncFailurePolicy::default(),
        }
    }
}

impl From<&StorefrontConfig> for ShopSettings {
    fn from(config: &StorefrontConfig) -> Self {
        Self {
            currency: config.currency.clone(),
            delivery_fee: config.delivery_fee,
            sync_failure_policy: config.sync_failure_policy,
        }
    }
}

/// A remote cart write waiting in the queue.
#[derive(Debug, Clone, Copy)]
enum RemoteWrite {
    Increment,
    Set(i64),
}

#[derive(Debug, Default)]
struct SessionSlot {
    session: Session,
    epoch: u64,
}

/// Builder for [`ShopState`].
pub struct ShopStateBuilder {
    backend: Arc<dyn ShopBackend>,
    tokens: Option<Arc<dyn TokenStore>>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
    settings: ShopSettings,
}

impl ShopStateBuilder {
    /// Take currency, delivery fee, failure policy and token file from `config`.
    #[must_use]
    pub fn config(mut self, config: &StorefrontConfig) -> Self {
        self.settings = ShopSettings::from(config);
        if let Some(path) = &config.token_path {
            self.tokens = Some(Arc::new(FileTokenStore::new(path.clone())));
        }
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: ShopSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    #[must_use]
    pub fn build(self) -> ShopState {
        let (ready, _) = watch::channel(false);
        ShopState {
            inner: Arc::new(ShopStateInner {
                backend: self.backend,
                tokens: self
                    .tokens
                    .unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator)),
                settings: self.settings,
                session: RwLock::new(SessionSlot::default()),
                cart: RwLock::new(Arc::new(Cart::new())),
                catalog: RwLock::new(Arc::new(Catalog::default())),
                ready,
                stale: AtomicBool::new(false),
                writes: KeyedQueue::new(),
            }),
        }
    }
}

/// The storefront's client-side state.
///
/// Mutations spawn background tasks and must be called from within a tokio
/// runtime.
#[derive(Clone)]
pub struct ShopState {
    inner: Arc<ShopStateInner>,
}

struct ShopStateInner {
    backend: Arc<dyn ShopBackend>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    settings: ShopSettings,
    session: RwLock<SessionSlot>,
    cart: RwLock<Arc<Cart>>,
    catalog: RwLock<Arc<Catalog>>,
    ready: watch::Sender<bool>,
    stale: AtomicBool,
    writes: KeyedQueue<CartKey>,
}

impl ShopState {
    /// Start building a state container around `backend`.
    #[must_use]
    pub fn builder(backend: Arc<dyn ShopBackend>) -> ShopStateBuilder {
        ShopStateBuilder {
            backend,
            tokens: None,
            notifier: None,
            navigator: None,
            settings: ShopSettings::default(),
        }
    }

    /// Get a reference to the store settings.
    #[must_use]
    pub fn settings(&self) -> &ShopSettings {
        &self.inner.settings
    }

    // =========================================================================
    // Startup & Catalog
    // =========================================================================

    /// Load the catalog and restore a persisted session, concurrently.
    ///
    /// The ready flag flips as soon as the catalog request resolves, whether
    /// it succeeded or not. The restored cart fetch may still be running at
    /// that point; this future returns once both are done.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        let restore = self.restore_session();
        let catalog = async {
            // Failures are already reported; readiness does not depend on them
            let _ = self.load_catalog().await;
            self.inner.ready.send_replace(true);
            info!("Shop state ready");
        };

        let ((), outcome) = tokio::join!(catalog, restore.wait());
        debug!(?outcome, "Session restore finished");
    }

    /// Whether the initial catalog load has resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Wait until the initial catalog load has resolved.
    pub async fn wait_ready(&self) {
        let mut ready = self.inner.ready.subscribe();
        if ready.wait_for(|ready| *ready).await.is_err() {
            warn!("Ready flag sender dropped");
        }
    }

    /// Current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&read_lock(&self.inner.catalog))
    }

    /// Look up a product in the cached catalog.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<Product> {
        self.catalog().get(id).cloned()
    }

    /// A product from the cached catalog, or from the backend if it is not
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the product is not cached and the request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product_details(&self, id: &ProductId) -> Result<Product, BackendError> {
        if let Some(product) = self.product(id.as_str()) {
            return Ok(product);
        }
        self.inner.backend.get_product(id).await.inspect_err(|e| {
            report_backend_error("product/single", e);
        })
    }

    /// Refetch the product list, bypassing any response cache.
    ///
    /// On failure the previous catalog stays in place.
    ///
    /// # Errors
    ///
    /// Returns the backend error after notifying the shopper.
    pub async fn reload_catalog(&self) -> Result<usize, BackendError> {
        self.inner.backend.invalidate_catalog();
        self.load_catalog().await
    }

    #[instrument(skip(self))]
    async fn load_catalog(&self) -> Result<usize, BackendError> {
        match self.inner.backend.list_products().await {
            Ok(products) => {
                let catalog = Catalog::new(products);
                let count = catalog.len();
                *write_lock(&self.inner.catalog) = Arc::new(catalog);
                info!(products = count, "Catalog loaded");
                Ok(count)
            }
            Err(e) => {
                report_backend_error("product/list", &e);
                let message = match &e {
                    BackendError::UnexpectedFormat(_) | BackendError::Parse(_) => e.user_message(),
                    _ => format!("Failed to fetch products: {}", e.user_message()),
                };
                self.notify(Notification::error(message));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Current session.
    #[must_use]
    pub fn session(&self) -> Session {
        read_lock(&self.inner.session).session.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        read_lock(&self.inner.session).session.is_authenticated()
    }

    /// Replace the auth token.
    ///
    /// A non-empty token signs in, persists the token and fetches the server
    /// cart in the background. An empty token signs out: the cart is cleared
    /// and the persisted token removed before this returns.
    pub fn set_token(&self, raw: &str) -> PendingSync {
        match AuthToken::new(raw) {
            Some(token) => self.sign_in(token, true),
            None => {
                self.sign_out();
                PendingSync::local()
            }
        }
    }

    /// Sign out, go to the login screen and confirm to the shopper.
    pub fn logout(&self) {
        self.sign_out();
        self.inner.navigator.navigate(Route::Login);
        self.notify(Notification::success(LOGGED_OUT_MESSAGE));
    }

    /// Exchange credentials for a session.
    ///
    /// On success the returned handle resolves when the server cart has been
    /// fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if the email is malformed or the backend refuses the
    /// credentials. The shopper is notified either way.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> crate::error::Result<PendingSync> {
        let email = self.parse_email(email)?;
        let credentials = Credentials {
            email,
            password: SecretString::from(password.to_string()),
        };

        match self.inner.backend.login(&credentials).await {
            Ok(token) => {
                let sync = self.sign_in(token, true);
                self.notify(Notification::success(LOGGED_IN_MESSAGE));
                self.inner.navigator.navigate(Route::Home);
                Ok(sync)
            }
            Err(e) => Err(self.backend_failure("user/login", e)),
        }
    }

    /// Create an account. The shopper still has to log in afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid or the backend refuses it.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> crate::error::Result<()> {
        let name = name.trim();
        if name.is_empty() {
            let message = "name is required";
            self.notify(Notification::error(message));
            return Err(AppError::BadRequest(message.to_string()));
        }
        let email = self.parse_email(email)?;
        let registration = Registration {
            name: name.to_string(),
            email,
            password: SecretString::from(password.to_string()),
        };

        match self.inner.backend.register(&registration).await {
            Ok(()) => {
                self.notify(Notification::success(REGISTERED_MESSAGE));
                self.inner.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(e) => Err(self.backend_failure("user/register", e)),
        }
    }

    fn restore_session(&self) -> PendingSync {
        match self.inner.tokens.load() {
            Ok(Some(token)) => {
                info!("Restoring persisted session");
                self.sign_in(token, false)
            }
            Ok(None) => PendingSync::local(),
            Err(e) => {
                warn!(error = %e, "Failed to load persisted auth token");
                PendingSync::local()
            }
        }
    }

    fn sign_in(&self, token: AuthToken, persist: bool) -> PendingSync {
        let epoch = {
            let mut slot = write_lock(&self.inner.session);
            slot.epoch = slot.epoch.wrapping_add(1);
            slot.session = Session::Authenticated {
                token: token.clone(),
            };
            slot.epoch
        };

        if persist && let Err(e) = self.inner.tokens.save(&token) {
            warn!(error = %e, "Failed to persist auth token");
        }
        add_breadcrumb("session", "Signed in", None);

        let state = self.clone();
        PendingSync::spawn(async move { state.fetch_cart_for(token, epoch).await })
    }

    fn sign_out(&self) {
        {
            let mut slot = write_lock(&self.inner.session);
            slot.epoch = slot.epoch.wrapping_add(1);
            slot.session = Session::Unauthenticated;
            *write_lock(&self.inner.cart) = Arc::new(Cart::new());
            self.inner.stale.store(false, Ordering::Release);
        }

        if let Err(e) = self.inner.tokens.remove() {
            warn!(error = %e, "Failed to remove persisted auth token");
        }
        add_breadcrumb("session", "Signed out", None);
    }

    fn current_token(&self) -> Option<(AuthToken, u64)> {
        let slot = read_lock(&self.inner.session);
        slot.session.token().map(|token| (token.clone(), slot.epoch))
    }

    fn current_epoch(&self) -> u64 {
        read_lock(&self.inner.session).epoch
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Snapshot of the local cart.
    #[must_use]
    pub fn cart(&self) -> Arc<Cart> {
        Arc::clone(&read_lock(&self.inner.cart))
    }

    /// Number of units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.cart().count()
    }

    /// Value of the cart at catalog prices.
    #[must_use]
    pub fn cart_amount(&self) -> Decimal {
        self.cart().amount(&self.catalog())
    }

    /// Checkout totals, once the catalog has loaded.
    #[must_use]
    pub fn cart_summary(&self) -> Option<CartSummary> {
        if !self.is_ready() {
            return None;
        }
        let cart = self.cart();
        let subtotal = cart.amount(&self.catalog());
        let delivery_fee = self.inner.settings.delivery_fee.amount();
        let total = if subtotal.is_zero() {
            Decimal::ZERO
        } else {
            subtotal + delivery_fee
        };

        Some(CartSummary {
            count: cart.count(),
            subtotal,
            delivery_fee,
            total,
        })
    }

    /// Format an amount in the store currency.
    #[must_use]
    pub fn format_amount(&self, amount: Decimal) -> String {
        format!("{}{amount:.2}", self.inner.settings.currency)
    }

    /// Add one unit of `product_id` in `size`.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::SizeRequired`] when no size was chosen; nothing is
    /// changed and nothing is sent.
    pub fn add_to_cart(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
    ) -> Result<PendingSync, CartError> {
        let Ok(size) = Size::parse(size) else {
            debug!(%product_id, "Size not selected");
            self.notify(Notification::error(SIZE_REQUIRED_MESSAGE));
            return Err(CartError::SizeRequired);
        };

        let key = CartKey::new(product_id.clone(), size);
        let quantity = self.mutate_cart(|cart| cart.increment(&key));
        debug!(%product_id, size = %key.size, quantity, "Added to cart");
        add_breadcrumb(
            "cart",
            "Added item to cart",
            Some(&[
                ("product_id", key.product_id.as_str()),
                ("size", key.size.as_str()),
            ]),
        );

        Ok(self.push_remote(key, RemoteWrite::Increment))
    }

    /// Set the absolute quantity of `product_id` in `size`.
    ///
    /// Zero and negative quantities are stored as given.
    pub fn update_quantity(&self, product_id: &ProductId, size: &Size, quantity: i64) -> PendingSync {
        let key = CartKey::new(product_id.clone(), size.clone());
        self.mutate_cart(|cart| cart.set_quantity(&key, quantity));
        debug!(%product_id, %size, quantity, "Updated cart quantity");
        add_breadcrumb(
            "cart",
            "Updated cart quantity",
            Some(&[("product_id", product_id.as_str()), ("size", size.as_str())]),
        );

        self.push_remote(key, RemoteWrite::Set(quantity))
    }

    /// Fetch the server cart for `token` and replace the local one with it.
    ///
    /// On failure the shopper is notified and the local cart is untouched.
    /// The result is discarded if the session changes while in flight.
    pub async fn fetch_remote_cart(&self, token: &AuthToken) -> SyncOutcome {
        let epoch = self.current_epoch();
        self.fetch_cart_for(token.clone(), epoch).await
    }

    /// Whether a remote write failed since the cart was last fetched.
    #[must_use]
    pub fn needs_reconcile(&self) -> bool {
        self.inner.stale.load(Ordering::Acquire)
    }

    /// Replace the local cart with the server cart of the current session.
    pub async fn reconcile(&self) -> SyncOutcome {
        match self.current_token() {
            Some((token, epoch)) => self.fetch_cart_for(token, epoch).await,
            None => SyncOutcome::LocalOnly,
        }
    }

    fn mutate_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut cart = write_lock(&self.inner.cart);
        f(Arc::make_mut(&mut cart))
    }

    fn push_remote(&self, key: CartKey, write: RemoteWrite) -> PendingSync {
        let Some((token, epoch)) = self.current_token() else {
            return PendingSync::local();
        };
        let state = self.clone();
        self.inner.writes.push(key.clone(), async move {
            state.run_write(token, key, write, epoch).await
        })
    }

    #[instrument(skip(self, token), fields(product_id = %key.product_id, size = %key.size))]
    async fn run_write(
        &self,
        token: AuthToken,
        key: CartKey,
        write: RemoteWrite,
        epoch: u64,
    ) -> SyncOutcome {
        let backend = &self.inner.backend;
        let (operation, result) = match write {
            RemoteWrite::Increment => ("cart/add", backend.add_to_cart(&token, &key).await),
            RemoteWrite::Set(quantity) => (
                "cart/update",
                backend.update_cart(&token, &key, quantity).await,
            ),
        };

        let Err(e) = result else {
            debug!(operation, "Cart write synced");
            return SyncOutcome::Synced;
        };

        report_backend_error(operation, &e);
        self.notify(Notification::error(e.user_message()));

        {
            // Epoch check and flag store must not straddle a sign-out
            let slot = read_lock(&self.inner.session);
            if slot.epoch != epoch {
                return SyncOutcome::Failed;
            }
            self.inner.stale.store(true, Ordering::Release);
        }

        if self.inner.settings.sync_failure_policy == SyncFailurePolicy::Reconcile {
            let outcome = self.reconcile().await;
            debug!(?outcome, "Reconciled after failed cart write");
        }
        SyncOutcome::Failed
    }

    async fn fetch_cart_for(&self, token: AuthToken, epoch: u64) -> SyncOutcome {
        let result = self.inner.backend.get_cart(&token).await;
        self.apply_fetched_cart(result, epoch)
    }

    fn apply_fetched_cart(&self, result: Result<Cart, BackendError>, epoch: u64) -> SyncOutcome {
        let slot = read_lock(&self.inner.session);
        if slot.epoch != epoch {
            debug!("Discarding cart fetched for a replaced session");
            return SyncOutcome::Discarded;
        }

        match result {
            Ok(cart) => {
                let count = cart.count();
                *write_lock(&self.inner.cart) = Arc::new(cart);
                self.inner.stale.store(false, Ordering::Release);
                drop(slot);
                info!(count, "Cart fetched");
                SyncOutcome::Synced
            }
            Err(e) => {
                drop(slot);
                report_backend_error("cart/get", &e);
                self.notify(Notification::error(e.user_message()));
                SyncOutcome::Failed
            }
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Relay a payment gateway redirect to the order service.
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn verify_payment(&self, success: bool, order_id: OrderId) -> PaymentStatus {
        let Some((token, _)) = self.current_token() else {
            self.inner.navigator.navigate(Route::Login);
            return PaymentStatus::SignInRequired;
        };

        let verification = PaymentVerification { success, order_id };
        match self.inner.backend.verify_payment(&token, &verification).await {
            Ok(true) => {
                *write_lock(&self.inner.cart) = Arc::new(Cart::new());
                self.inner.stale.store(false, Ordering::Release);
                add_breadcrumb(
                    "order",
                    "Payment verified",
                    Some(&[("order_id", verification.order_id.as_str())]),
                );
                self.notify(Notification::success(PAYMENT_VERIFIED_MESSAGE));
                self.inner.navigator.navigate(Route::Orders);
                PaymentStatus::Verified
            }
            Ok(false) => {
                self.notify(Notification::error(PAYMENT_FAILED_MESSAGE));
                self.inner.navigator.navigate(Route::Cart);
                PaymentStatus::Declined
            }
            Err(e) => {
                report_backend_error("order/verifyStripe", &e);
                self.notify(Notification::error(e.user_message()));
                self.inner.navigator.navigate(Route::Cart);
                PaymentStatus::Failed
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    fn parse_email(&self, raw: &str) -> Result<Email, AppError> {
        Email::parse(raw).map_err(|e| {
            self.notify(Notification::error(e.to_string()));
            AppError::from(e)
        })
    }

    fn backend_failure(&self, operation: &str, error: BackendError) -> AppError {
        report_backend_error(operation, &error);
        self.notify(Notification::error(error.user_message()));
        AppError::from(error)
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
