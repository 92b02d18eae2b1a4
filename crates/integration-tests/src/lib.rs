//! Integration test support for Shopfront.
//!
//! [`FakeShop`] runs an in-process axum server that speaks the shop backend
//! API (catalog, cart, user and order endpoints) on a random local port.
//! Tests point a real [`BackendClient`] at it and drive [`ShopState`] end to
//! end over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopfront-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shopfront_core::{Cart, CartKey, ProductId, Size};
use shopfront_storefront::navigation::RecordingNavigator;
use shopfront_storefront::notify::RecordingNotifier;
use shopfront_storefront::session::{MemoryTokenStore, TokenStore};
use shopfront_storefront::{BackendClient, ShopState, StorefrontConfig};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Email of the account every fake shop starts with.
pub const SHOPPER_EMAIL: &str = "shopper@example.com";

/// Password of [`SHOPPER_EMAIL`].
pub const SHOPPER_PASSWORD: &str = "hunter2";

const NOT_AUTHORIZED: &str = "Not Authorized Login Again";

type Reply = (StatusCode, Json<Value>);

/// A request the fake shop received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub token: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Shared {
    /// Raw body served by the product list endpoint
    product_list: RwLock<Value>,
    /// email -> password
    users: RwLock<HashMap<String, String>>,
    /// token -> email
    sessions: RwLock<HashMap<String, String>>,
    /// email -> cart
    carts: RwLock<HashMap<String, Cart>>,
    fail_cart_writes: AtomicBool,
    next_token: AtomicU64,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl Shared {
    async fn record(&self, path: &str, headers: &HeaderMap, body: Value) {
        self.requests.write().await.push(RecordedRequest {
            path: path.to_string(),
            token: token_header(headers),
            body,
        });
    }

    async fn user_for(&self, headers: &HeaderMap) -> Option<String> {
        let token = token_header(headers)?;
        self.sessions.read().await.get(&token).cloned()
    }

    async fn issue_token(&self, email: &str) -> String {
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        let token = format!("token-{n}");
        self.sessions
            .write()
            .await
            .insert(token.clone(), email.to_string());
        token
    }
}

/// In-process fake of the shop backend.
pub struct FakeShop {
    shared: Arc<Shared>,
    /// Server handle (kept alive to prevent shutdown)
    _handle: JoinHandle<()>,
    addr: SocketAddr,
}

/// A [`ShopState`] wired to a [`FakeShop`] with recording sinks.
pub struct TestClient {
    pub state: ShopState,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
}

impl FakeShop {
    /// Start a fake shop with the default products and one registered shopper.
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        *shared.product_list.write().await = json!({
            "success": true,
            "products": default_products(),
        });
        shared
            .users
            .write()
            .await
            .insert(SHOPPER_EMAIL.to_string(), SHOPPER_PASSWORD.to_string());

        // Bind to port 0 to get a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake shop");
        let addr = listener.local_addr().expect("Failed to get local address");

        let app = Router::new()
            .route("/api/product/list", get(list_products))
            .route("/api/product/single", post(single_product))
            .route("/api/cart/add", post(cart_add))
            .route("/api/cart/update", post(cart_update))
            .route("/api/cart/get", post(cart_get))
            .route("/api/user/login", post(login))
            .route("/api/user/register", post(register))
            .route("/api/order/verifyStripe", post(verify_stripe))
            .with_state(Arc::clone(&shared));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake shop server failed");
        });

        Self {
            shared,
            _handle: handle,
            addr,
        }
    }

    /// Base URL of the fake shop (e.g., "http://127.0.0.1:12345").
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this shop, with response caching off.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config = StorefrontConfig::new(&self.url()).expect("valid fake shop URL");
        config.request_timeout = Duration::from_secs(5);
        config.catalog_ttl = Duration::ZERO;
        config
    }

    /// A state container with an in-memory token store.
    #[must_use]
    pub fn client(&self) -> TestClient {
        self.client_with(&self.config(), Arc::new(MemoryTokenStore::new()))
    }

    /// A state container with custom configuration and token store.
    #[must_use]
    pub fn client_with(&self, config: &StorefrontConfig, tokens: Arc<dyn TokenStore>) -> TestClient {
        let backend = BackendClient::new(config).expect("Failed to build backend client");
        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let state = ShopState::builder(Arc::new(backend))
            .config(config)
            .token_store(tokens)
            .notifier(notifier.clone())
            .navigator(navigator.clone())
            .build();
        TestClient {
            state,
            notifier,
            navigator,
        }
    }

    /// Replace the raw product list response body.
    pub async fn set_product_list(&self, body: Value) {
        *self.shared.product_list.write().await = body;
    }

    /// Make cart writes answer 500 until switched back.
    pub fn fail_cart_writes(&self, fail: bool) {
        self.shared.fail_cart_writes.store(fail, Ordering::SeqCst);
    }

    /// Issue a session token for `email`, as a login would.
    pub async fn issue_token(&self, email: &str) -> String {
        self.shared.issue_token(email).await
    }

    /// Server-side cart of `email`.
    pub async fn cart_of(&self, email: &str) -> Cart {
        self.shared
            .carts
            .read()
            .await
            .get(email)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the server-side cart of `email`.
    pub async fn seed_cart(&self, email: &str, cart: Cart) {
        self.shared
            .carts
            .write()
            .await
            .insert(email.to_string(), cart);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.requests.read().await.clone()
    }

    /// Requests received for `path`.
    pub async fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

/// Products served by a fresh fake shop.
#[must_use]
pub fn default_products() -> Value {
    json!([
        {
            "_id": "tee-1",
            "name": "Women Round Neck Cotton Top",
            "description": "A lightweight, usually knitted, pullover shirt.",
            "price": 100,
            "image": [],
            "images": ["https://cdn.example.com/tee-1.png"],
            "category": "Women",
            "subCategory": "Topwear",
            "sizes": ["S", "M", "L"],
            "bestseller": true,
            "date": 1_716_634_345_448_i64
        },
        {
            "_id": "tee-2",
            "name": "Men Round Neck Pure Cotton T-shirt",
            "description": "Pure cotton, regular fit.",
            "price": 200,
            "images": [],
            "category": "Men",
            "subCategory": "Topwear",
            "sizes": ["M", "L", "XL"],
            "bestseller": false,
            "date": 1_716_621_345_448_i64
        },
        {
            "_id": "tee-3",
            "name": "Girls Round Neck Cotton Top",
            "price": 220,
            "category": "Kids",
            "subCategory": "Topwear",
            "sizes": ["S", "L", "XL"],
            "bestseller": true,
            "date": 1_716_234_545_448_i64
        }
    ])
}

fn token_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("token")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn rejected(message: &str) -> Reply {
    ok(json!({ "success": false, "message": message }))
}

fn cart_key(body: &Value) -> Option<CartKey> {
    let item = body.get("itemId")?.as_str()?;
    let size = body.get("size")?.as_str()?;
    Some(CartKey::new(ProductId::new(item), Size::from(size)))
}

async fn list_products(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Reply {
    shared.record("/api/product/list", &headers, Value::Null).await;
    ok(shared.product_list.read().await.clone())
}

async fn single_product(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared
        .record("/api/product/single", &headers, body.clone())
        .await;
    let wanted = body.get("productId").and_then(Value::as_str);
    let list = shared.product_list.read().await.clone();
    let products = list.get("products").cloned().unwrap_or(list);

    let found = products
        .as_array()
        .and_then(|all| all.iter().find(|p| p.get("_id").and_then(Value::as_str) == wanted))
        .cloned();
    match found {
        Some(product) => ok(json!({ "success": true, "product": product })),
        None => rejected("Product not found"),
    }
}

async fn cart_add(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared.record("/api/cart/add", &headers, body.clone()).await;
    let Some(email) = shared.user_for(&headers).await else {
        return rejected(NOT_AUTHORIZED);
    };
    if shared.fail_cart_writes.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "cart service unavailable" })),
        );
    }
    let Some(key) = cart_key(&body) else {
        return rejected("itemId and size are required");
    };

    shared
        .carts
        .write()
        .await
        .entry(email)
        .or_default()
        .increment(&key);
    ok(json!({ "success": true, "message": "Added To Cart" }))
}

async fn cart_update(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared.record("/api/cart/update", &headers, body.clone()).await;
    let Some(email) = shared.user_for(&headers).await else {
        return rejected(NOT_AUTHORIZED);
    };
    if shared.fail_cart_writes.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "cart service unavailable" })),
        );
    }
    let (Some(key), Some(quantity)) = (cart_key(&body), body.get("quantity").and_then(Value::as_i64))
    else {
        return rejected("itemId, size and quantity are required");
    };

    shared
        .carts
        .write()
        .await
        .entry(email)
        .or_default()
        .set_quantity(&key, quantity);
    ok(json!({ "success": true, "message": "Cart Updated" }))
}

async fn cart_get(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared.record("/api/cart/get", &headers, body).await;
    let Some(email) = shared.user_for(&headers).await else {
        return rejected(NOT_AUTHORIZED);
    };
    let cart = shared
        .carts
        .read()
        .await
        .get(&email)
        .cloned()
        .unwrap_or_default();
    ok(json!({ "success": true, "cartData": cart }))
}

async fn login(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared.record("/api/user/login", &headers, body.clone()).await;
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    let known = shared.users.read().await.get(email).cloned();
    match known {
        Some(expected) if expected == password => {
            let token = shared.issue_token(email).await;
            ok(json!({ "success": true, "token": token }))
        }
        Some(_) => rejected("Invalid credentials"),
        None => rejected("User doesn't exists"),
    }
}

async fn register(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared.record("/api/user/register", &headers, body.clone()).await;
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();
    if password.len() < 8 {
        return rejected("Please enter a strong password");
    }

    let mut users = shared.users.write().await;
    if users.contains_key(email) {
        return rejected("User already exists");
    }
    users.insert(email.to_string(), password.to_string());
    drop(users);

    let token = shared.issue_token(email).await;
    ok(json!({ "success": true, "token": token }))
}

async fn verify_stripe(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    shared
        .record("/api/order/verifyStripe", &headers, body.clone())
        .await;
    let Some(email) = shared.user_for(&headers).await else {
        return rejected(NOT_AUTHORIZED);
    };

    if body.get("success").and_then(Value::as_str) == Some("true") {
        shared.carts.write().await.remove(&email);
        ok(json!({ "success": true }))
    } else {
        ok(json!({ "success": false }))
    }
}
