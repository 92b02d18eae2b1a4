//! Sign-in, sign-out and token persistence across restarts.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use shopfront_core::{Cart, CartKey, ProductId, Size};
use shopfront_integration_tests::{FakeShop, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use shopfront_storefront::navigation::Route;
use shopfront_storefront::notify::NotificationLevel;
use shopfront_storefront::session::{FileTokenStore, TokenStore};
use shopfront_storefront::{AppError, BackendError, SyncOutcome};

#[tokio::test]
async fn test_login_persists_token_and_restart_restores_cart() {
    let shop = FakeShop::start().await;
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("session").join("token");
    let config = shop.config();

    let first = shop.client_with(&config, Arc::new(FileTokenStore::new(&token_path)));
    first.state.start().await;
    first
        .state
        .login(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap()
        .wait()
        .await;
    first
        .state
        .add_to_cart(&ProductId::new("tee-2"), Some("L"))
        .unwrap()
        .wait()
        .await;

    let persisted = std::fs::read_to_string(&token_path).unwrap();
    assert!(persisted.starts_with("token-"));

    let second = shop.client_with(&config, Arc::new(FileTokenStore::new(&token_path)));
    assert!(!second.state.is_authenticated());
    second.state.start().await;

    assert!(second.state.is_authenticated());
    assert_eq!(second.state.cart().quantity("tee-2", "L"), Some(1));
    let fetches = shop.requests_to("/api/cart/get").await;
    assert_eq!(fetches.last().unwrap().token.as_deref(), Some(persisted.as_str()));
}

#[tokio::test]
async fn test_restart_without_token_stays_signed_out() {
    let shop = FakeShop::start().await;
    let dir = tempfile::tempdir().unwrap();
    let config = shop.config();
    let client = shop.client_with(
        &config,
        Arc::new(FileTokenStore::new(dir.path().join("token"))),
    );

    client.state.start().await;

    assert!(!client.state.is_authenticated());
    assert!(shop.requests_to("/api/cart/get").await.is_empty());
}

#[tokio::test]
async fn test_empty_token_signs_out_and_forgets_it() {
    let shop = FakeShop::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileTokenStore::new(dir.path().join("token")));
    let client = shop.client_with(&shop.config(), store.clone());
    client.state.start().await;

    let token = shop.issue_token(SHOPPER_EMAIL).await;
    assert_eq!(client.state.set_token(&token).wait().await, SyncOutcome::Synced);
    client
        .state
        .add_to_cart(&ProductId::new("tee-1"), Some("S"))
        .unwrap()
        .wait()
        .await;
    assert!(store.path().exists());

    assert_eq!(client.state.set_token("  ").wait().await, SyncOutcome::LocalOnly);

    assert!(!client.state.is_authenticated());
    assert!(client.state.cart().is_empty());
    assert!(!store.path().exists());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_logout_clears_cart_and_goes_to_login() {
    let shop = FakeShop::start().await;
    let client = shop.client();
    client.state.start().await;
    client
        .state
        .login(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap()
        .wait()
        .await;
    client
        .state
        .add_to_cart(&ProductId::new("tee-1"), Some("S"))
        .unwrap()
        .wait()
        .await;

    client.state.logout();

    assert!(!client.state.is_authenticated());
    assert_eq!(client.state.cart_count(), 0);
    assert_eq!(client.navigator.routes(), vec![Route::Home, Route::Login]);
    assert_eq!(
        client.notifier.messages(NotificationLevel::Success),
        vec![
            "Logged in successfully!".to_string(),
            "Logged out successfully".to_string()
        ]
    );
    // The server keeps the cart for the next sign-in
    assert_eq!(shop.cart_of(SHOPPER_EMAIL).await.count(), 1);
}

#[tokio::test]
async fn test_wrong_password_is_reported() {
    let shop = FakeShop::start().await;
    let client = shop.client();
    client.state.start().await;

    let err = client
        .state
        .login(SHOPPER_EMAIL, "not-the-password")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Backend(BackendError::Rejected(_))));
    assert!(!client.state.is_authenticated());
    assert!(client.navigator.routes().is_empty());
    assert_eq!(
        client.notifier.messages(NotificationLevel::Error),
        vec!["Invalid credentials".to_string()]
    );
}

#[tokio::test]
async fn test_malformed_email_never_reaches_the_server() {
    let shop = FakeShop::start().await;
    let client = shop.client();

    let err = client.state.login("shopper", "whatever").await.unwrap_err();

    assert!(matches!(err, AppError::Email(_)));
    assert!(shop.requests_to("/api/user/login").await.is_empty());
    assert_eq!(client.notifier.messages(NotificationLevel::Error).len(), 1);
}

#[tokio::test]
async fn test_logout_during_cart_fetch_discards_late_response() {
    let shop = FakeShop::start().await;
    let mut saved = Cart::new();
    saved.set_quantity(&CartKey::new(ProductId::new("tee-3"), Size::from("S")), 4);
    shop.seed_cart(SHOPPER_EMAIL, saved).await;
    let client = shop.client();
    client.state.start().await;

    let token = shop.issue_token(SHOPPER_EMAIL).await;
    let fetch = client.state.set_token(&token);
    client.state.logout();

    let outcome = fetch.wait().await;
    // Either the fetch lost the race outright or it finished before logout
    // cleared the cart; the shopper is signed out with an empty cart both ways
    assert!(matches!(
        outcome,
        SyncOutcome::Discarded | SyncOutcome::Synced
    ));
    assert!(!client.state.is_authenticated());
    assert!(client.state.cart().is_empty());
}
