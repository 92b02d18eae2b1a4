//! Checkout totals, payment verification and account creation.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use shopfront_core::{OrderId, ProductId, Size};
use shopfront_integration_tests::{FakeShop, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use shopfront_storefront::navigation::Route;
use shopfront_storefront::notify::NotificationLevel;
use shopfront_storefront::{AppError, PaymentStatus};

async fn signed_in(shop: &FakeShop) -> shopfront_integration_tests::TestClient {
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
}

#[tokio::test]
async fn test_summary_adds_delivery_fee() {
    let shop = FakeShop::start().await;
    let client = shop.client();

    // Totals are withheld until the catalog has loaded
    assert!(client.state.cart_summary().is_none());
    client.state.start().await;

    let empty = client.state.cart_summary().unwrap();
    assert_eq!(empty.subtotal, Decimal::ZERO);
    assert_eq!(empty.total, Decimal::ZERO);

    client.state.add_to_cart(&ProductId::new("tee-1"), Some("S")).unwrap();
    client.state.add_to_cart(&ProductId::new("tee-1"), Some("M")).unwrap();
    client
        .state
        .update_quantity(&ProductId::new("tee-2"), &Size::from("L"), 2);

    let summary = client.state.cart_summary().unwrap();
    assert_eq!(summary.count, 4);
    assert_eq!(summary.subtotal, Decimal::from(600));
    assert_eq!(summary.delivery_fee, Decimal::from(10));
    assert_eq!(summary.total, Decimal::from(610));
    assert_eq!(client.state.format_amount(summary.total), "$610.00");
}

#[tokio::test]
async fn test_unknown_products_do_not_count_toward_amount() {
    let shop = FakeShop::start().await;
    let client = shop.client();
    client.state.start().await;

    client.state.add_to_cart(&ProductId::new("retired"), Some("M")).unwrap();
    client.state.add_to_cart(&ProductId::new("tee-3"), Some("M")).unwrap();

    assert_eq!(client.state.cart_count(), 2);
    assert_eq!(client.state.cart_amount(), Decimal::from(220));
}

#[tokio::test]
async fn test_verified_payment_clears_cart() {
    let shop = FakeShop::start().await;
    let client = signed_in(&shop).await;
    client
        .state
        .add_to_cart(&ProductId::new("tee-1"), Some("S"))
        .unwrap()
        .wait()
        .await;

    let status = client
        .state
        .verify_payment(true, OrderId::new("order-1"))
        .await;

    assert_eq!(status, PaymentStatus::Verified);
    assert!(client.state.cart().is_empty());
    assert!(shop.cart_of(SHOPPER_EMAIL).await.is_empty());
    assert_eq!(client.navigator.last(), Some(Route::Orders));
    assert!(
        client
            .notifier
            .messages(NotificationLevel::Success)
            .contains(&"Payment verified successfully!".to_string())
    );

    let request = shop.requests_to("/api/order/verifyStripe").await;
    assert_eq!(request[0].body["success"], "true");
    assert_eq!(request[0].body["orderId"], "order-1");
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let shop = FakeShop::start().await;
    let client = signed_in(&shop).await;
    client
        .state
        .add_to_cart(&ProductId::new("tee-2"), Some("M"))
        .unwrap()
        .wait()
        .await;

    let status = client
        .state
        .verify_payment(false, OrderId::new("order-2"))
        .await;

    assert_eq!(status, PaymentStatus::Declined);
    assert_eq!(client.state.cart_count(), 1);
    assert_eq!(client.navigator.last(), Some(Route::Cart));
    assert_eq!(
        client.notifier.messages(NotificationLevel::Error),
        vec!["Payment verification failed.".to_string()]
    );
}

#[tokio::test]
async fn test_payment_without_session_goes_to_login() {
    let shop = FakeShop::start().await;
    let client = shop.client();
    client.state.start().await;

    let status = client
        .state
        .verify_payment(true, OrderId::new("order-3"))
        .await;

    assert_eq!(status, PaymentStatus::SignInRequired);
    assert_eq!(client.navigator.routes(), vec![Route::Login]);
    assert!(shop.requests_to("/api/order/verifyStripe").await.is_empty());
}

#[tokio::test]
async fn test_register_then_login() {
    let shop = FakeShop::start().await;
    let client = shop.client();
    client.state.start().await;

    client
        .state
        .register("Ada", "ada@example.com", "correct-horse")
        .await
        .unwrap();

    // Registration does not sign in
    assert!(!client.state.is_authenticated());
    assert_eq!(client.navigator.last(), Some(Route::Login));
    assert_eq!(
        client.notifier.messages(NotificationLevel::Success),
        vec!["Account created successfully! Please log in.".to_string()]
    );

    client
        .state
        .login("ada@example.com", "correct-horse")
        .await
        .unwrap()
        .wait()
        .await;
    assert!(client.state.is_authenticated());
}

#[tokio::test]
async fn test_register_rejections_are_reported() {
    let shop = FakeShop::start().await;
    let client = shop.client();

    let duplicate = client
        .state
        .register("Shopper", SHOPPER_EMAIL, "long-enough-password")
        .await
        .unwrap_err();
    assert_eq!(
        duplicate.to_string(),
        "Backend error: Request rejected: User already exists"
    );

    let weak = client
        .state
        .register("Bob", "bob@example.com", "short")
        .await
        .unwrap_err();
    assert!(matches!(weak, AppError::Backend(_)));

    let nameless = client
        .state
        .register("   ", "carol@example.com", "long-enough-password")
        .await
        .unwrap_err();
    assert!(matches!(nameless, AppError::BadRequest(_)));

    assert_eq!(
        client.notifier.messages(NotificationLevel::Error),
        vec![
            "User already exists".to_string(),
            "Please enter a strong password".to_string(),
            "name is required".to_string(),
        ]
    );
    assert_eq!(shop.requests_to("/api/user/register").await.len(), 2);
}
