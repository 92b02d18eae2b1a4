//! Account and order commands.

use shopfront_core::OrderId;
use shopfront_storefront::{AppError, PaymentStatus, ShopState};

/// Sign in and fetch the server cart.
///
/// # Errors
///
/// Returns an error if the email is invalid or the credentials are refused.
#[allow(clippy::print_stdout)]
pub async fn login(state: &ShopState, email: &str, password: &str) -> shopfront_storefront::Result<()> {
    let fetch = state.login(email, password).await?;
    let outcome = fetch.wait().await;
    tracing::debug!(?outcome, "Cart fetched after login");
    println!("Cart holds {} item(s).", state.cart_count());
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns an error if the input is invalid or the backend refuses it.
pub async fn register(
    state: &ShopState,
    name: &str,
    email: &str,
    password: &str,
) -> shopfront_storefront::Result<()> {
    state.register(name, email, password).await
}

/// Sign out.
pub fn logout(state: &ShopState) {
    state.logout();
}

/// Relay a payment result.
///
/// # Errors
///
/// Returns an error unless the payment was verified.
pub async fn verify(
    state: &ShopState,
    success: bool,
    order_id: OrderId,
) -> shopfront_storefront::Result<()> {
    match state.verify_payment(success, order_id).await {
        PaymentStatus::Verified => Ok(()),
        PaymentStatus::SignInRequired => Err(AppError::BadRequest(
            "sign in before verifying a payment".to_string(),
        )),
        PaymentStatus::Declined | PaymentStatus::Failed => Err(AppError::BadRequest(
            "payment was not verified".to_string(),
        )),
    }
}
