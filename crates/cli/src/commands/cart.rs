//! Cart commands.
//!
//! Each command waits for its remote write before exiting so nothing is lost
//! when the process ends.

use rust_decimal::Decimal;
use shopfront_core::{ProductId, Size};
use shopfront_storefront::{ShopState, SyncOutcome};

/// Print the cart and its totals.
#[allow(clippy::print_stdout)]
pub fn show(state: &ShopState) {
    let cart = state.cart();
    let catalog = state.catalog();

    if cart.count() == 0 {
        println!("Your cart is empty.");
        return;
    }

    for line in cart.active_lines() {
        let (name, line_total) = catalog.get(line.product_id.as_str()).map_or_else(
            || ("(unavailable)".to_string(), None),
            |product| {
                (
                    product.name.clone(),
                    Some(product.price.times(line.quantity.unsigned_abs())),
                )
            },
        );
        let amount = line_total.map_or_else(|| "-".to_string(), |total| state.format_amount(total));
        println!(
            "{:<26} {:<4} x{:<3} {:>10}  {name}",
            line.product_id.as_str(),
            line.size.as_str(),
            line.quantity,
            amount
        );
    }

    if let Some(summary) = state.cart_summary() {
        println!();
        print_total(state, "Subtotal", summary.subtotal);
        print_total(state, "Shipping", summary.delivery_fee);
        print_total(state, "Total", summary.total);
    }
    if state.needs_reconcile() {
        println!("(cart may be out of date with the server)");
    }
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns an error if no size was given.
#[allow(clippy::print_stdout)]
pub async fn add(
    state: &ShopState,
    id: &ProductId,
    size: Option<&str>,
) -> shopfront_storefront::Result<()> {
    if state.product(id.as_str()).is_none() {
        tracing::warn!(product_id = %id, "Product is not in the catalog");
    }

    let pending = state.add_to_cart(id, size)?;
    report(pending.wait().await);
    println!("Cart now holds {} item(s).", state.cart_count());
    Ok(())
}

/// Set the quantity of a product in a size.
///
/// # Errors
///
/// Returns an error if the size is blank.
#[allow(clippy::print_stdout)]
pub async fn update(
    state: &ShopState,
    id: &ProductId,
    size: &str,
    quantity: i64,
) -> shopfront_storefront::Result<()> {
    let size = Size::parse(Some(size))
        .map_err(|e| shopfront_storefront::AppError::BadRequest(e.to_string()))?;

    report(state.update_quantity(id, &size, quantity).wait().await);
    println!("Cart now holds {} item(s).", state.cart_count());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_total(state: &ShopState, label: &str, amount: Decimal) {
    println!("{label:<10} {:>10}", state.format_amount(amount));
}

fn report(outcome: SyncOutcome) {
    match outcome {
        SyncOutcome::Synced => tracing::debug!("Cart saved to the server"),
        SyncOutcome::LocalOnly => {
            tracing::info!("Not signed in; cart changes are kept for this command only");
        }
        SyncOutcome::Failed | SyncOutcome::Discarded => {
            tracing::warn!(?outcome, "Cart change was not saved to the server");
        }
    }
}
