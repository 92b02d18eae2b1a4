//! Catalog browsing commands.

use shopfront_core::{CatalogFilter, Product, ProductId};
use shopfront_storefront::ShopState;

/// Number of related products shown under a product.
const RELATED_LIMIT: usize = 4;

/// Number of bestsellers listed.
const BESTSELLER_LIMIT: usize = 5;

/// Which slice of the catalog to list.
pub enum Listing {
    Filtered(CatalogFilter),
    Bestsellers,
    Latest(usize),
}

/// Print a product listing.
#[allow(clippy::print_stdout)]
pub fn products(state: &ShopState, listing: &Listing) {
    let catalog = state.catalog();
    let products = match listing {
        Listing::Filtered(filter) => catalog.filter(filter),
        Listing::Bestsellers => catalog.bestsellers(BESTSELLER_LIMIT),
        Listing::Latest(limit) => catalog.latest(*limit),
    };

    if products.is_empty() {
        println!("No products found.");
        return;
    }
    for product in products {
        println!("{}", summary_line(state, product));
    }
}

/// Print one product with its sizes and related items.
///
/// # Errors
///
/// Returns an error if the product is not cached and cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn product(state: &ShopState, id: &ProductId) -> shopfront_storefront::Result<()> {
    let product = state.product_details(id).await?;

    println!("{}", product.name);
    println!("  price:    {}", product.price.display(&state.settings().currency));
    println!("  category: {} / {}", product.category, product.sub_category);
    let sizes: Vec<&str> = product.sizes.iter().map(|s| s.as_str()).collect();
    println!("  sizes:    {}", sizes.join(", "));
    if product.bestseller {
        println!("  bestseller");
    }
    for image in product.gallery() {
        println!("  image:    {image}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }

    let catalog = state.catalog();
    let related = catalog.related(id.as_str(), RELATED_LIMIT);
    if !related.is_empty() {
        println!();
        println!("Related products:");
        for item in related {
            println!("{}", summary_line(state, item));
        }
    }
    Ok(())
}

fn summary_line(state: &ShopState, product: &Product) -> String {
    format!(
        "{:<26} {:>10}  {}",
        product.id.as_str(),
        product.price.display(&state.settings().currency),
        product.name
    )
}
