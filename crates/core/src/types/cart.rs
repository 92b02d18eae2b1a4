//! Shopping cart and its derived totals.
//!
//! The cart is a nested map `product id -> size -> quantity`, the same shape
//! the cart service stores and returns. Quantities are signed: the cart keeps
//! whatever absolute value a caller sets, and every derived query counts only
//! strictly positive quantities.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Catalog, ProductId, Size};

/// Identifies one cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: Size,
}

impl CartKey {
    #[must_use]
    pub const fn new(product_id: ProductId, size: Size) -> Self {
        Self { product_id, size }
    }
}

/// A single entry, borrowed from a [`Cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine<'a> {
    pub product_id: &'a ProductId,
    pub size: &'a Size,
    pub quantity: i64,
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: BTreeMap<ProductId, BTreeMap<Size, i64>>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cart holds no entries at all (including non-positive ones).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.values().all(BTreeMap::is_empty)
    }

    /// Add one unit of `key`, creating the entry if needed.
    ///
    /// Returns the new quantity.
    pub fn increment(&mut self, key: &CartKey) -> i64 {
        let quantity = self
            .items
            .entry(key.product_id.clone())
            .or_default()
            .entry(key.size.clone())
            .or_insert(0);
        *quantity = quantity.saturating_add(1);
        *quantity
    }

    /// Set the absolute quantity for `key`.
    ///
    /// No clamping is applied; zero and negative values are stored and
    /// simply contribute nothing to [`Self::count`] and [`Self::amount`].
    pub fn set_quantity(&mut self, key: &CartKey, quantity: i64) {
        self.items
            .entry(key.product_id.clone())
            .or_default()
            .insert(key.size.clone(), quantity);
    }

    /// Stored quantity for a product and size.
    #[must_use]
    pub fn quantity(&self, product_id: &str, size: &str) -> Option<i64> {
        self.items.get(product_id)?.get(size).copied()
    }

    /// Every stored entry, ordered by product id then size.
    pub fn lines(&self) -> impl Iterator<Item = CartLine<'_>> {
        self.items.iter().flat_map(|(product_id, sizes)| {
            sizes.iter().map(move |(size, &quantity)| CartLine {
                product_id,
                size,
                quantity,
            })
        })
    }

    /// Entries with a positive quantity.
    pub fn active_lines(&self) -> impl Iterator<Item = CartLine<'_>> {
        self.lines().filter(|line| line.quantity > 0)
    }

    /// Total number of units across all entries with a positive quantity.
    ///
    /// Saturates at `u64::MAX`.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.active_lines()
            .map(|line| line.quantity.unsigned_abs())
            .fold(0, u64::saturating_add)
    }

    /// Sum of `price * quantity` over positive entries.
    ///
    /// Products missing from `catalog` (not loaded yet, or deleted upstream)
    /// contribute nothing. Saturates at `Decimal::MAX`.
    #[must_use]
    pub fn amount(&self, catalog: &Catalog) -> Decimal {
        self.items
            .iter()
            .filter_map(|(product_id, sizes)| {
                let price = catalog.price_of(product_id.as_str())?;
                Some(
                    sizes
                        .values()
                        .filter(|&&quantity| quantity > 0)
                        .map(|&quantity| price.times(quantity.unsigned_abs()))
                        .fold(Decimal::ZERO, Decimal::saturating_add),
                )
            })
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }
}
