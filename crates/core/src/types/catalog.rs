//! Locally cached product catalog and the queries run against it.

use std::collections::HashMap;

use super::{Price, Product, ProductId};

/// Ordering applied to filtered product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Catalog order as returned by the backend.
    #[default]
    Relevant,
    /// Cheapest first.
    PriceLowHigh,
    /// Most expensive first.
    PriceHighLow,
}

/// Filter for collection listings.
///
/// Empty category lists match every product. A product matches when its
/// category is one of `categories` and its sub-category one of
/// `sub_categories`.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub categories: Vec<String>,
    pub sub_categories: Vec<String>,
    /// Case-insensitive substring of the product name.
    pub query: Option<String>,
    pub sort: SortOrder,
}

impl CatalogFilter {
    fn matches(&self, product: &Product) -> bool {
        let category_ok = self.categories.is_empty()
            || self.categories.iter().any(|c| c == &product.category);
        let sub_category_ok = self.sub_categories.is_empty()
            || self.sub_categories.iter().any(|c| c == &product.sub_category);
        let query_ok = self
            .query
            .as_deref()
            .is_none_or(|query| name_matches(product, &query.to_lowercase()));

        category_ok && sub_category_ok && query_ok
    }
}

/// Snapshot of the product list with an id index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Build a catalog from the backend's product list.
    ///
    /// If the list repeats an id, lookups resolve to its first occurrence.
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        let mut index = HashMap::with_capacity(products.len());
        for (position, product) in products.iter().enumerate() {
            index.entry(product.id.clone()).or_insert(position);
        }
        Self { products, index }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Products in backend order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Look up a product by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.index.get(id).and_then(|&position| self.products.get(position))
    }

    /// Price of a product, if it is in the catalog.
    #[must_use]
    pub fn price_of(&self, id: &str) -> Option<Price> {
        self.get(id).map(|product| product.price)
    }

    /// Products whose name contains `query`, ignoring case.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.trim().to_lowercase();
        self.products
            .iter()
            .filter(|product| name_matches(product, &needle))
            .collect()
    }

    /// Apply a collection filter and sort.
    #[must_use]
    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&Product> {
        let mut listed: Vec<&Product> = self
            .products
            .iter()
            .filter(|product| filter.matches(product))
            .collect();

        match filter.sort {
            SortOrder::Relevant => {}
            SortOrder::PriceLowHigh => listed.sort_by_key(|product| product.price),
            SortOrder::PriceHighLow => {
                listed.sort_by(|a, b| b.price.cmp(&a.price));
            }
        }

        listed
    }

    /// Up to `limit` bestsellers in catalog order.
    #[must_use]
    pub fn bestsellers(&self, limit: usize) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| product.bestseller)
            .take(limit)
            .collect()
    }

    /// Up to `limit` products, newest first. Undated products sort last.
    #[must_use]
    pub fn latest(&self, limit: usize) -> Vec<&Product> {
        let mut listed: Vec<&Product> = self.products.iter().collect();
        listed.sort_by(|a, b| b.date.cmp(&a.date));
        listed.truncate(limit);
        listed
    }

    /// Up to `limit` products sharing the category and sub-category of `id`.
    ///
    /// Returns nothing if `id` is not in the catalog.
    #[must_use]
    pub fn related(&self, id: &str, limit: usize) -> Vec<&Product> {
        let Some(anchor) = self.get(id) else {
            return Vec::new();
        };

        self.products
            .iter()
            .filter(|product| {
                product.id != anchor.id
                    && product.category == anchor.category
                    && product.sub_category == anchor.sub_category
            })
            .take(limit)
            .collect()
    }
}

fn name_matches(product: &Product, lowercase_needle: &str) -> bool {
    lowercase_needle.is_empty() || product.name.to_lowercase().contains(lowercase_needle)
}
