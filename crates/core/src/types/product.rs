//! Product records owned by the remote catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, ProductId, Size};

/// A product as listed by the catalog service.
///
/// Products are immutable on the client. Only `_id`, `name` and `price` are
/// required on the wire; the remaining fields default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    /// Sizes on offer, in display order.
    #[serde(default)]
    pub sizes: Vec<Size>,
    /// Image URLs, in display order.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub bestseller: bool,
    /// Creation time (epoch milliseconds on the wire).
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub date: Option<DateTime<Utc>>,
}

impl Product {
    /// Maximum number of images a product carries.
    pub const MAX_IMAGES: usize = 4;

    /// The image shown in listings, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Images capped at [`Self::MAX_IMAGES`].
    pub fn gallery(&self) -> impl Iterator<Item = &str> {
        self.images.iter().take(Self::MAX_IMAGES).map(String::as_str)
    }

    /// Whether the product is offered in `size`.
    #[must_use]
    pub fn offers_size(&self, size: &Size) -> bool {
        self.sizes.contains(size)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_deserialize_backend_document() {
        let json = r#"{
            "_id": "665f1a",
            "name": "Women Round Neck Cotton Top",
            "description": "A lightweight knit top",
            "price": 100,
            "category": "Women",
            "subCategory": "Topwear",
            "sizes": ["S", "M", "L"],
            "images": ["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"],
            "bestseller": true,
            "date": 1716325200000,
            "__v": 0
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "665f1a");
        assert_eq!(product.price.amount(), Decimal::from(100));
        assert_eq!(product.sub_category, "Topwear");
        assert_eq!(product.sizes.len(), 3);
        assert!(product.bestseller);
        assert_eq!(product.date.unwrap().timestamp_millis(), 1_716_325_200_000);
        assert_eq!(product.primary_image(), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_deserialize_minimal_document() {
        let product: Product =
            serde_json::from_str(r#"{"_id": "p1", "name": "Tee", "price": 20}"#).unwrap();
        assert!(product.sizes.is_empty());
        assert!(product.date.is_none());
        assert_eq!(product.primary_image(), None);
        assert!(!product.offers_size(&Size::from("M")));
    }

    #[test]
    fn test_gallery_is_capped() {
        let mut product: Product =
            serde_json::from_str(r#"{"_id": "p1", "name": "Tee", "price": 20}"#).unwrap();
        product.images = (0..6).map(|i| format!("https://cdn.example.com/{i}.png")).collect();
        assert_eq!(product.gallery().count(), Product::MAX_IMAGES);
    }
}
