//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod price;
pub mod product;
pub mod size;

pub use cart::{Cart, CartKey, CartLine};
pub use catalog::{Catalog, CatalogFilter, SortOrder};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use product::Product;
pub use size::{Size, SizeError};
