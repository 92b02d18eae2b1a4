//! Shopfront Core - Domain types for the storefront client.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `storefront` - Client state container synchronised with the shop backend
//! - `cli` - Command-line front end over the state container
//!
//! # Architecture
//!
//! The core crate contains only types and pure derivations - no I/O, no HTTP
//! clients, no async. Cart totals and catalog queries live here so they can be
//! tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, sizes, prices, emails, products, catalog and cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
