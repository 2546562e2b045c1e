//! Balance Botanica Core - Shared domain types.
//!
//! This crate provides the types used across the Balance Botanica workspace:
//! - `storefront` - JSON API for the shop (orders, products, users, sessions)
//! - `cli` - Maintenance commands that operate on the shop database
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Storage rows are mapped onto these types by the
//! storefront repositories.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phone numbers, prices and
//!   order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
