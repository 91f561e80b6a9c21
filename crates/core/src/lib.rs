//! Oferta Core - Shared types library.
//!
//! This crate provides common types used across the Oferta feed
//! components:
//! - `feed` - Product feed cache and gateway client
//! - `integration-tests` - End-to-end feed tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This
//! keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
