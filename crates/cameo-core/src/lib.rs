//! Core types, store traits and aggregation algorithms for cameo.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! algorithms here are pure functions over appearance records; memoization
//! and I/O live in `cameo-engine` and the store backends.

// Store impls use native `async fn`; the trait signatures spell out `Send`.
#![allow(async_fn_in_trait)]

pub mod annotate;
pub mod appearance;
pub mod dataset;
pub mod error;
pub mod feed;
pub mod graph;
pub mod index;
pub mod media;
pub mod memory;
pub mod person;
pub mod select;
pub mod store;

pub use error::{Error, Result};
