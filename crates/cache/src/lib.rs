//! Cache layer for product lookups.
//!
//! This crate provides:
//! - The [`Cache`] trait with typed JSON helpers in [`CacheExt`]
//! - An in-memory TTL cache and a Redis cache
//! - [`CacheProvider`], which picks a backend at startup
//! - The `product:<id>` key scheme

pub mod cache;
pub mod error;
pub mod keys;
pub mod memory;
pub mod provider;
pub mod redis;

pub use cache::{Cache, CacheExt};
pub use error::{CacheError, Result};
pub use keys::{PRODUCT_TTL, product_key};
pub use memory::InMemoryCache;
pub use provider::CacheProvider;
pub use self::redis::RedisCache;
