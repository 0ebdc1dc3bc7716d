//! Persistence layer for the catalog backend.
//!
//! The store traits hide whether data lives in PostgreSQL or in memory;
//! listing requests are translated into a [`ProductQuery`] and a
//! [`PageRequest`] before they reach either implementation.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{MAX_PAGE_SIZE, Page, PageRequest, ProductQuery, Sort, SortDirection, SortField};
pub use store::{CartStore, CatalogStore, CatalogStoreExt, OrderStore, ProductRow};
