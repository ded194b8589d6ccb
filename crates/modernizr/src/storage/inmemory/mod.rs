//! In-memory storage backend.
//!
//! [`InMemoryAdapters`] pairs two independent [`InMemoryRepository`]
//! instances, one standing in for each store, so the full migration flow can
//! run without external services.
//!
//! # Example
//!
//! ```rust,ignore
//! use modernizr::storage::inmemory::InMemoryAdapters;
//!
//! let adapters = InMemoryAdapters::new();
//! adapters.distributed.inject_write_failures(true);
//! ```

mod repository;

pub use repository::InMemoryRepository;

use std::sync::Arc;

use modernizr_core::migration::StoreKind;
use modernizr_core::storage::{
    CategoryRepository, OrderRepository, ProductRepository, ShoppingCartRepository,
    UserRepository,
};

use crate::factory::StoreAdapters;

/// One in-memory repository per store.
#[derive(Debug, Clone)]
pub struct InMemoryAdapters {
    pub relational: Arc<InMemoryRepository>,
    pub distributed: Arc<InMemoryRepository>,
}

impl Default for InMemoryAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAdapters {
    pub fn new() -> Self {
        Self {
            relational: Arc::new(InMemoryRepository::new(StoreKind::Relational)),
            distributed: Arc::new(InMemoryRepository::new(StoreKind::Distributed)),
        }
    }

    pub fn get(&self, store: StoreKind) -> Arc<InMemoryRepository> {
        match store {
            StoreKind::Relational => Arc::clone(&self.relational),
            StoreKind::Distributed => Arc::clone(&self.distributed),
        }
    }
}

impl StoreAdapters for InMemoryAdapters {
    fn users(&self, store: StoreKind) -> Arc<dyn UserRepository> {
        self.get(store)
    }

    fn products(&self, store: StoreKind) -> Arc<dyn ProductRepository> {
        self.get(store)
    }

    fn categories(&self, store: StoreKind) -> Arc<dyn CategoryRepository> {
        self.get(store)
    }

    fn orders(&self, store: StoreKind) -> Arc<dyn OrderRepository> {
        self.get(store)
    }

    fn carts(&self, store: StoreKind) -> Arc<dyn ShoppingCartRepository> {
        self.get(store)
    }
}
