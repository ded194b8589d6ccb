//! Phase-aware construction of entity repositories.

use std::sync::Arc;

use modernizr_core::migration::{RepositoryPlan, StoreKind};
use modernizr_core::storage::{
    CategoryRepository, OrderRepository, ProductRepository, ShoppingCartRepository,
    UserRepository,
};

use crate::config::Config;
use crate::flags::FeatureFlagStore;
use crate::storage::dual_write::{
    DualStore, DualStoreSettings, DualWriteCategoryRepository, DualWriteOrderRepository,
    DualWriteProductRepository, DualWriteShoppingCartRepository, DualWriteUserRepository,
    MirrorQueue, RepositoryPair,
};
use crate::storage::journal::ReplicationJournal;

/// Source of concrete store adapters, one per entity and store.
pub trait StoreAdapters: Send + Sync {
    fn users(&self, store: StoreKind) -> Arc<dyn UserRepository>;
    fn products(&self, store: StoreKind) -> Arc<dyn ProductRepository>;
    fn categories(&self, store: StoreKind) -> Arc<dyn CategoryRepository>;
    fn orders(&self, store: StoreKind) -> Arc<dyn OrderRepository>;
    fn carts(&self, store: StoreKind) -> Arc<dyn ShoppingCartRepository>;
}

/// Builds entity repositories for the current migration phase.
///
/// Nothing is cached: each `create_*` call consults the flags, so a phase
/// change is visible to the very next call. Wrappers built earlier keep
/// following the flags per operation but never turn into single-store
/// adapters.
pub struct RepositoryFactory<A: StoreAdapters> {
    adapters: Arc<A>,
    flags: FeatureFlagStore,
    settings: DualStoreSettings,
    journal: Arc<ReplicationJournal>,
    queue: Arc<MirrorQueue>,
}

impl<A: StoreAdapters> RepositoryFactory<A> {
    pub fn new(adapters: Arc<A>, flags: FeatureFlagStore, config: &Config) -> Self {
        let journal = Arc::new(ReplicationJournal::new(config.replication_log_max_size));
        Self {
            adapters,
            flags,
            settings: config.dual_store_settings(),
            queue: Arc::new(MirrorQueue::new(Arc::clone(&journal))),
            journal,
        }
    }

    /// Sets the store used in phase 1.
    pub fn initialize(&mut self, store: StoreKind) {
        self.settings.default_store = store;
        tracing::info!(store = %store, "Repository factory initialized");
    }

    pub fn flags(&self) -> &FeatureFlagStore {
        &self.flags
    }

    pub fn journal(&self) -> &Arc<ReplicationJournal> {
        &self.journal
    }

    pub fn settings(&self) -> DualStoreSettings {
        self.settings
    }

    /// Waits for every queued secondary write submitted so far.
    pub async fn flush_mirrors(&self) {
        self.queue.flush().await;
    }

    /// Drains queued secondary writes and stops the mirror worker.
    ///
    /// Queued mirrors submitted afterwards are journaled as failed.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
        tracing::info!(journal = ?self.journal.stats(), "Repository factory shut down");
    }

    /// Resolves the plan for the current phase.
    pub fn plan(&self) -> RepositoryPlan {
        RepositoryPlan::for_phase(self.flags.migration_phase())
    }

    pub fn create_user_repository(&self) -> Arc<dyn UserRepository> {
        match self.plan() {
            RepositoryPlan::SingleStore(store) => self.adapters.users(store),
            RepositoryPlan::DualStore => Arc::new(DualWriteUserRepository::new(
                self.dual_store("User", |a, s| a.users(s)),
            )),
        }
    }

    pub fn create_product_repository(&self) -> Arc<dyn ProductRepository> {
        match self.plan() {
            RepositoryPlan::SingleStore(store) => self.adapters.products(store),
            RepositoryPlan::DualStore => Arc::new(DualWriteProductRepository::new(
                self.dual_store("Product", |a, s| a.products(s)),
            )),
        }
    }

    pub fn create_category_repository(&self) -> Arc<dyn CategoryRepository> {
        match self.plan() {
            RepositoryPlan::SingleStore(store) => self.adapters.categories(store),
            RepositoryPlan::DualStore => Arc::new(DualWriteCategoryRepository::new(
                self.dual_store("Category", |a, s| a.categories(s)),
            )),
        }
    }

    pub fn create_order_repository(&self) -> Arc<dyn OrderRepository> {
        match self.plan() {
            RepositoryPlan::SingleStore(store) => self.adapters.orders(store),
            RepositoryPlan::DualStore => Arc::new(DualWriteOrderRepository::new(
                self.dual_store("Order", |a, s| a.orders(s)),
            )),
        }
    }

    pub fn create_shopping_cart_repository(&self) -> Arc<dyn ShoppingCartRepository> {
        match self.plan() {
            RepositoryPlan::SingleStore(store) => self.adapters.carts(store),
            RepositoryPlan::DualStore => Arc::new(DualWriteShoppingCartRepository::new(
                self.dual_store("ShoppingCart", |a, s| a.carts(s)),
            )),
        }
    }

    fn dual_store<R: ?Sized + Send + Sync + 'static>(
        &self,
        entity: &'static str,
        adapter: impl Fn(&A, StoreKind) -> Arc<R>,
    ) -> DualStore<R> {
        let stores = RepositoryPair::new(
            adapter(&self.adapters, StoreKind::Relational),
            adapter(&self.adapters, StoreKind::Distributed),
        );
        DualStore::new(
            entity,
            stores,
            self.flags.clone(),
            self.settings,
            Arc::clone(&self.journal),
            Arc::clone(&self.queue),
        )
    }
}
