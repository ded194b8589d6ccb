use async_trait::async_trait;
use futures_util::FutureExt;

use modernizr_core::models::{CreateProductRequest, Product, ProductFilters, UpdateProductRequest};
use modernizr_core::storage::{EntityId, Identity, Page, PageRequest, ProductRepository, Result};

use super::{applied, DualStore};

/// Product repository that writes to both stores and routes reads by phase.
pub struct DualWriteProductRepository<R: ?Sized = dyn ProductRepository> {
    store: DualStore<R>,
}

impl<R: ProductRepository + ?Sized + 'static> DualWriteProductRepository<R> {
    pub fn new(store: DualStore<R>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: ProductRepository + ?Sized + 'static> ProductRepository for DualWriteProductRepository<R> {
    async fn create_product(
        &self,
        seller_id: EntityId,
        request: &CreateProductRequest,
        identity: Identity,
    ) -> Result<Product> {
        let mirrored = request.clone();
        self.store
            .write(
                "create_product",
                format!("{seller_id}/{}", request.name),
                |repo| async move { repo.create_product(seller_id, request, identity).await }.boxed(),
                move |repo, product: &Product| {
                    let identity = Identity::assigned(product.id, product.created_at);
                    async move {
                        applied(repo.create_product(seller_id, &mirrored, identity).await)
                    }
                    .boxed()
                },
            )
            .await
    }

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>> {
        self.store
            .read("get_product", id.to_string(), |repo| {
                async move { repo.get_product(id).await }.boxed()
            })
            .await
    }

    async fn update_product(
        &self,
        id: EntityId,
        seller_id: EntityId,
        changes: &UpdateProductRequest,
    ) -> Result<Option<Product>> {
        let mirrored = changes.clone();
        self.store
            .write(
                "update_product",
                id.to_string(),
                |repo| async move { repo.update_product(id, seller_id, changes).await }.boxed(),
                move |repo, _: &Option<Product>| {
                    async move { applied(repo.update_product(id, seller_id, &mirrored).await) }
                        .boxed()
                },
            )
            .await
    }

    async fn delete_product(&self, id: EntityId, seller_id: EntityId) -> Result<bool> {
        self.store
            .write(
                "delete_product",
                id.to_string(),
                |repo| async move { repo.delete_product(id, seller_id).await }.boxed(),
                move |repo, _: &bool| async move { repo.delete_product(id, seller_id).await }.boxed(),
            )
            .await
    }

    async fn list_products(
        &self,
        filters: &ProductFilters,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.store
            .read("list_products", format!("page {}", page.page), |repo| {
                async move { repo.list_products(filters, page).await }.boxed()
            })
            .await
    }

    async fn products_by_seller(
        &self,
        seller_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.store
            .read("products_by_seller", seller_id.to_string(), |repo| {
                async move { repo.products_by_seller(seller_id, page).await }.boxed()
            })
            .await
    }

    async fn products_by_category(
        &self,
        category_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.store
            .read("products_by_category", category_id.to_string(), |repo| {
                async move { repo.products_by_category(category_id, page).await }.boxed()
            })
            .await
    }

    async fn search_products(&self, term: &str, page: PageRequest) -> Result<Page<Product>> {
        self.store
            .read("search_products", term.to_string(), |repo| {
                async move { repo.search_products(term, page).await }.boxed()
            })
            .await
    }

    async fn update_inventory(&self, id: EntityId, quantity: u32) -> Result<bool> {
        self.store
            .write(
                "update_inventory",
                id.to_string(),
                |repo| async move { repo.update_inventory(id, quantity).await }.boxed(),
                move |repo, _: &bool| async move { repo.update_inventory(id, quantity).await }.boxed(),
            )
            .await
    }

    async fn reduce_inventory(&self, id: EntityId, quantity: u32) -> Result<bool> {
        self.store
            .write(
                "reduce_inventory",
                id.to_string(),
                |repo| async move { repo.reduce_inventory(id, quantity).await }.boxed(),
                move |repo, _: &bool| async move { repo.reduce_inventory(id, quantity).await }.boxed(),
            )
            .await
    }

    async fn has_inventory(&self, id: EntityId, required: u32) -> Result<bool> {
        self.store
            .read("has_inventory", id.to_string(), |repo| {
                async move { repo.has_inventory(id, required).await }.boxed()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use modernizr_core::migration::{MigrationPhase, StoreKind};

    use super::*;
    use crate::config::Config;
    use crate::factory::RepositoryFactory;
    use crate::flags::FeatureFlagStore;
    use crate::storage::inmemory::InMemoryAdapters;

    fn setup() -> (RepositoryFactory<InMemoryAdapters>, Arc<InMemoryAdapters>) {
        let adapters = Arc::new(InMemoryAdapters::new());
        let flags = FeatureFlagStore::with_phase(MigrationPhase::DualWrite);
        let config = Config {
            migration_phase: MigrationPhase::DualWrite,
            default_store: StoreKind::Relational,
            authoritative_store: StoreKind::Relational,
            write_policy: Default::default(),
            replication_log_max_size: 10,
        };
        (RepositoryFactory::new(Arc::clone(&adapters), flags, &config), adapters)
    }

    fn lamp() -> CreateProductRequest {
        CreateProductRequest {
            name: "Lamp".to_string(),
            description: None,
            category_id: 1,
            price_cents: 4_500,
            inventory_quantity: 2,
        }
    }

    #[tokio::test]
    async fn test_non_owner_update_is_not_mirrored() {
        let (factory, adapters) = setup();
        let repo = factory.create_product_repository();
        let product = repo.create_product(7, &lamp(), Identity::Generate).await.unwrap();

        let changes = UpdateProductRequest {
            name: Some("Stolen".to_string()),
            ..UpdateProductRequest::default()
        };
        assert_eq!(repo.update_product(product.id, 8, &changes).await.unwrap(), None);

        let mirrored = adapters.distributed.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(mirrored.name, "Lamp");
        assert_eq!(factory.journal().stats().secondary_writes, 1);
    }

    #[tokio::test]
    async fn test_inventory_changes_reach_both_stores() {
        let (factory, adapters) = setup();
        let repo = factory.create_product_repository();
        let product = repo.create_product(7, &lamp(), Identity::Generate).await.unwrap();

        assert!(repo.reduce_inventory(product.id, 2).await.unwrap());
        assert!(!repo.reduce_inventory(product.id, 1).await.unwrap());

        for store in [StoreKind::Relational, StoreKind::Distributed] {
            assert!(!adapters.get(store).has_inventory(product.id, 1).await.unwrap());
        }
        assert_eq!(factory.journal().stats().secondary_failures, 0);
    }
}
