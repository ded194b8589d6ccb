use async_trait::async_trait;
use futures_util::FutureExt;

use modernizr_core::models::{Category, CreateCategoryRequest, UpdateCategoryRequest};
use modernizr_core::storage::{CategoryRepository, EntityId, Identity, Result};

use super::{applied, DualStore};

/// Category repository that writes to both stores and routes reads by phase.
///
/// The tree-walking operations (`category_path`, `would_create_cycle`, ...)
/// use the trait's provided methods, so every hop is itself a routed read.
pub struct DualWriteCategoryRepository<R: ?Sized = dyn CategoryRepository> {
    store: DualStore<R>,
}

impl<R: CategoryRepository + ?Sized + 'static> DualWriteCategoryRepository<R> {
    pub fn new(store: DualStore<R>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: CategoryRepository + ?Sized + 'static> CategoryRepository
    for DualWriteCategoryRepository<R>
{
    async fn find_all(&self) -> Result<Vec<Category>> {
        self.store
            .read("find_all", String::from("*"), |repo| {
                async move { repo.find_all().await }.boxed()
            })
            .await
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Category>> {
        self.store
            .read("find_by_id", id.to_string(), |repo| {
                async move { repo.find_by_id(id).await }.boxed()
            })
            .await
    }

    async fn find_by_parent(&self, parent_id: Option<EntityId>) -> Result<Vec<Category>> {
        let key = parent_id.map_or_else(|| String::from("root"), |id| id.to_string());
        self.store
            .read("find_by_parent", key, |repo| {
                async move { repo.find_by_parent(parent_id).await }.boxed()
            })
            .await
    }

    async fn create_category(
        &self,
        request: &CreateCategoryRequest,
        identity: Identity,
    ) -> Result<Category> {
        let mirrored = request.clone();
        self.store
            .write(
                "create_category",
                request.name.clone(),
                |repo| async move { repo.create_category(request, identity).await }.boxed(),
                move |repo, category: &Category| {
                    let identity = Identity::assigned(category.id, category.created_at);
                    async move { applied(repo.create_category(&mirrored, identity).await) }.boxed()
                },
            )
            .await
    }

    async fn update_category(
        &self,
        id: EntityId,
        changes: &UpdateCategoryRequest,
    ) -> Result<Option<Category>> {
        let mirrored = changes.clone();
        self.store
            .write(
                "update_category",
                id.to_string(),
                |repo| async move { repo.update_category(id, changes).await }.boxed(),
                move |repo, _: &Option<Category>| {
                    async move { applied(repo.update_category(id, &mirrored).await) }.boxed()
                },
            )
            .await
    }

    async fn delete_category(&self, id: EntityId) -> Result<bool> {
        self.store
            .write(
                "delete_category",
                id.to_string(),
                |repo| async move { repo.delete_category(id).await }.boxed(),
                move |repo, _: &bool| async move { repo.delete_category(id).await }.boxed(),
            )
            .await
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<EntityId>) -> Result<bool> {
        self.store
            .read("exists_by_name", name.to_string(), |repo| {
                async move { repo.exists_by_name(name, exclude_id).await }.boxed()
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

    #[tokio::test]
    async fn test_tree_walks_are_routed_reads() {
        let adapters = Arc::new(InMemoryAdapters::new());
        let flags = FeatureFlagStore::with_phase(MigrationPhase::DualRead);
        let config = Config {
            migration_phase: MigrationPhase::DualRead,
            default_store: StoreKind::Relational,
            authoritative_store: StoreKind::Relational,
            write_policy: Default::default(),
            replication_log_max_size: 10,
        };
        let factory = RepositoryFactory::new(Arc::clone(&adapters), flags, &config);
        let repo = factory.create_category_repository();

        let root = repo
            .create_category(&CreateCategoryRequest::root("Garden"), Identity::Generate)
            .await
            .unwrap();
        let child = repo
            .create_category(&CreateCategoryRequest::child("Tools", root.id), Identity::Generate)
            .await
            .unwrap();

        let path = repo.category_path(child.id).await.unwrap();
        assert_eq!(path, vec![root, child]);

        let stats = factory.journal().stats();
        assert_eq!(stats.shadow_reads, 2);
        assert_eq!(stats.validation_mismatches, 0);
    }
}
