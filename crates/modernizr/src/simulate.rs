//! Phase walkthroughs against in-memory stores.

use std::sync::Arc;

use serde::Serialize;

use modernizr_core::migration::{
    FeatureFlags, MigrationPhase, ReadRoute, RepositoryPlan, WritePlan, WritePolicy,
};
use modernizr_core::models::{
    CreateCategoryRequest, CreateProductRequest, CreateUserRequest, OrderStatus, UpdateUserRequest,
};
use modernizr_core::storage::{
    CategoryRepository, EntityId, Identity, OrderRepository, ProductRepository, Result,
    ShoppingCartRepository, UserRepository,
};

use crate::config::Config;
use crate::factory::RepositoryFactory;
use crate::flags::FeatureFlagStore;
use crate::storage::dual_write::DualStoreSettings;
use crate::storage::inmemory::{InMemoryAdapters, InMemoryRepository};
use crate::storage::journal::{FailedWrite, JournalStats};

/// Routing for one phase, as the factory and wrappers would resolve it.
#[derive(Debug, Clone, Serialize)]
pub struct PhasePlan {
    pub phase: MigrationPhase,
    pub description: &'static str,
    pub flags: FeatureFlags,
    pub plan: RepositoryPlan,
    pub read: ReadRoute,
    pub write: WritePlan,
}

/// Resolves the routing table for every phase.
pub fn phase_table(settings: DualStoreSettings) -> Vec<PhasePlan> {
    MigrationPhase::ALL
        .into_iter()
        .map(|phase| {
            let flags = FeatureFlags::for_phase(phase);
            PhasePlan {
                phase,
                description: phase.description(),
                flags,
                plan: RepositoryPlan::for_phase(phase),
                read: ReadRoute::for_flags(&flags, settings.default_store),
                write: WritePlan::for_flags(
                    &flags,
                    settings.default_store,
                    settings.authoritative,
                ),
            }
        })
        .collect()
}

/// Where one simulated record ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub entity: &'static str,
    pub id: EntityId,
    pub relational: bool,
    pub distributed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub phase: MigrationPhase,
    pub policy: WritePolicy,
    pub flags: FeatureFlags,
    pub plan: RepositoryPlan,
    pub placements: Vec<Placement>,
    pub journal: JournalStats,
    pub failed_writes: Vec<FailedWrite>,
}

/// Runs a create/update/read scenario for every entity in `config`'s phase.
pub async fn run(config: &Config) -> Result<SimulationReport> {
    let adapters = Arc::new(InMemoryAdapters::new());
    let flags = FeatureFlagStore::with_phase(config.migration_phase);
    let factory = RepositoryFactory::new(Arc::clone(&adapters), flags.clone(), config);

    tracing::info!(
        phase = config.migration_phase.number(),
        policy = %config.write_policy,
        plan = ?factory.plan(),
        "Starting simulation"
    );

    let users = factory.create_user_repository();
    let seller = users
        .create_user(
            &CreateUserRequest::new("sam", "sam@example.com", "$2b$10$seller")
                .with_name("Sam", "Seller"),
            Identity::Generate,
        )
        .await?;
    users.upgrade_to_seller(seller.id).await?;
    let shopper = users
        .create_user(
            &CreateUserRequest::new("sue", "sue@example.com", "$2b$10$shopper"),
            Identity::Generate,
        )
        .await?;
    let changes = UpdateUserRequest {
        first_name: Some("Sue".to_string()),
        ..UpdateUserRequest::default()
    };
    users.update_user(shopper.id, &changes).await?;

    let categories = factory.create_category_repository();
    let books = categories
        .create_category(&CreateCategoryRequest::root("Books"), Identity::Generate)
        .await?;

    let products = factory.create_product_repository();
    let request = CreateProductRequest {
        name: "The Rust Programming Language".to_string(),
        description: Some("Hardcover edition".to_string()),
        category_id: books.id,
        price_cents: 3_999,
        inventory_quantity: 25,
    };
    let product = products
        .create_product(seller.id, &request, Identity::Generate)
        .await?;
    products.reduce_inventory(product.id, 1).await?;

    let orders = factory.create_order_repository();
    let order = orders
        .create_order(shopper.id, product.price_cents, Identity::Generate)
        .await?;
    orders
        .create_order_item(order.id, product.id, 1, product.price_cents, Identity::Generate)
        .await?;
    orders
        .update_order_status(order.id, OrderStatus::Completed)
        .await?;

    let carts = factory.create_shopping_cart_repository();
    carts
        .add_item(shopper.id, product.id, 2, Identity::Generate)
        .await?;

    // Routed reads; shadowed and validated in phase 3.
    users.find_by_id(seller.id).await?;
    products.get_product(product.id).await?;
    orders.get_order(order.id).await?;
    carts.cart_items(shopper.id).await?;

    // Queued mirrors must land before the stores are inspected.
    factory.shutdown().await;

    let mut placements = Vec::new();
    for (entity, id) in [("User", seller.id), ("User", shopper.id)] {
        placements.push(
            placement(&adapters, entity, id, |repo, id| async move {
                UserRepository::find_by_id(repo.as_ref(), id)
                    .await
                    .map(|user| user.is_some())
            })
            .await?,
        );
    }
    placements.push(
        placement(&adapters, "Category", books.id, |repo, id| async move {
            CategoryRepository::find_by_id(repo.as_ref(), id)
                .await
                .map(|category| category.is_some())
        })
        .await?,
    );
    placements.push(
        placement(&adapters, "Product", product.id, |repo, id| async move {
            repo.get_product(id).await.map(|product| product.is_some())
        })
        .await?,
    );
    placements.push(
        placement(&adapters, "Order", order.id, |repo, id| async move {
            repo.get_order(id).await.map(|order| order.is_some())
        })
        .await?,
    );
    placements.push(
        placement(&adapters, "ShoppingCart", shopper.id, |repo, id| async move {
            repo.cart_item_count(id).await.map(|count| count > 0)
        })
        .await?,
    );

    let report = SimulationReport {
        phase: config.migration_phase,
        policy: config.write_policy,
        flags: flags.snapshot(),
        plan: factory.plan(),
        placements,
        journal: factory.journal().stats(),
        failed_writes: factory.journal().failed_writes(),
    };
    tracing::info!(journal = ?report.journal, "Simulation finished");
    Ok(report)
}

async fn placement<F, Fut>(
    adapters: &InMemoryAdapters,
    entity: &'static str,
    id: EntityId,
    present: F,
) -> Result<Placement>
where
    F: Fn(Arc<InMemoryRepository>, EntityId) -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    Ok(Placement {
        entity,
        id,
        relational: present(Arc::clone(&adapters.relational), id).await?,
        distributed: present(Arc::clone(&adapters.distributed), id).await?,
    })
}
