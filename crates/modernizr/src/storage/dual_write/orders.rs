use async_trait::async_trait;
use futures_util::FutureExt;

use modernizr_core::models::{Order, OrderItem, OrderStatus, OrderWithItems};
use modernizr_core::storage::{EntityId, Identity, OrderRepository, Result};

use super::{applied, DualStore};

/// Order repository that writes to both stores and routes reads by phase.
pub struct DualWriteOrderRepository<R: ?Sized = dyn OrderRepository> {
    store: DualStore<R>,
}

impl<R: OrderRepository + ?Sized + 'static> DualWriteOrderRepository<R> {
    pub fn new(store: DualStore<R>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: OrderRepository + ?Sized + 'static> OrderRepository for DualWriteOrderRepository<R> {
    async fn create_order(
        &self,
        user_id: EntityId,
        total_amount_cents: i64,
        identity: Identity,
    ) -> Result<Order> {
        self.store
            .write(
                "create_order",
                user_id.to_string(),
                |repo| {
                    async move { repo.create_order(user_id, total_amount_cents, identity).await }
                        .boxed()
                },
                move |repo, order: &Order| {
                    let identity = Identity::assigned(order.id, order.created_at);
                    async move {
                        applied(repo.create_order(user_id, total_amount_cents, identity).await)
                    }
                    .boxed()
                },
            )
            .await
    }

    async fn create_order_item(
        &self,
        order_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        price_at_time_cents: i64,
        identity: Identity,
    ) -> Result<OrderItem> {
        self.store
            .write(
                "create_order_item",
                format!("{order_id}/{product_id}"),
                |repo| {
                    async move {
                        repo.create_order_item(
                            order_id,
                            product_id,
                            quantity,
                            price_at_time_cents,
                            identity,
                        )
                        .await
                    }
                    .boxed()
                },
                move |repo, item: &OrderItem| {
                    // Order items carry no creation time of their own.
                    let identity = Identity::assigned(item.id, chrono::Utc::now());
                    async move {
                        applied(
                            repo.create_order_item(
                                order_id,
                                product_id,
                                quantity,
                                price_at_time_cents,
                                identity,
                            )
                            .await,
                        )
                    }
                    .boxed()
                },
            )
            .await
    }

    async fn get_order(&self, id: EntityId) -> Result<Option<OrderWithItems>> {
        self.store
            .read("get_order", id.to_string(), |repo| {
                async move { repo.get_order(id).await }.boxed()
            })
            .await
    }

    async fn user_orders(
        &self,
        user_id: EntityId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OrderWithItems>> {
        self.store
            .read("user_orders", user_id.to_string(), |repo| {
                async move { repo.user_orders(user_id, limit, offset).await }.boxed()
            })
            .await
    }

    async fn update_order_status(&self, id: EntityId, status: OrderStatus) -> Result<bool> {
        self.store
            .write(
                "update_order_status",
                id.to_string(),
                |repo| async move { repo.update_order_status(id, status).await }.boxed(),
                move |repo, _: &bool| async move { repo.update_order_status(id, status).await }.boxed(),
            )
            .await
    }

    async fn user_order_count(&self, user_id: EntityId) -> Result<u64> {
        self.store
            .read("user_order_count", user_id.to_string(), |repo| {
                async move { repo.user_order_count(user_id).await }.boxed()
            })
            .await
    }

    async fn orders_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<OrderWithItems>> {
        self.store
            .read("orders_by_status", status.to_string(), |repo| {
                async move { repo.orders_by_status(status, limit).await }.boxed()
            })
            .await
    }
}
