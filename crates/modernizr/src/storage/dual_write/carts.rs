use async_trait::async_trait;
use futures_util::FutureExt;

use modernizr_core::models::CartItem;
use modernizr_core::storage::{EntityId, Identity, Result, ShoppingCartRepository};

use super::{applied, DualStore};

/// Shopping cart repository that writes to both stores and routes reads by phase.
pub struct DualWriteShoppingCartRepository<R: ?Sized = dyn ShoppingCartRepository> {
    store: DualStore<R>,
}

impl<R: ShoppingCartRepository + ?Sized + 'static> DualWriteShoppingCartRepository<R> {
    pub fn new(store: DualStore<R>) -> Self {
        Self { store }
    }
}

fn line_key(user_id: EntityId, product_id: EntityId) -> String {
    format!("{user_id}-{product_id}")
}

#[async_trait]
impl<R: ShoppingCartRepository + ?Sized + 'static> ShoppingCartRepository
    for DualWriteShoppingCartRepository<R>
{
    async fn add_item(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        identity: Identity,
    ) -> Result<CartItem> {
        self.store
            .write(
                "add_item",
                line_key(user_id, product_id),
                |repo| async move { repo.add_item(user_id, product_id, quantity, identity).await }.boxed(),
                move |repo, item: &CartItem| {
                    let identity = Identity::assigned(item.id, item.created_at);
                    async move {
                        applied(repo.add_item(user_id, product_id, quantity, identity).await)
                    }
                    .boxed()
                },
            )
            .await
    }

    async fn cart_items(&self, user_id: EntityId) -> Result<Vec<CartItem>> {
        self.store
            .read("cart_items", user_id.to_string(), |repo| {
                async move { repo.cart_items(user_id).await }.boxed()
            })
            .await
    }

    async fn update_item_quantity(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
    ) -> Result<bool> {
        self.store
            .write(
                "update_item_quantity",
                line_key(user_id, product_id),
                |repo| {
                    async move { repo.update_item_quantity(user_id, product_id, quantity).await }
                        .boxed()
                },
                move |repo, _: &bool| {
                    async move { repo.update_item_quantity(user_id, product_id, quantity).await }
                        .boxed()
                },
            )
            .await
    }

    async fn remove_item(&self, user_id: EntityId, product_id: EntityId) -> Result<bool> {
        self.store
            .write(
                "remove_item",
                line_key(user_id, product_id),
                |repo| async move { repo.remove_item(user_id, product_id).await }.boxed(),
                move |repo, _: &bool| async move { repo.remove_item(user_id, product_id).await }.boxed(),
            )
            .await
    }

    async fn clear_cart(&self, user_id: EntityId) -> Result<bool> {
        self.store
            .write(
                "clear_cart",
                user_id.to_string(),
                |repo| async move { repo.clear_cart(user_id).await }.boxed(),
                move |repo, _: &bool| async move { repo.clear_cart(user_id).await }.boxed(),
            )
            .await
    }

    async fn cart_item_count(&self, user_id: EntityId) -> Result<u64> {
        self.store
            .read("cart_item_count", user_id.to_string(), |repo| {
                async move { repo.cart_item_count(user_id).await }.boxed()
            })
            .await
    }

    async fn cart_item(
        &self,
        user_id: EntityId,
        product_id: EntityId,
    ) -> Result<Option<CartItem>> {
        self.store
            .read("cart_item", line_key(user_id, product_id), |repo| {
                async move { repo.cart_item(user_id, product_id).await }.boxed()
            })
            .await
    }
}
