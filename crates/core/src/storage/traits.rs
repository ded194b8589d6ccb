use async_trait::async_trait;

use crate::models::{
    CartItem, Category, CreateCategoryRequest, CreateProductRequest, CreateUserRequest, Order,
    OrderItem, OrderStatus, OrderWithItems, Product, ProductFilters, UpdateCategoryRequest,
    UpdateProductRequest, UpdateUserRequest, User,
};

use super::{EntityId, Identity, Page, PageRequest, Result};

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn find_by_id(&self, id: EntityId) -> Result<Option<User>>;

    /// Gets a user by their username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Gets a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Creates a new user.
    ///
    /// Fails with `Conflict` if the username or email is taken.
    async fn create_user(&self, request: &CreateUserRequest, identity: Identity) -> Result<User>;

    /// Updates a user's profile. Returns `None` if the user does not exist.
    async fn update_user(&self, id: EntityId, changes: &UpdateUserRequest)
        -> Result<Option<User>>;

    /// Deletes a user. Returns false if the user does not exist.
    async fn delete_user(&self, id: EntityId) -> Result<bool>;

    /// Grants seller status.
    async fn upgrade_to_seller(&self, id: EntityId) -> Result<Option<User>>;

    async fn exists_by_username(&self, username: &str) -> Result<bool>;

    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    async fn promote_to_super_admin(&self, id: EntityId) -> Result<Option<User>>;

    async fn demote_from_super_admin(&self, id: EntityId) -> Result<Option<User>>;

    async fn find_all_super_admins(&self) -> Result<Vec<User>>;
}

/// Repository for product catalog operations.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Creates a product owned by `seller_id`.
    async fn create_product(
        &self,
        seller_id: EntityId,
        request: &CreateProductRequest,
        identity: Identity,
    ) -> Result<Product>;

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>>;

    /// Updates a product. Returns `None` if it does not exist or is not owned by `seller_id`.
    async fn update_product(
        &self,
        id: EntityId,
        seller_id: EntityId,
        changes: &UpdateProductRequest,
    ) -> Result<Option<Product>>;

    /// Deletes a product. Returns false if it does not exist or is not owned by `seller_id`.
    async fn delete_product(&self, id: EntityId, seller_id: EntityId) -> Result<bool>;

    async fn list_products(
        &self,
        filters: &ProductFilters,
        page: PageRequest,
    ) -> Result<Page<Product>>;

    async fn products_by_seller(
        &self,
        seller_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>>;

    async fn products_by_category(
        &self,
        category_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>>;

    async fn search_products(&self, term: &str, page: PageRequest) -> Result<Page<Product>>;

    /// Sets the inventory to an absolute quantity.
    async fn update_inventory(&self, id: EntityId, quantity: u32) -> Result<bool>;

    /// Reduces inventory. Returns false if the product is missing or stock is insufficient.
    async fn reduce_inventory(&self, id: EntityId, quantity: u32) -> Result<bool>;

    async fn has_inventory(&self, id: EntityId, required: u32) -> Result<bool>;
}

/// Repository for the category tree.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Category>>;

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Category>>;

    /// Finds the children of `parent_id`, or the roots when `None`.
    async fn find_by_parent(&self, parent_id: Option<EntityId>) -> Result<Vec<Category>>;

    /// Creates a category. Fails with `Conflict` if the name is taken.
    async fn create_category(
        &self,
        request: &CreateCategoryRequest,
        identity: Identity,
    ) -> Result<Category>;

    async fn update_category(
        &self,
        id: EntityId,
        changes: &UpdateCategoryRequest,
    ) -> Result<Option<Category>>;

    async fn delete_category(&self, id: EntityId) -> Result<bool>;

    /// Returns true if another category (other than `exclude_id`) has this name.
    async fn exists_by_name(&self, name: &str, exclude_id: Option<EntityId>) -> Result<bool>;

    async fn find_root_categories(&self) -> Result<Vec<Category>> {
        self.find_by_parent(None).await
    }

    async fn find_child_categories(&self, parent_id: EntityId) -> Result<Vec<Category>> {
        self.find_by_parent(Some(parent_id)).await
    }

    async fn exists_by_id(&self, id: EntityId) -> Result<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// A missing parent is valid (root category); a given parent must exist.
    async fn validate_parent_id(&self, parent_id: Option<EntityId>) -> Result<bool> {
        match parent_id {
            None => Ok(true),
            Some(id) => self.exists_by_id(id).await,
        }
    }

    /// Returns true if re-parenting `category_id` under `new_parent_id` would form a cycle.
    async fn would_create_cycle(
        &self,
        category_id: EntityId,
        new_parent_id: EntityId,
    ) -> Result<bool> {
        let mut current = Some(new_parent_id);
        let mut hops = 0usize;
        while let Some(id) = current {
            if id == category_id {
                return Ok(true);
            }
            hops += 1;
            // A cycle already present in the data.
            if hops > 1_000 {
                return Ok(true);
            }
            current = self.find_by_id(id).await?.and_then(|c| c.parent_id);
        }
        Ok(false)
    }

    /// Returns the categories from the root down to `category_id` (inclusive).
    async fn category_path(&self, category_id: EntityId) -> Result<Vec<Category>> {
        let mut path = Vec::new();
        let mut current = Some(category_id);
        while let Some(id) = current {
            let Some(category) = self.find_by_id(id).await? else {
                break;
            };
            if path.iter().any(|c: &Category| c.id == category.id) {
                break;
            }
            current = category.parent_id;
            path.push(category);
        }
        path.reverse();
        Ok(path)
    }
}

/// Repository for orders and their lines.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Creates a pending order.
    async fn create_order(
        &self,
        user_id: EntityId,
        total_amount_cents: i64,
        identity: Identity,
    ) -> Result<Order>;

    /// Adds a line to an existing order. Fails with `NotFound` if the order is missing.
    async fn create_order_item(
        &self,
        order_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        price_at_time_cents: i64,
        identity: Identity,
    ) -> Result<OrderItem>;

    async fn get_order(&self, id: EntityId) -> Result<Option<OrderWithItems>>;

    /// Orders of a user, newest first.
    async fn user_orders(
        &self,
        user_id: EntityId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OrderWithItems>>;

    /// Returns false if the order does not exist.
    async fn update_order_status(&self, id: EntityId, status: OrderStatus) -> Result<bool>;

    async fn user_order_count(&self, user_id: EntityId) -> Result<u64>;

    /// Orders in a given status, newest first.
    async fn orders_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<OrderWithItems>>;
}

/// Repository for shopping carts.
#[async_trait]
pub trait ShoppingCartRepository: Send + Sync {
    /// Adds `quantity` of a product, creating the line or increasing its quantity.
    ///
    /// `identity` only applies when a new line is created.
    async fn add_item(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        identity: Identity,
    ) -> Result<CartItem>;

    async fn cart_items(&self, user_id: EntityId) -> Result<Vec<CartItem>>;

    /// Sets a line's quantity. Returns false if the line does not exist.
    async fn update_item_quantity(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
    ) -> Result<bool>;

    async fn remove_item(&self, user_id: EntityId, product_id: EntityId) -> Result<bool>;

    /// Removes every line. Returns false if the cart was already empty.
    async fn clear_cart(&self, user_id: EntityId) -> Result<bool>;

    /// Number of distinct lines in the cart.
    async fn cart_item_count(&self, user_id: EntityId) -> Result<u64>;

    async fn cart_item(&self, user_id: EntityId, product_id: EntityId)
        -> Result<Option<CartItem>>;
}
