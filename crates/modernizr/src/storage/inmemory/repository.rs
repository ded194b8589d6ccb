//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use modernizr_core::migration::StoreKind;
use modernizr_core::models::{
    CartItem, Category, CreateCategoryRequest, CreateProductRequest, CreateUserRequest, Order,
    OrderItem, OrderStatus, OrderWithItems, Product, ProductFilters, UpdateCategoryRequest,
    UpdateProductRequest, UpdateUserRequest, User,
};
use modernizr_core::storage::{
    CategoryRepository, EntityId, Identity, OrderRepository, Page, PageRequest,
    ProductRepository, RepositoryError, Result, ShoppingCartRepository, UserRepository,
};

type CartKey = (EntityId, EntityId);

/// In-memory storage backend standing in for either store.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>` for thread-safe access. Reads and
/// writes can be made to fail with [`RepositoryError::ConnectionFailed`] to
/// exercise the dual-write failure paths.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    store: StoreKind,
    users: Arc<RwLock<HashMap<EntityId, User>>>,
    products: Arc<RwLock<HashMap<EntityId, Product>>>,
    categories: Arc<RwLock<HashMap<EntityId, Category>>>,
    orders: Arc<RwLock<HashMap<EntityId, Order>>>,
    order_items: Arc<RwLock<HashMap<EntityId, OrderItem>>>,
    cart_items: Arc<RwLock<HashMap<CartKey, CartItem>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new(StoreKind::Relational)
    }
}

impl InMemoryRepository {
    /// Creates a new empty repository labelled as `store`.
    pub fn new(store: StoreKind) -> Self {
        Self {
            store,
            users: Arc::new(RwLock::new(HashMap::new())),
            products: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(HashMap::new())),
            orders: Arc::new(RwLock::new(HashMap::new())),
            order_items: Arc::new(RwLock::new(HashMap::new())),
            cart_items: Arc::new(RwLock::new(HashMap::new())),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> StoreKind {
        self.store
    }

    /// Makes every subsequent read fail until turned off again.
    pub fn inject_read_failures(&self, enabled: bool) {
        self.fail_reads.store(enabled, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail until turned off again.
    pub fn inject_write_failures(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(format!(
                "{} store unavailable for reads",
                self.store
            )));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(format!(
                "{} store unavailable for writes",
                self.store
            )));
        }
        Ok(())
    }

    async fn with_items(&self, order: Order) -> OrderWithItems {
        let items = self.order_items.read().await;
        let mut lines: Vec<OrderItem> = items
            .values()
            .filter(|item| item.order_id == order.id)
            .cloned()
            .collect();
        lines.sort_by_key(|item| item.id);
        OrderWithItems { order, items: lines }
    }

    async fn filtered_products(
        &self,
        filters: &ProductFilters,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.check_read()?;
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .values()
            .filter(|p| filters.matches(p))
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.id);
        Ok(page.paginate(matching))
    }
}

fn next_id<V>(records: &HashMap<EntityId, V>) -> EntityId {
    records.keys().max().map_or(1, |id| id + 1)
}

fn sorted_by_id<T>(mut records: Vec<T>, id: impl Fn(&T) -> EntityId) -> Vec<T> {
    records.sort_by_key(|record| id(record));
    records
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<User>> {
        self.check_read()?;
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.check_read()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.check_read()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, request: &CreateUserRequest, identity: Identity) -> Result<User> {
        self.check_write()?;
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == request.username) {
            return Err(RepositoryError::conflict("User", "username", &request.username));
        }
        if users.values().any(|u| u.email == request.email) {
            return Err(RepositoryError::conflict("User", "email", &request.email));
        }

        let (id, created_at) = identity.resolve(|| next_id(&users), Utc::now());
        if users.contains_key(&id) {
            return Err(RepositoryError::conflict("User", "id", id));
        }

        let user = User::from_request(id, request, created_at);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: EntityId,
        changes: &UpdateUserRequest,
    ) -> Result<Option<User>> {
        self.check_write()?;
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepositoryError::conflict("User", "email", email));
            }
        }
        Ok(users.get_mut(&id).map(|user| {
            user.apply(changes, Utc::now());
            user.clone()
        }))
    }

    async fn delete_user(&self, id: EntityId) -> Result<bool> {
        self.check_write()?;
        let mut users = self.users.write().await;
        Ok(users.remove(&id).is_some())
    }

    async fn upgrade_to_seller(&self, id: EntityId) -> Result<Option<User>> {
        self.check_write()?;
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.is_seller = true;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        Ok(UserRepository::find_by_username(self, username).await?.is_some())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        Ok(UserRepository::find_by_email(self, email).await?.is_some())
    }

    async fn promote_to_super_admin(&self, id: EntityId) -> Result<Option<User>> {
        self.check_write()?;
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.super_admin = true;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn demote_from_super_admin(&self, id: EntityId) -> Result<Option<User>> {
        self.check_write()?;
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.super_admin = false;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn find_all_super_admins(&self) -> Result<Vec<User>> {
        self.check_read()?;
        let users = self.users.read().await;
        let admins = users.values().filter(|u| u.super_admin).cloned().collect();
        Ok(sorted_by_id(admins, |u| u.id))
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn create_product(
        &self,
        seller_id: EntityId,
        request: &CreateProductRequest,
        identity: Identity,
    ) -> Result<Product> {
        self.check_write()?;
        if request.price_cents < 0 {
            return Err(RepositoryError::InvalidData(format!(
                "price must not be negative, got {}",
                request.price_cents
            )));
        }

        let mut products = self.products.write().await;
        let (id, created_at) = identity.resolve(|| next_id(&products), Utc::now());
        if products.contains_key(&id) {
            return Err(RepositoryError::conflict("Product", "id", id));
        }

        let product = Product::from_request(id, seller_id, request, created_at);
        products.insert(id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>> {
        self.check_read()?;
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn update_product(
        &self,
        id: EntityId,
        seller_id: EntityId,
        changes: &UpdateProductRequest,
    ) -> Result<Option<Product>> {
        self.check_write()?;
        let mut products = self.products.write().await;
        Ok(products
            .get_mut(&id)
            .filter(|p| p.seller_id == seller_id)
            .map(|product| {
                product.apply(changes, Utc::now());
                product.clone()
            }))
    }

    async fn delete_product(&self, id: EntityId, seller_id: EntityId) -> Result<bool> {
        self.check_write()?;
        let mut products = self.products.write().await;
        if products.get(&id).is_some_and(|p| p.seller_id == seller_id) {
            products.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn list_products(
        &self,
        filters: &ProductFilters,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        self.filtered_products(filters, page).await
    }

    async fn products_by_seller(
        &self,
        seller_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let filters = ProductFilters {
            seller_id: Some(seller_id),
            ..ProductFilters::default()
        };
        self.filtered_products(&filters, page).await
    }

    async fn products_by_category(
        &self,
        category_id: EntityId,
        page: PageRequest,
    ) -> Result<Page<Product>> {
        let filters = ProductFilters {
            category_id: Some(category_id),
            ..ProductFilters::default()
        };
        self.filtered_products(&filters, page).await
    }

    async fn search_products(&self, term: &str, page: PageRequest) -> Result<Page<Product>> {
        let filters = ProductFilters {
            search: Some(term.to_string()),
            ..ProductFilters::default()
        };
        self.filtered_products(&filters, page).await
    }

    async fn update_inventory(&self, id: EntityId, quantity: u32) -> Result<bool> {
        self.check_write()?;
        let mut products = self.products.write().await;
        Ok(products
            .get_mut(&id)
            .map(|product| {
                product.inventory_quantity = quantity;
                product.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn reduce_inventory(&self, id: EntityId, quantity: u32) -> Result<bool> {
        self.check_write()?;
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(product) if product.inventory_quantity >= quantity => {
                product.inventory_quantity -= quantity;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn has_inventory(&self, id: EntityId, required: u32) -> Result<bool> {
        self.check_read()?;
        let products = self.products.read().await;
        Ok(products
            .get(&id)
            .is_some_and(|p| p.inventory_quantity >= required))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn find_all(&self) -> Result<Vec<Category>> {
        self.check_read()?;
        let categories = self.categories.read().await;
        Ok(sorted_by_id(categories.values().cloned().collect(), |c| c.id))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Category>> {
        self.check_read()?;
        let categories = self.categories.read().await;
        Ok(categories.get(&id).cloned())
    }

    async fn find_by_parent(&self, parent_id: Option<EntityId>) -> Result<Vec<Category>> {
        self.check_read()?;
        let categories = self.categories.read().await;
        let children = categories
            .values()
            .filter(|c| c.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(sorted_by_id(children, |c| c.id))
    }

    async fn create_category(
        &self,
        request: &CreateCategoryRequest,
        identity: Identity,
    ) -> Result<Category> {
        self.check_write()?;
        let mut categories = self.categories.write().await;
        if categories
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(&request.name))
        {
            return Err(RepositoryError::conflict("Category", "name", &request.name));
        }
        if let Some(parent_id) = request.parent_id {
            if !categories.contains_key(&parent_id) {
                return Err(RepositoryError::not_found("Category", parent_id));
            }
        }

        let (id, created_at) = identity.resolve(|| next_id(&categories), Utc::now());
        if categories.contains_key(&id) {
            return Err(RepositoryError::conflict("Category", "id", id));
        }

        let category = Category::from_request(id, request, created_at);
        categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: EntityId,
        changes: &UpdateCategoryRequest,
    ) -> Result<Option<Category>> {
        self.check_write()?;
        let mut categories = self.categories.write().await;
        if let Some(name) = &changes.name {
            if categories
                .values()
                .any(|c| c.id != id && c.name.eq_ignore_ascii_case(name))
            {
                return Err(RepositoryError::conflict("Category", "name", name));
            }
        }
        if let Some(Some(parent_id)) = changes.parent_id {
            if parent_id == id {
                return Err(RepositoryError::InvalidData(format!(
                    "category {id} cannot be its own parent"
                )));
            }
            if !categories.contains_key(&parent_id) {
                return Err(RepositoryError::not_found("Category", parent_id));
            }
        }
        Ok(categories.get_mut(&id).map(|category| {
            category.apply(changes, Utc::now());
            category.clone()
        }))
    }

    async fn delete_category(&self, id: EntityId) -> Result<bool> {
        self.check_write()?;
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.parent_id == Some(id)) {
            return Err(RepositoryError::InvalidData(format!(
                "category {id} still has child categories"
            )));
        }
        Ok(categories.remove(&id).is_some())
    }

    async fn exists_by_name(&self, name: &str, exclude_id: Option<EntityId>) -> Result<bool> {
        self.check_read()?;
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .any(|c| Some(c.id) != exclude_id && c.name.eq_ignore_ascii_case(name)))
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn create_order(
        &self,
        user_id: EntityId,
        total_amount_cents: i64,
        identity: Identity,
    ) -> Result<Order> {
        self.check_write()?;
        let mut orders = self.orders.write().await;
        let (id, created_at) = identity.resolve(|| next_id(&orders), Utc::now());
        if orders.contains_key(&id) {
            return Err(RepositoryError::conflict("Order", "id", id));
        }

        let order = Order::new(id, user_id, total_amount_cents, created_at);
        orders.insert(id, order.clone());
        Ok(order)
    }

    async fn create_order_item(
        &self,
        order_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        price_at_time_cents: i64,
        identity: Identity,
    ) -> Result<OrderItem> {
        self.check_write()?;
        if !self.orders.read().await.contains_key(&order_id) {
            return Err(RepositoryError::not_found("Order", order_id));
        }

        let mut items = self.order_items.write().await;
        let (id, _) = identity.resolve(|| next_id(&items), Utc::now());
        if items.contains_key(&id) {
            return Err(RepositoryError::conflict("OrderItem", "id", id));
        }

        let item = OrderItem {
            id,
            order_id,
            product_id,
            quantity,
            price_at_time_cents,
        };
        items.insert(id, item.clone());
        Ok(item)
    }

    async fn get_order(&self, id: EntityId) -> Result<Option<OrderWithItems>> {
        self.check_read()?;
        let order = self.orders.read().await.get(&id).cloned();
        match order {
            Some(order) => Ok(Some(self.with_items(order).await)),
            None => Ok(None),
        }
    }

    async fn user_orders(
        &self,
        user_id: EntityId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OrderWithItems>> {
        self.check_read()?;
        let mut matching: Vec<Order> = {
            let orders = self.orders.read().await;
            orders
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect()
        };
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut result = Vec::new();
        for order in matching.into_iter().skip(offset).take(limit) {
            result.push(self.with_items(order).await);
        }
        Ok(result)
    }

    async fn update_order_status(&self, id: EntityId, status: OrderStatus) -> Result<bool> {
        self.check_write()?;
        let mut orders = self.orders.write().await;
        Ok(orders
            .get_mut(&id)
            .map(|order| {
                order.status = status;
                order.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn user_order_count(&self, user_id: EntityId) -> Result<u64> {
        self.check_read()?;
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|o| o.user_id == user_id).count() as u64)
    }

    async fn orders_by_status(
        &self,
        status: OrderStatus,
        limit: usize,
    ) -> Result<Vec<OrderWithItems>> {
        self.check_read()?;
        let mut matching: Vec<Order> = {
            let orders = self.orders.read().await;
            orders
                .values()
                .filter(|o| o.status == status)
                .cloned()
                .collect()
        };
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let mut result = Vec::new();
        for order in matching.into_iter().take(limit) {
            result.push(self.with_items(order).await);
        }
        Ok(result)
    }
}

#[async_trait]
impl ShoppingCartRepository for InMemoryRepository {
    async fn add_item(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
        identity: Identity,
    ) -> Result<CartItem> {
        self.check_write()?;
        if quantity == 0 {
            return Err(RepositoryError::InvalidData(
                "quantity must be at least 1".to_string(),
            ));
        }

        let mut lines = self.cart_items.write().await;
        let now = Utc::now();
        if let Some(line) = lines.get_mut(&(user_id, product_id)) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.updated_at = now;
            return Ok(line.clone());
        }

        let next = || lines.values().map(|l| l.id).max().map_or(1, |id| id + 1);
        let (id, created_at) = identity.resolve(next, now);
        let line = CartItem {
            id,
            user_id,
            product_id,
            quantity,
            created_at,
            updated_at: created_at,
        };
        lines.insert((user_id, product_id), line.clone());
        Ok(line)
    }

    async fn cart_items(&self, user_id: EntityId) -> Result<Vec<CartItem>> {
        self.check_read()?;
        let lines = self.cart_items.read().await;
        let items = lines
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_by_id(items, |l| l.id))
    }

    async fn update_item_quantity(
        &self,
        user_id: EntityId,
        product_id: EntityId,
        quantity: u32,
    ) -> Result<bool> {
        self.check_write()?;
        let mut lines = self.cart_items.write().await;
        Ok(lines
            .get_mut(&(user_id, product_id))
            .map(|line| {
                line.quantity = quantity;
                line.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn remove_item(&self, user_id: EntityId, product_id: EntityId) -> Result<bool> {
        self.check_write()?;
        let mut lines = self.cart_items.write().await;
        Ok(lines.remove(&(user_id, product_id)).is_some())
    }

    async fn clear_cart(&self, user_id: EntityId) -> Result<bool> {
        self.check_write()?;
        let mut lines = self.cart_items.write().await;
        let before = lines.len();
        lines.retain(|(owner, _), _| *owner != user_id);
        Ok(lines.len() < before)
    }

    async fn cart_item_count(&self, user_id: EntityId) -> Result<u64> {
        self.check_read()?;
        let lines = self.cart_items.read().await;
        Ok(lines.keys().filter(|(owner, _)| *owner == user_id).count() as u64)
    }

    async fn cart_item(
        &self,
        user_id: EntityId,
        product_id: EntityId,
    ) -> Result<Option<CartItem>> {
        self.check_read()?;
        let lines = self.cart_items.read().await;
        Ok(lines.get(&(user_id, product_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> CreateUserRequest {
        CreateUserRequest::new("alice", "alice@example.com", "hash")
    }

    fn widget(category_id: EntityId) -> CreateProductRequest {
        CreateProductRequest {
            name: "Widget".to_string(),
            description: Some("A small widget".to_string()),
            category_id,
            price_cents: 1_999,
            inventory_quantity: 10,
        }
    }

    // ==================== User Tests ====================

    #[tokio::test]
    async fn test_user_create_and_lookup() {
        let repo = InMemoryRepository::default();
        let user = repo.create_user(&alice(), Identity::Generate).await.unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(UserRepository::find_by_id(&repo, 1).await.unwrap(), Some(user.clone()));
        assert_eq!(repo.find_by_username("alice").await.unwrap(), Some(user.clone()));
        assert_eq!(repo.find_by_email("alice@example.com").await.unwrap(), Some(user));
        assert!(repo.exists_by_username("alice").await.unwrap());
        assert!(!repo.exists_by_email("bob@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_duplicate_username_conflicts() {
        let repo = InMemoryRepository::default();
        repo.create_user(&alice(), Identity::Generate).await.unwrap();

        let duplicate = CreateUserRequest::new("alice", "other@example.com", "hash");
        let err = repo.create_user(&duplicate, Identity::Generate).await.unwrap_err();
        assert_eq!(err, RepositoryError::conflict("User", "username", "alice"));
    }

    #[tokio::test]
    async fn test_user_assigned_identity_is_honored() {
        let repo = InMemoryRepository::default();
        let created_at = Utc::now() - chrono::Duration::hours(1);
        let user = repo
            .create_user(&alice(), Identity::assigned(42, created_at))
            .await
            .unwrap();

        assert_eq!(user.id, 42);
        assert_eq!(user.created_at, created_at);
    }

    #[tokio::test]
    async fn test_user_update_and_roles() {
        let repo = InMemoryRepository::default();
        let user = repo.create_user(&alice(), Identity::Generate).await.unwrap();

        let changes = UpdateUserRequest {
            first_name: Some("Alice".to_string()),
            ..UpdateUserRequest::default()
        };
        let updated = repo.update_user(user.id, &changes).await.unwrap().unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));

        assert!(repo.upgrade_to_seller(user.id).await.unwrap().unwrap().is_seller);
        repo.promote_to_super_admin(user.id).await.unwrap();
        assert_eq!(repo.find_all_super_admins().await.unwrap().len(), 1);
        repo.demote_from_super_admin(user.id).await.unwrap();
        assert!(repo.find_all_super_admins().await.unwrap().is_empty());

        assert_eq!(repo.update_user(99, &changes).await.unwrap(), None);
        assert!(repo.delete_user(user.id).await.unwrap());
        assert!(!repo.delete_user(user.id).await.unwrap());
    }

    // ==================== Product Tests ====================

    #[tokio::test]
    async fn test_product_ownership_is_enforced() {
        let repo = InMemoryRepository::default();
        let product = repo.create_product(7, &widget(1), Identity::Generate).await.unwrap();

        let changes = UpdateProductRequest {
            price_cents: Some(2_500),
            ..UpdateProductRequest::default()
        };
        assert_eq!(repo.update_product(product.id, 8, &changes).await.unwrap(), None);
        assert!(!repo.delete_product(product.id, 8).await.unwrap());

        let updated = repo.update_product(product.id, 7, &changes).await.unwrap().unwrap();
        assert_eq!(updated.price_cents, 2_500);
        assert!(repo.delete_product(product.id, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_product_queries_paginate() {
        let repo = InMemoryRepository::default();
        for _ in 0..3 {
            repo.create_product(7, &widget(1), Identity::Generate).await.unwrap();
        }
        repo.create_product(8, &widget(2), Identity::Generate).await.unwrap();

        let page = repo.products_by_seller(7, PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);

        let by_category = repo.products_by_category(2, PageRequest::default()).await.unwrap();
        assert_eq!(by_category.total, 1);

        let found = repo.search_products("SMALL", PageRequest::default()).await.unwrap();
        assert_eq!(found.total, 4);
    }

    #[tokio::test]
    async fn test_inventory_operations() {
        let repo = InMemoryRepository::default();
        let product = repo.create_product(7, &widget(1), Identity::Generate).await.unwrap();

        assert!(repo.has_inventory(product.id, 10).await.unwrap());
        assert!(repo.reduce_inventory(product.id, 4).await.unwrap());
        assert!(!repo.reduce_inventory(product.id, 7).await.unwrap());
        assert!(repo.update_inventory(product.id, 0).await.unwrap());
        assert!(!repo.has_inventory(product.id, 1).await.unwrap());
        assert!(!repo.update_inventory(99, 1).await.unwrap());
    }

    // ==================== Category Tests ====================

    #[tokio::test]
    async fn test_category_tree() {
        let repo = InMemoryRepository::default();
        let books = repo
            .create_category(&CreateCategoryRequest::root("Books"), Identity::Generate)
            .await
            .unwrap();
        let fiction = repo
            .create_category(&CreateCategoryRequest::child("Fiction", books.id), Identity::Generate)
            .await
            .unwrap();

        assert_eq!(repo.find_root_categories().await.unwrap(), vec![books.clone()]);
        assert_eq!(repo.find_child_categories(books.id).await.unwrap(), vec![fiction.clone()]);
        assert_eq!(
            repo.category_path(fiction.id).await.unwrap(),
            vec![books.clone(), fiction.clone()]
        );
        assert!(repo.would_create_cycle(books.id, fiction.id).await.unwrap());
        assert!(!repo.would_create_cycle(fiction.id, books.id).await.unwrap());
        assert!(repo.exists_by_name("books", None).await.unwrap());
        assert!(!repo.exists_by_name("Books", Some(books.id)).await.unwrap());

        let err = repo.delete_category(books.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_category_rejects_missing_parent_and_duplicates() {
        let repo = InMemoryRepository::default();
        let err = repo
            .create_category(&CreateCategoryRequest::child("Orphan", 5), Identity::Generate)
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::not_found("Category", 5));

        repo.create_category(&CreateCategoryRequest::root("Books"), Identity::Generate)
            .await
            .unwrap();
        let err = repo
            .create_category(&CreateCategoryRequest::root("BOOKS"), Identity::Generate)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { field: "name", .. }));
    }

    // ==================== Order Tests ====================

    #[tokio::test]
    async fn test_order_with_items() {
        let repo = InMemoryRepository::default();
        let order = repo.create_order(1, 3_998, Identity::Generate).await.unwrap();
        repo.create_order_item(order.id, 10, 2, 1_999, Identity::Generate)
            .await
            .unwrap();

        let loaded = repo.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(loaded.order.status, OrderStatus::Pending);
        assert_eq!(loaded.items.len(), 1);

        assert!(repo.update_order_status(order.id, OrderStatus::Completed).await.unwrap());
        assert_eq!(repo.orders_by_status(OrderStatus::Completed, 10).await.unwrap().len(), 1);
        assert_eq!(repo.user_order_count(1).await.unwrap(), 1);
        assert_eq!(repo.user_orders(1, 10, 0).await.unwrap().len(), 1);
        assert!(repo.user_orders(1, 10, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_item_requires_order() {
        let repo = InMemoryRepository::default();
        let err = repo
            .create_order_item(9, 10, 1, 100, Identity::Generate)
            .await
            .unwrap_err();
        assert_eq!(err, RepositoryError::not_found("Order", 9));
    }

    // ==================== Cart Tests ====================

    #[tokio::test]
    async fn test_cart_lines_accumulate() {
        let repo = InMemoryRepository::default();
        let first = repo.add_item(1, 10, 2, Identity::Generate).await.unwrap();
        let again = repo.add_item(1, 10, 3, Identity::Generate).await.unwrap();
        repo.add_item(1, 11, 1, Identity::Generate).await.unwrap();

        assert_eq!(again.id, first.id);
        assert_eq!(again.quantity, 5);
        assert_eq!(repo.cart_item_count(1).await.unwrap(), 2);

        assert!(repo.update_item_quantity(1, 10, 1).await.unwrap());
        assert_eq!(repo.cart_item(1, 10).await.unwrap().unwrap().quantity, 1);
        assert!(repo.remove_item(1, 11).await.unwrap());
        assert!(repo.clear_cart(1).await.unwrap());
        assert!(!repo.clear_cart(1).await.unwrap());
        assert!(repo.cart_items(1).await.unwrap().is_empty());
    }

    // ==================== Fault Injection Tests ====================

    #[tokio::test]
    async fn test_injected_failures() {
        let repo = InMemoryRepository::new(StoreKind::Distributed);
        repo.inject_write_failures(true);

        let err = repo.create_user(&alice(), Identity::Generate).await.unwrap_err();
        assert!(err.is_store_error());
        assert_eq!(
            err.to_string(),
            "Connection failed: distributed store unavailable for writes"
        );

        repo.inject_write_failures(false);
        repo.create_user(&alice(), Identity::Generate).await.unwrap();

        repo.inject_read_failures(true);
        assert!(repo.find_by_username("alice").await.is_err());
    }
}
