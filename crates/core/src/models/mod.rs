//! Store-agnostic domain records.
//!
//! Both store adapters translate to and from these shapes; the migration
//! layer only ever sees them.

mod cart;
mod category;
mod order;
mod product;
mod user;

pub use cart::CartItem;
pub use category::{Category, CreateCategoryRequest, UpdateCategoryRequest};
pub use order::{Order, OrderItem, OrderStatus, OrderWithItems};
pub use product::{CreateProductRequest, Product, ProductFilters, UpdateProductRequest};
pub use user::{CreateUserRequest, UpdateUserRequest, User};
