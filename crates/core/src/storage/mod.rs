mod error;
mod traits;
mod types;

pub use error::{ErrorKind, RepositoryError, Result};
pub use traits::{
    CategoryRepository, OrderRepository, ProductRepository, ShoppingCartRepository, UserRepository,
};
pub use types::{EntityId, Identity, Page, PageRequest};
