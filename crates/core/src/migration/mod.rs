//! Migration phase logic.
//!
//! Pure functions from the current phase and flags to routing decisions.
//! Nothing here touches a store; the shell reads a flag snapshot once per
//! operation and asks these types where to go.

mod error;
mod flags;
mod phase;
mod policy;
mod routing;
mod validation;

pub use error::MigrationError;
pub use flags::{FeatureFlags, FlagName};
pub use phase::{MigrationPhase, StoreKind};
pub use policy::WritePolicy;
pub use routing::{ReadRoute, RepositoryPlan, WritePlan};
pub use validation::{Divergence, FieldMismatch, ValidationReport};
