//! Dual-write repository decorators.
//!
//! Each entity wrapper delegates to a [`DualStore`], which resolves the
//! current flags once per call and then:
//!
//! - **Writes**: run against the authoritative store; if the write applied and
//!   dual writes are enabled, the same operation is mirrored to the secondary
//!   store under the configured [`WritePolicy`]. Queued mirrors go through a
//!   shared [`MirrorQueue`] and keep their submission order.
//! - **Reads**: run against the routed primary store; with dual reads enabled a
//!   shadow read runs concurrently against the other store and, when validation
//!   is enabled, the two results are compared field by field.

mod carts;
mod categories;
mod orders;
mod products;
mod queue;
mod users;

pub use carts::DualWriteShoppingCartRepository;
pub use categories::DualWriteCategoryRepository;
pub use orders::DualWriteOrderRepository;
pub use products::DualWriteProductRepository;
pub use queue::MirrorQueue;
pub use users::DualWriteUserRepository;

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::BoxFuture;
use uuid::Uuid;

use modernizr_core::migration::{
    Divergence, ReadRoute, StoreKind, ValidationReport, WritePlan, WritePolicy,
};
use modernizr_core::models::{CartItem, Category, Order, OrderItem, Product, User};
use modernizr_core::storage::{RepositoryError, Result};

use crate::flags::FeatureFlagStore;
use crate::storage::journal::{FailedWrite, ReplicationJournal};

/// The relational and distributed adapters for one entity.
pub struct RepositoryPair<R: ?Sized> {
    pub relational: Arc<R>,
    pub distributed: Arc<R>,
}

impl<R: ?Sized> RepositoryPair<R> {
    pub fn new(relational: Arc<R>, distributed: Arc<R>) -> Self {
        Self {
            relational,
            distributed,
        }
    }

    pub fn get(&self, store: StoreKind) -> Arc<R> {
        match store {
            StoreKind::Relational => Arc::clone(&self.relational),
            StoreKind::Distributed => Arc::clone(&self.distributed),
        }
    }
}

impl<R: ?Sized> Clone for RepositoryPair<R> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.relational), Arc::clone(&self.distributed))
    }
}

/// Static routing settings shared by every wrapper a factory builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualStoreSettings {
    pub policy: WritePolicy,
    /// Store used for phase 1 reads and writes.
    pub default_store: StoreKind,
    /// Store written first while dual writes are enabled.
    pub authoritative: StoreKind,
}

/// Whether a write result means the store actually changed.
///
/// Writes that did not apply (deleting a missing row, updating a product the
/// seller does not own) are not mirrored.
pub trait Applied {
    fn applied(&self) -> bool;
}

impl Applied for bool {
    fn applied(&self) -> bool {
        *self
    }
}

impl<T> Applied for Option<T> {
    fn applied(&self) -> bool {
        self.is_some()
    }
}

macro_rules! always_applied {
    ($($ty:ty),*) => {
        $(
            impl Applied for $ty {
                fn applied(&self) -> bool {
                    true
                }
            }
        )*
    };
}

always_applied!(User, Product, Category, Order, OrderItem, CartItem);

/// Maps a mirrored write's result to whether it applied.
pub(crate) fn applied<T: Applied>(result: Result<T>) -> Result<bool> {
    result.map(|value| value.applied())
}

/// Identifies one mirrored write in logs and the journal.
struct MirrorContext {
    entity: &'static str,
    operation: &'static str,
    key: String,
    store: StoreKind,
    correlation_id: Uuid,
}

/// Routing engine shared by the entity wrappers.
pub struct DualStore<R: ?Sized> {
    entity: &'static str,
    stores: RepositoryPair<R>,
    flags: FeatureFlagStore,
    settings: DualStoreSettings,
    journal: Arc<ReplicationJournal>,
    queue: Arc<MirrorQueue>,
}

impl<R: ?Sized + Send + Sync + 'static> DualStore<R> {
    pub fn new(
        entity: &'static str,
        stores: RepositoryPair<R>,
        flags: FeatureFlagStore,
        settings: DualStoreSettings,
        journal: Arc<ReplicationJournal>,
        queue: Arc<MirrorQueue>,
    ) -> Self {
        Self {
            entity,
            stores,
            flags,
            settings,
            journal,
            queue,
        }
    }

    pub fn journal(&self) -> &Arc<ReplicationJournal> {
        &self.journal
    }

    /// Runs a read against the routed store, shadowing it when dual reads are on.
    ///
    /// Only the primary result reaches the caller. Shadow failures and
    /// mismatches are logged and counted.
    pub async fn read<'a, T, F>(&self, operation: &'static str, key: String, call: F) -> Result<T>
    where
        T: Divergence + Send,
        F: Fn(Arc<R>) -> BoxFuture<'a, Result<T>>,
    {
        let flags = self.flags.snapshot();
        let route = ReadRoute::for_flags(&flags, self.settings.default_store);

        let Some(shadow_store) = route.shadow else {
            return call(self.stores.get(route.primary)).await;
        };

        let correlation_id = Uuid::new_v4();
        let (primary, shadow) = tokio::join!(
            call(self.stores.get(route.primary)),
            call(self.stores.get(shadow_store))
        );
        let primary = primary?;
        self.journal.record_shadow_read();

        match shadow {
            Ok(shadow) if route.validate => {
                let report = ValidationReport {
                    entity: self.entity,
                    operation,
                    key,
                    correlation_id: correlation_id.to_string(),
                    primary_store: route.primary,
                    shadow_store,
                    mismatches: primary.divergences(&shadow),
                    timestamp: Utc::now(),
                };
                if report.passed() {
                    tracing::debug!(
                        entity = self.entity,
                        operation,
                        %correlation_id,
                        "Dual read validation passed"
                    );
                } else {
                    tracing::warn!(
                        entity = self.entity,
                        operation,
                        %correlation_id,
                        mismatches = report.mismatches.len(),
                        "{}",
                        report.summary()
                    );
                }
                self.journal.record_validation(report);
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(
                    entity = self.entity,
                    operation,
                    key = %key,
                    store = %shadow_store,
                    %correlation_id,
                    error = %err,
                    "Shadow read failed"
                );
                self.journal.record_shadow_failure();
            }
        }

        Ok(primary)
    }

    /// Runs a write against the authoritative store and mirrors it if needed.
    ///
    /// `primary` performs the write. `mirror` builds the secondary write from
    /// the authoritative result, so generated identifiers carry over. The
    /// authoritative result is returned regardless of the mirror outcome,
    /// except under [`WritePolicy::SynchronousBoth`].
    pub async fn write<'a, T, P, M>(
        &self,
        operation: &'static str,
        key: String,
        primary: P,
        mirror: M,
    ) -> Result<T>
    where
        T: Applied + Send,
        P: FnOnce(Arc<R>) -> BoxFuture<'a, Result<T>>,
        M: FnOnce(Arc<R>, &T) -> BoxFuture<'static, Result<bool>>,
    {
        let flags = self.flags.snapshot();
        let plan = WritePlan::for_flags(
            &flags,
            self.settings.default_store,
            self.settings.authoritative,
        );

        let (authoritative, secondary) = match plan {
            WritePlan::Single { store } => return primary(self.stores.get(store)).await,
            WritePlan::Dual {
                authoritative,
                secondary,
            } => (authoritative, secondary),
        };

        let value = primary(self.stores.get(authoritative)).await?;
        if !value.applied() {
            tracing::debug!(
                entity = self.entity,
                operation,
                key = %key,
                "Authoritative write did not apply, skipping mirror"
            );
            return Ok(value);
        }

        let context = MirrorContext {
            entity: self.entity,
            operation,
            key,
            store: secondary,
            correlation_id: Uuid::new_v4(),
        };
        let pending = mirror(self.stores.get(secondary), &value);

        match self.settings.policy {
            WritePolicy::SynchronousBoth => {
                settle(&self.journal, context, pending.await)?;
            }
            WritePolicy::BestEffortSecondary => {
                let _ = settle(&self.journal, context, pending.await);
            }
            WritePolicy::QueuedSecondary => self.queue.enqueue(context, pending),
        }

        Ok(value)
    }
}

/// Records the outcome of a mirrored write.
fn settle(
    journal: &ReplicationJournal,
    context: MirrorContext,
    outcome: Result<bool>,
) -> Result<()> {
    let err = match outcome {
        Ok(true) => {
            journal.record_secondary_write();
            tracing::debug!(
                entity = context.entity,
                operation = context.operation,
                key = %context.key,
                store = %context.store,
                correlation_id = %context.correlation_id,
                "Secondary write applied"
            );
            return Ok(());
        }
        Ok(false) => RepositoryError::not_found(context.entity, &context.key),
        Err(err) => err,
    };

    tracing::error!(
        entity = context.entity,
        operation = context.operation,
        key = %context.key,
        store = %context.store,
        correlation_id = %context.correlation_id,
        error = %err,
        "Secondary write failed"
    );
    journal.record_secondary_failure(FailedWrite {
        entity: context.entity,
        operation: context.operation,
        key: context.key,
        store: context.store,
        error: err.to_string(),
        correlation_id: context.correlation_id,
        at: Utc::now(),
    });
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_outcomes() {
        assert!(true.applied());
        assert!(!false.applied());
        assert!(Some(1).applied());
        assert!(!None::<u8>.applied());
    }

    #[test]
    fn test_settle_records_failures() {
        let journal = ReplicationJournal::default();
        let context = || MirrorContext {
            entity: "User",
            operation: "delete_user",
            key: "3".to_string(),
            store: StoreKind::Distributed,
            correlation_id: Uuid::new_v4(),
        };

        assert!(settle(&journal, context(), Ok(true)).is_ok());
        assert_eq!(
            settle(&journal, context(), Ok(false)),
            Err(RepositoryError::not_found("User", "3"))
        );
        assert!(settle(
            &journal,
            context(),
            Err(RepositoryError::ConnectionFailed("down".to_string()))
        )
        .is_err());

        let stats = journal.stats();
        assert_eq!(stats.secondary_writes, 1);
        assert_eq!(stats.secondary_failures, 2);
        assert_eq!(journal.failed_writes()[1].error, "Connection failed: down");
    }
}
