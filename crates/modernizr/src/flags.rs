//! Shared, mutable migration flag state.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use modernizr_core::migration::{FeatureFlags, FlagName, MigrationError, MigrationPhase};

/// Cloneable handle to the current [`FeatureFlags`].
///
/// Every clone observes the same state. Separate handles created with
/// [`FeatureFlagStore::new`] are fully independent.
///
/// Readers take a [`snapshot`](Self::snapshot) once per operation; there is no
/// isolation between a snapshot and later phase changes.
///
/// A poisoned lock is recovered with the last flags written to it.
#[derive(Debug, Clone, Default)]
pub struct FeatureFlagStore {
    inner: Arc<RwLock<FeatureFlags>>,
}

impl FeatureFlagStore {
    /// Creates a store at phase 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store at the given phase.
    pub fn with_phase(phase: MigrationPhase) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FeatureFlags::for_phase(phase))),
        }
    }

    /// Moves to `phase`, recomputing every derived flag and discarding overrides.
    pub fn set_migration_phase(&self, phase: u8) -> Result<FeatureFlags, MigrationError> {
        let phase = MigrationPhase::try_from(phase)?;
        let flags = FeatureFlags::for_phase(phase);

        *self.write() = flags;

        tracing::info!(
            phase = phase.number(),
            description = phase.description(),
            "Migration phase set"
        );
        Ok(flags)
    }

    /// Overrides one derived flag until the next phase change or reset.
    pub fn set_flag(&self, flag: FlagName, value: bool) {
        self.write().set(flag, value);
        tracing::info!(flag = %flag, value, "Feature flag overridden");
    }

    pub fn get_flag(&self, flag: FlagName) -> bool {
        self.snapshot().get(flag)
    }

    pub fn migration_phase(&self) -> MigrationPhase {
        self.snapshot().migration_phase
    }

    /// Returns a copy of the current flags.
    pub fn snapshot(&self) -> FeatureFlags {
        *self.read()
    }

    /// Returns to phase 1 defaults.
    pub fn reset(&self) {
        *self.write() = FeatureFlags::default();
        tracing::info!("Feature flags reset to phase 1");
    }

    fn read(&self) -> RwLockReadGuard<'_, FeatureFlags> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FeatureFlags> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
