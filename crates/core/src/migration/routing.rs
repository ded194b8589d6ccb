//! Routing decisions derived from a flag snapshot.

use serde::Serialize;

use super::{FeatureFlags, MigrationPhase, StoreKind};

/// What the repository factory builds for a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "store", rename_all = "snake_case")]
pub enum RepositoryPlan {
    /// Hand out the adapter for one store directly.
    SingleStore(StoreKind),
    /// Wrap both adapters in the entity's dual-write wrapper.
    DualStore,
}

impl RepositoryPlan {
    /// Strategy table indexed by phase number - 1.
    const TABLE: [RepositoryPlan; 5] = [
        RepositoryPlan::DualStore,
        RepositoryPlan::DualStore,
        RepositoryPlan::DualStore,
        RepositoryPlan::DualStore,
        RepositoryPlan::SingleStore(StoreKind::Distributed),
    ];

    pub fn for_phase(phase: MigrationPhase) -> Self {
        Self::TABLE[usize::from(phase.number() - 1)]
    }
}

/// Where a single read goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadRoute {
    /// Store whose result is returned to the caller.
    pub primary: StoreKind,
    /// Store read for comparison only; its result never reaches the caller.
    pub shadow: Option<StoreKind>,
    /// Whether primary and shadow results are compared field by field.
    pub validate: bool,
}

impl ReadRoute {
    /// Resolves the route for a flag snapshot.
    ///
    /// `read_from_distributed` picks the primary store; in phase 1 without an
    /// override the factory's default store answers instead.
    pub fn for_flags(flags: &FeatureFlags, default_store: StoreKind) -> Self {
        let primary = if flags.read_from_distributed {
            StoreKind::Distributed
        } else if flags.migration_phase == MigrationPhase::RelationalOnly {
            default_store
        } else {
            StoreKind::Relational
        };
        let shadow = flags.dual_read_enabled.then(|| primary.other());
        Self {
            primary,
            shadow,
            validate: shadow.is_some() && flags.validation_enabled,
        }
    }
}

/// Where a single write goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WritePlan {
    /// Write one store only; its errors are the caller's errors.
    Single { store: StoreKind },
    /// Write the authoritative store, then mirror to the secondary.
    Dual {
        authoritative: StoreKind,
        secondary: StoreKind,
    },
}

impl WritePlan {
    /// Resolves the plan for a flag snapshot.
    ///
    /// Phase 1 writes go to `default_store`, like phase 1 reads; they are not
    /// pinned to the relational store.
    pub fn for_flags(
        flags: &FeatureFlags,
        default_store: StoreKind,
        authoritative: StoreKind,
    ) -> Self {
        if flags.dual_write_enabled {
            return WritePlan::Dual {
                authoritative,
                secondary: authoritative.other(),
            };
        }
        let store = if flags.read_from_distributed {
            StoreKind::Distributed
        } else if flags.migration_phase == MigrationPhase::RelationalOnly {
            default_store
        } else {
            StoreKind::Relational
        };
        WritePlan::Single { store }
    }

    /// Store whose result is returned to the caller.
    pub fn authoritative(&self) -> StoreKind {
        match self {
            WritePlan::Single { store } => *store,
            WritePlan::Dual { authoritative, .. } => *authoritative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::FlagName;

    fn flags(phase: u8) -> FeatureFlags {
        FeatureFlags::for_phase(MigrationPhase::try_from(phase).unwrap())
    }

    #[test]
    fn test_plan_table() {
        for phase in &MigrationPhase::ALL[..4] {
            assert_eq!(RepositoryPlan::for_phase(*phase), RepositoryPlan::DualStore);
        }
        assert_eq!(
            RepositoryPlan::for_phase(MigrationPhase::DistributedOnly),
            RepositoryPlan::SingleStore(StoreKind::Distributed)
        );
    }

    #[test]
    fn test_read_routes_per_phase() {
        let relational = StoreKind::Relational;
        let distributed = StoreKind::Distributed;

        assert_eq!(ReadRoute::for_flags(&flags(1), relational).primary, relational);
        assert_eq!(ReadRoute::for_flags(&flags(2), relational).primary, relational);
        assert_eq!(ReadRoute::for_flags(&flags(4), relational).primary, distributed);
        assert_eq!(ReadRoute::for_flags(&flags(5), relational).primary, distributed);

        let phase3 = ReadRoute::for_flags(&flags(3), relational);
        assert_eq!(phase3.primary, relational);
        assert_eq!(phase3.shadow, Some(distributed));
        assert!(phase3.validate);
    }

    #[test]
    fn test_phase_one_reads_from_default_store() {
        let route = ReadRoute::for_flags(&flags(1), StoreKind::Distributed);
        assert_eq!(route.primary, StoreKind::Distributed);
        assert_eq!(route.shadow, None);

        // The default store only matters in phase 1.
        let route = ReadRoute::for_flags(&flags(2), StoreKind::Distributed);
        assert_eq!(route.primary, StoreKind::Relational);
    }

    #[test]
    fn test_dual_read_without_validation_still_shadows() {
        let mut f = flags(3);
        f.set(FlagName::ValidationEnabled, false);
        let route = ReadRoute::for_flags(&f, StoreKind::Relational);
        assert_eq!(route.shadow, Some(StoreKind::Distributed));
        assert!(!route.validate);
    }

    #[test]
    fn test_shadow_follows_overridden_primary() {
        let mut f = flags(3);
        f.set(FlagName::ReadFromDistributed, true);
        let route = ReadRoute::for_flags(&f, StoreKind::Relational);
        assert_eq!(route.primary, StoreKind::Distributed);
        assert_eq!(route.shadow, Some(StoreKind::Relational));
    }

    #[test]
    fn test_write_plans_per_phase() {
        let relational = StoreKind::Relational;
        let dual = WritePlan::Dual {
            authoritative: StoreKind::Relational,
            secondary: StoreKind::Distributed,
        };

        assert_eq!(
            WritePlan::for_flags(&flags(1), relational, relational),
            WritePlan::Single { store: relational }
        );
        assert_eq!(WritePlan::for_flags(&flags(2), relational, relational), dual);
        assert_eq!(WritePlan::for_flags(&flags(3), relational, relational), dual);
        assert_eq!(WritePlan::for_flags(&flags(4), relational, relational), dual);
        assert_eq!(
            WritePlan::for_flags(&flags(5), relational, relational),
            WritePlan::Single {
                store: StoreKind::Distributed
            }
        );
    }

    #[test]
    fn test_phase_one_writes_follow_default_store() {
        let distributed = StoreKind::Distributed;
        assert_eq!(
            WritePlan::for_flags(&flags(1), distributed, StoreKind::Relational),
            WritePlan::Single { store: distributed }
        );
        assert_eq!(
            ReadRoute::for_flags(&flags(1), distributed).primary,
            WritePlan::for_flags(&flags(1), distributed, StoreKind::Relational).authoritative()
        );
    }

    #[test]
    fn test_authoritative_store_can_flip() {
        let plan = WritePlan::for_flags(&flags(4), StoreKind::Relational, StoreKind::Distributed);
        assert_eq!(
            plan,
            WritePlan::Dual {
                authoritative: StoreKind::Distributed,
                secondary: StoreKind::Relational,
            }
        );
        assert_eq!(plan.authoritative(), StoreKind::Distributed);
    }
}
