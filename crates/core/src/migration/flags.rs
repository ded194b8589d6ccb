use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{MigrationError, MigrationPhase};

/// The migration phase plus the four routing flags derived from it.
///
/// Absent manual overrides, the booleans are a pure function of the phase
/// (see [`FeatureFlags::for_phase`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub migration_phase: MigrationPhase,
    pub dual_write_enabled: bool,
    pub dual_read_enabled: bool,
    #[serde(alias = "read_from_dynamodb")]
    pub read_from_distributed: bool,
    pub validation_enabled: bool,
}

impl FeatureFlags {
    /// Returns the canonical flag set for a phase.
    ///
    /// | phase | dual_write | dual_read | read_from_distributed | validation |
    /// |-------|------------|-----------|-----------------------|------------|
    /// | 1     | false      | false     | false                 | false      |
    /// | 2     | true       | false     | false                 | false      |
    /// | 3     | true       | true      | false                 | true       |
    /// | 4     | true       | false     | true                  | false      |
    /// | 5     | false      | false     | true                  | false      |
    pub const fn for_phase(phase: MigrationPhase) -> Self {
        let (dual_write_enabled, dual_read_enabled, read_from_distributed, validation_enabled) =
            match phase {
                MigrationPhase::RelationalOnly => (false, false, false, false),
                MigrationPhase::DualWrite => (true, false, false, false),
                MigrationPhase::DualRead => (true, true, false, true),
                MigrationPhase::DistributedRead => (true, false, true, false),
                MigrationPhase::DistributedOnly => (false, false, true, false),
            };
        Self {
            migration_phase: phase,
            dual_write_enabled,
            dual_read_enabled,
            read_from_distributed,
            validation_enabled,
        }
    }

    /// Returns the value of one derived flag.
    pub fn get(&self, flag: FlagName) -> bool {
        match flag {
            FlagName::DualWriteEnabled => self.dual_write_enabled,
            FlagName::DualReadEnabled => self.dual_read_enabled,
            FlagName::ReadFromDistributed => self.read_from_distributed,
            FlagName::ValidationEnabled => self.validation_enabled,
        }
    }

    /// Overrides one derived flag, leaving the phase untouched.
    pub fn set(&mut self, flag: FlagName, value: bool) {
        match flag {
            FlagName::DualWriteEnabled => self.dual_write_enabled = value,
            FlagName::DualReadEnabled => self.dual_read_enabled = value,
            FlagName::ReadFromDistributed => self.read_from_distributed = value,
            FlagName::ValidationEnabled => self.validation_enabled = value,
        }
    }

    /// Returns true if any flag differs from the phase's canonical values.
    pub fn is_overridden(&self) -> bool {
        *self != Self::for_phase(self.migration_phase)
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::for_phase(MigrationPhase::default())
    }
}

/// Names of the overridable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagName {
    DualWriteEnabled,
    DualReadEnabled,
    #[serde(alias = "read_from_dynamodb")]
    ReadFromDistributed,
    ValidationEnabled,
}

impl FlagName {
    pub const ALL: [FlagName; 4] = [
        FlagName::DualWriteEnabled,
        FlagName::DualReadEnabled,
        FlagName::ReadFromDistributed,
        FlagName::ValidationEnabled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlagName::DualWriteEnabled => "dual_write_enabled",
            FlagName::DualReadEnabled => "dual_read_enabled",
            FlagName::ReadFromDistributed => "read_from_distributed",
            FlagName::ValidationEnabled => "validation_enabled",
        }
    }
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FlagName {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dual_write_enabled" => Ok(FlagName::DualWriteEnabled),
            "dual_read_enabled" => Ok(FlagName::DualReadEnabled),
            "read_from_distributed" | "read_from_dynamodb" => Ok(FlagName::ReadFromDistributed),
            "validation_enabled" => Ok(FlagName::ValidationEnabled),
            other => Err(MigrationError::UnknownFlag(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(phase: u8) -> (bool, bool, bool, bool) {
        let flags = FeatureFlags::for_phase(MigrationPhase::try_from(phase).unwrap());
        (
            flags.dual_write_enabled,
            flags.dual_read_enabled,
            flags.read_from_distributed,
            flags.validation_enabled,
        )
    }

    #[test]
    fn test_phase_table() {
        assert_eq!(row(1), (false, false, false, false));
        assert_eq!(row(2), (true, false, false, false));
        assert_eq!(row(3), (true, true, false, true));
        assert_eq!(row(4), (true, false, true, false));
        assert_eq!(row(5), (false, false, true, false));
    }

    #[test]
    fn test_default_is_phase_one() {
        let flags = FeatureFlags::default();
        assert_eq!(flags.migration_phase, MigrationPhase::RelationalOnly);
        assert!(!flags.is_overridden());
    }

    #[test]
    fn test_set_marks_overridden_without_changing_phase() {
        let mut flags = FeatureFlags::for_phase(MigrationPhase::DualWrite);
        flags.set(FlagName::DualReadEnabled, true);

        assert!(flags.get(FlagName::DualReadEnabled));
        assert_eq!(flags.migration_phase, MigrationPhase::DualWrite);
        assert!(flags.is_overridden());
    }

    #[test]
    fn test_flag_name_parsing() {
        for flag in FlagName::ALL {
            assert_eq!(flag.as_str().parse::<FlagName>(), Ok(flag));
        }
        assert_eq!(
            "read_from_dynamodb".parse::<FlagName>(),
            Ok(FlagName::ReadFromDistributed)
        );
        assert_eq!(
            "migration_phase".parse::<FlagName>(),
            Err(MigrationError::UnknownFlag("migration_phase".to_string()))
        );
    }

    #[test]
    fn test_flags_accept_legacy_field_name() {
        let json = r#"{
            "migration_phase": 4,
            "dual_write_enabled": true,
            "dual_read_enabled": false,
            "read_from_dynamodb": true,
            "validation_enabled": false
        }"#;
        let flags: FeatureFlags = serde_json::from_str(json).unwrap();
        assert_eq!(
            flags,
            FeatureFlags::for_phase(MigrationPhase::DistributedRead)
        );
    }
}
