use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::MigrationError;

/// How far the cutover from the relational store to the distributed store has progressed.
///
/// Phases are totally ordered but transitions are unrestricted: operators may
/// jump forward or roll back to any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MigrationPhase {
    /// Read and write the relational store only.
    RelationalOnly = 1,
    /// Write both stores, read the relational store.
    DualWrite = 2,
    /// Write both stores, read both and validate.
    DualRead = 3,
    /// Write both stores, read the distributed store.
    DistributedRead = 4,
    /// Read and write the distributed store only.
    DistributedOnly = 5,
}

impl MigrationPhase {
    /// Every phase in migration order.
    pub const ALL: [MigrationPhase; 5] = [
        MigrationPhase::RelationalOnly,
        MigrationPhase::DualWrite,
        MigrationPhase::DualRead,
        MigrationPhase::DistributedRead,
        MigrationPhase::DistributedOnly,
    ];

    /// Returns the phase number (1-5).
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Short human-readable description used in logs and CLI output.
    pub fn description(&self) -> &'static str {
        match self {
            MigrationPhase::RelationalOnly => "relational only",
            MigrationPhase::DualWrite => "dual write, relational read",
            MigrationPhase::DualRead => "dual write, dual read with validation",
            MigrationPhase::DistributedRead => "dual write, distributed read",
            MigrationPhase::DistributedOnly => "distributed only",
        }
    }
}

impl Default for MigrationPhase {
    fn default() -> Self {
        MigrationPhase::RelationalOnly
    }
}

impl TryFrom<u8> for MigrationPhase {
    type Error = MigrationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MigrationPhase::RelationalOnly),
            2 => Ok(MigrationPhase::DualWrite),
            3 => Ok(MigrationPhase::DualRead),
            4 => Ok(MigrationPhase::DistributedRead),
            5 => Ok(MigrationPhase::DistributedOnly),
            other => Err(MigrationError::InvalidPhase(other)),
        }
    }
}

impl From<MigrationPhase> for u8 {
    fn from(phase: MigrationPhase) -> Self {
        phase.number()
    }
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One of the two backing stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// The current system of record, e.g. MySQL.
    Relational,
    /// The migration target, e.g. DynamoDB.
    Distributed,
}

impl StoreKind {
    /// Returns the other store.
    pub fn other(&self) -> StoreKind {
        match self {
            StoreKind::Relational => StoreKind::Distributed,
            StoreKind::Distributed => StoreKind::Relational,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Relational => "relational",
            StoreKind::Distributed => "distributed",
        }
    }
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::Relational
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" | "mysql" => Ok(StoreKind::Relational),
            "distributed" | "dynamodb" => Ok(StoreKind::Distributed),
            other => Err(MigrationError::UnknownStore(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_valid_numbers() {
        for (n, phase) in (1u8..=5).zip(MigrationPhase::ALL) {
            assert_eq!(MigrationPhase::try_from(n), Ok(phase));
            assert_eq!(phase.number(), n);
        }
    }

    #[test]
    fn test_phase_rejects_out_of_range() {
        assert_eq!(
            MigrationPhase::try_from(0),
            Err(MigrationError::InvalidPhase(0))
        );
        assert_eq!(
            MigrationPhase::try_from(6),
            Err(MigrationError::InvalidPhase(6))
        );
    }

    #[test]
    fn test_phases_are_ordered() {
        assert!(MigrationPhase::RelationalOnly < MigrationPhase::DualWrite);
        assert!(MigrationPhase::DistributedRead < MigrationPhase::DistributedOnly);
    }

    #[test]
    fn test_phase_serializes_as_number() {
        let json = serde_json::to_string(&MigrationPhase::DualRead).unwrap();
        assert_eq!(json, "3");
        let phase: MigrationPhase = serde_json::from_str("4").unwrap();
        assert_eq!(phase, MigrationPhase::DistributedRead);
        assert!(serde_json::from_str::<MigrationPhase>("9").is_err());
    }

    #[test]
    fn test_store_kind_parsing_accepts_aliases() {
        assert_eq!("mysql".parse::<StoreKind>(), Ok(StoreKind::Relational));
        assert_eq!("DynamoDB".parse::<StoreKind>(), Ok(StoreKind::Distributed));
        assert!("postgres".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_store_kind_other() {
        assert_eq!(StoreKind::Relational.other(), StoreKind::Distributed);
        assert_eq!(StoreKind::Distributed.other(), StoreKind::Relational);
    }
}
