use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::MigrationError;

/// What a dual write does with the secondary store.
///
/// The authoritative write always runs first and its errors always reach the
/// caller. The policy only governs the mirrored write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WritePolicy {
    /// Await the secondary write and fail the call if it fails.
    SynchronousBoth,
    /// Await the secondary write; log and count failures, never fail the call.
    BestEffortSecondary,
    /// Spawn the secondary write in the background and return immediately.
    QueuedSecondary,
}

impl WritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritePolicy::SynchronousBoth => "synchronous",
            WritePolicy::BestEffortSecondary => "best-effort",
            WritePolicy::QueuedSecondary => "queued",
        }
    }
}

impl Default for WritePolicy {
    fn default() -> Self {
        WritePolicy::BestEffortSecondary
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WritePolicy {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synchronous" | "synchronous-both" | "sync" => Ok(WritePolicy::SynchronousBoth),
            "best-effort" | "best-effort-secondary" => Ok(WritePolicy::BestEffortSecondary),
            "queued" | "queued-secondary" | "async" => Ok(WritePolicy::QueuedSecondary),
            other => Err(MigrationError::UnknownPolicy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_best_effort() {
        assert_eq!(WritePolicy::default(), WritePolicy::BestEffortSecondary);
    }

    #[test]
    fn test_parse_policies() {
        assert_eq!("sync".parse::<WritePolicy>(), Ok(WritePolicy::SynchronousBoth));
        assert_eq!("Best-Effort".parse::<WritePolicy>(), Ok(WritePolicy::BestEffortSecondary));
        assert_eq!("queued".parse::<WritePolicy>(), Ok(WritePolicy::QueuedSecondary));
        assert_eq!(
            "eventually".parse::<WritePolicy>(),
            Err(MigrationError::UnknownPolicy("eventually".to_string()))
        );
    }
}
