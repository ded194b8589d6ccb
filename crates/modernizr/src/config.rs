use std::{env, fmt::Display, num::ParseIntError, str::FromStr};

use modernizr_core::migration::{MigrationPhase, StoreKind, WritePolicy};

use crate::storage::DualStoreSettings;

/// Migration configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Phase the flag store starts in (default: 1)
    pub migration_phase: MigrationPhase,
    /// Store used for phase 1 reads and writes (default: relational)
    pub default_store: StoreKind,
    /// Store written first during dual writes (default: relational)
    pub authoritative_store: StoreKind,
    /// What dual writes do with the secondary store (default: best-effort)
    pub write_policy: WritePolicy,
    /// Maximum failed writes kept for reconciliation (default: 1,000)
    pub replication_log_max_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `MIGRATION_PHASE` - Starting phase, 1-5 (default: 1)
    /// - `DEFAULT_STORE` - `relational` or `distributed` (default: relational)
    /// - `AUTHORITATIVE_STORE` - `relational` or `distributed` (default: relational)
    /// - `WRITE_POLICY` - `synchronous`, `best-effort` or `queued` (default: best-effort)
    /// - `REPLICATION_LOG_MAX_SIZE` - Failed-write log size, at least 1 (default: 1,000)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            migration_phase: parse_or(
                &lookup,
                "MIGRATION_PHASE",
                MigrationPhase::default(),
                parse_phase,
            ),
            default_store: parse_var(&lookup, "DEFAULT_STORE"),
            authoritative_store: parse_var(&lookup, "AUTHORITATIVE_STORE"),
            write_policy: parse_var(&lookup, "WRITE_POLICY"),
            replication_log_max_size: parse_or(
                &lookup,
                "REPLICATION_LOG_MAX_SIZE",
                DEFAULT_REPLICATION_LOG_MAX_SIZE,
                parse_log_size,
            ),
        }
    }

    /// Routing settings for the dual-write wrappers.
    pub fn dual_store_settings(&self) -> DualStoreSettings {
        DualStoreSettings {
            policy: self.write_policy,
            default_store: self.default_store,
            authoritative: self.authoritative_store,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

const DEFAULT_REPLICATION_LOG_MAX_SIZE: usize = 1_000;

fn parse_phase(value: &str) -> Result<MigrationPhase, String> {
    let number: u8 = value.trim().parse().map_err(|err: ParseIntError| err.to_string())?;
    MigrationPhase::try_from(number).map_err(|err| err.to_string())
}

fn parse_log_size(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(err) => Err(err.to_string()),
    }
}

/// Parses `name` with `parse`, warning and using `default` when it is invalid.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> T {
    let Some(value) = lookup(name) else {
        return default;
    };
    parse(&value).unwrap_or_else(|err| {
        tracing::warn!(variable = name, %value, error = %err, "Ignoring invalid value");
        default
    })
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> T
where
    T: FromStr + Default,
    T::Err: Display,
{
    parse_or(lookup, name, T::default(), |value| {
        value.parse().map_err(|err: T::Err| err.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = config(&[]);

        assert_eq!(config.migration_phase, MigrationPhase::RelationalOnly);
        assert_eq!(config.default_store, StoreKind::Relational);
        assert_eq!(config.authoritative_store, StoreKind::Relational);
        assert_eq!(config.write_policy, WritePolicy::BestEffortSecondary);
        assert_eq!(config.replication_log_max_size, 1_000);
    }

    #[test]
    fn test_values_are_read() {
        let config = config(&[
            ("MIGRATION_PHASE", "3"),
            ("DEFAULT_STORE", "dynamodb"),
            ("AUTHORITATIVE_STORE", "distributed"),
            ("WRITE_POLICY", "queued"),
            ("REPLICATION_LOG_MAX_SIZE", "50"),
        ]);

        assert_eq!(config.migration_phase, MigrationPhase::DualRead);
        assert_eq!(config.default_store, StoreKind::Distributed);
        assert_eq!(config.authoritative_store, StoreKind::Distributed);
        assert_eq!(config.write_policy, WritePolicy::QueuedSecondary);
        assert_eq!(config.replication_log_max_size, 50);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = config(&[
            ("MIGRATION_PHASE", "9"),
            ("DEFAULT_STORE", "postgres"),
            ("WRITE_POLICY", "eventually"),
            ("REPLICATION_LOG_MAX_SIZE", "lots"),
        ]);

        assert_eq!(config.migration_phase, MigrationPhase::RelationalOnly);
        assert_eq!(config.default_store, StoreKind::Relational);
        assert_eq!(config.write_policy, WritePolicy::BestEffortSecondary);
        assert_eq!(config.replication_log_max_size, 1_000);
    }

    #[test]
    fn test_zero_log_size_falls_back_to_default() {
        let config = config(&[("REPLICATION_LOG_MAX_SIZE", "0")]);
        assert_eq!(config.replication_log_max_size, 1_000);

        assert_eq!(parse_log_size(" 25 "), Ok(25));
        assert_eq!(parse_log_size("0"), Err("must be at least 1".to_string()));
        assert!(parse_log_size("-3").is_err());
    }

    #[test]
    fn test_dual_store_settings() {
        let settings = config(&[("WRITE_POLICY", "sync")]).dual_store_settings();
        assert_eq!(settings.policy, WritePolicy::SynchronousBoth);
        assert_eq!(settings.authoritative, StoreKind::Relational);
    }
}
