use thiserror::Error;

/// Errors raised by the migration control surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Invalid migration phase {0}: must be between 1 and 5")]
    InvalidPhase(u8),
    #[error("Unknown feature flag: {0}")]
    UnknownFlag(String),
    #[error("Unknown store: {0} (expected 'relational' or 'distributed')")]
    UnknownStore(String),
    #[error("Unknown write policy: {0} (expected 'synchronous', 'best-effort' or 'queued')")]
    UnknownPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_phase_display() {
        assert_eq!(
            MigrationError::InvalidPhase(7).to_string(),
            "Invalid migration phase 7: must be between 1 and 5"
        );
    }

    #[test]
    fn test_unknown_flag_display() {
        assert_eq!(
            MigrationError::UnknownFlag("turbo".to_string()).to_string(),
            "Unknown feature flag: turbo"
        );
    }
}
