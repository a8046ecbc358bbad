//! Error types for the resource pools

use crate::slots::EntryKey;
use thiserror::Error;

/// Error returned by a resource's teardown hook.
///
/// Teardown errors never propagate out of an eviction pass. They are logged
/// and counted in the pool metrics, and the pass carries on with the next
/// victim.
pub type TeardownError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("A pool for {kind} named {name:?} already exists")]
    DuplicatePool { kind: &'static str, name: String },

    #[error("No pool for {kind} named {name:?} is registered")]
    PoolNotFound { kind: &'static str, name: String },

    #[error("Entry {0} is not registered in this pool")]
    EntryNotFound(EntryKey),

    #[error("Entry {0} was returned more times than it was borrowed")]
    DoubleReturn(EntryKey),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),
}

/// Broad classification of a [`PoolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The call was made against bad configuration or unknown pools/entries.
    Configuration,

    /// The caller broke the borrow/return protocol. Pool state is unaffected.
    ProtocolViolation,
}

impl PoolError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::DoubleReturn(_) => ErrorClass::ProtocolViolation,
            Self::DuplicatePool { .. }
            | Self::PoolNotFound { .. }
            | Self::EntryNotFound(_)
            | Self::InvalidConfiguration(_) => ErrorClass::Configuration,
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        let key = EntryKey::new(3, 1);
        assert_eq!(PoolError::DoubleReturn(key).class(), ErrorClass::ProtocolViolation);
        assert_eq!(PoolError::EntryNotFound(key).class(), ErrorClass::Configuration);
        assert_eq!(
            PoolError::configuration("bad").class(),
            ErrorClass::Configuration
        );
    }

    #[test]
    fn test_error_messages() {
        let err = PoolError::DuplicatePool {
            kind: "Bullet",
            name: "enemy".to_string(),
        };
        assert_eq!(err.to_string(), "A pool for Bullet named \"enemy\" already exists");
        assert_eq!(
            PoolError::DoubleReturn(EntryKey::new(2, 0)).to_string(),
            "Entry #2v0 was returned more times than it was borrowed"
        );
    }
}
