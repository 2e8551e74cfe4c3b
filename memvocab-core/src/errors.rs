use thiserror::Error;

/// Domain errors surfaced by the storage layer.
///
/// Low-level database failures never escape the repositories un-normalized;
/// they are logged at the boundary and arrive here as `Storage` with a short
/// verb phrase, so `CoreError::Storage("save cards")` renders as
/// "failed to save cards in local storage".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("failed to {0} in local storage")]
    Storage(&'static str),

    #[error("malformed {collection} record: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },

    #[error("migration from v{from} to v{to} failed: {reason}")]
    Migration { from: u32, to: u32, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_message_shape() {
        let err = CoreError::Storage("save cards");
        assert_eq!(err.to_string(), "failed to save cards in local storage");
    }

    #[test]
    fn migration_message_shape() {
        let err = CoreError::Migration {
            from: 1,
            to: 2,
            reason: "boom".into(),
        };
        assert_eq!(err.to_string(), "migration from v1 to v2 failed: boom");
    }
}
