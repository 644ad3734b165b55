use thiserror::Error;

/// Failures of one collection cycle, scoped to a host token, a host or a database.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The configured host token is not `[alias@]host[:port]`.
    #[error("malformed host token {token:?}")]
    MalformedHost { token: String },

    /// The host could not be reached (refused, unresolvable, timed out).
    #[error("could not reach {host}: {reason}")]
    Connect { host: String, reason: String },

    /// The server rejected the selected database name.
    #[error("unknown database {database:?}")]
    UnknownDatabase { database: String },

    /// The server failed or rejected the request, including authentication failures.
    #[error("query failed: {reason}")]
    Query { reason: String },

    /// The query succeeded but returned no result blocks.
    #[error("empty result for database {database:?}")]
    EmptyResult { database: String },
}

impl CollectError {
    /// Whether the error means the whole host must be abandoned.
    #[must_use]
    pub const fn is_host_scoped(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_host_scoped() {
        let err = CollectError::Connect {
            host: "localhost:8086".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.is_host_scoped());
        assert_eq!(
            err.to_string(),
            "could not reach localhost:8086: connection refused"
        );
    }

    #[test]
    fn test_database_errors_are_not_host_scoped() {
        let errors = [
            CollectError::UnknownDatabase {
                database: "x".to_string(),
            },
            CollectError::Query {
                reason: "boom".to_string(),
            },
            CollectError::EmptyResult {
                database: "x".to_string(),
            },
        ];

        for err in &errors {
            assert!(!err.is_host_scoped(), "{err} should be database scoped");
        }
    }
}
