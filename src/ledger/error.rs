//! Ledger client error type.

/// Errors returned by [`LedgerClient`](super::LedgerClient).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Transport-level request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The indexer API answered with a non-success HTTP status.
    #[error("indexer API returned status {0}")]
    Status(u16),

    /// The GraphQL response carried errors instead of data.
    #[error("graphql error: {0}")]
    Graphql(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_display_graphql() {
        let err = LedgerError::Graphql("field not found".to_string());
        assert_eq!(err.to_string(), "graphql error: field not found");
    }

    #[test]
    fn test_display_status() {
        let err = LedgerError::Status(502);
        assert!(err.to_string().contains("502"));
    }
}
