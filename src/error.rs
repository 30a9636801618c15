use thiserror::Error;

/// Failures the aggregation engine and its boundary can report.
///
/// "User has no data" is never an error; it yields empty results.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("Invalid filter '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },
}

impl AnalyticsError {
    pub fn invalid_filter(field: &str, reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidFilter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_names_field() {
        let err = AnalyticsError::invalid_filter("from", "expected YYYY-MM-DD");
        assert_eq!(err.to_string(), "Invalid filter 'from': expected YYYY-MM-DD");
    }

    #[test]
    fn test_store_unavailable_keeps_context_chain() {
        let source = anyhow::anyhow!("connection refused").context("fetching transactions");
        let err = AnalyticsError::StoreUnavailable(source);
        assert_eq!(
            err.to_string(),
            "Store unavailable: fetching transactions: connection refused"
        );
    }
}
