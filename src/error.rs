use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to fetch build feed: {0}")]
    Fetch(String),

    #[error("Failed to deliver notification: {0}")]
    Notify(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MonitorError {
    /// Fetch failures are retried on the next cycle; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fetch_errors_are_retryable() {
        assert!(MonitorError::Fetch("timeout".to_string()).is_retryable());
        assert!(!MonitorError::Notify("channel_not_found".to_string()).is_retryable());
        assert!(!MonitorError::Config("no channel".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_transport_errors_convert_to_network() {
        let err: MonitorError = reqwest::get("http://127.0.0.1:9/").await.unwrap_err().into();

        assert!(matches!(err, MonitorError::Network(_)));
        assert!(!err.is_retryable());
    }
}
