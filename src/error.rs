use thiserror::Error;

impl From<sqlx::Error> for MonitorError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("no matching row".to_string()),
            other => Self::TransientIo(format!("Database error: {}", other)),
        }
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransientIo(format!("HTTP error: {}", err))
    }
}

impl From<::config::ConfigError> for MonitorError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Collector unavailable: {0}")]
    CollectorUnavailable(String),

    #[error("Delivery failed: {0}")]
    DeliveryError(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Whether the failure is expected to clear up on its own by the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientIo(_) | Self::CollectorUnavailable(_) | Self::DeliveryError(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn empty_field(field: &str) -> Self {
        Self::ValidationError(format!("{} must not be empty", field))
    }
}
