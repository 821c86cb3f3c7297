use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Delivery error: {channel}: {message}")]
    Delivery { channel: String, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        AppError::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn delivery(channel: impl Into<String>, message: impl ToString) -> Self {
        AppError::Delivery {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Fetch { .. } | AppError::Http(_) => 2,
            AppError::Extraction(_) | AppError::NoData(_) => 3,
            AppError::Persistence(_) => 4,
            _ => 1,
        }
    }

    /// Whether the run may be retried on the next tick without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Fetch { .. } | AppError::Http(_) | AppError::Delivery { .. })
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
