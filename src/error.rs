use thiserror::Error;

#[derive(Error, Debug)]
pub enum RentalError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage request failed: {reason}")]
    Store { reason: String },

    #[error("Resource not found: {id}")]
    ResourceNotFound { id: String },

    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Not enough capacity on {day}: {remaining} unit(s) left, {requested} requested")]
    CapacityExceeded {
        day: String,
        remaining: u32,
        requested: u32,
    },

    #[error("Minimum stay not met: {required} unit(s) required, {actual} selected")]
    MinimumStay { required: u32, actual: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl RentalError {
    /// True for failures of the backing stores, as opposed to rejected input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Store { .. } | Self::Io(_) | Self::Json(_) | Self::Url(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
