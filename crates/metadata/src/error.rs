use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("invalid market {platform}: {reason}")]
    InvalidMarket { platform: String, reason: String },
}

impl MetadataError {
    pub(crate) fn invalid_market(platform: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMarket {
            platform: platform.to_string(),
            reason: reason.into(),
        }
    }
}
