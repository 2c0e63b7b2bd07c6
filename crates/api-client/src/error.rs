use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("The provider returned an error ({code}): {description}")]
    Provider { code: String, description: String },

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),
}
