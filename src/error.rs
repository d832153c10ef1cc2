use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing required parameters for search by parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    #[error("Token request failed: {0}")]
    Auth(String),

    #[error("Catalogue search failed: {0}")]
    Search(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Unsupported archive format: {0}")]
    UnsupportedFormat(String),

    #[error("Unable to extract archive: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
