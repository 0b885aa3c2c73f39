use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesseraError {
    #[error("invalid layout '{0}'")]
    InvalidLayout(String),

    #[error("invalid group-by '{0}'")]
    InvalidGroupBy(String),

    #[error("invalid order-by '{0}'")]
    InvalidOrderBy(String),

    #[error("invalid priority '{0}'")]
    InvalidPriority(String),

    #[error("invalid state group '{0}'")]
    InvalidStateGroup(String),

    #[error("invalid issue type filter '{0}'")]
    InvalidIssueType(String),

    #[error("invalid filter key '{0}'")]
    InvalidFilterKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    /// The issue service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl TesseraError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        TesseraError::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the failure came from the service.
    pub fn status(&self) -> Option<u16> {
        match self {
            TesseraError::Api { status, .. } => Some(*status),
            TesseraError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TesseraError>;
