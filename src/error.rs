use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExoMercatError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No '{catalog}' snapshot on or before {date}")]
    MissingInput { catalog: String, date: String },

    #[error("Resolver services unreachable: {0}")]
    ResolverUnavailable(String),

    #[error("Resolver error: {message}")]
    Resolver { message: String },

    #[error("Consistency check failed: {message}")]
    Check { message: String },
}

pub type Result<T> = std::result::Result<T, ExoMercatError>;
