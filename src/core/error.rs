use thiserror::Error;


#[derive(Error, Debug)]
pub enum TokobotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State store error: {0}")]
    State(String),

    #[error("Intent classification error: {0}")]
    Classification(String),

    #[error("Query reformulation error: {0}")]
    Reformulation(String),

    #[error("Search service error: {0}")]
    Search(String),

    #[error("Response generation error: {0}")]
    Response(String),

    #[error("Language model service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Language model misconfigured: {0}")]
    Misconfigured(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}


pub type Result<T> = std::result::Result<T, TokobotError>;
