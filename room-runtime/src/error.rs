use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoomError {
    #[error("Component not running: {0}")]
    NotRunning(&'static str),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: String, need: String },

    #[error("Invalid quote from router: {0}")]
    InvalidQuote(String),

    #[error("Faucet queue is full")]
    FaucetQueueFull,

    #[error("Faucet wallet underfunded: balance {balance}, minimum {minimum}")]
    FaucetUnderfunded { balance: String, minimum: String },

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error("Chain error: {0}")]
    ChainError(String),

    #[error("Prompt fetch failed: {0}")]
    PromptFetch(String),

    #[error("Chat completion error: {0}")]
    LlmError(String),

    #[error("Unknown room: {0}")]
    UnknownRoom(u64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl From<reqwest::Error> for RoomError {
    fn from(e: reqwest::Error) -> Self {
        RoomError::HttpError(e.to_string())
    }
}

impl From<serde_json::Error> for RoomError {
    fn from(e: serde_json::Error) -> Self {
        RoomError::SerializationError(e.to_string())
    }
}
