use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid key: {key}")]
    Validation { key: String },
    #[error("payment request is missing a `data` object")]
    MissingData,
    #[error("merge error: {0}")]
    Merge(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid bridge state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("channel error: {0}")]
    Channel(String),
    #[error("channel closed before a payment outcome was received")]
    ChannelClosed,
    #[error("no payment outcome received within {0:?}")]
    Timeout(Duration),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
