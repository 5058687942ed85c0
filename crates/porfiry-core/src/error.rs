use thiserror::Error;

pub type Result<T> = std::result::Result<T, PorfiryError>;

#[derive(Debug, Error)]
pub enum PorfiryError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt registry entry for chat key {key:?}")]
    CorruptRegistry { key: String },

    #[error("Messenger error: {0}")]
    Messenger(String),

    #[error("Invalid schedule: {0}")]
    Schedule(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
