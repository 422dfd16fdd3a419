use client::{ClientError, transport::TransportError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid setting: {0}")]
    Setting(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
