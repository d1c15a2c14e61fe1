//! Error types for dispatchq.

use thiserror::Error;

use crate::model::RequestId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dispatch queue closed")]
    QueueClosed,

    #[error("reply for request {0} dropped before completion")]
    ReplyDropped(RequestId),

    #[error("run interrupted before all producers finished")]
    Interrupted,

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
