#![forbid(unsafe_code)]

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Node creation failed: {0}")]
    NodeCreation(String),

    #[error("Invalid supervisor config: {0}")]
    Config(String),

    #[error("Supervisor already started")]
    AlreadyStarted,

    #[error("Supervisor stopped")]
    Stopped,
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
