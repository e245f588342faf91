use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] core_queue::QueueError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for {command}")]
    MissingArgument { command: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
