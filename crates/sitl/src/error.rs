/// Errors that can occur during simulator operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("Invalid vehicle configuration: {0}")]
    InvalidConfig(String),

    #[error("MAVLink encode failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
