use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("could not open serial port {port}: {source}. Check that the board is connected.")]
    Connection {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("serial port {port} stopped delivering data")]
    Disconnected { port: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaptureError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CaptureError::Config(_) => 2,
            CaptureError::Connection { .. } => 3,
            CaptureError::Disconnected { .. } | CaptureError::Io(_) => 4,
        }
    }
}
