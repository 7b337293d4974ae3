use std::fmt;

/// A single timestamped line captured from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Local wall clock, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// Decoded, trimmed line text; never empty
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: String, message: String) -> Self {
        Self { timestamp, message }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.message)
    }
}

pub fn banner(timestamp: &str) -> String {
    format!("===== LOGS INICIADOS EM {} =====", timestamp)
}
