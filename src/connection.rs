use crate::decode::LineAssembler;
use crate::error::CaptureError;
use log::{debug, info, trace};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

const READ_CHUNK: usize = 1024;

/// Blocking line-read capability the capture loop drives.
pub trait LineSource {
    /// Returns the next line without its terminator, or an empty line when
    /// the read timeout elapses first. One call never blocks longer than a
    /// single timeout interval, however the bytes trickle in.
    fn read_line(&mut self) -> impl Future<Output = Result<Vec<u8>, CaptureError>>;

    /// Releases the underlying handle. Safe to call more than once.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Owns the byte stream to the device for the lifetime of one session.
///
/// A `Connection` only exists once the endpoint opened successfully; after
/// [`LineSource::close`] it cannot be reopened.
pub struct Connection<S = SerialStream> {
    port: String,
    stream: Option<S>,
    read_timeout: Duration,
    lines: LineAssembler,
}

impl Connection<SerialStream> {
    pub fn open(
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
        max_line_len: usize,
    ) -> Result<Self, CaptureError> {
        let stream = tokio_serial::new(port, baud_rate)
            .open_native_async()
            .map_err(|source| CaptureError::Connection {
                port: port.to_string(),
                source,
            })?;

        info!("Opened serial port {} at {} baud", port, baud_rate);
        Ok(Self::from_stream(port, stream, read_timeout, max_line_len))
    }
}

impl<S: AsyncRead + Unpin> Connection<S> {
    pub fn from_stream(port: &str, stream: S, read_timeout: Duration, max_line_len: usize) -> Self {
        Self {
            port: port.to_string(),
            stream: Some(stream),
            read_timeout,
            lines: LineAssembler::new(max_line_len),
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn state(&self) -> ConnectionState {
        if self.stream.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }
}

impl<S: AsyncRead + Unpin> LineSource for Connection<S> {
    async fn read_line(&mut self) -> Result<Vec<u8>, CaptureError> {
        let mut chunk = [0u8; READ_CHUNK];
        let deadline = Instant::now() + self.read_timeout;
        loop {
            if let Some(line) = self.lines.next_line() {
                trace!("Received line from {}: {} bytes", self.port, line.len());
                return Ok(line);
            }

            let stream = self.stream.as_mut().ok_or_else(|| {
                CaptureError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    format!("serial port {} is closed", self.port),
                ))
            })?;

            match timeout_at(deadline, stream.read(&mut chunk)).await {
                // Idle: keep any partial line for the next call
                Err(_) => {
                    if self.lines.pending() > 0 {
                        trace!("Read timeout with {} bytes pending", self.lines.pending());
                    }
                    return Ok(Vec::new());
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(Vec::new()),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(0)) => {
                    debug!("End of stream on {}", self.port);
                    return match self.lines.take_partial() {
                        Some(partial) => Ok(partial),
                        None => Err(CaptureError::Disconnected {
                            port: self.port.clone(),
                        }),
                    };
                }
                Ok(Ok(n)) => self.lines.push(&chunk[..n]),
            }
        }
    }

    fn close(&mut self) {
        if self.state() == ConnectionState::Open {
            self.stream = None;
            info!("Closed serial port {}", self.port);
        }
    }
}
