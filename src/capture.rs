use crate::config::Config;
use crate::connection::{Connection, LineSource};
use crate::decode::decode_permissive;
use crate::error::CaptureError;
use crate::log_entry::LogEntry;
use crate::log_sink::{self, EntrySink, LogSink};
use crate::shutdown::Cancellation;
use crate::timestamp;
use chrono::{DateTime, Local};
use log::{debug, error, info};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    pub entries: usize,
}

/// Drives the read → timestamp → persist → echo cycle until cancelled or
/// until a read or append fails. The source is closed on every exit path.
pub struct CaptureLoop<C, S, F = fn() -> DateTime<Local>> {
    source: C,
    sink: S,
    clock: F,
    captured: usize,
}

impl<C: LineSource, S: EntrySink> CaptureLoop<C, S> {
    pub fn new(source: C, sink: S) -> Self {
        Self {
            source,
            sink,
            clock: Local::now,
            captured: 0,
        }
    }
}

impl<C, S, F> CaptureLoop<C, S, F>
where
    C: LineSource,
    S: EntrySink,
    F: FnMut() -> DateTime<Local>,
{
    pub fn with_clock<G>(self, clock: G) -> CaptureLoop<C, S, G>
    where
        G: FnMut() -> DateTime<Local>,
    {
        CaptureLoop {
            source: self.source,
            sink: self.sink,
            clock,
            captured: self.captured,
        }
    }

    pub async fn run(mut self, cancellation: &Cancellation) -> Result<CaptureSummary, CaptureError> {
        let result = self.capture(cancellation).await;
        self.source.close();

        match result {
            Ok(()) => {
                info!("Capture stopped after {} entries", self.captured);
                Ok(CaptureSummary {
                    entries: self.captured,
                })
            }
            Err(e) => {
                error!("Capture aborted after {} entries: {}", self.captured, e);
                Err(e)
            }
        }
    }

    async fn capture(&mut self, cancellation: &Cancellation) -> Result<(), CaptureError> {
        while !cancellation.is_cancelled() {
            let raw = self.source.read_line().await?;

            let text = decode_permissive(&raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let entry = LogEntry::new(timestamp::format(&(self.clock)()), text.to_string());
            self.sink.append(&entry)?;
            self.captured += 1;
            self.sink.echo(&entry);
        }

        debug!("Cancellation observed");
        Ok(())
    }
}

/// Runs one full capture session against the configured port and log file.
pub async fn run(config: &Config, cancellation: &Cancellation) -> Result<CaptureSummary, CaptureError> {
    let started = timestamp::format(&Local::now());
    log_sink::ensure_initialized(&config.log_file, &started)?;

    let connection = Connection::open(
        &config.port,
        config.baud_rate,
        config.read_timeout(),
        config.max_line_len,
    )?;
    let sink = LogSink::open(&config.log_file)?;
    info!("Appending to {}", sink.path().display());

    log_sink::announce(
        &mut io::stdout(),
        &format!(
            "Connected to serial port {}, waiting for data...\n(Press Ctrl+C to stop)\n",
            connection.port()
        ),
    );

    CaptureLoop::new(connection, sink).run(cancellation).await
}
