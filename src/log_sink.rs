use crate::log_entry::{banner, LogEntry};
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

/// Durable persistence plus console mirroring for captured entries.
pub trait EntrySink {
    /// Returns only once the entry is flushed to storage.
    fn append(&mut self, entry: &LogEntry) -> io::Result<()>;

    /// Best-effort console copy of an entry.
    fn echo(&mut self, entry: &LogEntry);
}

/// Creates the session log with its banner if `path` does not exist yet.
///
/// Returns `true` when the file was created. An existing file is left
/// untouched.
pub fn ensure_initialized(path: &Path, timestamp: &str) -> io::Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!("Session log {} already exists", path.display());
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    file.write_all(format!("{}\n", banner(timestamp)).as_bytes())?;
    file.sync_all()?;
    info!("Created session log {}", path.display());
    Ok(true)
}

/// Writes an operator-facing console line. A closed console is logged and
/// otherwise ignored; returns whether the line was written.
pub fn announce<W: Write>(console: &mut W, message: &str) -> bool {
    match writeln!(console, "{}", message).and_then(|_| console.flush()) {
        Ok(()) => true,
        Err(e) => {
            warn!("Console write failed: {}", e);
            false
        }
    }
}

pub struct LogSink<W: Write = Stdout> {
    path: PathBuf,
    file: File,
    console: W,
    echo_failed: bool,
}

impl LogSink<Stdout> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::with_console(path, io::stdout())
    }
}

impl<W: Write> LogSink<W> {
    pub fn with_console(path: &Path, console: W) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            console,
            echo_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<W: Write> EntrySink for LogSink<W> {
    fn append(&mut self, entry: &LogEntry) -> io::Result<()> {
        // One write per entry so concurrent readers only see whole lines
        let line = format!("{}\n", entry);
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()
    }

    fn echo(&mut self, entry: &LogEntry) {
        let result = writeln!(self.console, "{}", entry).and_then(|_| self.console.flush());
        if let Err(e) = result {
            if !self.echo_failed {
                warn!("Console echo failed, continuing with file only: {}", e);
                self.echo_failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct BrokenConsole;

    impl Write for BrokenConsole {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn entry(ts: &str, msg: &str) -> LogEntry {
        LogEntry::new(ts.to_string(), msg.to_string())
    }

    #[test]
    fn fresh_path_gets_exactly_one_banner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        assert!(ensure_initialized(&path, "2024-01-01 00:00:00").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "===== LOGS INICIADOS EM 2024-01-01 00:00:00 =====\n"
        );
    }

    #[test]
    fn existing_content_is_never_altered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        let previous = b"old banner\n[2023-01-01 00:00:00] old\npartial-without-newline";
        fs::write(&path, previous).unwrap();

        assert!(!ensure_initialized(&path, "2024-01-01 00:00:00").unwrap());
        assert!(!ensure_initialized(&path, "2024-01-01 00:00:01").unwrap());
        assert_eq!(fs::read(&path).unwrap(), previous);
    }

    #[test]
    fn appends_in_canonical_format_after_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        ensure_initialized(&path, "2024-01-01 00:00:00").unwrap();

        let mut sink = LogSink::with_console(&path, Vec::new()).unwrap();
        sink.append(&entry("2024-01-01 00:00:01", "a")).unwrap();
        sink.append(&entry("2024-01-01 00:00:02", "b")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "===== LOGS INICIADOS EM 2024-01-01 00:00:00 =====",
                "[2024-01-01 00:00:01] a",
                "[2024-01-01 00:00:02] b",
            ]
        );
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let mut first = LogSink::with_console(&path, Vec::new()).unwrap();
        first.append(&entry("2024-01-01 00:00:01", "run one")).unwrap();
        drop(first);

        let mut second = LogSink::with_console(&path, Vec::new()).unwrap();
        second.append(&entry("2024-01-02 00:00:01", "run two")).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-01 00:00:01] run one\n[2024-01-02 00:00:01] run two\n"
        );
    }

    #[test]
    fn echo_mirrors_entry_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        let mut sink = LogSink::with_console(&path, Vec::new()).unwrap();

        sink.echo(&entry("2024-01-01 00:00:01", "hello"));
        assert_eq!(sink.console, b"[2024-01-01 00:00:01] hello\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn announce_writes_line_and_survives_closed_console() {
        let mut console = Vec::new();
        assert!(announce(&mut console, "Connected to serial port /dev/ttyACM0"));
        assert_eq!(console, b"Connected to serial port /dev/ttyACM0\n");

        assert!(!announce(&mut BrokenConsole, "Log capture stopped by user."));
    }

    #[test]
    fn console_failure_does_not_block_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");
        let mut sink = LogSink::with_console(&path, BrokenConsole).unwrap();

        let e = entry("2024-01-01 00:00:01", "still persisted");
        sink.echo(&e);
        sink.append(&e).unwrap();
        sink.echo(&e);

        assert!(sink.echo_failed);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[2024-01-01 00:00:01] still persisted\n"
        );
    }
}
