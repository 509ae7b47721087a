//! Access log writer module
//!
//! Thread-safe access log output to stdout or an append-only file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Global access log writer instance
static ACCESS_WRITER: OnceLock<AccessWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    File(Mutex<File>),
}

/// Thread-safe access log writer
pub struct AccessWriter {
    target: LogTarget,
}

impl AccessWriter {
    fn new(access_log_file: Option<&str>) -> io::Result<Self> {
        let target = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };
        Ok(Self { target })
    }

    /// Write one access log line
    pub fn write_access(&self, message: &str) {
        match &self.target {
            LogTarget::Stdout => {
                let mut out = io::stdout().lock();
                let _ = writeln!(out, "{message}");
            }
            LogTarget::File(file) => {
                if let Ok(mut f) = file.lock() {
                    if let Err(e) = writeln!(f, "{message}") {
                        tracing::warn!(error = %e, "failed to write access log");
                    }
                }
            }
        }
    }
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global access log writer
///
/// Returns error if the log file cannot be opened or the writer is already set.
pub fn init(access_log_file: Option<&str>) -> io::Result<()> {
    let writer = AccessWriter::new(access_log_file)?;
    ACCESS_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "Access log writer already initialized",
        )
    })
}

/// Get the global access log writer, `None` before `init()`
pub fn get() -> Option<&'static AccessWriter> {
    ACCESS_WRITER.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_target_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/access.log");
        let path_str = path.to_str().unwrap();

        let writer = AccessWriter::new(Some(path_str)).unwrap();
        writer.write_access("first");
        writer.write_access("second");

        let reopened = AccessWriter::new(Some(path_str)).unwrap();
        reopened.write_access("third");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\nthird\n");
    }
}
