//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.
//!
//! Development mode renders colorized human-readable lines on the console.
//! Production mode renders newline-delimited JSON on the console and
//! additionally writes error-level records to a size-rotated `error.log`
//! and all records to a size-rotated `combined.log`.

use crate::config::ObservabilityConfig;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

static INIT: Once = Once::new();

/// Keeps the non-blocking file writer workers alive
///
/// Dropping the guards flushes and stops the background writers, so the
/// caller (normally `main`) must hold this for the process lifetime.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Initialize tracing subscriber for structured logging
///
/// This can only be called once per process. Subsequent calls are silently
/// ignored and return `None`.
///
/// Reads log level from RUST_LOG environment variable, defaulting to the
/// level specified in config (or "info" if not set).
pub fn init(config: &ObservabilityConfig) -> Option<LogGuards> {
    let mut guards = None;
    INIT.call_once(|| {
        guards = Some(init_subscriber(config));
    });
    guards
}

fn init_subscriber(config: &ObservabilityConfig) -> LogGuards {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "crmwatch={},tower_http=debug",
            config.log_level
        ))
    });

    if !config.environment.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(true))
            .init();
        return LogGuards { _guards: Vec::new() };
    }

    let log_dir = PathBuf::from(&config.log_dir);

    let error_writer = RotatingFileWriter::new(
        log_dir.join("error.log"),
        config.log_file_max_bytes,
        config.log_file_max_count,
    );
    let (error_nb, error_guard) = tracing_appender::non_blocking(error_writer);

    let combined_writer = RotatingFileWriter::new(
        log_dir.join("combined.log"),
        config.log_file_max_bytes,
        config.log_file_max_count,
    );
    let (combined_nb, combined_guard) = tracing_appender::non_blocking(combined_writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_ansi(false))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(combined_nb),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(error_nb)
                .with_filter(LevelFilter::ERROR),
        )
        .init();

    LogGuards {
        _guards: vec![error_guard, combined_guard],
    }
}

/// Size-rotated log file writer
///
/// Rotates `name.log` to `name.log.1`, shifting older rotations up to
/// `max_files` total files and deleting the oldest. All filesystem errors
/// are swallowed: a failing log sink must never abort the host process,
/// so `write` always reports the full buffer as written.
pub struct RotatingFileWriter {
    path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    file: Option<File>,
    written: u64,
}

impl RotatingFileWriter {
    /// Create a writer for `path`, capped at `max_bytes` per file with at
    /// most `max_files` files retained (the active file included).
    ///
    /// The file is opened lazily on first write.
    pub fn new(path: PathBuf, max_bytes: u64, max_files: usize) -> Self {
        Self {
            path,
            max_bytes,
            max_files: max_files.max(1),
            file: None,
            written: 0,
        }
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.path.display(), index))
    }

    fn ensure_open(&mut self) -> Option<&mut File> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => {
                    self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
                    self.file = Some(file);
                }
                Err(_) => return None,
            }
        }
        self.file.as_mut()
    }

    fn rotate(&mut self) {
        self.file = None;
        self.written = 0;

        // Oldest rotation falls off the end.
        let _ = std::fs::remove_file(self.rotated_path(self.max_files - 1));
        for index in (1..self.max_files - 1).rev() {
            let _ = std::fs::rename(self.rotated_path(index), self.rotated_path(index + 1));
        }
        if self.max_files > 1 {
            let _ = std::fs::rename(&self.path, self.rotated_path(1));
        } else {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    /// Current file path (used by tests)
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Open first so `written` reflects a pre-existing file's size.
        if self.file.is_none() {
            let _ = self.ensure_open();
        }

        // Never split a record across files. A single record larger than the
        // cap is written to a fresh file rather than rotating forever.
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate();
        }

        if let Some(file) = self.ensure_open() {
            match file.write_all(buf) {
                Ok(()) => self.written += buf.len() as u64,
                Err(_) => self.file = None,
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_record(writer: &mut RotatingFileWriter, len: usize) {
        let record = vec![b'x'; len];
        let written = writer.write(&record).expect("write never errors");
        assert_eq!(written, len);
    }

    #[test]
    fn test_writes_below_cap_do_not_rotate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("combined.log");
        let mut writer = RotatingFileWriter::new(path.clone(), 1024, 3);

        write_record(&mut writer, 100);
        write_record(&mut writer, 100);
        writer.flush().unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("combined.log.1").exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 200);
    }

    #[test]
    fn test_rotation_at_byte_cap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("combined.log");
        let mut writer = RotatingFileWriter::new(path.clone(), 150, 3);

        write_record(&mut writer, 100);
        // 100 + 100 > 150: rotates before the second record
        write_record(&mut writer, 100);
        writer.flush().unwrap();

        let rotated = dir.path().join("combined.log.1");
        assert!(rotated.exists(), "first file should be rotated to .1");
        assert_eq!(std::fs::metadata(&rotated).unwrap().len(), 100);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_retained_file_count_is_bounded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("error.log");
        let mut writer = RotatingFileWriter::new(path.clone(), 50, 3);

        // Force many rotations
        for _ in 0..10 {
            write_record(&mut writer, 40);
            write_record(&mut writer, 40);
        }
        writer.flush().unwrap();

        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(
            count <= 3,
            "at most max_files files should be retained, found {}",
            count
        );
        assert!(path.exists());
        assert!(!dir.path().join("error.log.3").exists());
    }

    #[test]
    fn test_oversized_record_written_whole() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("combined.log");
        let mut writer = RotatingFileWriter::new(path.clone(), 10, 2);

        write_record(&mut writer, 100);
        writer.flush().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 100);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        // The target path is an existing directory: every open fails.
        let mut writer = RotatingFileWriter::new(dir.path().to_path_buf(), 1024, 3);

        let result = writer.write(b"lost record");
        assert!(result.is_ok(), "sink failure must not surface to the caller");
        assert_eq!(result.unwrap(), b"lost record".len());
        assert!(writer.flush().is_ok());
    }

    #[test]
    fn test_append_resumes_existing_file_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("combined.log");
        std::fs::write(&path, vec![b'y'; 120]).unwrap();

        let mut writer = RotatingFileWriter::new(path.clone(), 150, 3);
        // 120 existing + 50 new > 150: must rotate instead of exceeding cap
        write_record(&mut writer, 50);
        writer.flush().unwrap();

        assert!(dir.path().join("combined.log.1").exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 50);
    }
}
