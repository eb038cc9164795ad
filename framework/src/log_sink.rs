//! Append-only text log shared by the HTTP handlers and the worker.
//!
//! Every entry is a single line: `<RFC 3339 timestamp> <LEVEL> <message>`.
//! The same file is served back verbatim by `GET /logs`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;

/// Severity of a [`LogSink`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Handle to the log file. Cheap to clone; every clone appends to the same path.
#[derive(Debug, Clone)]
pub struct LogSink {
    path: Arc<PathBuf>,
}

impl LogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn info(&self, message: impl AsRef<str>) -> std::io::Result<()> {
        self.append(Level::Info, message.as_ref()).await
    }

    pub async fn error(&self, message: impl AsRef<str>) -> std::io::Result<()> {
        self.append(Level::Error, message.as_ref()).await
    }

    /// Append one entry, creating the file if needed.
    ///
    /// The line is written with a single `write_all` on a file opened in
    /// append mode, so concurrent appenders in one process never interleave
    /// within a line.
    pub async fn append(&self, level: Level, message: &str) -> std::io::Result<()> {
        let line = format_line(OffsetDateTime::now_utc(), level, message);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Read the whole file.
    pub async fn read_all(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(self.path.as_ref()).await
    }
}

/// Render an entry. Line breaks in `message` are escaped so an entry never
/// spans more than one line.
fn format_line(at: OffsetDateTime, level: Level, message: &str) -> String {
    let timestamp = at
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    let message = message.replace('\r', "\\r").replace('\n', "\\n");
    format!("{timestamp} {level} {message}\n")
}
