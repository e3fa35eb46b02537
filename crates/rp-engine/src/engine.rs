//! The engine capability used by the form controller.
//!
//! An [`Engine`] owns a private virtual filesystem. The controller writes the
//! selected input into it, asks for a transcode between two names, and reads
//! the produced bytes back. Everything the engine wants to tell the user goes
//! through the [`Logger`] handed to [`EngineFactory::create`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Origin of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Engine lifecycle messages (load, version banner).
    Info,
    /// The command line about to be executed.
    Command,
    /// A line written by ffmpeg to stderr.
    Stderr,
}

/// A single message emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Info,
            message: message.into(),
        }
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Command,
            message: message.into(),
        }
    }

    pub fn stderr(message: impl Into<String>) -> Self {
        Self {
            kind: LogKind::Stderr,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Callback receiving every log line, possibly from another task.
pub type Logger = Arc<dyn Fn(LogEntry) + Send + Sync>;

/// A transcoding engine with its own virtual filesystem.
///
/// Instances are single-use: one instance serves exactly one form run. Call
/// order is `load`, `write`, `transcode`, `read`; any method other than
/// `load` fails until `load` succeeded.
#[async_trait]
pub trait Engine: Send {
    /// Prepare the engine (locate binaries, create the virtual filesystem).
    async fn load(&mut self) -> rp_core::Result<()>;

    /// Store `data` in the virtual filesystem under `name`.
    async fn write(&mut self, name: &str, data: &[u8]) -> rp_core::Result<()>;

    /// Transcode `input` into `output`. `args` is the raw option string; the
    /// engine decides how to split it into arguments.
    async fn transcode(&mut self, input: &str, output: &str, args: &str) -> rp_core::Result<()>;

    /// Fetch the bytes stored under `name`.
    async fn read(&mut self, name: &str) -> rp_core::Result<Vec<u8>>;
}

/// Creates a fresh [`Engine`] wired to a logger.
pub trait EngineFactory: Send + Sync {
    fn create(&self, logger: Logger) -> Box<dyn Engine>;

    /// Name shown in logs.
    fn name(&self) -> &str {
        "engine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn log_entry_constructors() {
        assert_eq!(LogEntry::info("a").kind, LogKind::Info);
        assert_eq!(LogEntry::command("b").kind, LogKind::Command);
        assert_eq!(LogEntry::stderr("c").kind, LogKind::Stderr);
        assert_eq!(LogEntry::stderr("frame=10").to_string(), "frame=10");
    }

    #[test]
    fn logger_is_shareable() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let logger: Logger = Arc::new(move |entry: LogEntry| {
            sink.lock().unwrap().push(entry.message);
        });

        let cloned = Arc::clone(&logger);
        std::thread::spawn(move || cloned(LogEntry::info("from thread")))
            .join()
            .unwrap();
        logger(LogEntry::info("from main"));

        assert_eq!(*seen.lock().unwrap(), vec!["from thread", "from main"]);
    }

    #[test]
    fn log_kind_serializes_snake_case() {
        let json = serde_json::to_string(&LogKind::Stderr).unwrap();
        assert_eq!(json, "\"stderr\"");
    }
}
