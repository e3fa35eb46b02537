//! # rp-engine
//!
//! The transcoding engine behind the reelpress form.
//!
//! This crate provides:
//!
//! - **Engine capability** ([`Engine`], [`EngineFactory`]) -- the
//!   `load`/`write`/`transcode`/`read` interface plus a log callback, so the
//!   form controller can be driven by ffmpeg or by a test double.
//! - **ffmpeg engine** ([`FfmpegEngine`]) -- runs the ffmpeg CLI against a
//!   private scratch directory that acts as the engine's virtual filesystem.
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support and line-by-line stderr streaming.
//! - **Workspace management** ([`Workspace`]) -- flat-named files inside a
//!   temporary directory.
//! - **Argument tokenizing** ([`args::tokenize`]) -- split an option string
//!   into process arguments, honouring quotes.

pub mod args;
pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{LineSplitter, ToolCommand, ToolOutput};
pub use engine::{Engine, EngineFactory, LogEntry, LogKind, Logger};
pub use ffmpeg::{FfmpegEngine, FfmpegEngineFactory};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::Workspace;
