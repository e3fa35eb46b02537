//! [`Engine`] backed by the ffmpeg command line tool.
//!
//! The virtual filesystem is a scratch [`Workspace`]; `transcode` runs ffmpeg
//! with the workspace as its working directory so engine-local names are used
//! unchanged on the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rp_core::config::EngineConfig;
use rp_core::{Error, Result};

use crate::args::tokenize;
use crate::command::ToolCommand;
use crate::engine::{Engine, EngineFactory, LogEntry, Logger};
use crate::tools::ToolRegistry;
use crate::workspace::Workspace;

/// Timeout for the `-version` probe during load.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

struct Loaded {
    ffmpeg: PathBuf,
    workspace: Workspace,
}

pub struct FfmpegEngine {
    config: EngineConfig,
    tools: Arc<ToolRegistry>,
    logger: Logger,
    loaded: Option<Loaded>,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig, tools: Arc<ToolRegistry>, logger: Logger) -> Self {
        Self {
            config,
            tools,
            logger,
            loaded: None,
        }
    }

    fn loaded(&self) -> Result<&Loaded> {
        self.loaded
            .as_ref()
            .ok_or_else(|| Error::Engine("engine not loaded".into()))
    }

    fn log(&self, entry: LogEntry) {
        (self.logger)(entry);
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn load(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            return Err(Error::Engine("engine already loaded".into()));
        }

        let ffmpeg = self.tools.require("ffmpeg")?.path.clone();
        let probe = ToolCommand::new(ffmpeg.clone())
            .arg("-version")
            .timeout(PROBE_TIMEOUT)
            .execute()
            .await?;
        if let Some(banner) = probe.stdout.lines().next() {
            self.log(LogEntry::info(banner));
        }

        let workspace = Workspace::new(self.config.scratch_dir.as_deref())?;
        tracing::info!(
            ffmpeg = %ffmpeg.display(),
            workspace = %workspace.path().display(),
            "Engine loaded"
        );
        self.loaded = Some(Loaded { ffmpeg, workspace });
        Ok(())
    }

    async fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let loaded = self.loaded()?;
        loaded.workspace.write(name, data).await?;
        tracing::debug!("Wrote {} bytes to {name}", data.len());
        Ok(())
    }

    async fn transcode(&mut self, input: &str, output: &str, args: &str) -> Result<()> {
        let loaded = self.loaded()?;
        let options = tokenize(args)?;
        loaded.workspace.resolve(output)?;
        if !loaded.workspace.contains(input).await? {
            return Err(Error::not_found("file", input));
        }

        let mut cmd = ToolCommand::new(loaded.ffmpeg.clone());
        cmd.arg("-nostdin").arg("-y");
        if self.config.hide_banner {
            cmd.arg("-hide_banner");
        }
        cmd.arg("-i")
            .arg(input)
            .args(options)
            .arg(output)
            .current_dir(loaded.workspace.path())
            .timeout(Duration::from_secs(self.config.timeout_secs));

        self.log(LogEntry::command(format!(
            "run ffmpeg with args: {}",
            cmd.get_args().join(" ")
        )));
        tracing::info!("Running ffmpeg {}", cmd.get_args().join(" "));

        let logger = Arc::clone(&self.logger);
        cmd.execute_with_stderr_callback(move |line| logger(LogEntry::stderr(line)))
            .await?;

        tracing::info!("Transcode finished: {output}");
        Ok(())
    }

    async fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        self.loaded()?.workspace.read(name).await
    }
}

/// Creates one [`FfmpegEngine`] per run, sharing discovered tools.
pub struct FfmpegEngineFactory {
    config: EngineConfig,
    tools: Arc<ToolRegistry>,
}

impl FfmpegEngineFactory {
    pub fn new(config: EngineConfig, tools: Arc<ToolRegistry>) -> Self {
        Self { config, tools }
    }
}

impl EngineFactory for FfmpegEngineFactory {
    fn create(&self, logger: Logger) -> Box<dyn Engine> {
        Box::new(FfmpegEngine::new(
            self.config.clone(),
            Arc::clone(&self.tools),
            logger,
        ))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
