//! Builder for executing external tool commands with timeout support.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Number of stderr lines kept for error messages when streaming.
const STDERR_TAIL_LINES: usize = 20;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8). When the command was run with
    /// [`ToolCommand::execute_with_stderr_callback`] this holds only the last
    /// lines, the full stream having gone to the callback.
    pub stderr: String,
}

/// Splits a byte stream into lines on `\n` and `\r`.
///
/// ffmpeg redraws its progress line with bare carriage returns, so both
/// terminators end a line. Empty lines are dropped.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &b in chunk {
            if b == b'\n' || b == b'\r' {
                if !self.pending.is_empty() {
                    lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                    self.pending.clear();
                }
            } else {
                self.pending.push(b);
            }
        }
        lines
    }

    /// Return the unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            Some(line)
        }
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use rp_engine::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> rp_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    stdin_data: Option<Vec<u8>>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            stdin_data: None,
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Provide data to be written to the process's stdin.
    pub fn stdin(&mut self, data: Vec<u8>) -> &mut Self {
        self.stdin_data = Some(data);
        self
    }

    /// Run the process inside `dir`.
    pub fn current_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    fn spawn(&self) -> rp_core::Result<tokio::process::Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(if self.stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // A timed-out child is killed when its handle goes away.
        cmd.kill_on_drop(true);

        cmd.spawn()
            .map_err(|e| rp_core::Error::tool(self.program_name(), format!("failed to spawn: {e}")))
    }

    async fn feed_stdin(&self, child: &mut tokio::process::Child) -> rp_core::Result<()> {
        if let Some(ref data) = self.stdin_data {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(data).await.map_err(|e| {
                    rp_core::Error::tool(self.program_name(), format!("failed to write stdin: {e}"))
                })?;
                // Dropping stdin closes the pipe so the child can proceed.
            }
        }
        Ok(())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`rp_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`rp_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`rp_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> rp_core::Result<ToolOutput> {
        let program_name = self.program_name();
        let mut child = self.spawn()?;
        self.feed_stdin(&mut child).await?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(rp_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(rp_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            // The child was moved into the cancelled future; kill_on_drop
            // takes care of it.
            Err(_elapsed) => Err(rp_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    /// Execute the command, handing every stderr line to `on_line` as it
    /// arrives. Lines are split with [`LineSplitter`].
    ///
    /// Errors are the same as for [`ToolCommand::execute`]; the non-zero exit
    /// message carries the last stderr lines.
    pub async fn execute_with_stderr_callback(
        &self,
        mut on_line: impl FnMut(&str) + Send,
    ) -> rp_core::Result<ToolOutput> {
        let program_name = self.program_name();
        let mut child = self.spawn()?;
        self.feed_stdin(&mut child).await?;

        let mut stdout = child.stdout.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(ref mut out) = stdout {
                let _ = out.read_to_end(&mut buf).await;
            }
            buf
        });

        let mut stderr = child.stderr.take();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut record = |line: String, tail: &mut VecDeque<String>| {
            on_line(&line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        };

        let run = async {
            if let Some(ref mut err) = stderr {
                let mut splitter = LineSplitter::new();
                let mut chunk = vec![0u8; 8192];
                loop {
                    let n = err.read(&mut chunk).await?;
                    if n == 0 {
                        break;
                    }
                    for line in splitter.push(&chunk[..n]) {
                        record(line, &mut tail);
                    }
                }
                if let Some(line) = splitter.finish() {
                    record(line, &mut tail);
                }
            }
            child.wait().await
        };

        let result = tokio::time::timeout(self.timeout, run).await;

        let status = match result {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(rp_core::Error::tool(
                    program_name,
                    format!("I/O error waiting for process: {e}"),
                ))
            }
            Err(_elapsed) => {
                let _ = child.kill().await;
                stdout_task.abort();
                return Err(rp_core::Error::tool(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");

        if !status.success() {
            return Err(rp_core::Error::tool(
                program_name,
                format!("exited with status {status}: {}", stderr.trim()),
            ));
        }

        Ok(ToolOutput {
            status,
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr,
        })
    }
}
