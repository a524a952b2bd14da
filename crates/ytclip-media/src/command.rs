//! FFmpeg command builder and a generic tool runner.

use std::collections::VecDeque;
use std::future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::tools::resolve_program;

/// Lines kept from each pipe for error reporting.
const TAIL_LINES: usize = 40;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Arguments before -i
    input_args: Vec<String>,
    /// Arguments after -i
    output_args: Vec<String>,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input-side seek, so decoding starts near the window.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Length of output to write.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Copy all streams without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-v".to_string(),
            self.log_level.clone(),
            "-progress".to_string(),
            "pipe:2".to_string(),
        ];
        args.extend(self.input_args.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// Which pipe carries the line-based progress output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPipe {
    Stdout,
    Stderr,
}

/// Captured tail of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Runs an external tool with line callbacks, cancellation and timeout.
///
/// The child is killed when cancellation fires or the timeout elapses.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout: Option<Duration>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the tool once the receiver observes `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `program` to completion.
    ///
    /// Every line on `pipe` is handed to `on_line`. A non-zero exit is
    /// reported as [`MediaError::ToolFailed`] carrying the stderr tail.
    pub async fn run<F>(
        &self,
        program: &Path,
        args: &[String],
        pipe: ProgressPipe,
        on_line: F,
    ) -> MediaResult<ToolOutput>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let tool = tool_name(program);
        let resolved = resolve_program(program).ok_or_else(|| MediaError::ToolNotFound {
            tool: tool.clone(),
            path: program.to_path_buf(),
        })?;

        debug!(tool = %tool, "Running: {} {}", resolved.display(), args.join(" "));

        let mut child = Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MediaError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let (out_cb, err_cb) = match pipe {
            ProgressPipe::Stdout => (Some(on_line), None),
            ProgressPipe::Stderr => (None, Some(on_line)),
        };
        let out_task = tokio::spawn(collect_lines(stdout, out_cb));
        let err_task = tokio::spawn(collect_lines(stderr, err_cb));

        let status = match self.wait_for_exit(&mut child, &tool).await {
            Ok(status) => status,
            Err(e) => {
                // Grandchildren may still hold the pipes open.
                out_task.abort();
                err_task.abort();
                return Err(e);
            }
        };

        let output = ToolOutput {
            stdout: out_task.await.unwrap_or_default().into(),
            stderr: err_task.await.unwrap_or_default().into(),
        };

        if status.success() {
            return Ok(output);
        }

        let message = output
            .stderr
            .iter()
            .rev()
            .find(|l| !l.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| format!("{} exited with {}", tool, status));
        Err(MediaError::tool_failed(
            tool,
            message,
            Some(output.stderr_text()),
            status.code(),
        ))
    }

    async fn wait_for_exit(&self, child: &mut Child, tool: &str) -> MediaResult<ExitStatus> {
        let cancelled = wait_cancelled(self.cancel_rx.clone());
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            status = child.wait() => Ok(status?),
            _ = cancelled => {
                info!(tool, "Cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
            _ = deadline => {
                let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(tool, "Timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

/// Resolves once the flag reads `true`; never resolves without a receiver.
async fn wait_cancelled(rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = rx else {
        return future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return future::pending().await;
        }
    }
}

async fn collect_lines<R, F>(reader: R, mut callback: Option<F>) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut tail = VecDeque::with_capacity(TAIL_LINES);
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(cb) = callback.as_mut() {
            cb(&line);
        }
        if tail.len() == TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail
}

fn tool_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
