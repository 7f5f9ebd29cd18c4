//! Subprocess spawning and line streaming

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use droidflash_core::prelude::*;

use crate::tool::Tool;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs tool invocations against one device session
///
/// Every invocation streams its output lines over the `lines` channel (the
/// receiver typically feeds the progress parser and the advanced-output
/// display) and resolves to a terminal boolean. Cloning is cheap; the
/// controller clones a runner into the task executing each operation.
///
/// There is no cancellation: once spawned, an invocation runs until its child
/// exits. The timing knobs exist so tests can compress the inter-stage delays
/// and wait loops that pace a real device.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    bin_dir: PathBuf,
    assets_dir: PathBuf,
    lines: mpsc::Sender<String>,
    pub(crate) delay_unit: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) max_polls: usize,
}

impl ToolRunner {
    /// Create a runner streaming output lines to `lines`
    pub fn new(bin_dir: PathBuf, assets_dir: PathBuf, lines: mpsc::Sender<String>) -> Self {
        Self {
            bin_dir,
            assets_dir,
            lines,
            delay_unit: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
            max_polls: 300,
        }
    }

    /// Create a runner that discards output lines (detection probes, CLI)
    pub fn detached(bin_dir: PathBuf, assets_dir: PathBuf) -> Self {
        let (lines, _) = mpsc::channel(1);
        Self::new(bin_dir, assets_dir, lines)
    }

    /// Override the unit used for inter-stage delays (tests pass zero)
    pub fn with_delay_unit(mut self, delay_unit: Duration) -> Self {
        self.delay_unit = delay_unit;
        self
    }

    /// Override the wait-loop policy (poll interval and retry bound)
    pub fn with_wait_policy(mut self, poll_interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// Resolve a bundled payload (helper files, scripts) in the assets dir
    pub(crate) fn asset(&self, name: &str) -> PathBuf {
        self.assets_dir.join(name)
    }

    /// Sleep for `seconds` delay units between pipeline stages
    pub(crate) async fn pause(&self, seconds: u32) {
        tokio::time::sleep(self.delay_unit * seconds).await;
    }

    pub(crate) async fn emit(&self, line: impl Into<String>) {
        let _ = self.lines.send(line.into()).await;
    }

    /// Run one tool invocation, streaming output, logging the command line
    pub(crate) async fn stream(&self, tool: Tool, args: &[&str]) -> bool {
        self.stream_inner(tool, args, true).await
    }

    /// Like [`stream`](Self::stream) but without invocation logging, for
    /// low-value polling commands that would flood the log
    pub(crate) async fn stream_quiet(&self, tool: Tool, args: &[&str]) -> bool {
        self.stream_inner(tool, args, false).await
    }

    async fn stream_inner(&self, tool: Tool, args: &[&str], log: bool) -> bool {
        let exe = tool.executable(&self.bin_dir);
        if log {
            info!("Run command: {} {}", exe.display(), args.join(" "));
        }
        self.emit(format!("$ {} {}", tool, args.join(" "))).await;

        let mut command = Command::new(&exe);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("Failed to run {}: {e}", exe.display());
                self.emit(format!("Failed to run {tool}: {e}")).await;
                return false;
            }
        };

        let stdout = child.stdout.take().expect("stdout was configured");
        let stdout_task = tokio::spawn(Self::forward_lines(
            stdout,
            self.lines.clone(),
            tool,
            log,
        ));

        let stderr = child.stderr.take().expect("stderr was configured");
        let stderr_task = tokio::spawn(Self::forward_lines(
            stderr,
            self.lines.clone(),
            tool,
            log,
        ));

        // Drain both pipes to EOF before consulting the exit status, so the
        // terminal signal always arrives after the last output line.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        match child.wait().await {
            Ok(status) => {
                if log {
                    debug!("{tool} exited with status: {status:?}");
                }
                status.success()
            }
            Err(e) => {
                error!("Error waiting for {tool}: {e}");
                false
            }
        }
    }

    /// Forward each line from a child pipe to the output channel
    ///
    /// If the receiver goes away we keep reading to EOF (the child must not
    /// block on a full pipe) but stop sending.
    async fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>, tool: Tool, log: bool)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(pipe).lines();
        let mut sink_open = true;

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim_end().to_string();
            if log {
                debug!("{tool}: {line}");
            }
            if sink_open && tx.send(line).await.is_err() {
                sink_open = false;
            }
        }
    }

    /// Run one invocation quietly and capture its merged output
    ///
    /// Used for polling probes (`fastboot devices`, `heimdall detect`,
    /// `getprop`) whose output is inspected rather than shown.
    pub(crate) async fn capture(&self, tool: Tool, args: &[&str]) -> (String, bool) {
        let exe = tool.executable(&self.bin_dir);
        debug!("Run command (captured): {} {}", exe.display(), args.join(" "));

        let mut command = Command::new(&exe);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        match command.output().await {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                (text, output.status.success())
            }
            Err(e) => {
                debug!("Failed to run {}: {e}", exe.display());
                (String::new(), false)
            }
        }
    }
}

/// Uniform wrapper applied to every named operation: log the step
/// description, run it, and log an error when its terminal signal is `false`.
pub(crate) async fn logged<F>(desc: &str, op: F) -> bool
where
    F: std::future::Future<Output = bool>,
{
    info!("{desc}");
    let ok = op.await;
    if !ok {
        error!("{desc} failed");
    }
    ok
}

/// Turn a path into a command-line argument
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
