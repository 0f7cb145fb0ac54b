/// External command execution
///
/// Every delegated tool call goes through [`CommandRunner`], which runs the
/// command to completion, streams its output into the run log line by line and
/// hands back the exit code. Callers decide what a non-zero code means.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::error::ToolError;
use crate::utils::{mask_password_arg, shell_quote};

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line safe for logs (passwords masked)
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| mask_password_arg(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Command line quoted for `bash -c`
    pub fn to_shell(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|w| shell_quote(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion; `Ok(None)` means the process ended without an exit code
    async fn run(&self, invocation: &Invocation) -> Result<Option<i64>, ToolError>;

    /// Check the execution environment before the first step
    async fn preflight(&self) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Runs commands directly on the host
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Log every line of `stream` until EOF; undecodable bytes are replaced
async fn forward_lines<R>(stream: R)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                info!(target: "tool", "{}", line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                // Keep the pipe open so the child never sees SIGPIPE
                warn!("Failed to read tool output: {}", e);
                let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                break;
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<Option<i64>, ToolError> {
        debug!("Spawning {}", invocation.display());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().map(|s| tokio::spawn(forward_lines(s)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(forward_lines(s)));

        let status = child.wait().await.map_err(|source| ToolError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        for task in [stdout, stderr].into_iter().flatten() {
            let _ = task.await;
        }

        Ok(status.code().map(i64::from))
    }
}
