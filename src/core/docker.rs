/// Docker integration
///
/// Runs backup commands inside a named container through the Docker Engine
/// exec API, the equivalent of `docker exec <container> bash -c "<cmd>"`.

use async_trait::async_trait;
use bollard::container::InspectContainerOptions;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, info};

use crate::core::error::ToolError;
use crate::core::process::{CommandRunner, Invocation};

/// Splits streamed output chunks into whole lines
#[derive(Debug, Default)]
struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Append a chunk, returning every line it completed
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        lines
    }

    /// Trailing output without a final newline
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending)
        }
    }
}

#[derive(Clone)]
pub struct ContainerRunner {
    docker: Docker,
    container: String,
    shell: String,
}

impl ContainerRunner {
    /// Connect to the local Docker daemon
    pub fn connect(container: impl Into<String>, shell: impl Into<String>) -> Result<Self, ToolError> {
        let docker = Docker::connect_with_local_defaults().map_err(|e| {
            ToolError::Container(format!("Failed to connect to Docker daemon. Is Docker running? {}", e))
        })?;

        Ok(Self {
            docker,
            container: container.into(),
            shell: shell.into(),
        })
    }

    /// Fail early when the target container is missing or stopped
    pub async fn ensure_running(&self) -> Result<(), ToolError> {
        let inspect = self
            .docker
            .inspect_container(&self.container, None::<InspectContainerOptions>)
            .await
            .map_err(|e| ToolError::Container(format!("Container {} not found: {}", self.container, e)))?;

        let running = inspect
            .state
            .and_then(|state| state.running)
            .unwrap_or(false);

        if running {
            Ok(())
        } else {
            Err(ToolError::Container(format!("Container {} is not running", self.container)))
        }
    }
}

#[async_trait]
impl CommandRunner for ContainerRunner {
    async fn run(&self, invocation: &Invocation) -> Result<Option<i64>, ToolError> {
        debug!("docker exec {} {} -c {}", self.container, self.shell, invocation.display());

        let options = CreateExecOptions {
            cmd: Some(vec![self.shell.clone(), "-c".to_string(), invocation.to_shell()]),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let exec = self
            .docker
            .create_exec(&self.container, options)
            .await
            .map_err(|e| ToolError::Container(format!("Failed to create exec in {}: {}", self.container, e)))?;

        let started = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| ToolError::Container(format!("Failed to start exec in {}: {}", self.container, e)))?;

        if let StartExecResults::Attached { mut output, .. } = started {
            let mut buffer = LineBuffer::default();
            while let Some(chunk) = output.next().await {
                let chunk = chunk
                    .map_err(|e| ToolError::Container(format!("Exec output stream failed: {}", e)))?;
                for line in buffer.push(&chunk.to_string()) {
                    info!(target: "tool", "{}", line);
                }
            }
            if let Some(rest) = buffer.finish() {
                info!(target: "tool", "{}", rest);
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| ToolError::Container(format!("Failed to inspect exec: {}", e)))?;

        Ok(inspect.exit_code)
    }

    async fn preflight(&self) -> Result<(), ToolError> {
        self.ensure_running().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_joins_split_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push("[00] 2026-01-01 Copying ./ib").is_empty());
        assert_eq!(
            buffer.push("data1\r\n[00] done\nnext"),
            vec!["[00] 2026-01-01 Copying ./ibdata1", "[00] done"]
        );
        assert_eq!(buffer.finish().as_deref(), Some("next"));
    }

    #[test]
    fn test_line_buffer_empty_finish() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.push("complete\n"), vec!["complete"]);
        assert_eq!(buffer.finish(), None);
    }
}
