//! External lifecycle executor.
//!
//! Provisioning, address assignment and liveness live outside execri, in
//! programs found by convention in the bin directory:
//! - `pod create|remove <node> <sandbox-id> <hostname>`
//! - `showip <hostname>` (address on stdout)
//! - `ct start <node> <sandbox-id> <hostname> <container-id> <image-ref>`
//! - `ct stop|check <node> <sandbox-id> <container-id>`
//!
//! Exit status is the only feedback channel: zero is success, anything else
//! (including failure to spawn) is an executor error.

use async_trait::async_trait;
use execri_shared::constants::executor as program;
use execri_shared::errors::{ExecriError, ExecriResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// One executor operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Place a sandbox on the node.
    CreatePod {
        node: String,
        sandbox_id: String,
        hostname: String,
    },
    /// Look up the address assigned to a sandbox hostname.
    ShowIp { hostname: String },
    /// Tear a sandbox down.
    RemovePod {
        node: String,
        sandbox_id: String,
        hostname: String,
    },
    /// Start a container process inside its sandbox.
    StartContainer {
        node: String,
        sandbox_id: String,
        hostname: String,
        container_id: String,
        image_ref: String,
    },
    /// Stop a container process.
    StopContainer {
        node: String,
        sandbox_id: String,
        container_id: String,
    },
    /// Check whether a container process is still alive.
    CheckContainer {
        node: String,
        sandbox_id: String,
        container_id: String,
    },
}

impl Invocation {
    /// Program name inside the bin directory.
    pub fn program(&self) -> &'static str {
        match self {
            Invocation::CreatePod { .. } | Invocation::RemovePod { .. } => program::POD,
            Invocation::ShowIp { .. } => program::SHOW_IP,
            Invocation::StartContainer { .. }
            | Invocation::StopContainer { .. }
            | Invocation::CheckContainer { .. } => program::CONTAINER,
        }
    }

    /// Command-line arguments, sub-command first.
    pub fn args(&self) -> Vec<&str> {
        match self {
            Invocation::CreatePod {
                node,
                sandbox_id,
                hostname,
            } => vec!["create", node.as_str(), sandbox_id.as_str(), hostname.as_str()],
            Invocation::ShowIp { hostname } => vec![hostname.as_str()],
            Invocation::RemovePod {
                node,
                sandbox_id,
                hostname,
            } => vec!["remove", node.as_str(), sandbox_id.as_str(), hostname.as_str()],
            Invocation::StartContainer {
                node,
                sandbox_id,
                hostname,
                container_id,
                image_ref,
            } => vec![
                "start",
                node.as_str(),
                sandbox_id.as_str(),
                hostname.as_str(),
                container_id.as_str(),
                image_ref.as_str(),
            ],
            Invocation::StopContainer {
                node,
                sandbox_id,
                container_id,
            } => vec!["stop", node.as_str(), sandbox_id.as_str(), container_id.as_str()],
            Invocation::CheckContainer {
                node,
                sandbox_id,
                container_id,
            } => vec!["check", node.as_str(), sandbox_id.as_str(), container_id.as_str()],
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program(), self.args().join(" "))
    }
}

/// Executor runs lifecycle operations.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run an operation, succeeding only on a zero exit status.
    async fn run(&self, invocation: &Invocation) -> ExecriResult<()>;

    /// Run an operation and capture its standard output.
    async fn output(&self, invocation: &Invocation) -> ExecriResult<String>;
}

/// Spawns executor programs from a bin directory.
///
/// Stdin and stderr are inherited from the server process. Stdout is
/// inherited too, except when captured by [`Executor::output`].
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    bin_dir: PathBuf,
}

impl CommandExecutor {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let path = self.bin_dir.join(invocation.program());
        debug!(program = %path.display(), args = ?invocation.args(), "executor invocation");

        let mut cmd = Command::new(path);
        cmd.args(invocation.args())
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

#[async_trait]
impl Executor for CommandExecutor {
    async fn run(&self, invocation: &Invocation) -> ExecriResult<()> {
        let status = self
            .command(invocation)
            .stdout(Stdio::inherit())
            .status()
            .await
            .map_err(|e| spawn_error(invocation, e))?;

        if !status.success() {
            warn!(invocation = %invocation, %status, "executor command failed");
            return Err(ExecriError::Executor(format!(
                "'{}' exited with {}",
                invocation, status
            )));
        }
        Ok(())
    }

    async fn output(&self, invocation: &Invocation) -> ExecriResult<String> {
        let output = self
            .command(invocation)
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(invocation, e))?;

        if !output.status.success() {
            warn!(invocation = %invocation, status = %output.status, "executor command failed");
            return Err(ExecriError::Executor(format!(
                "'{}' exited with {}",
                invocation, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn spawn_error(invocation: &Invocation, err: std::io::Error) -> ExecriError {
    warn!(invocation = %invocation, error = %err, "failed to spawn executor command");
    ExecriError::Executor(format!("failed to spawn '{}': {}", invocation, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_pod_argv() {
        let inv = Invocation::CreatePod {
            node: "n1".into(),
            sandbox_id: "web_default_u_0".into(),
            hostname: "web".into(),
        };
        assert_eq!(inv.program(), "pod");
        assert_eq!(inv.args(), vec!["create", "n1", "web_default_u_0", "web"]);
        assert_eq!(inv.to_string(), "pod create n1 web_default_u_0 web");
    }

    #[test]
    fn test_show_ip_argv() {
        let inv = Invocation::ShowIp {
            hostname: "web".into(),
        };
        assert_eq!(inv.program(), "showip");
        assert_eq!(inv.args(), vec!["web"]);
    }

    #[test]
    fn test_container_argv() {
        let start = Invocation::StartContainer {
            node: "n1".into(),
            sandbox_id: "sb".into(),
            hostname: "web".into(),
            container_id: "sb_app_0".into(),
            image_ref: "busybox".into(),
        };
        assert_eq!(start.program(), "ct");
        assert_eq!(
            start.args(),
            vec!["start", "n1", "sb", "web", "sb_app_0", "busybox"]
        );

        let stop = Invocation::StopContainer {
            node: "n1".into(),
            sandbox_id: "sb".into(),
            container_id: "sb_app_0".into(),
        };
        assert_eq!(stop.args(), vec!["stop", "n1", "sb", "sb_app_0"]);

        let check = Invocation::CheckContainer {
            node: "n1".into(),
            sandbox_id: "sb".into(),
            container_id: "sb_app_0".into(),
        };
        assert_eq!(check.args(), vec!["check", "n1", "sb", "sb_app_0"]);
    }

    #[test]
    fn test_remove_pod_argv() {
        let inv = Invocation::RemovePod {
            node: "n1".into(),
            sandbox_id: "sb".into(),
            hostname: "web".into(),
        };
        assert_eq!(inv.program(), "pod");
        assert_eq!(inv.args(), vec!["remove", "n1", "sb", "web"]);
    }
}
