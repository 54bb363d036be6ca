//! Sandbox and container lifecycle engine.
//!
//! `RuntimeEngine` owns both registries and is only reachable through the
//! runtime service lock, so every operation below runs with exclusive access
//! for its whole duration, executor calls included.
//!
//! Failure ordering differs per operation and is deliberate:
//! - `run_sandbox` registers nothing unless both `pod create` and `showip`
//!   succeed.
//! - `remove_sandbox` deletes the entry even when `pod remove` fails.
//! - `start_container` leaves the container `Created` when `ct start` fails.
//! - `stop_container` commits `Exited` before `ct stop` runs and keeps it when
//!   the command fails; the failure is still returned.

use crate::executor::{Executor, Invocation};
use crate::filter::matches_labels;
use crate::init_script::InitScript;
use crate::naming::{build_container_id, build_sandbox_id};
use crate::runtime::liveness::{self, Refresh};
use crate::runtime::registry::{ContainerRegistry, SandboxRegistry};
use crate::runtime::types::{ContainerEntry, ContainerState, SandboxEntry, SandboxState};
use chrono::Utc;
use execri_shared::errors::{ExecriError, ExecriResult};
use execri_shared::generated as pb;
use execri_shared::layout::{NodeLayout, RootLayout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle engine for one node.
pub struct RuntimeEngine {
    node: String,
    layout: NodeLayout,
    executor: Arc<dyn Executor>,
    sandboxes: SandboxRegistry,
    containers: ContainerRegistry,
}

impl RuntimeEngine {
    /// Create an engine with empty registries.
    pub fn new(node: impl Into<String>, root: &RootLayout, executor: Arc<dyn Executor>) -> Self {
        let node = node.into();
        Self {
            layout: root.node(&node),
            node,
            executor,
            sandboxes: SandboxRegistry::new(),
            containers: ContainerRegistry::new(),
        }
    }

    pub fn node(&self) -> &str {
        &self.node
    }

    pub fn sandboxes(&self) -> &SandboxRegistry {
        &self.sandboxes
    }

    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// Path of the init script for a container.
    pub fn init_script_path(&self, sandbox_id: &str, container_id: &str) -> PathBuf {
        self.layout.pod(sandbox_id).init_script(container_id)
    }

    // ========================================================================
    // SANDBOXES
    // ========================================================================

    /// Place a sandbox through the executor and register it `Ready`.
    pub async fn run_sandbox(&mut self, config: pb::PodSandboxConfig) -> ExecriResult<String> {
        let metadata = config
            .metadata
            .ok_or_else(|| ExecriError::InvalidArgument("sandbox config has no metadata".into()))?;
        let sandbox_id = build_sandbox_id(&metadata);
        let created_at = Utc::now();

        self.executor
            .run(&Invocation::CreatePod {
                node: self.node.clone(),
                sandbox_id: sandbox_id.clone(),
                hostname: config.hostname.clone(),
            })
            .await?;

        let ip = self
            .executor
            .output(&Invocation::ShowIp {
                hostname: config.hostname.clone(),
            })
            .await?
            .trim()
            .to_string();

        info!(sandbox_id = %sandbox_id, ip = %ip, "pod sandbox ready");

        self.sandboxes.insert(SandboxEntry {
            id: sandbox_id.clone(),
            metadata,
            state: SandboxState::Ready,
            created_at,
            ip,
            hostname: config.hostname,
            labels: config.labels,
            annotations: config.annotations,
        });

        Ok(sandbox_id)
    }

    /// Mark a sandbox `NotReady`. The executor is not involved.
    pub fn stop_sandbox(&mut self, sandbox_id: &str) -> ExecriResult<()> {
        let sandbox = self
            .sandboxes
            .get_mut(sandbox_id)
            .ok_or_else(|| sandbox_not_found(sandbox_id))?;
        sandbox.mark_not_ready();
        Ok(())
    }

    /// Tear a sandbox down and unregister it.
    ///
    /// A failing `pod remove` is logged and ignored. Containers referencing
    /// the sandbox are left in place.
    pub async fn remove_sandbox(&mut self, sandbox_id: &str) -> ExecriResult<()> {
        let hostname = self
            .sandboxes
            .get(sandbox_id)
            .map(|sb| sb.hostname.clone())
            .ok_or_else(|| sandbox_not_found(sandbox_id))?;

        let remove = Invocation::RemovePod {
            node: self.node.clone(),
            sandbox_id: sandbox_id.to_string(),
            hostname,
        };
        if let Err(e) = self.executor.run(&remove).await {
            warn!(sandbox_id = %sandbox_id, error = %e, "pod remove failed, unregistering anyway");
        }

        self.sandboxes.remove(sandbox_id);
        Ok(())
    }

    pub fn sandbox_status(&self, sandbox_id: &str) -> ExecriResult<pb::PodSandboxStatus> {
        self.sandboxes
            .get(sandbox_id)
            .map(SandboxEntry::to_status)
            .ok_or_else(|| sandbox_not_found(sandbox_id))
    }

    /// List sandboxes matching every filter field that is set.
    pub fn list_sandboxes(&self, filter: Option<&pb::PodSandboxFilter>) -> Vec<pb::PodSandbox> {
        self.sandboxes
            .iter()
            .filter(|sb| filter.is_none_or(|f| sandbox_matches(f, sb)))
            .map(SandboxEntry::to_summary)
            .collect()
    }

    // ========================================================================
    // CONTAINERS
    // ========================================================================

    /// Write the init script and register the container `Created`.
    ///
    /// The sandbox is not required to exist yet; it is resolved on start.
    pub fn create_container(
        &mut self,
        sandbox_id: &str,
        config: pb::ContainerConfig,
    ) -> ExecriResult<String> {
        validate_path_component("pod sandbox", sandbox_id)?;
        let metadata = config.metadata.ok_or_else(|| {
            ExecriError::InvalidArgument("container config has no metadata".into())
        })?;
        let image = config.image.unwrap_or_default();
        let container_id = build_container_id(&metadata, sandbox_id);
        validate_path_component("container", &container_id)?;

        let script_path = self.init_script_path(sandbox_id, &container_id);
        InitScript::new(&config.envs, &config.mounts).write_to(&script_path)?;
        debug!(
            container_id = %container_id,
            path = %script_path.display(),
            env_count = config.envs.len(),
            mount_count = config.mounts.len(),
            "init script written"
        );

        self.containers.insert(ContainerEntry {
            id: container_id.clone(),
            metadata,
            sandbox_id: sandbox_id.to_string(),
            image_ref: image.image.clone(),
            image,
            state: ContainerState::Created,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            labels: config.labels,
            annotations: config.annotations,
            mounts: config.mounts,
        });

        Ok(container_id)
    }

    /// Start a container inside its sandbox.
    pub async fn start_container(&mut self, container_id: &str) -> ExecriResult<()> {
        let container = self
            .containers
            .get_mut(container_id)
            .ok_or_else(|| container_not_found(container_id))?;
        let sandbox = self
            .sandboxes
            .get(&container.sandbox_id)
            .ok_or_else(|| sandbox_not_found(&container.sandbox_id))?;

        self.executor
            .run(&Invocation::StartContainer {
                node: self.node.clone(),
                sandbox_id: container.sandbox_id.clone(),
                hostname: sandbox.hostname.clone(),
                container_id: container_id.to_string(),
                image_ref: container.image_ref.clone(),
            })
            .await?;

        container.mark_running();
        info!(container_id = %container_id, "container running");
        Ok(())
    }

    /// Mark a container `Exited`, then ask the executor to stop it.
    pub async fn stop_container(&mut self, container_id: &str) -> ExecriResult<()> {
        let container = self
            .containers
            .get_mut(container_id)
            .ok_or_else(|| container_not_found(container_id))?;

        container.mark_exited();

        self.executor
            .run(&Invocation::StopContainer {
                node: self.node.clone(),
                sandbox_id: container.sandbox_id.clone(),
                container_id: container_id.to_string(),
            })
            .await
    }

    /// Unregister a container. Absent IDs are ignored.
    pub fn remove_container(&mut self, container_id: &str) {
        if self.containers.remove(container_id).is_none() {
            debug!(container_id = %container_id, "remove of unknown container ignored");
        }
    }

    /// Probe every running container, returning how many moved to `Exited`.
    pub async fn refresh_containers(&mut self) -> usize {
        let mut exited = 0;
        for container in self.containers.iter_mut() {
            if liveness::refresh(container, &self.node, self.executor.as_ref()).await
                == Refresh::Exited
            {
                exited += 1;
            }
        }
        exited
    }

    /// Status of one container, after refreshing its liveness.
    pub async fn container_status(
        &mut self,
        container_id: &str,
    ) -> ExecriResult<pb::ContainerStatus> {
        let container = self
            .containers
            .get_mut(container_id)
            .ok_or_else(|| container_not_found(container_id))?;

        liveness::refresh(container, &self.node, self.executor.as_ref()).await;
        Ok(container.to_status())
    }

    /// List containers matching every filter field that is set.
    ///
    /// Liveness is refreshed first so filters see the current state.
    pub async fn list_containers(
        &mut self,
        filter: Option<&pb::ContainerFilter>,
    ) -> Vec<pb::Container> {
        self.refresh_containers().await;

        self.containers
            .iter()
            .filter(|c| filter.is_none_or(|f| container_matches(f, c)))
            .map(ContainerEntry::to_summary)
            .collect()
    }
}

fn sandbox_matches(filter: &pb::PodSandboxFilter, sandbox: &SandboxEntry) -> bool {
    if !filter.id.is_empty() && filter.id != sandbox.id {
        return false;
    }
    if let Some(state) = &filter.state {
        if state.state != pb::PodSandboxState::from(sandbox.state) as i32 {
            return false;
        }
    }
    matches_labels(&filter.label_selector, &sandbox.labels)
}

fn container_matches(filter: &pb::ContainerFilter, container: &ContainerEntry) -> bool {
    if !filter.id.is_empty() && filter.id != container.id {
        return false;
    }
    if !filter.pod_sandbox_id.is_empty() && filter.pod_sandbox_id != container.sandbox_id {
        return false;
    }
    if let Some(state) = &filter.state {
        if state.state != pb::ContainerState::from(container.state) as i32 {
            return false;
        }
    }
    matches_labels(&filter.label_selector, &container.labels)
}

/// Sandbox and container IDs name entries under the node layout.
fn validate_path_component(kind: &str, id: &str) -> ExecriResult<()> {
    if id.is_empty() {
        return Err(ExecriError::InvalidArgument(format!("{} id is empty", kind)));
    }
    if id.contains('/') || id.contains("..") {
        return Err(ExecriError::InvalidArgument(format!(
            "{} id {:?} is not a valid path component",
            kind, id
        )));
    }
    Ok(())
}

fn sandbox_not_found(sandbox_id: &str) -> ExecriError {
    ExecriError::NotFound(format!("pod sandbox {}", sandbox_id))
}

fn container_not_found(container_id: &str) -> ExecriError {
    ExecriError::NotFound(format!("container {}", container_id))
}
