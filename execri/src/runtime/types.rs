//! Sandbox and container entries and their lifecycle states.
//!
//! Sandbox state machine:
//! ```text
//! run()  → Ready
//! stop() → NotReady
//! remove() deletes the entry
//! ```
//!
//! Container state machine:
//! ```text
//! create() → Created
//! start()  → Running
//! stop()   → Exited   (also set by a failed liveness check)
//! remove() deletes the entry
//! ```

use chrono::{DateTime, Utc};
use execri_shared::generated as pb;
use std::collections::HashMap;

/// Entry kept in a registry, keyed by its ID.
pub trait Entry {
    fn id(&self) -> &str;
}

// ============================================================================
// SANDBOX
// ============================================================================

/// Lifecycle state of a pod sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SandboxState {
    /// Sandbox placed by the executor and serving.
    Ready,

    /// Sandbox stopped; kept until removed.
    NotReady,
}

impl SandboxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SandboxState::Ready => "ready",
            SandboxState::NotReady => "not_ready",
        }
    }
}

impl From<SandboxState> for pb::PodSandboxState {
    fn from(state: SandboxState) -> Self {
        match state {
            SandboxState::Ready => pb::PodSandboxState::SandboxReady,
            SandboxState::NotReady => pb::PodSandboxState::SandboxNotready,
        }
    }
}

impl std::fmt::Display for SandboxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered pod sandbox.
#[derive(Debug, Clone)]
pub struct SandboxEntry {
    pub id: String,
    pub metadata: pb::PodSandboxMetadata,
    pub state: SandboxState,
    pub created_at: DateTime<Utc>,
    /// Address reported by the executor's address lookup.
    pub ip: String,
    pub hostname: String,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

impl SandboxEntry {
    /// Mark the sandbox stopped. Repeatable.
    pub fn mark_not_ready(&mut self) {
        self.state = SandboxState::NotReady;
    }

    /// Full status as returned by PodSandboxStatus.
    pub fn to_status(&self) -> pb::PodSandboxStatus {
        pb::PodSandboxStatus {
            id: self.id.clone(),
            metadata: Some(self.metadata.clone()),
            state: pb::PodSandboxState::from(self.state) as i32,
            created_at: self.created_at.timestamp(),
            network: Some(pb::PodSandboxNetworkStatus {
                ip: self.ip.clone(),
            }),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
        }
    }

    /// Summary as returned by ListPodSandbox.
    pub fn to_summary(&self) -> pb::PodSandbox {
        pb::PodSandbox {
            id: self.id.clone(),
            metadata: Some(self.metadata.clone()),
            state: pb::PodSandboxState::from(self.state) as i32,
            created_at: self.created_at.timestamp(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

impl Entry for SandboxEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// CONTAINER
// ============================================================================

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerState {
    /// Registered, init script written, process not started.
    Created,

    /// Started by the executor.
    Running,

    /// Stopped, or reported dead by the liveness check.
    Exited,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
        }
    }
}

impl From<ContainerState> for pb::ContainerState {
    fn from(state: ContainerState) -> Self {
        match state {
            ContainerState::Created => pb::ContainerState::ContainerCreated,
            ContainerState::Running => pb::ContainerState::ContainerRunning,
            ContainerState::Exited => pb::ContainerState::ContainerExited,
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered container.
///
/// `sandbox_id` is a plain back-reference: the sandbox may be removed while
/// the container entry survives. It is resolved when the container starts.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    pub id: String,
    pub metadata: pb::ContainerMetadata,
    pub sandbox_id: String,
    pub image: pb::ImageSpec,
    pub image_ref: String,
    pub state: ContainerState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub mounts: Vec<pb::Mount>,
}

impl ContainerEntry {
    /// Record a successful start.
    pub fn mark_running(&mut self) {
        self.state = ContainerState::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record the end of the container process.
    pub fn mark_exited(&mut self) {
        self.state = ContainerState::Exited;
        self.finished_at = Some(Utc::now());
    }

    /// Full status as returned by ContainerStatus.
    pub fn to_status(&self) -> pb::ContainerStatus {
        pb::ContainerStatus {
            id: self.id.clone(),
            metadata: Some(self.metadata.clone()),
            state: pb::ContainerState::from(self.state) as i32,
            created_at: self.created_at.timestamp(),
            started_at: self.started_at.map(|t| t.timestamp()).unwrap_or_default(),
            finished_at: self.finished_at.map(|t| t.timestamp()).unwrap_or_default(),
            exit_code: 0,
            image: Some(self.image.clone()),
            image_ref: self.image_ref.clone(),
            reason: String::new(),
            message: String::new(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            mounts: self.mounts.clone(),
        }
    }

    /// Summary as returned by ListContainers.
    pub fn to_summary(&self) -> pb::Container {
        pb::Container {
            id: self.id.clone(),
            pod_sandbox_id: self.sandbox_id.clone(),
            metadata: Some(self.metadata.clone()),
            image: Some(self.image.clone()),
            image_ref: self.image_ref.clone(),
            state: pb::ContainerState::from(self.state) as i32,
            created_at: self.created_at.timestamp(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

impl Entry for ContainerEntry {
    fn id(&self) -> &str {
        &self.id
    }
}
