//! Runtime service state: entries, registries and the lifecycle engine.

pub mod engine;
pub mod liveness;
pub mod registry;
pub mod types;

pub use engine::RuntimeEngine;
pub use liveness::{Refresh, refresh};
pub use registry::{ContainerRegistry, Registry, SandboxRegistry};
pub use types::{ContainerEntry, ContainerState, Entry, SandboxEntry, SandboxState};
