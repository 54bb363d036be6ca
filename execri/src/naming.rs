//! Deterministic sandbox and container identifiers.
//!
//! IDs are pure functions of request metadata, so a retried create call with
//! identical metadata lands on the same registry key and overwrites the prior
//! entry instead of duplicating it.

use execri_shared::{ContainerMetadata, PodSandboxMetadata};

/// Separator between ID components.
pub const ID_SEPARATOR: char = '_';

/// Sandbox ID: `{name}_{namespace}_{uid}_{attempt}`.
pub fn build_sandbox_id(metadata: &PodSandboxMetadata) -> String {
    format!(
        "{name}{sep}{namespace}{sep}{uid}{sep}{attempt}",
        name = metadata.name,
        namespace = metadata.namespace,
        uid = metadata.uid,
        attempt = metadata.attempt,
        sep = ID_SEPARATOR,
    )
}

/// Container ID: `{sandbox_id}_{name}_{attempt}`.
pub fn build_container_id(metadata: &ContainerMetadata, sandbox_id: &str) -> String {
    format!(
        "{sandbox_id}{sep}{name}{sep}{attempt}",
        name = metadata.name,
        attempt = metadata.attempt,
        sep = ID_SEPARATOR,
    )
}
