//! Read-triggered liveness refresh.
//!
//! Container reads (ListContainers, ContainerStatus) first probe every
//! `Running` entry through the executor's `ct check`. A failed check moves
//! the entry to `Exited` in place, so the read observes the refreshed state.
//! `Created` and `Exited` entries are never probed.

use crate::executor::{Executor, Invocation};
use crate::runtime::types::ContainerEntry;
use tracing::info;

/// Outcome of refreshing one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Not running, no probe issued.
    Skipped,

    /// Probe succeeded; still running.
    Alive,

    /// Probe failed; entry moved to `Exited`.
    Exited,
}

/// Probe a container and apply the resulting transition.
pub async fn refresh(
    entry: &mut ContainerEntry,
    node: &str,
    executor: &dyn Executor,
) -> Refresh {
    if !entry.state.is_running() {
        return Refresh::Skipped;
    }

    let check = Invocation::CheckContainer {
        node: node.to_string(),
        sandbox_id: entry.sandbox_id.clone(),
        container_id: entry.id.clone(),
    };

    match executor.run(&check).await {
        Ok(()) => Refresh::Alive,
        Err(e) => {
            info!(
                container_id = %entry.id,
                error = %e,
                "liveness check failed, marking container exited"
            );
            entry.mark_exited();
            Refresh::Exited
        }
    }
}
