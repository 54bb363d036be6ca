//! Test helpers shared by execri integration tests.
//!
//! - [`StubExecutor`]: records invocations instead of spawning programs
//! - [`TestNode`]: a temporary root directory with image fixtures
//! - config builders for sandboxes and containers

use async_trait::async_trait;
use execri::executor::{Executor, Invocation};
use execri::{NodeOptions, RuntimeEngine};
use execri_shared::generated as pb;
use execri_shared::layout::RootLayout;
use execri_shared::{ExecriError, ExecriResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Address `showip` reports unless overridden.
pub const DEFAULT_IP: &str = "10.88.0.2";

/// Node name used by [`TestNode`].
pub const TEST_NODE: &str = "test-node";

type Matcher = Box<dyn Fn(&Invocation) -> bool + Send + Sync>;

struct FailureRule {
    matcher: Matcher,
    once: bool,
}

struct DelayRule {
    matcher: Matcher,
    delay: Duration,
}

/// Executor double that records every invocation.
///
/// `showip` answers with a configurable address (newline-terminated, as a
/// shell program would print it). Failures and slow commands are injected
/// with matchers. An invocation is recorded once its delay has elapsed.
pub struct StubExecutor {
    ip: Mutex<String>,
    calls: Mutex<Vec<Invocation>>,
    rules: Mutex<Vec<FailureRule>>,
    delays: Mutex<Vec<DelayRule>>,
}

impl Default for StubExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StubExecutor {
    pub fn new() -> Self {
        Self {
            ip: Mutex::new(DEFAULT_IP.to_string()),
            calls: Mutex::new(Vec::new()),
            rules: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn set_ip(&self, ip: impl Into<String>) {
        *self.ip.lock() = ip.into();
    }

    /// Fail every matching invocation from now on.
    pub fn fail_when(&self, matcher: impl Fn(&Invocation) -> bool + Send + Sync + 'static) {
        self.rules.lock().push(FailureRule {
            matcher: Box::new(matcher),
            once: false,
        });
    }

    /// Fail only the next matching invocation.
    pub fn fail_next(&self, matcher: impl Fn(&Invocation) -> bool + Send + Sync + 'static) {
        self.rules.lock().push(FailureRule {
            matcher: Box::new(matcher),
            once: true,
        });
    }

    /// Make every matching invocation take `delay` before completing.
    pub fn delay_when(
        &self,
        matcher: impl Fn(&Invocation) -> bool + Send + Sync + 'static,
        delay: Duration,
    ) {
        self.delays.lock().push(DelayRule {
            matcher: Box::new(matcher),
            delay,
        });
    }

    pub fn clear_failures(&self) {
        self.rules.lock().clear();
    }

    /// All invocations so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Invocations accepted by `filter`.
    pub fn calls_matching(&self, filter: impl Fn(&Invocation) -> bool) -> Vec<Invocation> {
        self.calls.lock().iter().filter(|inv| filter(inv)).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn pause(&self, invocation: &Invocation) {
        let delay = self
            .delays
            .lock()
            .iter()
            .find(|rule| (rule.matcher)(invocation))
            .map(|rule| rule.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, invocation: &Invocation) -> ExecriResult<()> {
        self.calls.lock().push(invocation.clone());

        let mut rules = self.rules.lock();
        if let Some(pos) = rules.iter().position(|rule| (rule.matcher)(invocation)) {
            if rules[pos].once {
                rules.remove(pos);
            }
            return Err(ExecriError::Executor(format!(
                "'{}' exited with exit status: 1",
                invocation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for StubExecutor {
    async fn run(&self, invocation: &Invocation) -> ExecriResult<()> {
        self.pause(invocation).await;
        self.record(invocation)
    }

    async fn output(&self, invocation: &Invocation) -> ExecriResult<String> {
        self.pause(invocation).await;
        self.record(invocation)?;
        Ok(format!("{}\n", self.ip.lock()))
    }
}

/// Matches `ct check` invocations.
pub fn is_check(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::CheckContainer { .. })
}

/// Matches `ct start` invocations.
pub fn is_start(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::StartContainer { .. })
}

/// Matches `ct stop` invocations.
pub fn is_stop(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::StopContainer { .. })
}

/// Matches `pod create` invocations.
pub fn is_create_pod(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::CreatePod { .. })
}

/// Matches `pod remove` invocations.
pub fn is_remove_pod(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::RemovePod { .. })
}

/// Matches `showip` invocations.
pub fn is_show_ip(invocation: &Invocation) -> bool {
    matches!(invocation, Invocation::ShowIp { .. })
}

/// A node rooted in a temporary directory.
///
/// The directory is deleted when the node is dropped.
pub struct TestNode {
    dir: TempDir,
    pub executor: Arc<StubExecutor>,
}

impl TestNode {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp root"),
            executor: StubExecutor::shared(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> RootLayout {
        RootLayout::new(self.root())
    }

    pub fn options(&self) -> NodeOptions {
        NodeOptions {
            node: TEST_NODE.to_string(),
            bin_dir: self.root().join("bin"),
            root_dir: self.root().to_path_buf(),
        }
    }

    /// Engine wired to the stub executor.
    pub fn engine(&self) -> RuntimeEngine {
        RuntimeEngine::new(TEST_NODE, &self.layout(), self.executor.clone())
    }

    /// Create `{root}/images/{name}` so pulls of `name` succeed.
    pub fn add_image(&self, name: &str) -> PathBuf {
        let path = self.layout().image(name);
        std::fs::create_dir_all(&path).expect("Failed to create image dir");
        path
    }
}

impl Default for TestNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Sandbox config with metadata, hostname and no labels.
pub fn sandbox_config(name: &str, namespace: &str, uid: &str, attempt: u32) -> pb::PodSandboxConfig {
    pb::PodSandboxConfig {
        metadata: Some(pb::PodSandboxMetadata {
            name: name.to_string(),
            uid: uid.to_string(),
            namespace: namespace.to_string(),
            attempt,
        }),
        hostname: name.to_string(),
        ..Default::default()
    }
}

/// Container config with metadata and image.
pub fn container_config(name: &str, attempt: u32, image: &str) -> pb::ContainerConfig {
    pb::ContainerConfig {
        metadata: Some(pb::ContainerMetadata {
            name: name.to_string(),
            attempt,
        }),
        image: Some(pb::ImageSpec {
            image: image.to_string(),
        }),
        ..Default::default()
    }
}

/// Build a label map from pairs.
pub fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
