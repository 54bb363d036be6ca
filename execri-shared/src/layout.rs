//! Filesystem layout under the execri root directory.
//!
//! The root directory is shared with the external executor:
//! - `RootLayout`: the root itself (image gate directory, nodes)
//! - `NodeLayout`: per-node directory
//! - `PodLayout`: per-sandbox directory holding init scripts
//!
//! ```text
//! {root}/
//! ├── images/
//! │   └── {name}                  # existence gates PullImage
//! └── nodes/
//!     └── {node}/                 # NodeLayout
//!         └── pods/
//!             └── {sandbox-id}/   # PodLayout
//!                 └── {container-id}.sh
//! ```

use std::path::{Path, PathBuf};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Directory names.
pub mod dirs {
    /// Image gate directory
    pub const IMAGES: &str = "images";

    /// Nodes directory
    pub const NODES: &str = "nodes";

    /// Pods directory inside a node
    pub const PODS: &str = "pods";
}

/// Extension of container init scripts.
pub const INIT_SCRIPT_EXT: &str = "sh";

// ============================================================================
// POD LAYOUT
// ============================================================================

/// Per-sandbox directory: {root}/nodes/{node}/pods/{sandbox-id}
#[derive(Clone, Debug)]
pub struct PodLayout {
    root: PathBuf,
}

impl PodLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Init script handed to the executor: {root}/{container-id}.sh
    pub fn init_script(&self, container_id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", container_id, INIT_SCRIPT_EXT))
    }
}

// ============================================================================
// NODE LAYOUT
// ============================================================================

/// Per-node directory: {root}/nodes/{node}
#[derive(Clone, Debug)]
pub struct NodeLayout {
    root: PathBuf,
}

impl NodeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pods directory: {root}/pods
    pub fn pods_dir(&self) -> PathBuf {
        self.root.join(dirs::PODS)
    }

    /// Get layout for a specific sandbox.
    pub fn pod(&self, sandbox_id: &str) -> PodLayout {
        PodLayout::new(self.pods_dir().join(sandbox_id))
    }
}

// ============================================================================
// ROOT LAYOUT
// ============================================================================

/// Root directory layout shared with the executor.
///
/// # Example
///
/// ```
/// use execri_shared::layout::RootLayout;
///
/// let layout = RootLayout::new("/root");
/// assert!(layout.image("busybox").ends_with("images/busybox"));
/// assert!(layout
///     .node("node")
///     .pod("web_default_u1_0")
///     .init_script("web_default_u1_0_nginx_0")
///     .ends_with("nodes/node/pods/web_default_u1_0/web_default_u1_0_nginx_0.sh"));
/// ```
#[derive(Clone, Debug)]
pub struct RootLayout {
    base: PathBuf,
}

impl RootLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Images directory: {base}/images
    pub fn images_dir(&self) -> PathBuf {
        self.base.join(dirs::IMAGES)
    }

    /// Gate path for an image name: {base}/images/{name}
    pub fn image(&self, name: &str) -> PathBuf {
        self.images_dir().join(name)
    }

    /// Nodes directory: {base}/nodes
    pub fn nodes_dir(&self) -> PathBuf {
        self.base.join(dirs::NODES)
    }

    /// Get layout for a specific node.
    pub fn node(&self, node: &str) -> NodeLayout {
        NodeLayout::new(self.nodes_dir().join(node))
    }
}
