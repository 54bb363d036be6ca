//! Configuration for an execri node.

use execri_shared::constants::defaults;
use execri_shared::errors::{ExecriError, ExecriResult};
use execri_shared::layout::RootLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options shared by the runtime and image services.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeOptions {
    /// Node name passed to every executor invocation.
    #[serde(default = "default_node")]
    pub node: String,

    /// Directory holding the `pod`, `showip` and `ct` programs.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    /// Root of the filesystem layout shared with the executor.
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}

fn default_node() -> String {
    defaults::NODE.to_string()
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from(defaults::BIN_DIR)
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(defaults::ROOT_DIR)
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            node: default_node(),
            bin_dir: default_bin_dir(),
            root_dir: default_root_dir(),
        }
    }
}

impl NodeOptions {
    /// Reject options the executor contract cannot carry.
    pub fn validate(&self) -> ExecriResult<()> {
        if self.node.trim().is_empty() {
            return Err(ExecriError::Config("node name must not be empty".into()));
        }
        if self.node.contains('/') {
            return Err(ExecriError::Config(format!(
                "node name {:?} must not contain '/'",
                self.node
            )));
        }
        Ok(())
    }

    pub fn layout(&self) -> RootLayout {
        RootLayout::new(&self.root_dir)
    }
}
