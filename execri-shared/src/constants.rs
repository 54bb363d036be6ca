//! Shared constants.
//!
//! Runtime identity and executor naming must stay identical between the
//! server and any tooling that talks to it.

/// Runtime identity reported by `Version`.
pub mod runtime {
    /// Runtime name
    pub const NAME: &str = "execri";

    /// Runtime interface version served
    pub const API_VERSION: &str = "v1alpha1";

    /// Condition type: the runtime is up and can run containers
    pub const RUNTIME_READY: &str = "RuntimeReady";

    /// Condition type: the runtime network is ready
    pub const NETWORK_READY: &str = "NetworkReady";

    /// Exit code reported by ExecSync, which is not supported
    pub const EXEC_SYNC_EXIT_CODE: i32 = -1;
}

/// External executor programs, resolved inside the bin directory.
pub mod executor {
    /// Sandbox provisioning (`pod create|remove ...`)
    pub const POD: &str = "pod";

    /// Address lookup (`showip <hostname>`)
    pub const SHOW_IP: &str = "showip";

    /// Container control (`ct start|stop|check ...`)
    pub const CONTAINER: &str = "ct";
}

/// Image registry constants
pub mod image {
    /// Size reported for every image; content is never inspected
    pub const PLACEHOLDER_SIZE: u64 = 1;

    /// Separator between an image name and its tag
    pub const TAG_SEPARATOR: char = ':';
}

/// Default option values
pub mod defaults {
    /// Listen endpoint
    pub const LISTEN: &str = "unix:///run/execri.sock";

    /// Node name passed to the executor
    pub const NODE: &str = "node";

    /// Directory holding executor programs
    pub const BIN_DIR: &str = "/root/bin";

    /// Root of the filesystem layout
    pub const ROOT_DIR: &str = "/root";
}

/// Environment variables read by the binary
pub mod envs {
    pub const LISTEN: &str = "EXECRI_LISTEN";
    pub const NODE: &str = "EXECRI_NODE";
    pub const BIN_DIR: &str = "EXECRI_BINDIR";
    pub const ROOT_DIR: &str = "EXECRI_ROOTDIR";
}
