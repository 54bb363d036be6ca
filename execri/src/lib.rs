//! execri - a container runtime interface server that keeps sandbox,
//! container and image state in memory and delegates placement to external
//! executor programs.

pub mod client;
pub mod executor;
pub mod filter;
pub mod image;
pub mod init_script;
pub mod naming;
pub mod options;
pub mod runtime;
pub mod service;

pub use executor::{CommandExecutor, Executor, Invocation};
pub use image::ImageRegistry;
pub use options::NodeOptions;
pub use runtime::RuntimeEngine;
pub use service::{CriRuntime, CriServer};

pub use execri_shared::{ExecriError, ExecriResult, Transport};
