//! gRPC service implementations.
//!
//! - `runtime`: RuntimeService (version, status, sandbox and container lifecycle)
//! - `image`: ImageService (list, status, pull, remove)
//! - `server`: binds the endpoint and serves both services

mod image;
mod runtime;
pub mod server;

pub use runtime::CriRuntime;
pub use server::CriServer;
