//! execri shared - wire contract and vocabulary shared by server, tooling and tests
//!
//! This crate contains the generated runtime-interface types and service
//! stubs, the error type, constants, filesystem layout and transport parsing.

pub mod constants;
pub mod errors;
pub mod layout;
pub mod transport;

// Generated protobuf types
pub mod generated {
    #![allow(clippy::all, unused_qualifications)]
    tonic::include_proto!("runtime");
}

pub use errors::{ExecriError, ExecriResult};
pub use transport::Transport;

// Runtime service
pub use generated::runtime_service_client::RuntimeServiceClient;
pub use generated::runtime_service_server::{RuntimeService, RuntimeServiceServer};

// Image service
pub use generated::image_service_client::ImageServiceClient;
pub use generated::image_service_server::{ImageService, ImageServiceServer};

// All generated types
pub use generated::*;
