//! Client-side connection helpers.
//!
//! Converts a [`Transport`] into a tonic [`Channel`] and wraps it in the
//! generated service clients.

use execri_shared::{ExecriResult, ImageServiceClient, RuntimeServiceClient, Transport};
use hyper_util::rt::TokioIo;
use std::path::Path;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

/// Connect to a runtime endpoint.
pub async fn connect(transport: &Transport) -> ExecriResult<Channel> {
    match transport {
        Transport::Unix { socket_path } => {
            tracing::debug!("Connecting via Unix: {}", socket_path.display());
            connect_unix(socket_path).await
        }
        Transport::Tcp { port } => {
            tracing::debug!("Connecting via TCP: 127.0.0.1:{}", port);
            connect_tcp(*port).await
        }
    }
}

pub async fn runtime_client(transport: &Transport) -> ExecriResult<RuntimeServiceClient<Channel>> {
    Ok(RuntimeServiceClient::new(connect(transport).await?))
}

pub async fn image_client(transport: &Transport) -> ExecriResult<ImageServiceClient<Channel>> {
    Ok(ImageServiceClient::new(connect(transport).await?))
}

async fn connect_unix(socket_path: &Path) -> ExecriResult<Channel> {
    let socket_path = socket_path.to_path_buf();

    // The authority is ignored; every connection dials the socket.
    let channel = Endpoint::try_from("http://[::]:50051")?
        .connect_with_connector(service_fn(move |_: Uri| {
            let socket_path = socket_path.clone();
            async move {
                let stream = tokio::net::UnixStream::connect(socket_path).await?;
                Ok::<_, std::io::Error>(TokioIo::new(stream))
            }
        }))
        .await?;

    Ok(channel)
}

async fn connect_tcp(port: u16) -> ExecriResult<Channel> {
    let channel = Endpoint::try_from(format!("http://127.0.0.1:{}", port))?
        .connect()
        .await?;
    Ok(channel)
}
