use crate::executor::{CommandExecutor, Executor};
use crate::image::ImageRegistry;
use crate::options::NodeOptions;
use crate::runtime::RuntimeEngine;
use crate::service::CriRuntime;
use execri_shared::{ExecriResult, ImageServiceServer, RuntimeServiceServer, Transport};
use std::future::Future;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::{info, warn};

/// Runtime-interface server.
///
/// Serves two gRPC services on one endpoint:
/// - RuntimeService: sandbox and container lifecycle
/// - ImageService: image bookkeeping
pub struct CriServer {
    runtime: Arc<CriRuntime>,
    images: Arc<ImageRegistry>,
}

impl CriServer {
    /// Create a server whose executor runs the programs in `options.bin_dir`.
    pub fn new(options: &NodeOptions) -> Self {
        let executor = Arc::new(CommandExecutor::new(options.bin_dir.clone()));
        Self::with_executor(options, executor)
    }

    /// Create a server with a caller-supplied executor.
    pub fn with_executor(options: &NodeOptions, executor: Arc<dyn Executor>) -> Self {
        let layout = options.layout();
        let engine = RuntimeEngine::new(options.node.clone(), &layout, executor);

        Self {
            runtime: Arc::new(CriRuntime::new(engine)),
            images: Arc::new(ImageRegistry::new(layout)),
        }
    }

    pub fn runtime(&self) -> &Arc<CriRuntime> {
        &self.runtime
    }

    pub fn images(&self) -> &Arc<ImageRegistry> {
        &self.images
    }

    /// Serve on `transport` until SIGINT or SIGTERM.
    pub async fn run(self, transport: Transport) -> ExecriResult<()> {
        self.serve_with_shutdown(transport, shutdown_signal()).await
    }

    /// Serve on `transport` until `signal` completes.
    ///
    /// A stale Unix socket at the target path is replaced, and the socket is
    /// removed again once the server has drained.
    pub async fn serve_with_shutdown<F>(self, transport: Transport, signal: F) -> ExecriResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let router = Server::builder()
            .add_service(RuntimeServiceServer::from_arc(self.runtime.clone()))
            .add_service(ImageServiceServer::from_arc(self.images.clone()));

        match transport {
            Transport::Unix { socket_path } => {
                use tokio_stream::wrappers::UnixListenerStream;

                if socket_path.exists() {
                    std::fs::remove_file(&socket_path)?;
                }
                if let Some(parent) = socket_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let listener = tokio::net::UnixListener::bind(&socket_path)?;
                info!("Listening on unix://{}", socket_path.display());

                router
                    .serve_with_incoming_shutdown(UnixListenerStream::new(listener), signal)
                    .await?;

                if let Err(e) = std::fs::remove_file(&socket_path) {
                    warn!("Failed to remove socket {}: {}", socket_path.display(), e);
                }
            }

            Transport::Tcp { port } => {
                use tokio_stream::wrappers::TcpListenerStream;

                let addr = format!("127.0.0.1:{}", port);
                let listener = tokio::net::TcpListener::bind(&addr).await?;
                info!("Listening on tcp://{}", addr);

                router
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
                    .await?;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
