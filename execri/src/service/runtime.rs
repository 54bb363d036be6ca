//! Runtime service implementation.
//!
//! Every lifecycle RPC holds the engine lock for its full duration,
//! including executor invocations, so calls on this service are serialized.
//!
//! Engine work that awaits the executor runs on its own task. A caller that
//! times out or disconnects stops waiting for the answer, but the executor
//! call and the state change that follows it still complete.

use crate::runtime::RuntimeEngine;
use execri_shared::RuntimeService;
use execri_shared::constants::runtime as runtime_const;
use execri_shared::errors::{ExecriError, ExecriResult};
use execri_shared::generated::*;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use tonic::{Request, Response, Status};
use tracing::info;

/// Runtime service backed by a lifecycle engine.
pub struct CriRuntime {
    engine: Arc<Mutex<RuntimeEngine>>,
}

impl CriRuntime {
    pub fn new(engine: RuntimeEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Exclusive access to the engine, as taken by every lifecycle RPC.
    pub async fn lock(&self) -> MutexGuard<'_, RuntimeEngine> {
        self.engine.lock().await
    }

    /// Run `work` under the engine lock on a spawned task and wait for it.
    async fn detached<T, F, Fut>(&self, work: F) -> Result<T, Status>
    where
        T: Send + 'static,
        F: FnOnce(OwnedMutexGuard<RuntimeEngine>) -> Fut + Send + 'static,
        Fut: Future<Output = ExecriResult<T>> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::spawn(async move { work(engine.lock_owned().await).await })
            .await
            .map_err(|e| Status::internal(format!("engine task failed: {}", e)))?
            .map_err(Status::from)
    }
}

#[tonic::async_trait]
impl RuntimeService for CriRuntime {
    async fn version(
        &self,
        request: Request<VersionRequest>,
    ) -> Result<Response<VersionResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "Version");

        Ok(Response::new(VersionResponse {
            version: req.version,
            runtime_name: runtime_const::NAME.to_string(),
            runtime_version: env!("CARGO_PKG_VERSION").to_string(),
            runtime_api_version: runtime_const::API_VERSION.to_string(),
        }))
    }

    async fn status(
        &self,
        request: Request<StatusRequest>,
    ) -> Result<Response<StatusResponse>, Status> {
        info!(request = ?request.get_ref(), "Status");

        let condition = |kind: &str| RuntimeCondition {
            r#type: kind.to_string(),
            status: true,
            reason: String::new(),
            message: String::new(),
        };

        Ok(Response::new(StatusResponse {
            status: Some(RuntimeStatus {
                conditions: vec![
                    condition(runtime_const::RUNTIME_READY),
                    condition(runtime_const::NETWORK_READY),
                ],
            }),
        }))
    }

    async fn run_pod_sandbox(
        &self,
        request: Request<RunPodSandboxRequest>,
    ) -> Result<Response<RunPodSandboxResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "RunPodSandbox");

        let config = req
            .config
            .ok_or_else(|| Status::invalid_argument("Missing config in RunPodSandbox request"))?;

        let pod_sandbox_id = self
            .detached(move |mut engine| async move { engine.run_sandbox(config).await })
            .await?;
        Ok(Response::new(RunPodSandboxResponse { pod_sandbox_id }))
    }

    async fn stop_pod_sandbox(
        &self,
        request: Request<StopPodSandboxRequest>,
    ) -> Result<Response<StopPodSandboxResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "StopPodSandbox");

        self.lock().await.stop_sandbox(&req.pod_sandbox_id)?;
        Ok(Response::new(StopPodSandboxResponse {}))
    }

    async fn remove_pod_sandbox(
        &self,
        request: Request<RemovePodSandboxRequest>,
    ) -> Result<Response<RemovePodSandboxResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "RemovePodSandbox");

        let sandbox_id = req.pod_sandbox_id;
        self.detached(move |mut engine| async move {
            engine.remove_sandbox(&sandbox_id).await
        })
        .await?;
        Ok(Response::new(RemovePodSandboxResponse {}))
    }

    async fn pod_sandbox_status(
        &self,
        request: Request<PodSandboxStatusRequest>,
    ) -> Result<Response<PodSandboxStatusResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "PodSandboxStatus");

        let status = self.lock().await.sandbox_status(&req.pod_sandbox_id)?;
        Ok(Response::new(PodSandboxStatusResponse {
            status: Some(status),
        }))
    }

    async fn list_pod_sandbox(
        &self,
        request: Request<ListPodSandboxRequest>,
    ) -> Result<Response<ListPodSandboxResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "ListPodSandbox");

        let items = self.lock().await.list_sandboxes(req.filter.as_ref());
        Ok(Response::new(ListPodSandboxResponse { items }))
    }

    async fn create_container(
        &self,
        request: Request<CreateContainerRequest>,
    ) -> Result<Response<CreateContainerResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "CreateContainer");

        let config = req
            .config
            .ok_or_else(|| Status::invalid_argument("Missing config in CreateContainer request"))?;

        let container_id = self
            .lock()
            .await
            .create_container(&req.pod_sandbox_id, config)?;
        Ok(Response::new(CreateContainerResponse { container_id }))
    }

    async fn start_container(
        &self,
        request: Request<StartContainerRequest>,
    ) -> Result<Response<StartContainerResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "StartContainer");

        let container_id = req.container_id;
        self.detached(move |mut engine| async move {
            engine.start_container(&container_id).await
        })
        .await?;
        Ok(Response::new(StartContainerResponse {}))
    }

    async fn stop_container(
        &self,
        request: Request<StopContainerRequest>,
    ) -> Result<Response<StopContainerResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "StopContainer");

        let container_id = req.container_id;
        self.detached(move |mut engine| async move {
            engine.stop_container(&container_id).await
        })
        .await?;
        Ok(Response::new(StopContainerResponse {}))
    }

    async fn remove_container(
        &self,
        request: Request<RemoveContainerRequest>,
    ) -> Result<Response<RemoveContainerResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "RemoveContainer");

        self.lock().await.remove_container(&req.container_id);
        Ok(Response::new(RemoveContainerResponse {}))
    }

    async fn list_containers(
        &self,
        request: Request<ListContainersRequest>,
    ) -> Result<Response<ListContainersResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "ListContainers");

        let filter = req.filter;
        let containers = self
            .detached(move |mut engine| async move {
                Ok::<_, ExecriError>(engine.list_containers(filter.as_ref()).await)
            })
            .await?;
        Ok(Response::new(ListContainersResponse { containers }))
    }

    async fn container_status(
        &self,
        request: Request<ContainerStatusRequest>,
    ) -> Result<Response<ContainerStatusResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "ContainerStatus");

        let container_id = req.container_id;
        let status = self
            .detached(move |mut engine| async move {
                engine.container_status(&container_id).await
            })
            .await?;
        Ok(Response::new(ContainerStatusResponse {
            status: Some(status),
        }))
    }

    async fn exec_sync(
        &self,
        request: Request<ExecSyncRequest>,
    ) -> Result<Response<ExecSyncResponse>, Status> {
        info!(request = ?request.get_ref(), "ExecSync");
        let _engine = self.lock().await;

        Ok(Response::new(ExecSyncResponse {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: runtime_const::EXEC_SYNC_EXIT_CODE,
        }))
    }

    async fn exec(&self, request: Request<ExecRequest>) -> Result<Response<ExecResponse>, Status> {
        info!(request = ?request.get_ref(), "Exec");
        let _engine = self.lock().await;

        Ok(Response::new(ExecResponse::default()))
    }

    async fn attach(
        &self,
        request: Request<AttachRequest>,
    ) -> Result<Response<AttachResponse>, Status> {
        info!(request = ?request.get_ref(), "Attach");
        let _engine = self.lock().await;

        Ok(Response::new(AttachResponse::default()))
    }

    async fn port_forward(
        &self,
        request: Request<PortForwardRequest>,
    ) -> Result<Response<PortForwardResponse>, Status> {
        info!(request = ?request.get_ref(), "PortForward");
        let _engine = self.lock().await;

        Ok(Response::new(PortForwardResponse::default()))
    }

    async fn update_runtime_config(
        &self,
        request: Request<UpdateRuntimeConfigRequest>,
    ) -> Result<Response<UpdateRuntimeConfigResponse>, Status> {
        info!(request = ?request.get_ref(), "UpdateRuntimeConfig");
        Ok(Response::new(UpdateRuntimeConfigResponse {}))
    }
}
