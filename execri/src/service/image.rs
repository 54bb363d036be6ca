//! Image service implementation.

use crate::image::ImageRegistry;
use execri_shared::ImageService;
use execri_shared::errors::ExecriError;
use execri_shared::generated::*;
use tonic::{Request, Response, Status};
use tracing::info;

#[tonic::async_trait]
impl ImageService for ImageRegistry {
    async fn list_images(
        &self,
        request: Request<ListImagesRequest>,
    ) -> Result<Response<ListImagesResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "ListImages");

        let tag = req
            .filter
            .and_then(|f| f.image)
            .map(|spec| spec.image)
            .filter(|image| !image.is_empty());

        let images = self.list(tag.as_deref()).await;
        Ok(Response::new(ListImagesResponse { images }))
    }

    async fn image_status(
        &self,
        request: Request<ImageStatusRequest>,
    ) -> Result<Response<ImageStatusResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "ImageStatus");

        let name = req.image.map(|spec| spec.image).unwrap_or_default();
        let image = self.status(&name).await;
        Ok(Response::new(ImageStatusResponse { image }))
    }

    async fn pull_image(
        &self,
        request: Request<PullImageRequest>,
    ) -> Result<Response<PullImageResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "PullImage");

        let image_ref = req.image.map(|spec| spec.image).unwrap_or_default();
        if image_ref.is_empty() {
            return Err(ExecriError::InvalidArgument("image reference is empty".into()).into());
        }

        let image_ref = self.pull(&image_ref).await?;
        Ok(Response::new(PullImageResponse { image_ref }))
    }

    async fn remove_image(
        &self,
        request: Request<RemoveImageRequest>,
    ) -> Result<Response<RemoveImageResponse>, Status> {
        let req = request.into_inner();
        info!(request = ?req, "RemoveImage");

        let name = req.image.map(|spec| spec.image).unwrap_or_default();
        self.remove(&name).await;
        Ok(Response::new(RemoveImageResponse {}))
    }
}
