//! Image registry.
//!
//! Images are never fetched. A pull succeeds when `{root}/images/{name}`
//! exists, and records a placeholder entry under the image name (the
//! reference with any `:tag` stripped).

use execri_shared::constants::image as image_const;
use execri_shared::errors::{ExecriError, ExecriResult};
use execri_shared::generated as pb;
use execri_shared::layout::RootLayout;
use std::collections::BTreeMap;
use std::path::{Component, Path};
use tokio::sync::Mutex;
use tracing::debug;

/// Known images, guarded by the image service lock.
pub struct ImageRegistry {
    layout: RootLayout,
    images: Mutex<BTreeMap<String, pb::Image>>,
}

impl ImageRegistry {
    /// Create empty registry gated by `{root}/images`.
    pub fn new(layout: RootLayout) -> Self {
        Self {
            layout,
            images: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register an image, returning its canonical name.
    ///
    /// Repeat pulls of the same name (any tag) are no-ops.
    pub async fn pull(&self, image_ref: &str) -> ExecriResult<String> {
        let mut images = self.images.lock().await;
        let name = image_name(image_ref).to_string();
        validate_image_name(&name)?;

        if !images.contains_key(&name) {
            let path = self.layout.image(&name);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ExecriError::Precondition(format!(
                    "image not exists {}",
                    path.display()
                )));
            }

            debug!(image = %name, path = %path.display(), "image registered");
            images.insert(name.clone(), placeholder(&name));
        }

        Ok(name)
    }

    /// List images, optionally only those tagged `tag`.
    ///
    /// Entries carry no tags, so any non-empty filter yields nothing.
    pub async fn list(&self, tag: Option<&str>) -> Vec<pb::Image> {
        let images = self.images.lock().await;
        images
            .values()
            .filter(|img| tag.is_none_or(|t| img.repo_tags.iter().any(|rt| rt == t)))
            .cloned()
            .collect()
    }

    /// Look an image up by its exact key.
    pub async fn status(&self, name: &str) -> Option<pb::Image> {
        self.images.lock().await.get(name).cloned()
    }

    /// Forget an image. Removing an unknown name succeeds.
    pub async fn remove(&self, name: &str) {
        self.images.lock().await.remove(name);
    }

    pub async fn len(&self) -> usize {
        self.images.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.lock().await.is_empty()
    }
}

/// Canonical image name: everything before the first `:`.
pub fn image_name(image_ref: &str) -> &str {
    image_ref
        .split_once(image_const::TAG_SEPARATOR)
        .map_or(image_ref, |(name, _tag)| name)
}

/// An image name must stay inside the images directory: relative, with no
/// `.` or `..` components.
fn validate_image_name(name: &str) -> ExecriResult<()> {
    let inside = !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !inside {
        return Err(ExecriError::InvalidArgument(format!(
            "image name {:?} is not a path under the images directory",
            name
        )));
    }
    Ok(())
}

fn placeholder(name: &str) -> pb::Image {
    pb::Image {
        id: name.to_string(),
        repo_tags: Vec::new(),
        repo_digests: Vec::new(),
        size: image_const::PLACEHOLDER_SIZE,
        uid: None,
        username: String::new(),
    }
}
