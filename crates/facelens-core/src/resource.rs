//! Shared, asynchronously loaded resources.
//!
//! A [`Resource`] starts out `Loading` and settles exactly once into `Ready`
//! or `Failed`. Readers poll it with [`Resource::try_get`] on every frame and
//! never wait for it.

use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to spawn loader thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Load state without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Loading,
    Ready,
    Failed,
}

enum Slot<T> {
    Loading,
    Ready(Arc<T>),
    Failed(String),
}

/// Clone-safe handle to a value that becomes available later.
pub struct Resource<T> {
    slot: Arc<RwLock<Slot<T>>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> Resource<T> {
    /// A resource that has not finished loading.
    pub fn pending() -> Self {
        Self { slot: Arc::new(RwLock::new(Slot::Loading)) }
    }

    pub fn ready(value: T) -> Self {
        Self { slot: Arc::new(RwLock::new(Slot::Ready(Arc::new(value)))) }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { slot: Arc::new(RwLock::new(Slot::Failed(reason.into()))) }
    }

    /// Settle with a value. Ignored if the resource already settled.
    pub fn resolve(&self, value: T) {
        self.settle(Slot::Ready(Arc::new(value)));
    }

    /// Settle as failed. Ignored if the resource already settled.
    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(Slot::Failed(reason.into()));
    }

    fn settle(&self, next: Slot<T>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if matches!(*slot, Slot::Loading) {
            *slot = next;
        } else {
            tracing::debug!("resource already settled; ignoring second result");
        }
    }

    /// The value if it has loaded. Never blocks: a contended lock reads as not ready.
    pub fn try_get(&self) -> Option<Arc<T>> {
        match &*self.slot.try_read().ok()? {
            Slot::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn state(&self) -> ResourceState {
        match &*self.slot.read().unwrap_or_else(|e| e.into_inner()) {
            Slot::Loading => ResourceState::Loading,
            Slot::Ready(_) => ResourceState::Ready,
            Slot::Failed(_) => ResourceState::Failed,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state() != ResourceState::Loading
    }

    /// Failure reason, if loading failed.
    pub fn error(&self) -> Option<String> {
        match &*self.slot.read().unwrap_or_else(|e| e.into_inner()) {
            Slot::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }
}

/// Start decoding an image on a background thread.
///
/// Returns immediately with a `Loading` resource; decode errors settle it as
/// `Failed` rather than surfacing here.
pub fn load_image(path: impl AsRef<Path>) -> Result<Resource<RgbaImage>, ResourceError> {
    let path = path.as_ref().to_path_buf();
    let resource = Resource::pending();
    let handle = resource.clone();

    std::thread::Builder::new()
        .name("facelens-asset".into())
        .spawn(move || match decode_rgba(&path) {
            Ok(img) => {
                tracing::info!(
                    path = %path.display(),
                    width = img.width(),
                    height = img.height(),
                    "overlay asset loaded"
                );
                handle.resolve(img);
            }
            Err(e) => {
                tracing::warn!(error = %e, "overlay asset failed to load");
                handle.fail(e.to_string());
            }
        })?;

    Ok(resource)
}

fn decode_rgba(path: &Path) -> Result<RgbaImage, ResourceError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| ResourceError::Decode { path: path.to_path_buf(), source })
}
