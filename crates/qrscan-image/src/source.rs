use crate::{Bitmap, ImageError, decode_bitmap, decode_bitmap_typed};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

const BLOB_SCHEME: &str = "blob:";
const FILE_SCHEME: &str = "file://";

/// Anything a still image can be loaded from.
#[derive(Debug)]
pub enum ImageSource {
    /// Pixels that are already realized.
    Bitmap(Bitmap),
    /// An image that may still be loading.
    Handle(ImageHandle),
    /// Encoded image bytes, e.g. an uploaded file.
    Blob(Blob),
    /// A filesystem path, `file://` URL, or `blob:` reference.
    Url(String),
}

impl From<Bitmap> for ImageSource {
    fn from(bitmap: Bitmap) -> Self {
        ImageSource::Bitmap(bitmap)
    }
}

impl From<crates_image::DynamicImage> for ImageSource {
    fn from(image: crates_image::DynamicImage) -> Self {
        ImageSource::Bitmap(image.into())
    }
}

impl From<ImageHandle> for ImageSource {
    fn from(handle: ImageHandle) -> Self {
        ImageSource::Handle(handle)
    }
}

impl From<Blob> for ImageSource {
    fn from(blob: Blob) -> Self {
        ImageSource::Blob(blob)
    }
}

impl From<String> for ImageSource {
    fn from(url: String) -> Self {
        ImageSource::Url(url)
    }
}

impl From<&str> for ImageSource {
    fn from(url: &str) -> Self {
        ImageSource::Url(url.to_string())
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Url(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::from(path.as_path())
    }
}

impl ImageSource {
    /// Resolve the source into pixels.
    ///
    /// Blobs are exposed through a temporary `blob:` reference in `store`
    /// while they load; the reference is revoked afterwards whether loading
    /// succeeded, failed, or was cancelled.
    pub async fn load(self, store: &BlobStore) -> Result<Bitmap, ImageError> {
        match self {
            ImageSource::Bitmap(bitmap) => {
                if bitmap.size.is_empty() {
                    return Err(ImageError::Unsupported(format!(
                        "bitmap has no pixels ({})",
                        bitmap.size
                    )));
                }
                Ok(bitmap)
            }
            ImageSource::Handle(handle) => handle.wait_loaded().await,
            ImageSource::Blob(blob) => {
                let url = store.create_url(blob);
                load_url(url.as_str(), store).await
            }
            ImageSource::Url(url) => load_url(&url, store).await,
        }
    }
}

async fn load_url(url: &str, store: &BlobStore) -> Result<Bitmap, ImageError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ImageError::Unsupported("empty url".to_string()));
    }

    if url.starts_with(BLOB_SCHEME) {
        let blob = store
            .get(url)
            .ok_or_else(|| ImageError::Load(format!("{url} is not a live blob reference")))?;
        return decode_bitmap_typed(&blob.bytes, blob.mime.as_deref()).await;
    }

    let path = match url.strip_prefix(FILE_SCHEME) {
        Some(path) => path,
        None if url.contains("://") => {
            return Err(ImageError::Unsupported(format!("cannot fetch {url}")));
        }
        None => url,
    };

    log::debug!("loading image from {}", path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ImageError::Load(format!("{path}: {e}")))?;
    decode_bitmap(&bytes).await
}

#[derive(Debug, Clone)]
enum LoadState {
    Loading,
    Loaded(Bitmap),
    Failed(String),
}

/// An image whose pixels arrive asynchronously.
///
/// The producing side holds the paired [`ImageLoader`] and signals completion
/// or failure through it.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    state: watch::Receiver<LoadState>,
}

/// Completes an [`ImageHandle`].
#[derive(Debug)]
pub struct ImageLoader {
    state: watch::Sender<LoadState>,
}

impl ImageHandle {
    /// A handle that is still loading, plus the loader that completes it.
    pub fn pending() -> (ImageHandle, ImageLoader) {
        let (sender, receiver) = watch::channel(LoadState::Loading);
        (ImageHandle { state: receiver }, ImageLoader { state: sender })
    }

    /// A handle that has already finished loading.
    pub fn loaded(bitmap: Bitmap) -> ImageHandle {
        let (sender, receiver) = watch::channel(LoadState::Loaded(bitmap));
        drop(sender);
        ImageHandle { state: receiver }
    }

    /// True once the image has loaded with non-zero dimensions.
    pub fn is_complete(&self) -> bool {
        matches!(&*self.state.borrow(), LoadState::Loaded(bitmap) if !bitmap.size.is_empty())
    }

    /// Wait for the load-complete signal.
    pub async fn wait_loaded(mut self) -> Result<Bitmap, ImageError> {
        loop {
            let settled = match &*self.state.borrow_and_update() {
                LoadState::Loading => None,
                LoadState::Loaded(bitmap) if bitmap.size.is_empty() => {
                    Some(Err(ImageError::Load("image loaded without pixels".to_string())))
                }
                LoadState::Loaded(bitmap) => Some(Ok(bitmap.clone())),
                LoadState::Failed(reason) => Some(Err(ImageError::Load(reason.clone()))),
            };
            if let Some(result) = settled {
                return result;
            }
            if self.state.changed().await.is_err() {
                return Err(ImageError::Load(
                    "image loader dropped before completion".to_string(),
                ));
            }
        }
    }
}

impl ImageLoader {
    pub fn complete(self, bitmap: Bitmap) {
        self.state.send_replace(LoadState::Loaded(bitmap));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.state.send_replace(LoadState::Failed(reason.into()));
    }
}

/// Encoded image bytes held in memory. A MIME type, when set, selects the
/// decoder.
#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, mime: None }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Registry of live `blob:` references.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    inner: Arc<BlobStoreInner>,
}

#[derive(Debug, Default)]
struct BlobStoreInner {
    next_id: AtomicU64,
    blobs: Mutex<HashMap<String, Arc<Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob` and return a reference that revokes itself on drop.
    pub fn create_url(&self, blob: Blob) -> BlobUrl {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("{BLOB_SCHEME}qrscan/{id}");
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.clone(), Arc::new(blob));
        BlobUrl {
            url,
            store: self.clone(),
        }
    }

    pub fn get(&self, url: &str) -> Option<Arc<Blob>> {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
    }

    pub fn revoke(&self, url: &str) -> bool {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url)
            .is_some()
    }

    /// Number of references that have not been revoked yet.
    pub fn live_count(&self) -> usize {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

/// A temporary `blob:` reference. Dropping it revokes the reference.
#[derive(Debug)]
pub struct BlobUrl {
    url: String,
    store: BlobStore,
}

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for BlobUrl {
    fn drop(&mut self) {
        if self.store.revoke(&self.url) {
            log::debug!("revoked {}", self.url);
        }
    }
}
