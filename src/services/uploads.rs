use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Filesystem store for uploaded product images.
///
/// Files land under `root` with generated names; the value persisted on
/// the product row is the public server-relative path so responses can
/// hand it straight to clients.
#[derive(Clone, Debug)]
pub struct ImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Persist an uploaded image, returning its public path.
    ///
    /// The original filename only contributes its extension, which must
    /// be on the whitelist; the stored name is generated.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                ServiceError::ValidationError("Image file has no extension".to_string())
            })?;

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Unsupported image type '.{}'",
                extension
            )));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let target = self.root.join(&filename);
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))?;

        debug!(path = %target.display(), "stored uploaded image");
        Ok(format!("{}/{}", self.public_prefix, filename))
    }

    /// Best-effort removal of a previously stored image.
    ///
    /// A missing file is not an error; the row deletion must win even
    /// when the file is already gone.
    pub async fn delete(&self, public_path: &str) {
        let Some(filename) = public_path.rsplit('/').next() else {
            return;
        };
        let target = self.root.join(filename);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(path = %target.display(), "removed uploaded image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %target.display(), "failed to remove image: {}", e),
        }
    }
}
