use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{invalid_input_error, Error};

pub const MAX_IMAGE_BYTES: usize = 500_000;

/// Local directory holding uploaded place images. Stored images are referred
/// to by their path, which is what ends up in `Place::image`.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    #[tracing::instrument(name = "ImageStore::new", skip_all)]
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            tracing::debug!("creating upload directory");
            tokio::fs::create_dir_all(&root).await?;
        }

        Ok(Self { root })
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save(&self, content_type: &str, data: &[u8]) -> Result<String, Error> {
        let extension = extension_for(content_type)
            .ok_or_else(|| invalid_input_error("Invalid mime type."))?;

        if data.is_empty() || data.len() > MAX_IMAGE_BYTES {
            return Err(invalid_input_error("Image must be between 1 and 500000 bytes."));
        }

        let path = self.root.join(format!("{}.{}", Uuid::new_v4(), extension));
        tokio::fs::write(&path, data).await?;

        Ok(path.to_string_lossy().into_owned())
    }

    /// Deletes a stored image in the background. The outcome is only logged.
    pub fn discard(&self, path: String) {
        tokio::spawn(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(%path, "image deleted"),
                Err(err) => tracing::warn!(%path, %err, "failed to delete image"),
            }
        });
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpeg"),
        "image/jpg" => Some("jpg"),
        _ => None,
    }
}
