// Media Store - image attachments for profiles, posts, events and projects
// The core only ever keeps the descriptor returned by `upload`, never raw bytes.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Reference to an uploaded image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>) -> AppResult<MediaDescriptor>;
}

/// Detect the image format from its magic bytes
fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix
pub fn decode_image(encoded: &str) -> AppResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 image: {}", e)))
}

/// Stores images as files under a directory served at `base_url`
pub struct LocalMediaStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(&self, bytes: Vec<u8>) -> AppResult<MediaDescriptor> {
        if bytes.is_empty() {
            return Err(AppError::Validation("Image is empty".to_string()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::Validation(format!(
                "Image exceeds {} bytes",
                MAX_IMAGE_BYTES
            )));
        }
        let extension = image_extension(&bytes).ok_or_else(|| {
            AppError::Validation("Unsupported image format".to_string())
        })?;

        let id = Uuid::new_v4().to_string();
        let file_name = format!("{}.{}", id, extension);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create media directory: {}", e)))?;
        tokio::fs::write(self.dir.join(&file_name), &bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store image: {}", e)))?;

        debug!("Stored image {}", file_name);
        Ok(MediaDescriptor {
            id,
            url: format!("{}/{}", self.base_url, file_name),
        })
    }
}
