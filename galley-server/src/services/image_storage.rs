//! Image store gateway
//!
//! Product photos are validated, normalized to JPEG, and kept on local
//! disk under `uploads/images/`. Content hashes are symlinked in a
//! `by_hash/` tree so re-uploading the same image returns the existing
//! file instead of storing a copy.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fs, io};

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use shared::error::{AppError, AppResult, ErrorCode};

use crate::utils::IdSource;

/// Maximum file size (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Supported image formats
const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// JPEG quality for stored product images
const JPEG_QUALITY: u8 = 85;

/// A stored image, addressable by file name or serving URL
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub file_name: String,
    pub url: String,
    pub size: usize,
    /// True when the upload matched an existing file by content hash
    pub deduplicated: bool,
}

/// Gateway to wherever product images live
///
/// The rest of the system only sees this trait; swapping local disk
/// for a blob service is a matter of providing another implementation.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Validate, normalize, and store an image; returns its serving
    /// location
    async fn upload(&self, data: &[u8], original_name: &str) -> AppResult<StoredImage>;

    /// Store a new image and then drop the file it replaces
    async fn replace(
        &self,
        data: &[u8],
        original_name: &str,
        existing_file: &str,
    ) -> AppResult<StoredImage>;

    /// Remove a stored image
    async fn delete(&self, file_name: &str) -> AppResult<()>;

    /// Read a stored image back
    async fn load(&self, file_name: &str) -> AppResult<Vec<u8>>;
}

/// Calculate SHA256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Find existing file by content hash
fn find_file_by_hash(images_dir: &Path, hash: &str) -> Option<String> {
    let hash_dir = images_dir.join("by_hash");
    if !hash_dir.exists() {
        return None;
    }

    // Hash directory uses first 2 chars as subdir (e.g., "ab/abc123...")
    let prefix = &hash[..2];
    let hash_path = hash_dir.join(format!("{}/{}", prefix, hash));

    if hash_path.exists() {
        // Read the symlink to get original filename
        if let Ok(target) = fs::read_link(&hash_path) {
            return target.file_name().map(|s| s.to_string_lossy().to_string());
        }
    }
    None
}

/// Create hash-based symlink for deduplication
fn create_hash_symlink(images_dir: &Path, hash: &str, file_name: &str) -> AppResult<()> {
    let hash_dir = images_dir.join("by_hash");
    fs::create_dir_all(&hash_dir)
        .map_err(|e| AppError::storage(format!("Failed to create hash dir: {}", e)))?;

    let prefix = &hash[..2];
    let hash_subdir = hash_dir.join(prefix);
    fs::create_dir_all(&hash_subdir)
        .map_err(|e| AppError::storage(format!("Failed to create hash subdir: {}", e)))?;

    let hash_path = hash_subdir.join(hash);
    let target_path = PathBuf::from("../").join(file_name);

    symlink::symlink_auto(&target_path, &hash_path)
        .map_err(|e| AppError::storage(format!("Failed to create symlink: {}", e)))?;

    Ok(())
}

/// Re-encode the image as JPEG at the storage quality
fn process_and_compress(data: &[u8]) -> AppResult<Vec<u8>> {
    let img = image::load_from_memory(data).map_err(|e| {
        AppError::with_message(ErrorCode::InvalidImageFile, format!("Invalid image: {}", e))
    })?;

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let rgb_img = img.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        rgb_img.write_with_encoder(encoder).map_err(|e| {
            AppError::with_message(
                ErrorCode::ImageProcessingFailed,
                format!("Failed to compress image: {}", e),
            )
        })?;
    }

    Ok(buffer)
}

/// Validate size, extension, and decodability
fn validate_image(data: &[u8], ext: &str) -> AppResult<()> {
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::new(ErrorCode::FileTooLarge)
            .with_detail("max_bytes", MAX_FILE_SIZE)
            .with_detail("actual_bytes", data.len()));
    }

    let ext_lower = ext.to_lowercase();
    if !SUPPORTED_FORMATS.contains(&ext_lower.as_str()) {
        return Err(AppError::with_message(
            ErrorCode::UnsupportedFileFormat,
            format!(
                "Unsupported file format '{}'. Supported: {}",
                ext_lower,
                SUPPORTED_FORMATS.join(", ")
            ),
        ));
    }

    if let Err(e) = image::load_from_memory(data) {
        return Err(AppError::with_message(
            ErrorCode::InvalidImageFile,
            format!("Invalid image file ({}): {}", ext_lower, e),
        ));
    }

    Ok(())
}

/// Local-disk image storage
pub struct LocalImageStorage {
    images_dir: PathBuf,
    ids: Arc<dyn IdSource>,
}

impl LocalImageStorage {
    pub fn new(work_dir: impl Into<PathBuf>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            images_dir: work_dir.into().join("uploads/images"),
            ids,
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    fn serving_url(file_name: &str) -> String {
        format!("/api/image/{}", file_name)
    }
}

#[async_trait]
impl ImageStorage for LocalImageStorage {
    async fn upload(&self, data: &[u8], original_name: &str) -> AppResult<StoredImage> {
        if data.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyFile));
        }

        let ext = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::InvalidFormat,
                    format!("Invalid file extension for: {}", original_name),
                )
            })?;

        validate_image(data, ext)?;

        let compressed = process_and_compress(data)?;
        let file_hash = calculate_hash(&compressed);

        fs::create_dir_all(&self.images_dir)
            .map_err(|e| AppError::storage(format!("Failed to create images directory: {}", e)))?;

        // Same content already stored: hand back the existing file
        if let Some(existing) = find_file_by_hash(&self.images_dir, &file_hash) {
            tracing::info!(
                original_name = %original_name,
                existing_file = %existing,
                "Duplicate image detected, returning existing file"
            );

            return Ok(StoredImage {
                url: Self::serving_url(&existing),
                file_name: existing,
                size: compressed.len(),
                deduplicated: true,
            });
        }

        let file_name = format!("{}.jpg", self.ids.next_id());
        let file_path = self.images_dir.join(&file_name);

        fs::write(&file_path, &compressed)
            .map_err(|e| AppError::storage(format!("Failed to save file: {}", e)))?;

        create_hash_symlink(&self.images_dir, &file_hash, &file_name)?;

        tracing::info!(
            original_name = %original_name,
            file_name = %file_name,
            size = compressed.len(),
            hash = %file_hash,
            "Image uploaded"
        );

        Ok(StoredImage {
            url: Self::serving_url(&file_name),
            file_name,
            size: compressed.len(),
            deduplicated: false,
        })
    }

    async fn replace(
        &self,
        data: &[u8],
        original_name: &str,
        existing_file: &str,
    ) -> AppResult<StoredImage> {
        let stored = self.upload(data, original_name).await?;

        // The new file is already in place; a failed cleanup of the
        // old one must not undo the upload
        if stored.file_name != existing_file
            && let Err(e) = self.delete(existing_file).await
        {
            tracing::warn!(
                existing_file = %existing_file,
                error = %e,
                "Failed to remove replaced image"
            );
        }

        Ok(stored)
    }

    async fn delete(&self, file_name: &str) -> AppResult<()> {
        let file_path = self.images_dir.join(file_name);
        match fs::remove_file(&file_path) {
            Ok(()) => {
                tracing::info!(file_name = %file_name, "Image deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage(format!("Failed to delete file: {}", e))),
        }
    }

    async fn load(&self, file_name: &str) -> AppResult<Vec<u8>> {
        let file_path = self.images_dir.join(file_name);
        match fs::read(&file_path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::not_found("Image").with_detail("file_name", file_name))
            }
            Err(e) => Err(AppError::storage(format!("Failed to read file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::UuidSource;

    /// Tiny valid PNG generated in memory
    fn sample_png(shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade]));
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn storage(dir: &Path) -> LocalImageStorage {
        LocalImageStorage::new(dir, Arc::new(UuidSource))
    }

    #[tokio::test]
    async fn test_upload_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let stored = storage.upload(&sample_png(10), "photo.png").await.unwrap();
        assert!(stored.file_name.ends_with(".jpg"));
        assert_eq!(stored.url, format!("/api/image/{}", stored.file_name));
        assert!(!stored.deduplicated);

        let data = storage.load(&stored.file_name).await.unwrap();
        assert!(!data.is_empty());
        // Stored bytes are JPEG regardless of the input format
        assert!(image::load_from_memory(&data).is_ok());
    }

    #[tokio::test]
    async fn test_upload_deduplicates_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let first = storage.upload(&sample_png(10), "a.png").await.unwrap();
        let second = storage.upload(&sample_png(10), "b.png").await.unwrap();

        assert_eq!(first.file_name, second.file_name);
        assert!(second.deduplicated);
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let err = storage
            .upload(&sample_png(10), "photo.gif")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedFileFormat);
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let err = storage
            .upload(b"definitely not an image", "photo.png")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidImageFile);
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let big = vec![0u8; MAX_FILE_SIZE + 1];
        let err = storage.upload(&big, "photo.png").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FileTooLarge);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let err = storage.upload(&[], "photo.png").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyFile);
    }

    #[tokio::test]
    async fn test_replace_removes_old_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let old = storage.upload(&sample_png(10), "a.png").await.unwrap();
        let new = storage
            .replace(&sample_png(200), "b.png", &old.file_name)
            .await
            .unwrap();

        assert_ne!(old.file_name, new.file_name);
        assert!(storage.load(&new.file_name).await.is_ok());
        assert!(storage.load(&old.file_name).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let stored = storage.upload(&sample_png(10), "a.png").await.unwrap();
        storage.delete(&stored.file_name).await.unwrap();
        // Deleting again is a no-op, not an error
        storage.delete(&stored.file_name).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(dir.path());

        let err = storage.load("nope.jpg").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
