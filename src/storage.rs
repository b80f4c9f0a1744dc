//! Local file storage for profile media.
//!
//! Files land in per-bucket directories under the data dir
//! (`storage/avatars`, `storage/banners`, `storage/logos`), each with its own
//! size cap. Writes go through a temp file and a rename so a crash never
//! leaves a half-written image at the final path.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Avatars,
    Banners,
    Logos,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Banners => "banners",
            Bucket::Logos => "logos",
        }
    }

    /// Per-bucket upload cap in bytes.
    pub fn max_bytes(&self) -> usize {
        match self {
            Bucket::Avatars => 2 * 1024 * 1024,
            Bucket::Banners => 5 * 1024 * 1024,
            Bucket::Logos => 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Bucket directories are created lazily on first write.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("storage"),
        }
    }

    fn bucket_dir(&self, bucket: Bucket) -> PathBuf {
        self.root.join(bucket.name())
    }

    /// Store `bytes` in the bucket and return the path relative to the
    /// storage root (the value persisted in `avatar_url` etc.).
    pub fn store(
        &self,
        bucket: Bucket,
        owner_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::Validation("file is empty".into()));
        }
        if bytes.len() > bucket.max_bytes() {
            return Err(ServiceError::Validation(format!(
                "file exceeds the {} byte limit for {}",
                bucket.max_bytes(),
                bucket.name()
            )));
        }
        let ext = extension.trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ServiceError::Validation(format!(
                "unsupported file extension: {:?}",
                extension
            )));
        }

        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir)
            .map_err(|e| ServiceError::Storage(format!("create bucket dir: {}", e)))?;

        let file_name = format!("{}-{}.{}", owner_id, Uuid::new_v4(), ext);
        let final_path = dir.join(&file_name);
        let tmp_path = dir.join(format!(".{}.tmp", file_name));

        fs::write(&tmp_path, bytes)
            .map_err(|e| ServiceError::Storage(format!("write {}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ServiceError::Storage(format!("finalize {}: {}", final_path.display(), e))
        })?;

        log::debug!("stored {} bytes in {}/{}", bytes.len(), bucket.name(), file_name);
        Ok(format!("{}/{}", bucket.name(), file_name))
    }

    /// Resolve a stored relative path back to a filesystem path.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Delete a stored file. Missing files are not an error — the pointer
    /// may outlive the file.
    pub fn delete(&self, relative: &str) -> Result<(), ServiceError> {
        let path = self.resolve(relative);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Storage(format!(
                "delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
