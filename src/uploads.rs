use std::path::{Path, PathBuf};

use rocket::fs::{NamedFile, TempFile};
use rocket::tokio::fs;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;

/// Directory of supporting documents. Files are stored under generated keys
/// so two uploads never share a path, whatever the client called them.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub key: String,
    pub original_name: String,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Copies an upload into the store. Returns `None` when the browser sent
    /// the file field without choosing a file.
    #[instrument(skip_all)]
    pub async fn save(&self, upload: &mut TempFile<'_>) -> Result<Option<StoredFile>, AppError> {
        let original_name = match upload.raw_name() {
            Some(name) => name.dangerous_unsafe_unsanitized_raw().as_str().to_string(),
            None => return Ok(None),
        };
        if original_name.is_empty() {
            return Ok(None);
        }

        let key = storage_key(&original_name);
        upload.copy_to(self.root.join(&key)).await?;

        info!(key = %key, original_name = %original_name, bytes = upload.len(), "Stored upload");

        Ok(Some(StoredFile { key, original_name }))
    }

    /// Opens a stored file. `key` is either a sanitized `PathBuf` segment
    /// guard or a key this store generated, so it cannot climb out of it.
    pub async fn open(&self, key: &Path) -> Option<NamedFile> {
        let path = self.root.join(key);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => NamedFile::open(path).await.ok(),
            _ => None,
        }
    }
}

/// A fresh storage key keeping the client's extension, if it has a sane one.
pub fn storage_key(original_name: &str) -> String {
    let id = Uuid::new_v4();
    match extension_of(original_name) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Lowercased extension of `name` when it is plain ASCII alphanumerics.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();

    if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}
