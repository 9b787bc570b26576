//! Upload storage for practical files.
//!
//! The store accepts bytes plus a declared MIME type, enforces the allow-list
//! and size ceiling before anything touches disk, and only returns a path
//! once the bytes are durably written. Order rows therefore never reference
//! a partial file.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::errors::ServiceError;

/// MIME types the intake form accepts: PDF, DOC, DOCX and plain text.
const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Reference to a stored upload, recorded on the order.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Original client-supplied file name.
    pub file_name: String,
    /// Path of the stored copy, relative to the process working directory.
    pub file_path: String,
}

#[derive(Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    max_bytes: u64,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_bytes,
        }
    }

    /// Validates the declared MIME type and size without touching disk.
    /// Called before any persistence so rejected uploads leave no trace.
    pub fn validate(&self, content_type: &str, len: u64) -> Result<(), ServiceError> {
        let normalized = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();

        if !ALLOWED_MIME_TYPES.contains(&normalized.as_str()) {
            return Err(ServiceError::UnsupportedFileType(format!(
                "{} is not allowed; only PDF, DOC, DOCX and TXT files are accepted",
                content_type
            )));
        }

        if len > self.max_bytes {
            return Err(ServiceError::FileTooLarge(len, self.max_bytes));
        }

        Ok(())
    }

    /// Stores an upload and returns its reference. The write is flushed to
    /// disk before returning.
    #[instrument(skip(self, data), fields(original_name = %original_name, bytes = data.len()))]
    pub async fn store(
        &self,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StoredFile, ServiceError> {
        self.validate(content_type, data.len() as u64)?;

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| ServiceError::InternalError(format!("upload dir unavailable: {e}")))?;

        let stored_name = generate_stored_name(original_name);
        let path = self.base_dir.join(&stored_name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ServiceError::InternalError(format!("failed to create upload: {e}")))?;
        file.write_all(&data)
            .await
            .map_err(|e| ServiceError::InternalError(format!("failed to write upload: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| ServiceError::InternalError(format!("failed to flush upload: {e}")))?;

        info!(path = %path.display(), "Upload stored");

        Ok(StoredFile {
            file_name: original_name.to_string(),
            file_path: path.to_string_lossy().into_owned(),
        })
    }
}

/// Unique stored name: timestamp plus a random suffix, keeping the original
/// extension.
fn generate_stored_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("upload-{}-{}{}", Utc::now().timestamp_millis(), suffix, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        FileStore::new(tempfile::tempdir().unwrap().into_path(), 10 * 1024 * 1024)
    }

    #[test]
    fn rejects_disallowed_mime_types() {
        let store = store();
        let err = store.validate("image/png", 100).unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFileType(_)));

        let err = store
            .validate("application/x-msdownload", 100)
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFileType(_)));
    }

    #[test]
    fn rejects_oversize_uploads() {
        let store = FileStore::new(tempfile::tempdir().unwrap().into_path(), 1024);
        let err = store.validate("application/pdf", 2048).unwrap_err();
        assert!(matches!(err, ServiceError::FileTooLarge(2048, 1024)));
    }

    #[test]
    fn accepts_allowed_types_with_charset_parameter() {
        let store = store();
        assert!(store.validate("text/plain; charset=utf-8", 100).is_ok());
        assert!(store.validate("application/pdf", 100).is_ok());
    }

    #[tokio::test]
    async fn stores_bytes_and_keeps_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), 1024);

        let stored = store
            .store("practical-7.pdf", "application/pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();

        assert_eq!(stored.file_name, "practical-7.pdf");
        assert!(stored.file_path.ends_with(".pdf"));
        let on_disk = std::fs::read(&stored.file_path).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn oversize_store_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), 4);

        let err = store
            .store("notes.txt", "text/plain", Bytes::from_static(b"too big"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::FileTooLarge(..)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
