//! On-disk blob storage for uploaded images and documents.
//!
//! Uploads are validated before any byte hits the disk, stored under a
//! per-purpose path prefix, and addressed by a durable `/blobs/...` URL that
//! the HTTP layer serves statically.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png"];
const CERTIFICATION_TYPES: &[&str] = &["application/pdf", "image/jpeg", "image/png"];

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("unsupported content type '{0}'")]
    InvalidType(String),

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("empty upload")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where an upload lands and which validation rules apply to it.
#[derive(Debug, Clone)]
pub enum BlobKind<'a> {
    Donation { org_id: &'a str },
    DonationConfirmation,
    Certification,
    Receipt { donation_id: &'a str },
    ChatImage { thread_id: &'a str },
}

impl BlobKind<'_> {
    /// Directory the blob lands in. Only the donation kind nests per-org.
    fn dir(&self) -> String {
        match self {
            BlobKind::Donation { org_id } => format!("donations/{}", sanitize(org_id)),
            BlobKind::DonationConfirmation => "donation-confirmations".into(),
            BlobKind::Certification => "certifications".into(),
            BlobKind::Receipt { .. } => "receipts".into(),
            BlobKind::ChatImage { .. } => "chat_images".into(),
        }
    }

    /// Identifier prefixed to the filename, ahead of the timestamp.
    fn file_prefix(&self) -> Option<String> {
        match self {
            BlobKind::Receipt { donation_id } => Some(sanitize(donation_id)),
            BlobKind::ChatImage { thread_id } => Some(sanitize(thread_id)),
            _ => None,
        }
    }

    fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            BlobKind::Certification => CERTIFICATION_TYPES,
            _ => IMAGE_TYPES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// Durable fetch URL, rooted at `/blobs/`.
    pub url: String,
    pub sha256: String,
    pub size: u64,
}

pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub async fn new(dir: PathBuf) -> Result<Self, BlobError> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        &self.dir
    }

    /// Reject an upload before writing anything.
    pub fn validate(kind: &BlobKind<'_>, content_type: &str, size: u64) -> Result<(), BlobError> {
        if !kind.allowed_types().contains(&content_type) {
            return Err(BlobError::InvalidType(content_type.to_string()));
        }
        if size == 0 {
            return Err(BlobError::Empty);
        }
        if size > MAX_UPLOAD_BYTES {
            return Err(BlobError::TooLarge {
                size,
                max: MAX_UPLOAD_BYTES,
            });
        }
        Ok(())
    }

    /// Validate, write and hash an upload. Progress is reported as a
    /// percentage at the same milestones the dashboard surfaced: 25 after
    /// validation, 75 once the bytes are on disk, 100 when the URL is ready.
    pub async fn store<F>(
        &self,
        kind: BlobKind<'_>,
        filename: &str,
        content_type: &str,
        data: &[u8],
        mut progress: F,
    ) -> Result<StoredBlob, BlobError>
    where
        F: FnMut(u8),
    {
        Self::validate(&kind, content_type, data.len() as u64)?;
        progress(25);

        let prefix = match kind.file_prefix() {
            Some(p) => format!("{}_", p),
            None => String::new(),
        };
        let rel_path = format!(
            "{}/{}{}_{}",
            kind.dir(),
            prefix,
            Utc::now().timestamp_millis(),
            sanitize(filename)
        );
        let path = self.dir.join(&rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        progress(75);

        let mut hasher = Sha256::new();
        hasher.update(data);
        let sha256 = hex::encode(hasher.finalize());
        progress(100);

        Ok(StoredBlob {
            url: format!("/blobs/{}", rel_path),
            sha256,
            size: data.len() as u64,
        })
    }

    /// Best-effort removal of a previously stored blob, used to clean up
    /// after a failed multi-step flow. Missing files are not an error.
    pub async fn delete(&self, url: &str) -> Result<(), BlobError> {
        let Some(rel_path) = url.strip_prefix("/blobs/") else {
            warn!("Refusing to delete non-blob URL '{}'", url);
            return Ok(());
        };
        let path = self.dir.join(sanitize_path(rel_path));
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob '{}' already gone", rel_path);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Strip anything that could escape the storage directory or confuse a URL.
/// Dot runs are collapsed so the result can never contain "..".
fn sanitize(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut prev_dot = false;
    for c in name.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if mapped == '.' {
            if prev_dot {
                continue;
            }
            prev_dot = true;
        } else {
            prev_dot = false;
        }
        cleaned.push(mapped);
    }
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize a stored relative path segment-by-segment, preserving the
/// prefix directory structure.
fn sanitize_path(rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .map(sanitize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).await.unwrap();
        (dir, store)
    }

    #[test]
    fn validation_rejects_foreign_types_and_oversize_files() {
        let kind = BlobKind::ChatImage { thread_id: "donor-42" };
        assert!(BlobStore::validate(&kind, "image/jpeg", 1024).is_ok());
        assert!(BlobStore::validate(&kind, "image/png", 1024).is_ok());

        assert!(matches!(
            BlobStore::validate(&kind, "image/gif", 1024),
            Err(BlobError::InvalidType(_))
        ));
        assert!(matches!(
            BlobStore::validate(&kind, "application/pdf", 1024),
            Err(BlobError::InvalidType(_))
        ));
        assert!(matches!(
            BlobStore::validate(&kind, "image/jpeg", MAX_UPLOAD_BYTES + 1),
            Err(BlobError::TooLarge { .. })
        ));
        assert!(matches!(
            BlobStore::validate(&kind, "image/jpeg", 0),
            Err(BlobError::Empty)
        ));
    }

    #[test]
    fn certifications_additionally_accept_pdf() {
        assert!(BlobStore::validate(&BlobKind::Certification, "application/pdf", 1024).is_ok());
        assert!(BlobStore::validate(&BlobKind::Certification, "image/webp", 1024).is_err());
    }

    #[tokio::test]
    async fn stored_blob_lands_under_its_prefix_with_progress() {
        let (_dir, store) = store().await;
        let mut milestones = Vec::new();

        let blob = store
            .store(
                BlobKind::ChatImage { thread_id: "donor-42" },
                "receipt photo.png",
                "image/png",
                b"fake png bytes",
                |pct| milestones.push(pct),
            )
            .await
            .unwrap();

        assert!(blob.url.starts_with("/blobs/chat_images/donor-42_"));
        assert!(blob.url.ends_with("_receipt_photo.png"));
        assert_eq!(blob.size, 14);
        assert_eq!(milestones, vec![25, 75, 100]);

        // The bytes really are on disk at the URL's relative path.
        let rel = blob.url.strip_prefix("/blobs/").unwrap();
        let data = tokio::fs::read(store.root().join(rel)).await.unwrap();
        assert_eq!(data, b"fake png bytes");
    }

    #[tokio::test]
    async fn filenames_cannot_escape_the_storage_dir() {
        let (_dir, store) = store().await;
        let blob = store
            .store(
                BlobKind::DonationConfirmation,
                "../../etc/passwd",
                "image/jpeg",
                b"data",
                |_| {},
            )
            .await
            .unwrap();
        assert!(!blob.url.contains(".."));
        assert!(blob.url.starts_with("/blobs/donation-confirmations/"));
    }

    #[test]
    fn sanitized_names_never_carry_dot_runs() {
        assert_eq!(sanitize("../../etc/passwd"), "_._etc_passwd");
        assert_eq!(sanitize("photo...2025.jpg"), "photo.2025.jpg");
        assert_eq!(sanitize("receipt.jpg"), "receipt.jpg");
        assert_eq!(sanitize("...."), "file");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_dir, store) = store().await;
        let blob = store
            .store(
                BlobKind::Receipt { donation_id: "TRX-007" },
                "receipt.jpg",
                "image/jpeg",
                b"bytes",
                |_| {},
            )
            .await
            .unwrap();

        store.delete(&blob.url).await.unwrap();
        store.delete(&blob.url).await.unwrap();
        store.delete("https://elsewhere.example/x.png").await.unwrap();
    }
}
