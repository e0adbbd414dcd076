use crate::config::UploadRules;
use crate::infrastructure::storage::ContainerFactory;
use crate::models::{FileRecord, UploadBatch};
use crate::services::storage::{ListItem, StorageError};
use crate::utils::naming::generate_unique_name;
use crate::utils::validation::{ValidationFailure, validate_batch};
use percent_encoding::percent_decode_str;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Ordering accepted by [`BlobService::ordered_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    FileName,
    /// Orders by the decimal size string, so "10" sorts before "9".
    FileSize,
}

impl SortKey {
    /// Unrecognized keys, including the empty string, order by name.
    pub fn from_param(value: &str) -> Self {
        match value {
            "FileSize" => Self::FileSize,
            _ => Self::FileName,
        }
    }
}

/// List, upload and delete operations over one blob container.
///
/// Holds no state between calls; each operation acquires its own container
/// handle from the factory.
pub struct BlobService {
    factory: Arc<dyn ContainerFactory>,
    rules: UploadRules,
}

impl BlobService {
    pub fn new(factory: Arc<dyn ContainerFactory>, rules: UploadRules) -> Self {
        Self { factory, rules }
    }

    pub fn rules(&self) -> &UploadRules {
        &self.rules
    }

    /// Confirms the container can be reached.
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.factory.acquire_container().await.map(|_| ())
    }

    pub fn validate(&self, batch: &UploadBatch) -> Vec<ValidationFailure> {
        validate_batch(batch, &self.rules)
    }

    /// Every stored blob, in the order the container reports them.
    pub async fn list(&self) -> Result<Vec<FileRecord>, StorageError> {
        let container = self.factory.acquire_container().await?;
        let mut records = Vec::new();
        let mut token = None;

        loop {
            let segment = container.list_segment(token).await?;
            for item in segment.items {
                match item {
                    ListItem::Blob(blob) => records.push(FileRecord {
                        file_name: blob.name,
                        file_type: blob.size.to_string(),
                        file_location: blob.uri,
                    }),
                    ListItem::Directory(dir) => {
                        debug!("Skipping directory entry {}", dir.prefix);
                    }
                }
            }

            token = segment.continuation_token;
            if token.is_none() {
                break;
            }
        }

        debug!("Listed {} blobs", records.len());
        Ok(records)
    }

    pub async fn ordered_list(&self, sort_key: &str) -> Result<Vec<FileRecord>, StorageError> {
        let mut records = self.list().await?;
        match SortKey::from_param(sort_key) {
            SortKey::FileName => {
                records.sort_by(|a, b| compare_names(&a.file_name, &b.file_name))
            }
            SortKey::FileSize => records.sort_by(|a, b| a.file_type.cmp(&b.file_type)),
        }
        Ok(records)
    }

    /// Stores each file under a freshly generated name, one at a time.
    ///
    /// Returns the generated names in batch order. A failure stops the batch;
    /// files stored before it stay in the container.
    pub async fn upload(&self, batch: &UploadBatch) -> Result<Vec<String>, StorageError> {
        let container = self.factory.acquire_container().await?;
        let mut names = Vec::with_capacity(batch.len());

        for part in batch {
            let name = generate_unique_name(&part.file_name);
            container
                .upload(&name, part.data.clone(), part.content_type.as_deref())
                .await?;
            info!(
                "📄 Uploaded {} as {} ({} bytes)",
                part.file_name,
                name,
                part.size()
            );
            names.push(name);
        }

        Ok(names)
    }

    /// Deletes the object a listing URI points at. Missing objects are ignored.
    pub async fn delete(&self, file_uri: &str) -> Result<(), StorageError> {
        let name = file_name_from_uri(file_uri)?;
        let container = self.factory.acquire_container().await?;

        if container.delete_if_exists(&name).await? {
            info!("🗑️  Deleted {}", name);
        } else {
            debug!("Nothing to delete for {}", name);
        }
        Ok(())
    }

    /// Deletes every blob found by a full scan; directory entries are left alone.
    pub async fn delete_all(&self) -> Result<(), StorageError> {
        let container = self.factory.acquire_container().await?;
        let mut deleted = 0usize;
        let mut token = None;

        loop {
            let segment = container.list_segment(token).await?;
            for item in segment.items {
                if let ListItem::Blob(blob) = item {
                    if container.delete_if_exists(&blob.name).await? {
                        deleted += 1;
                    }
                }
            }

            token = segment.continuation_token;
            if token.is_none() {
                break;
            }
        }

        info!("🗑️  Deleted {} blobs", deleted);
        Ok(())
    }
}

/// Case-insensitive order, with byte order breaking ties so `alpha.pdf`
/// lands before `Zeta.pdf` and the result stays deterministic.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Last path segment of `file_uri`, percent-decoded.
pub fn file_name_from_uri(file_uri: &str) -> Result<String, StorageError> {
    let uri = Url::parse(file_uri)
        .map_err(|e| StorageError::InvalidUri(format!("{}: {}", file_uri, e)))?;

    let segment = uri
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StorageError::InvalidUri(format!("{}: no file name", file_uri)))?;

    percent_decode_str(segment)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|e| StorageError::InvalidUri(format!("{}: {}", file_uri, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(SortKey::from_param("FileName"), SortKey::FileName);
        assert_eq!(SortKey::from_param("FileSize"), SortKey::FileSize);
        assert_eq!(SortKey::from_param("filesize"), SortKey::FileName);
        assert_eq!(SortKey::from_param(""), SortKey::FileName);
        assert_eq!(SortKey::from_param("bogus-key"), SortKey::FileName);
    }

    #[test]
    fn test_compare_names_ignores_case_first() {
        assert_eq!(compare_names("alpha.pdf", "Zeta.pdf"), Ordering::Less);
        assert_eq!(compare_names("B.pdf", "a.pdf"), Ordering::Greater);
        assert_eq!(compare_names("A.pdf", "a.pdf"), Ordering::Less);
        assert_eq!(compare_names("a.pdf", "a.pdf"), Ordering::Equal);
    }

    #[test]
    fn test_file_name_from_uri() {
        assert_eq!(
            file_name_from_uri("http://127.0.0.1:9000/pdf-files/123_abc.pdf").unwrap(),
            "123_abc.pdf"
        );
        assert_eq!(
            file_name_from_uri("https://acct.blob.core.windows.net/c/my%20file.pdf?sv=1").unwrap(),
            "my file.pdf"
        );
        assert_eq!(
            file_name_from_uri("memory://local/pdf-files/a%2Fb.pdf").unwrap(),
            "a/b.pdf"
        );
    }

    #[test]
    fn test_file_name_from_uri_rejects_garbage() {
        assert!(matches!(
            file_name_from_uri("not a uri"),
            Err(StorageError::InvalidUri(_))
        ));
        assert!(matches!(
            file_name_from_uri("http://127.0.0.1:9000/pdf-files/"),
            Err(StorageError::InvalidUri(_))
        ));
        assert!(matches!(
            file_name_from_uri("mailto:someone@example.com"),
            Err(StorageError::InvalidUri(_))
        ));
    }
}
