use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

/// Separator used to derive virtual directories from object names
pub const DELIMITER: &str = "/";

#[derive(Error, Debug)]
pub enum StorageError {
    /// Store unreachable or misconfigured
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O failure while listing, uploading or deleting
    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Invalid file URI: {0}")]
    InvalidUri(String),
}

/// A stored object that can be read, replaced and deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub size: i64,
    pub uri: Url,
}

/// A virtual directory grouping objects under a common prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryItem {
    pub prefix: String,
    pub uri: Url,
}

/// Anything a listing page can return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    Blob(BlobItem),
    Directory(DirectoryItem),
}

/// One page of a container listing
#[derive(Debug, Clone, Default)]
pub struct ListSegment {
    pub items: Vec<ListItem>,
    /// Cursor for the next page; `None` once the listing is exhausted
    pub continuation_token: Option<String>,
}

/// Handle to a single blob container
#[async_trait]
pub trait BlobContainer: Send + Sync {
    async fn list_segment(&self, token: Option<String>) -> Result<ListSegment, StorageError>;
    async fn upload(
        &self,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;
    /// Returns whether an object was actually removed
    async fn delete_if_exists(&self, name: &str) -> Result<bool, StorageError>;
}

/// Appends `name` to `base` as a single, percent-encoded path segment.
pub fn object_uri(base: &Url, name: &str) -> Result<Url, StorageError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StorageError::InvalidUri(format!("{} cannot be a base URI", base)))?
        .pop_if_empty()
        .push(name);
    Ok(url)
}

pub struct S3Container {
    client: Client,
    bucket: String,
    /// `<endpoint>/<bucket>`, the prefix of every object URI
    base_uri: Url,
    page_size: i32,
}

impl S3Container {
    pub fn new(client: Client, bucket: String, base_uri: Url, page_size: i32) -> Self {
        Self {
            client,
            bucket,
            base_uri,
            page_size,
        }
    }

    fn transfer_error<E>(op: &str, err: E) -> StorageError
    where
        E: std::error::Error,
    {
        tracing::error!("S3 {} failed: {}", op, DisplayErrorContext(&err));
        StorageError::Transfer(format!("{} failed: {}", op, DisplayErrorContext(&err)))
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(Self::transfer_error("head_object", service_error))
                }
            }
        }
    }
}

#[async_trait]
impl BlobContainer for S3Container {
    async fn list_segment(&self, token: Option<String>) -> Result<ListSegment, StorageError> {
        let res = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .delimiter(DELIMITER)
            .max_keys(self.page_size)
            .set_continuation_token(token)
            .send()
            .await
            .map_err(|e| Self::transfer_error("list_objects_v2", e))?;

        let mut items = Vec::new();

        for prefix in res.common_prefixes() {
            if let Some(prefix) = prefix.prefix() {
                items.push(ListItem::Directory(DirectoryItem {
                    prefix: prefix.to_string(),
                    uri: object_uri(&self.base_uri, prefix)?,
                }));
            }
        }

        for object in res.contents() {
            if let Some(key) = object.key() {
                items.push(ListItem::Blob(BlobItem {
                    name: key.to_string(),
                    size: object.size().unwrap_or(0),
                    uri: object_uri(&self.base_uri, key)?,
                }));
            }
        }

        let continuation_token = if res.is_truncated().unwrap_or(false) {
            res.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListSegment {
            items,
            continuation_token,
        })
    }

    async fn upload(
        &self,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::transfer_error("put_object", e))?;
        Ok(())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, StorageError> {
        if !self.exists(name).await? {
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| Self::transfer_error("delete_object", e))?;
        Ok(true)
    }
}
