use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;
use url::Url;

use super::storage::{
    BlobContainer, BlobItem, DELIMITER, DirectoryItem, ListItem, ListSegment, StorageError,
    object_uri,
};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: Option<String>,
}

/// Container kept entirely in process memory.
///
/// Names are listed in lexicographic order. Anything containing `/` is
/// reported once per first-level prefix as a [`ListItem::Directory`], the
/// same way a delimited S3 listing folds keys into common prefixes. The
/// continuation token is the last name a page covered, so entries deleted
/// while a scan is in progress never shift later pages.
pub struct MemoryContainer {
    blobs: Mutex<BTreeMap<String, StoredBlob>>,
    base_uri: Url,
    page_size: usize,
}

impl MemoryContainer {
    pub fn new(base_uri: Url, page_size: usize) -> Self {
        Self {
            blobs: Mutex::new(BTreeMap::new()),
            base_uri,
            page_size: page_size.max(1),
        }
    }

    /// Stores an object directly, bypassing upload naming.
    pub fn insert(&self, name: &str, data: impl Into<Bytes>) {
        self.lock().insert(
            name.to_string(),
            StoredBlob {
                data: data.into(),
                content_type: None,
            },
        );
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn content_type(&self, name: &str) -> Option<String> {
        self.lock().get(name).and_then(|b| b.content_type.clone())
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.lock().get(name).map(|b| b.data.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredBlob>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BlobContainer for MemoryContainer {
    async fn list_segment(&self, token: Option<String>) -> Result<ListSegment, StorageError> {
        let blobs = self.lock();
        let lower = match token {
            Some(ref t) => Bound::Excluded(t.clone()),
            None => Bound::Unbounded,
        };

        let mut items = Vec::new();
        let mut last_covered: Option<String> = None;
        let mut open_prefix: Option<String> = None;

        for (name, blob) in blobs.range((lower, Bound::Unbounded)) {
            if let Some(prefix) = &open_prefix {
                if name.starts_with(prefix.as_str()) {
                    last_covered = Some(name.clone());
                    continue;
                }
            }

            if items.len() == self.page_size {
                return Ok(ListSegment {
                    items,
                    continuation_token: last_covered,
                });
            }

            match name.find(DELIMITER) {
                Some(idx) => {
                    let prefix = name[..idx + DELIMITER.len()].to_string();
                    items.push(ListItem::Directory(DirectoryItem {
                        uri: object_uri(&self.base_uri, &prefix)?,
                        prefix: prefix.clone(),
                    }));
                    open_prefix = Some(prefix);
                }
                None => {
                    items.push(ListItem::Blob(BlobItem {
                        name: name.clone(),
                        size: blob.data.len() as i64,
                        uri: object_uri(&self.base_uri, name)?,
                    }));
                    open_prefix = None;
                }
            }
            last_covered = Some(name.clone());
        }

        Ok(ListSegment {
            items,
            continuation_token: None,
        })
    }

    async fn upload(
        &self,
        name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.lock().insert(
            name.to_string(),
            StoredBlob {
                data,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    async fn delete_if_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.lock().remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(page_size: usize) -> MemoryContainer {
        MemoryContainer::new(Url::parse("memory://local/pdf-files").unwrap(), page_size)
    }

    async fn drain(c: &MemoryContainer) -> (Vec<ListItem>, usize) {
        let mut items = Vec::new();
        let mut pages = 0;
        let mut token = None;
        loop {
            let segment = c.list_segment(token).await.unwrap();
            pages += 1;
            items.extend(segment.items);
            token = segment.continuation_token;
            if token.is_none() {
                break;
            }
        }
        (items, pages)
    }

    #[tokio::test]
    async fn test_pages_cover_every_blob_once() {
        let c = container(2);
        for name in ["e.pdf", "a.pdf", "d.pdf", "b.pdf", "c.pdf"] {
            c.insert(name, vec![0u8; 3]);
        }

        let (items, pages) = drain(&c).await;
        assert_eq!(pages, 3);
        let names: Vec<_> = items
            .iter()
            .map(|i| match i {
                ListItem::Blob(b) => b.name.clone(),
                ListItem::Directory(d) => d.prefix.clone(),
            })
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf"]);
    }

    #[tokio::test]
    async fn test_nested_names_fold_into_one_directory() {
        let c = container(10);
        c.insert("archive/one.pdf", "1");
        c.insert("archive/two.pdf", "2");
        c.insert("z.pdf", "z");

        let (items, _) = drain(&c).await;
        assert_eq!(items.len(), 2);
        match &items[0] {
            ListItem::Directory(d) => {
                assert_eq!(d.prefix, "archive/");
                assert_eq!(d.uri.as_str(), "memory://local/pdf-files/archive%2F");
            }
            other => panic!("expected directory, got {:?}", other),
        }
        match &items[1] {
            ListItem::Blob(b) => {
                assert_eq!(b.name, "z.pdf");
                assert_eq!(b.size, 1);
            }
            other => panic!("expected blob, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_directory_straddling_page_boundary_is_not_repeated() {
        let c = container(1);
        c.insert("dir/a.pdf", "a");
        c.insert("dir/b.pdf", "b");
        c.insert("x.pdf", "x");

        let (items, pages) = drain(&c).await;
        assert_eq!(items.len(), 2);
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn test_deleting_during_scan_does_not_skip() {
        let c = container(2);
        for name in ["a", "b", "c", "d", "e"] {
            c.insert(name, "x");
        }

        let mut token = None;
        loop {
            let segment = c.list_segment(token).await.unwrap();
            for item in segment.items {
                if let ListItem::Blob(b) = item {
                    assert!(c.delete_if_exists(&b.name).await.unwrap());
                }
            }
            token = segment.continuation_token;
            if token.is_none() {
                break;
            }
        }

        assert!(c.names().is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let c = container(10);
        c.upload("one.pdf", Bytes::from_static(b"%PDF"), Some("application/pdf"))
            .await
            .unwrap();
        assert_eq!(c.get("one.pdf").unwrap(), Bytes::from_static(b"%PDF"));
        assert_eq!(c.content_type("one.pdf").as_deref(), Some("application/pdf"));

        assert!(c.delete_if_exists("one.pdf").await.unwrap());
        assert!(!c.delete_if_exists("one.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_container_lists_single_empty_page() {
        let c = container(3);
        let segment = c.list_segment(None).await.unwrap();
        assert!(segment.items.is_empty());
        assert!(segment.continuation_token.is_none());
    }
}
