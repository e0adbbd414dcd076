use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// One stored object as reported by the container at listing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_name: String,
    /// Byte size of the object, rendered as a decimal string.
    pub file_type: String,
    #[schema(value_type = String, example = "http://127.0.0.1:9000/pdf-files/638000000000000000_0f8f.pdf")]
    pub file_location: Url,
}

/// A single file submitted for upload, already read off the wire.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadPart {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Files submitted together in one upload call, in submission order.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    pub parts: Vec<UploadPart>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, part: UploadPart) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UploadPart> {
        self.parts.iter()
    }
}

impl From<Vec<UploadPart>> for UploadBatch {
    fn from(parts: Vec<UploadPart>) -> Self {
        Self { parts }
    }
}

impl<'a> IntoIterator for &'a UploadBatch {
    type Item = &'a UploadPart;
    type IntoIter = std::slice::Iter<'a, UploadPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}
