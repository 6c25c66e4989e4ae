//! Types for storage operations

use serde::{Deserialize, Serialize};

/// Options for file uploads
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// MIME type of the file
    pub content_type: Option<String>,

    /// Replace an existing object at the same path
    pub upsert: bool,

    /// Cache control header value, in seconds
    pub cache_control: Option<String>,
}

impl FileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn with_cache_control(mut self, cache_control: &str) -> Self {
        self.cache_control = Some(cache_control.to_string());
        self
    }
}

/// Response from an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// `{bucket}/{path}` of the stored object
    #[serde(rename = "Key")]
    pub key: String,
}
