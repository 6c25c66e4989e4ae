//! Storage operations for file uploads and downloads

mod types;

use reqwest::{multipart, Client};
use serde_json::json;

use crate::error::{Error, Result};
use crate::fetch::{ensure_success, Fetch, CLIENT_INFO};

pub use types::*;

/// Client for Supabase Storage
pub struct StorageClient {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// Bearer token for requests
    token: String,

    /// HTTP client used for requests
    client: Client,
}

/// Client for a specific storage bucket
pub struct BucketClient<'a> {
    storage: &'a StorageClient,
    bucket_id: String,
}

impl StorageClient {
    /// Create a new StorageClient
    pub fn new(url: &str, key: &str, token: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            token: token.to_string(),
            client,
        }
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    /// Get a client for a specific bucket
    pub fn from(&self, bucket_id: &str) -> BucketClient<'_> {
        BucketClient {
            storage: self,
            bucket_id: bucket_id.to_string(),
        }
    }
}

/// Percent-encode each segment of an object path, keeping the separators
pub fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl<'a> BucketClient<'a> {
    fn object_url(&self, path: &str) -> String {
        self.storage
            .get_url(&format!("/object/{}/{}", self.bucket_id, encode_path(path)))
    }

    /// Upload a file to the bucket
    pub async fn upload(
        &self,
        path: &str,
        file_data: Vec<u8>,
        options: FileOptions,
    ) -> Result<UploadResponse> {
        let url = self.object_url(path);
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();

        let mut part = multipart::Part::bytes(file_data).file_name(file_name);
        if let Some(ref content_type) = options.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = multipart::Form::new()
            .text("cacheControl", options.cache_control.clone().unwrap_or_else(|| "3600".to_string()))
            .part("", part);

        log::debug!("Uploading {} to bucket {}", path, self.bucket_id);
        let response = self
            .storage
            .client
            .post(&url)
            .header("apikey", &self.storage.key)
            .header("Authorization", format!("Bearer {}", self.storage.token))
            .header("X-Client-Info", CLIENT_INFO)
            .header("x-upsert", options.upsert.to_string())
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response)
            .await
            .map_err(|e| Error::storage(format!("Upload of {} failed: {}", path, e)))?;
        Ok(response.json::<UploadResponse>().await?)
    }

    /// Download a file from the bucket
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.object_url(path);

        let response = Fetch::get(&self.storage.client, &url)
            .api_key(&self.storage.key, &self.storage.token)
            .execute_checked()
            .await
            .map_err(|e| Error::storage(format!("Download of {} failed: {}", path, e)))?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Delete files in the bucket
    pub async fn remove(&self, paths: &[&str]) -> Result<()> {
        let url = self.storage.get_url(&format!("/object/{}", self.bucket_id));

        Fetch::delete(&self.storage.client, &url)
            .api_key(&self.storage.key, &self.storage.token)
            .json(&json!({ "prefixes": paths }))?
            .execute_checked()
            .await
            .map_err(|e| Error::storage(format!("Removal failed: {}", e)))?;

        Ok(())
    }

    /// Get the public URL for a file
    pub fn get_public_url(&self, path: &str) -> String {
        self.storage.get_url(&format!(
            "/object/public/{}/{}",
            self.bucket_id,
            encode_path(path)
        ))
    }
}
