//! Google Drive API client.
//!
//! Every operation validates its local inputs, builds the request payload
//! once, and hands a request action to the client's [`RetryPolicy`]. The
//! action is re-run from scratch on each attempt, so upload bodies are
//! re-opened and download targets re-created per attempt.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::auth::{Authenticator, TokenProvider};
use crate::config::DriveConfig;
use crate::error::{DriveError, RequestError, Result};
use crate::models::{
    fields, ApiErrorResponse, DriveFile, FileListResponse, FileMetadataRequest, FOLDER_MIME_TYPE,
};
use crate::retry::RetryPolicy;

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Page size used by `list_files` when the caller has no preference.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Client for a Google Drive account, optionally scoped to one root folder.
pub struct DriveClient {
    config: DriveConfig,
    retry: RetryPolicy,
    auth: Arc<dyn TokenProvider>,
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    /// Create a client authenticating with the configured service account file.
    pub fn new(config: DriveConfig) -> Result<Self> {
        let auth = Authenticator::from_file(config.credentials_path())?;
        Ok(Self::with_token_provider(config, auth))
    }

    /// Create a client from environment configuration alone.
    pub fn from_env() -> Result<Self> {
        Self::new(DriveConfig::from_env()?)
    }

    /// Create a client with a custom token source.
    pub fn with_token_provider<A>(config: DriveConfig, auth: A) -> Self
    where
        A: TokenProvider + 'static,
    {
        let retry = RetryPolicy::new(config.max_retries(), config.retry_delay());
        Self {
            config,
            retry,
            auth: Arc::new(auth),
            http: Client::new(),
            api_base: DRIVE_API_BASE.to_string(),
            upload_base: UPLOAD_API_BASE.to_string(),
        }
    }

    /// Point the client at different metadata and upload endpoints.
    pub fn with_endpoints(
        mut self,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = upload_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Upload a local file.
    ///
    /// The item is named after the file's base name and placed in
    /// `parent_id`, else the configured root folder, else the drive root.
    pub async fn upload_file<P: AsRef<Path>>(
        &self,
        local_path: P,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFile> {
        let local_path = local_path.as_ref();
        ensure_exists(local_path)?;

        let metadata = FileMetadataRequest {
            name: Some(base_name(local_path)),
            mime_type: None,
            parents: self.resolve_parents(parent_id),
        };

        debug!(path = %local_path.display(), mime_type, "Uploading file");
        self.retry
            .execute("upload_file", || {
                self.send_upload(local_path, &metadata, mime_type)
            })
            .await
    }

    /// List a single page of files.
    ///
    /// `query` uses Drive query syntax and is combined with the root folder
    /// restriction when one is configured.
    pub async fn list_files(&self, query: Option<&str>, page_size: u32) -> Result<Vec<DriveFile>> {
        let q = build_list_query(self.config.root_folder_id(), query);

        debug!(query = ?q, page_size, "Listing files");
        self.retry
            .execute("list_files", || self.send_list(q.as_deref(), page_size))
            .await
    }

    /// Fetch metadata for one file.
    pub async fn get_file_meta(&self, file_id: &str) -> Result<DriveFile> {
        debug!(file_id, "Fetching file metadata");
        self.retry
            .execute("get_file_meta", || self.send_get(file_id))
            .await
    }

    /// Download a file's content to `destination`, replacing any existing file.
    ///
    /// Returns the number of bytes written.
    pub async fn download_file<P: AsRef<Path>>(&self, file_id: &str, destination: P) -> Result<u64> {
        let destination = destination.as_ref();

        debug!(file_id, destination = %destination.display(), "Downloading file");
        self.retry
            .execute("download_file", || self.send_download(file_id, destination))
            .await
    }

    /// Replace a file's content and/or rename it.
    ///
    /// With neither a new path nor a new name the call still goes out and
    /// only touches the file's metadata.
    pub async fn update_file(
        &self,
        file_id: &str,
        new_local_path: Option<&Path>,
        new_name: Option<&str>,
    ) -> Result<DriveFile> {
        if let Some(path) = new_local_path {
            ensure_exists(path)?;
        }

        let metadata = FileMetadataRequest {
            name: new_name.filter(|n| !n.is_empty()).map(str::to_string),
            ..Default::default()
        };

        debug!(file_id, replace_content = new_local_path.is_some(), "Updating file");
        self.retry
            .execute("update_file", || {
                self.send_update(file_id, &metadata, new_local_path)
            })
            .await
    }

    /// Permanently delete a file.
    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        debug!(file_id, "Deleting file");
        self.retry
            .execute("delete_file", || self.send_delete(file_id))
            .await
    }

    /// Create a folder, placed like an upload.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<DriveFile> {
        let metadata = FileMetadataRequest {
            name: Some(name.to_string()),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: self.resolve_parents(parent_id),
        };

        debug!(name, "Creating folder");
        self.retry
            .execute("create_folder", || self.send_create_folder(&metadata))
            .await
    }

    fn resolve_parents(&self, parent_id: Option<&str>) -> Option<Vec<String>> {
        resolve_parents(parent_id, self.config.root_folder_id())
    }

    fn all_drives(&self) -> &'static str {
        if self.config.supports_all_drives() {
            "true"
        } else {
            "false"
        }
    }

    async fn send_upload(
        &self,
        local_path: &Path,
        metadata: &FileMetadataRequest,
        mime_type: &str,
    ) -> std::result::Result<DriveFile, RequestError> {
        let token = self.auth.access_token().await?;
        let form = multipart_form(metadata, local_path, mime_type).await?;

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[
                ("uploadType", "multipart"),
                ("fields", fields::UPLOAD),
                ("supportsAllDrives", self.all_drives()),
            ])
            .multipart(form)
            .send()
            .await?;

        decode(response).await
    }

    async fn send_list(
        &self,
        q: Option<&str>,
        page_size: u32,
    ) -> std::result::Result<Vec<DriveFile>, RequestError> {
        let token = self.auth.access_token().await?;

        let mut request = self
            .http
            .get(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("pageSize", page_size.to_string().as_str()),
                ("fields", fields::LIST),
                ("supportsAllDrives", self.all_drives()),
                ("includeItemsFromAllDrives", self.all_drives()),
            ]);

        if let Some(q) = q {
            request = request.query(&[("q", q)]);
        }

        let list: FileListResponse = decode(request.send().await?).await?;
        Ok(list.files)
    }

    async fn send_get(&self, file_id: &str) -> std::result::Result<DriveFile, RequestError> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[
                ("fields", fields::GET),
                ("supportsAllDrives", self.all_drives()),
            ])
            .send()
            .await?;

        decode(response).await
    }

    async fn send_download(
        &self,
        file_id: &str,
        destination: &Path,
    ) -> std::result::Result<u64, RequestError> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", self.all_drives())])
            .send()
            .await?;
        let response = check_status(response).await?;

        // Dropped on every return path below, closing the handle.
        let mut file = File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;

        Ok(written)
    }

    async fn send_update(
        &self,
        file_id: &str,
        metadata: &FileMetadataRequest,
        new_local_path: Option<&Path>,
    ) -> std::result::Result<DriveFile, RequestError> {
        let token = self.auth.access_token().await?;

        let request = match new_local_path {
            Some(path) => {
                let mime_type = mime_guess::from_path(path).first_or_octet_stream();
                let form = multipart_form(metadata, path, mime_type.essence_str()).await?;
                self.http
                    .patch(format!("{}/files/{}", self.upload_base, file_id))
                    .query(&[("uploadType", "multipart")])
                    .multipart(form)
            }
            None => self
                .http
                .patch(format!("{}/files/{}", self.api_base, file_id))
                .json(metadata),
        };

        let response = request
            .bearer_auth(&token)
            .query(&[
                ("fields", fields::UPDATE),
                ("supportsAllDrives", self.all_drives()),
            ])
            .send()
            .await?;

        decode(response).await
    }

    async fn send_delete(&self, file_id: &str) -> std::result::Result<(), RequestError> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", self.all_drives())])
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn send_create_folder(
        &self,
        metadata: &FileMetadataRequest,
    ) -> std::result::Result<DriveFile, RequestError> {
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&token)
            .query(&[
                ("fields", fields::CREATE_FOLDER),
                ("supportsAllDrives", self.all_drives()),
            ])
            .json(metadata)
            .send()
            .await?;

        decode(response).await
    }
}

/// Effective list query: the root folder restriction and the caller's
/// filter joined with `and`, either alone, or `None` when both are absent.
pub fn build_list_query(root_folder_id: Option<&str>, filter: Option<&str>) -> Option<String> {
    let parts: Vec<String> = [
        root_folder_id
            .filter(|id| !id.is_empty())
            .map(|id| format!("'{}' in parents", id)),
        filter.filter(|q| !q.is_empty()).map(str::to_string),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" and "))
    }
}

/// Parent linkage for new items: explicit parent, else root folder, else none.
pub fn resolve_parents(parent_id: Option<&str>, root_folder_id: Option<&str>) -> Option<Vec<String>> {
    parent_id
        .filter(|id| !id.is_empty())
        .or(root_folder_id)
        .map(|id| vec![id.to_string()])
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DriveError::Input(format!(
            "file not found: {}",
            path.display()
        )))
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Metadata part followed by a streamed media part.
async fn multipart_form(
    metadata: &FileMetadataRequest,
    local_path: &Path,
    mime_type: &str,
) -> std::result::Result<Form, RequestError> {
    let file = File::open(local_path).await?;
    let length = file.metadata().await?.len();

    let metadata_part = Part::text(serde_json::to_string(metadata)?).mime_str("application/json")?;
    let media_part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
        .file_name(base_name(local_path))
        .mime_str(mime_type)?;

    Ok(Form::new()
        .part("metadata", metadata_part)
        .part("file", media_part))
}

/// Turn a non-success response into [`RequestError::Api`].
///
/// The HTTP status is authoritative; the message comes from Google's error
/// envelope when the body has one, else the raw body.
async fn check_status(response: Response) -> std::result::Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => body,
    };

    Err(RequestError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> std::result::Result<T, RequestError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_unrestricted() {
        assert_eq!(build_list_query(None, None), None);
        assert_eq!(build_list_query(Some(""), Some("")), None);
    }

    #[test]
    fn test_list_query_single_part() {
        assert_eq!(
            build_list_query(Some("root1"), None),
            Some("'root1' in parents".to_string())
        );
        assert_eq!(
            build_list_query(None, Some("trashed = false")),
            Some("trashed = false".to_string())
        );
    }

    #[test]
    fn test_list_query_conjunction() {
        assert_eq!(
            build_list_query(Some("root1"), Some("name contains 'report'")),
            Some("'root1' in parents and name contains 'report'".to_string())
        );
    }

    #[test]
    fn test_resolve_parents() {
        assert_eq!(
            resolve_parents(Some("explicit"), Some("root")),
            Some(vec!["explicit".to_string()])
        );
        assert_eq!(
            resolve_parents(None, Some("root")),
            Some(vec!["root".to_string()])
        );
        assert_eq!(resolve_parents(None, None), None);
        assert_eq!(
            resolve_parents(Some(""), Some("root")),
            Some(vec!["root".to_string()])
        );
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/tmp/dir/report.pdf")), "report.pdf");
        assert_eq!(base_name(Path::new("notes.txt")), "notes.txt");
    }

    #[test]
    fn test_ensure_exists_missing() {
        let err = ensure_exists(Path::new("/nonexistent/drive_client/file.bin")).unwrap_err();
        assert!(matches!(err, DriveError::Input(_)));
        assert!(err.to_string().contains("/nonexistent/drive_client/file.bin"));
    }
}
