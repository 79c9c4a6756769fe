//! Dropbox storage client.
//!
//! Talks to the Dropbox HTTP API with an app key, app secret and a
//! long-lived refresh token. The short-lived bearer token lives in a
//! [`Session`] owned by the client; it is fetched lazily before the first
//! call and refreshed when the API answers 401.
//!
//! Refreshes are single-flight: callers that saw the same stale token wait
//! on one exchange instead of each minting their own. A call that is still
//! rejected after `max_auth_retries` refreshes fails with
//! `FolioError::Unauthorized`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::cloud::{CloudClient, MediaStore};
use crate::config::dynamic::DynamicConfig;
use crate::config::simplified::DropboxCredentials;
use crate::errors::{FolioError, Result};
use crate::http_client::HttpClient;

// ---------------------------------------------------------------------------
// Data models
// ---------------------------------------------------------------------------

/// Metadata for a file as returned by `list_folder`, `upload` and friends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub client_modified: Option<String>,
    #[serde(default)]
    pub server_modified: Option<String>,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub media_info: Option<MediaInfo>,
}

/// Metadata for a folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderMetadata {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
}

/// Tombstone for an entry removed since a cursor was issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeletedMetadata {
    pub name: String,
    #[serde(default)]
    pub path_lower: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
}

/// One directory entry, discriminated by Dropbox's `.tag` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum Entry {
    File(FileMetadata),
    Folder(FolderMetadata),
    Deleted(DeletedMetadata),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::File(f) => &f.name,
            Entry::Folder(f) => &f.name,
            Entry::Deleted(d) => &d.name,
        }
    }

    pub fn path_display(&self) -> Option<&str> {
        match self {
            Entry::File(f) => f.path_display.as_deref(),
            Entry::Folder(f) => f.path_display.as_deref(),
            Entry::Deleted(d) => d.path_display.as_deref(),
        }
    }

    pub fn as_file(&self) -> Option<&FileMetadata> {
        match self {
            Entry::File(f) => Some(f),
            _ => None,
        }
    }
}

/// Photo/video details requested with `include_media_info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum MediaInfo {
    Pending,
    Metadata { metadata: MediaMetadata },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum MediaMetadata {
    Photo {
        #[serde(default)]
        dimensions: Option<Dimensions>,
        #[serde(default)]
        time_taken: Option<String>,
    },
    Video {
        #[serde(default)]
        dimensions: Option<Dimensions>,
        #[serde(default)]
        time_taken: Option<String>,
        /// Milliseconds.
        #[serde(default)]
        duration: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dimensions {
    pub height: u64,
    pub width: u64,
}

/// A file to upload: the whole payload is held in memory so a retry after
/// a 401 re-sends exactly the same bytes.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub payload: Bytes,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Read a local file; the destination name is the file's own name.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FolioError::Command(format!("Not a file name: {}", path.display()))
            })?
            .to_string();
        let payload = tokio::fs::read(path).await?;
        Ok(Self::new(name, payload))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
    include_media_info: bool,
}

#[derive(Debug, Serialize)]
struct ListFolderContinueArg<'a> {
    cursor: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    entries: Vec<Entry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct PathArg<'a> {
    path: &'a str,
}

#[derive(Debug, Deserialize)]
struct TemporaryLinkResult {
    link: String,
}

#[derive(Debug, Deserialize)]
struct DeleteResult {
    metadata: Entry,
}

#[derive(Debug, Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'a str,
    autorename: bool,
    mute: bool,
    strict_conflict: bool,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A bearer token together with the refresh that produced it.
///
/// Generations start at 1 and grow by one per successful exchange, which
/// lets a caller tell whether somebody else already replaced the token it
/// saw rejected.
#[derive(Clone)]
pub struct Credential {
    access_token: String,
    generation: u64,
}

impl Credential {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

/// Process-lifetime authentication state for one client instance.
#[derive(Default)]
pub struct Session {
    credential: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl Session {
    async fn current(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    async fn generation(&self) -> u64 {
        self.credential
            .read()
            .await
            .as_ref()
            .map_or(0, |c| c.generation)
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Base URLs for the three Dropbox hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct DropboxEndpoints {
    pub token_url: String,
    pub api_url: String,
    pub content_url: String,
}

impl DropboxEndpoints {
    pub fn from_config(config: &DynamicConfig) -> Self {
        Self {
            token_url: config.dropbox_token_url.clone(),
            api_url: config.dropbox_api_url.trim_end_matches('/').to_string(),
            content_url: config.dropbox_content_url.trim_end_matches('/').to_string(),
        }
    }

    fn rpc(&self, route: &str) -> String {
        format!("{}/2/{route}", self.api_url)
    }

    fn content(&self, route: &str) -> String {
        format!("{}/2/{route}", self.content_url)
    }
}

// ---------------------------------------------------------------------------
// DropboxClient
// ---------------------------------------------------------------------------

/// Dropbox client holding its own session.
#[derive(Clone)]
pub struct DropboxClient {
    http: HttpClient,
    credentials: DropboxCredentials,
    endpoints: DropboxEndpoints,
    max_auth_retries: u32,
    session: Arc<Session>,
}

impl DropboxClient {
    pub fn new(
        http: HttpClient,
        credentials: DropboxCredentials,
        endpoints: DropboxEndpoints,
        max_auth_retries: u32,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoints,
            max_auth_retries,
            session: Arc::new(Session::default()),
        }
    }

    /// Build a client from the current `DynamicConfig` snapshot.
    pub fn from_config(
        http: HttpClient,
        credentials: DropboxCredentials,
        config: &DynamicConfig,
    ) -> Self {
        Self::new(
            http,
            credentials,
            DropboxEndpoints::from_config(config),
            config.max_auth_retries,
        )
    }

    pub fn endpoints(&self) -> &DropboxEndpoints {
        &self.endpoints
    }

    /// Whether a bearer token is currently held.
    pub async fn has_credential(&self) -> bool {
        self.session.current().await.is_some()
    }

    // -----------------------------------------------------------------------
    // Credential handling
    // -----------------------------------------------------------------------

    /// Exchange the refresh token for a new bearer token, replacing any held one.
    pub async fn acquire_credential(&self) -> Result<Credential> {
        let _guard = self.session.refresh_lock.lock().await;
        self.exchange_refresh_token().await
    }

    /// Refresh unless another caller already replaced the token at `stale_generation`.
    async fn refresh_after(&self, stale_generation: u64) -> Result<Credential> {
        let _guard = self.session.refresh_lock.lock().await;
        if let Some(current) = self.session.current().await {
            if current.generation > stale_generation {
                tracing::debug!(
                    generation = current.generation,
                    "Reusing credential refreshed by a concurrent call"
                );
                return Ok(current);
            }
        }
        self.exchange_refresh_token().await
    }

    /// Caller must hold `refresh_lock`.
    async fn exchange_refresh_token(&self) -> Result<Credential> {
        let client = self.http.api().await;
        let resp = client
            .post(&self.endpoints.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_id", self.credentials.app_key.as_str()),
                ("client_secret", self.credentials.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(FolioError::Http)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status, "Dropbox token exchange rejected");
            return Err(FolioError::Auth(format!(
                "Dropbox token exchange failed ({status}): {body}"
            )));
        }

        let token = resp.json::<TokenResponse>().await.map_err(FolioError::Http)?;
        let mut slot = self.session.credential.write().await;
        let generation = slot.as_ref().map_or(0, |c| c.generation) + 1;
        let credential = Credential {
            access_token: token.access_token,
            generation,
        };
        *slot = Some(credential.clone());
        tracing::info!(
            generation,
            expires_in = token.expires_in,
            "Acquired Dropbox access token"
        );
        Ok(credential)
    }

    async fn ensure_credential(&self) -> Result<Credential> {
        match self.session.current().await {
            Some(c) => Ok(c),
            None => {
                let seen = self.session.generation().await;
                self.refresh_after(seen).await
            }
        }
    }

    /// Send an authorized request, refreshing the token on 401 up to
    /// `max_auth_retries` times.
    ///
    /// `build` is called once per attempt with the current bearer token.
    async fn send_authorized<F>(&self, operation: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let client = self.http.api().await;
        self.send_authorized_on(client, operation, build).await
    }

    async fn send_authorized_on<F>(
        &self,
        client: reqwest::Client,
        operation: &str,
        build: F,
    ) -> Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder,
    {
        let mut credential = self.ensure_credential().await?;
        let mut refreshes = 0;

        loop {
            tracing::debug!(operation, generation = credential.generation, "Dropbox request");
            let resp = build(&client, &credential.access_token)
                .send()
                .await
                .map_err(FolioError::Http)?;

            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED {
                if refreshes >= self.max_auth_retries {
                    return Err(FolioError::Unauthorized {
                        operation: operation.to_string(),
                    });
                }
                refreshes += 1;
                tracing::warn!(operation, attempt = refreshes, "Dropbox returned 401, refreshing token");
                credential = self.refresh_after(credential.generation).await?;
                continue;
            }

            if !status.is_success() {
                return Err(FolioError::from_response(operation, resp).await);
            }
            return Ok(resp);
        }
    }

    // -----------------------------------------------------------------------
    // File operations
    // -----------------------------------------------------------------------

    /// List `path` without recursion, following `has_more` cursors.
    pub async fn list_folder(&self, path: &str) -> Result<Vec<Entry>> {
        let url = self.endpoints.rpc("files/list_folder");
        let arg = ListFolderArg {
            path,
            recursive: false,
            include_media_info: true,
        };
        let resp = self
            .send_authorized("list_folder", |client, token| {
                client.post(&url).bearer_auth(token).json(&arg)
            })
            .await?;
        let mut page = resp
            .json::<ListFolderResult>()
            .await
            .map_err(FolioError::Http)?;

        let mut entries = std::mem::take(&mut page.entries);
        let continue_url = self.endpoints.rpc("files/list_folder/continue");
        while page.has_more {
            let cursor = page.cursor.clone();
            let arg = ListFolderContinueArg { cursor: &cursor };
            let resp = self
                .send_authorized("list_folder_continue", |client, token| {
                    client.post(&continue_url).bearer_auth(token).json(&arg)
                })
                .await?;
            page = resp
                .json::<ListFolderResult>()
                .await
                .map_err(FolioError::Http)?;
            entries.append(&mut page.entries);
        }

        tracing::debug!(path, count = entries.len(), "Listed Dropbox folder");
        Ok(entries)
    }

    /// Get a time-limited direct link for the file at `path`.
    pub async fn get_temporary_link(&self, path: &str) -> Result<String> {
        let url = self.endpoints.rpc("files/get_temporary_link");
        let arg = PathArg { path };
        let resp = self
            .send_authorized("get_temporary_link", |client, token| {
                client.post(&url).bearer_auth(token).json(&arg)
            })
            .await?;
        let result = resp
            .json::<TemporaryLinkResult>()
            .await
            .map_err(FolioError::Http)?;
        Ok(result.link)
    }

    /// Upload into `folder` as `request.name`, letting Dropbox auto-rename on conflict.
    pub async fn upload_file(&self, folder: &str, request: &UploadRequest) -> Result<FileMetadata> {
        let url = self.endpoints.content("files/upload");
        let destination = remote_path(folder, &request.name);
        let arg = header_safe_json(&UploadArg {
            path: &destination,
            mode: "add",
            autorename: true,
            mute: false,
            strict_conflict: false,
        })?;

        let client = self.http.transfer().await;
        let resp = self
            .send_authorized_on(client, "upload", |client, token| {
                client
                    .post(&url)
                    .bearer_auth(token)
                    .header("Dropbox-API-Arg", arg.as_str())
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(request.payload.clone())
            })
            .await?;

        let file = resp.json::<FileMetadata>().await.map_err(FolioError::Http)?;
        tracing::info!(name = %file.name, size = file.size, "Uploaded file to Dropbox");
        Ok(file)
    }

    /// Delete the file or folder at `path`.
    pub async fn delete_file(&self, path: &str) -> Result<Entry> {
        let url = self.endpoints.rpc("files/delete_v2");
        let arg = PathArg { path };
        let resp = self
            .send_authorized("delete", |client, token| {
                client.post(&url).bearer_auth(token).json(&arg)
            })
            .await?;
        let result = resp.json::<DeleteResult>().await.map_err(FolioError::Http)?;
        tracing::info!(path, "Deleted Dropbox entry");
        Ok(result.metadata)
    }
}

/// Join a Dropbox folder and a file name into an absolute path.
///
/// The root folder is written as the empty string.
pub fn remote_path(folder: &str, name: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        format!("/{name}")
    } else if folder.starts_with('/') {
        format!("{folder}/{name}")
    } else {
        format!("/{folder}/{name}")
    }
}

/// Serialize to JSON with every non-ASCII character and DEL escaped as
/// `\uXXXX`, since HTTP header values must be visible ASCII.
fn header_safe_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() && ch != '\x7f' {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl CloudClient for DropboxClient {
    fn name(&self) -> &str {
        "Dropbox"
    }

    async fn authenticate(&self) -> Result<()> {
        self.acquire_credential().await.map(|_| ())
    }
}

#[async_trait]
impl MediaStore for DropboxClient {
    async fn list_folder(&self, path: &str) -> Result<Vec<Entry>> {
        DropboxClient::list_folder(self, path).await
    }

    async fn temporary_link(&self, path: &str) -> Result<String> {
        self.get_temporary_link(path).await
    }

    async fn upload(&self, folder: &str, request: UploadRequest) -> Result<FileMetadata> {
        self.upload_file(folder, &request).await
    }

    async fn delete(&self, path: &str) -> Result<Entry> {
        self.delete_file(path).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Matches an ASCII-only `Dropbox-API-Arg` header carrying the given JSON.
    struct ApiArgMatcher(serde_json::Value);

    impl wiremock::Match for ApiArgMatcher {
        fn matches(&self, request: &wiremock::Request) -> bool {
            request
                .headers
                .get("dropbox-api-arg")
                .and_then(|v| v.to_str().ok())
                .filter(|v| v.is_ascii())
                .and_then(|v| serde_json::from_str::<serde_json::Value>(v).ok())
                .is_some_and(|v| v == self.0)
        }
    }

    fn make_client(server: &MockServer, max_auth_retries: u32) -> DropboxClient {
        let http = HttpClient::from_defaults().unwrap();
        DropboxClient::new(
            http,
            DropboxCredentials {
                app_key: "app-key".into(),
                app_secret: "app-secret".into(),
                refresh_token: "refresh-secret".into(),
            },
            DropboxEndpoints {
                token_url: format!("{}/oauth2/token", server.uri()),
                api_url: server.uri(),
                content_url: server.uri(),
            },
            max_auth_retries,
        )
    }

    fn token_body(token: &str) -> serde_json::Value {
        json!({ "access_token": token, "token_type": "bearer", "expires_in": 14400 })
    }

    fn file_json(name: &str) -> serde_json::Value {
        json!({
            ".tag": "file",
            "name": name,
            "id": format!("id:{name}"),
            "path_lower": format!("/{}", name.to_lowercase()),
            "path_display": format!("/{name}"),
            "size": 2048,
            "rev": "015f",
        })
    }

    async fn mount_token(server: &MockServer, token: &str, times: Option<u64>) {
        let mock = Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(token)));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n).expect(n),
            None => mock,
        };
        mock.mount(server).await;
    }

    #[tokio::test]
    async fn test_first_call_acquires_exactly_one_credential() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", Some(1)).await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [file_json("beach.jpg")],
                "cursor": "c0",
                "has_more": false,
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        assert!(!client.has_credential().await);

        let entries = client.list_folder("").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "beach.jpg");

        // Second call reuses the held token.
        client.list_folder("").await.unwrap();
        assert!(client.has_credential().await);
    }

    #[tokio::test]
    async fn test_list_folder_sends_non_recursive_media_request() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", None).await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .and(body_string_contains("\"recursive\":false"))
            .and(body_string_contains("\"include_media_info\":true"))
            .and(body_string_contains("\"path\":\"\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [],
                "cursor": "c0",
                "has_more": false,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        assert!(client.list_folder("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_triggers_one_refresh_and_retry() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", Some(1)).await;
        mount_token(&server, "token-2", Some(1)).await;
        Mock::given(method("POST"))
            .and(path("/2/files/get_temporary_link"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/get_temporary_link"))
            .and(header("authorization", "Bearer token-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": file_json("clip.mp4"),
                "link": "https://dl.dropboxusercontent.com/apitl/1/abc",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        let link = client.get_temporary_link("/clip.mp4").await.unwrap();
        assert_eq!(link, "https://dl.dropboxusercontent.com/apitl/1/abc");
    }

    #[tokio::test]
    async fn test_always_unauthorized_is_bounded() {
        let server = MockServer::start().await;
        mount_token(&server, "token-x", Some(2)).await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        match client.list_folder("").await.unwrap_err() {
            FolioError::Unauthorized { operation } => assert_eq!(operation, "list_folder"),
            other => panic!("Expected Unauthorized, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_exchange_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "error": "invalid_grant" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        match client.list_folder("").await.unwrap_err() {
            FolioError::Auth(msg) => assert!(msg.contains("invalid_grant")),
            other => panic!("Expected Auth error, got: {:?}", other),
        }
        assert!(!client.has_credential().await);
    }

    #[tokio::test]
    async fn test_other_failure_is_request_error() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", None).await;
        Mock::given(method("POST"))
            .and(path("/2/files/delete_v2"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("path_lookup/not_found/"),
            )
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        match client.delete_file("/missing.png").await.unwrap_err() {
            FolioError::Request {
                operation,
                status,
                message,
            } => {
                assert_eq!(operation, "delete");
                assert_eq!(status, 409);
                assert!(message.contains("not_found"));
            }
            other => panic!("Expected Request error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_folder_follows_cursor() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", None).await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [file_json("a.png"), { ".tag": "folder", "name": "Albums", "id": "id:f" }],
                "cursor": "cursor-1",
                "has_more": true,
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/list_folder/continue"))
            .and(body_string_contains("cursor-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entries": [file_json("b.mov")],
                "cursor": "cursor-2",
                "has_more": false,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        let entries = client.list_folder("").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a.png", "Albums", "b.mov"]);
        assert!(matches!(entries[1], Entry::Folder(_)));
    }

    #[tokio::test]
    async fn test_upload_retry_resends_same_payload() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", Some(1)).await;
        mount_token(&server, "token-2", Some(1)).await;
        let payload = b"\x89PNG fake image bytes".to_vec();

        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_bytes(payload.clone()))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .and(header("authorization", "Bearer token-2"))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(payload.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "shot.png",
                "id": "id:shot",
                "path_display": "/shot.png",
                "size": 21,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        let file = client
            .upload_file("", &UploadRequest::new("shot.png", payload))
            .await
            .unwrap();
        assert_eq!(file.name, "shot.png");
        assert_eq!(file.size, 21);
    }

    #[tokio::test]
    async fn test_upload_arg_header() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", None).await;
        Mock::given(method("POST"))
            .and(path("/2/files/upload"))
            .and(ApiArgMatcher(json!({
                "path": "/Gallery/café.jpg",
                "mode": "add",
                "autorename": true,
                "mute": false,
                "strict_conflict": false,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "café.jpg",
                "id": "id:cafe",
                "size": 3,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        let file = client
            .upload_file("/Gallery/", &UploadRequest::new("café.jpg", b"abc".to_vec()))
            .await
            .unwrap();
        assert_eq!(file.name, "café.jpg");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_single_flight() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", Some(1)).await;
        mount_token(&server, "token-2", Some(1)).await;
        Mock::given(method("POST"))
            .and(path("/2/files/get_temporary_link"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2/files/get_temporary_link"))
            .and(header("authorization", "Bearer token-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": file_json("a.jpg"),
                "link": "https://dl.example.com/a",
            })))
            .mount(&server)
            .await;

        let client = make_client(&server, 1);
        let (a, b) = tokio::join!(
            client.get_temporary_link("/a.jpg"),
            client.get_temporary_link("/a.jpg"),
        );
        assert_eq!(a.unwrap(), "https://dl.example.com/a");
        assert_eq!(b.unwrap(), "https://dl.example.com/a");
    }

    #[tokio::test]
    async fn test_acquire_credential_overwrites() {
        let server = MockServer::start().await;
        mount_token(&server, "token-1", Some(1)).await;
        mount_token(&server, "token-2", Some(1)).await;

        let client = make_client(&server, 1);
        let first = client.acquire_credential().await.unwrap();
        let second = client.authenticate().await;
        assert!(second.is_ok());
        assert_eq!(first.generation(), 1);
        assert_eq!(client.session.generation().await, 2);
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("", "a.jpg"), "/a.jpg");
        assert_eq!(remote_path("/", "a.jpg"), "/a.jpg");
        assert_eq!(remote_path("/Photos", "a.jpg"), "/Photos/a.jpg");
        assert_eq!(remote_path("Photos/", "a.jpg"), "/Photos/a.jpg");
    }

    #[test]
    fn test_header_safe_json_escapes_non_ascii() {
        let json = header_safe_json(&PathArg { path: "/日本 🎉.png" }).unwrap();
        assert!(json.is_ascii());
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["path"], "/日本 🎉.png");
    }

    #[test]
    fn test_header_safe_json_escapes_delete_char() {
        let json = header_safe_json(&PathArg { path: "/a\u{7f}b.jpg" }).unwrap();
        assert!(json.contains("\\u007f"));
        assert!(reqwest::header::HeaderValue::from_str(&json).is_ok());
        let back: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back["path"], "/a\u{7f}b.jpg");
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let c = Credential {
            access_token: "sl.secret".into(),
            generation: 3,
        };
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("sl.secret"));
        assert!(dbg.contains("generation: 3"));
    }

    #[test]
    fn test_entry_deserializes_media_info() {
        let entry: Entry = serde_json::from_value(json!({
            ".tag": "file",
            "name": "IMG_0001.JPG",
            "id": "id:1",
            "size": 1024,
            "media_info": {
                ".tag": "metadata",
                "metadata": {
                    ".tag": "photo",
                    "dimensions": { "height": 3024, "width": 4032 },
                    "time_taken": "2024-05-01T10:00:00Z"
                }
            }
        }))
        .unwrap();

        let file = entry.as_file().unwrap();
        match &file.media_info {
            Some(MediaInfo::Metadata {
                metadata: MediaMetadata::Photo { dimensions, .. },
            }) => assert_eq!(dimensions.unwrap().width, 4032),
            other => panic!("unexpected media info: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_request_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("sunset.gif");
        std::fs::write(&file, b"GIF89a").unwrap();

        let req = UploadRequest::from_path(&file).await.unwrap();
        assert_eq!(req.name, "sunset.gif");
        assert_eq!(&req.payload[..], b"GIF89a");
    }
}
