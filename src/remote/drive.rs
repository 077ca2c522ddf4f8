//! HTTP client for the Drive v3 files API

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::auth::Authenticator;
use super::{classify_status, RemoteFile, RemoteStore};
use crate::config::paths::LedgerPaths;
use crate::config::settings::RemoteSettings;
use crate::error::{LedgerError, LedgerResult};

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const SNAPSHOT_MIME: &str = "application/x-sqlite3";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    id: String,
}

/// Remote store backed by the Drive v3 API
#[derive(Debug, Clone)]
pub struct DriveClient {
    http: Client,
    settings: RemoteSettings,
    auth: Authenticator,
}

impl DriveClient {
    pub fn new(http: Client, settings: RemoteSettings, auth: Authenticator) -> Self {
        Self {
            http,
            settings,
            auth,
        }
    }

    /// Build a client with its own connection pool and session file
    pub fn from_settings(paths: &LedgerPaths, settings: &RemoteSettings) -> LedgerResult<Self> {
        let http = Client::builder()
            .user_agent(format!("debitmanager/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let auth = Authenticator::new(http.clone(), settings.clone(), paths.session_file());
        Ok(Self::new(http, settings.clone(), auth))
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.settings.api_base.trim_end_matches('/'))
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/{}", self.files_url(), file_id)
    }

    /// Authorize, send and classify the response status
    async fn send(&self, builder: RequestBuilder, context: &str) -> LedgerResult<Response> {
        let token = self.auth.access_token().await?;
        let response = builder
            .bearer_auth(token)
            .timeout(self.settings.timeout())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, context, &body))
    }

    async fn query_files(&self, q: &str, fields: &str, order_by: Option<&str>) -> LedgerResult<Vec<RemoteFile>> {
        let mut params = vec![("q", q), ("fields", fields), ("spaces", "drive")];
        if let Some(order_by) = order_by {
            params.push(("orderBy", order_by));
        }
        let response = self
            .send(self.http.get(self.files_url()).query(&params), "list files")
            .await?;
        let list: FileList = response
            .json()
            .await
            .map_err(|e| LedgerError::Network(format!("malformed file listing: {}", e)))?;
        Ok(list.files)
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `multipart/related` body: JSON metadata part, then the base64 file part
fn multipart_body(boundary: &str, metadata: &serde_json::Value, bytes: &[u8]) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n\
         --{b}\r\nContent-Type: {mime}\r\nContent-Transfer-Encoding: base64\r\n\r\n{data}\r\n\
         --{b}--",
        b = boundary,
        meta = metadata,
        mime = SNAPSHOT_MIME,
        data = BASE64.encode(bytes),
    )
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn is_signed_in(&self) -> bool {
        self.auth.is_signed_in()
    }

    async fn get_or_create_folder(&self, name: &str) -> LedgerResult<String> {
        let q = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            quote(name),
            FOLDER_MIME
        );
        let existing = self.query_files(&q, "files(id, name)", None).await?;
        if let Some(folder) = existing.into_iter().next() {
            debug!(folder = %folder.id, "using existing backup folder");
            return Ok(folder.id);
        }

        let body = serde_json::json!({ "name": name, "mimeType": FOLDER_MIME });
        let response = self
            .send(
                self.http
                    .post(self.files_url())
                    .query(&[("fields", "id")])
                    .json(&body),
                "create folder",
            )
            .await?;
        let created: CreatedFolder = response
            .json()
            .await
            .map_err(|e| LedgerError::Network(format!("malformed folder response: {}", e)))?;
        info!(folder = %created.id, name, "created backup folder");
        Ok(created.id)
    }

    async fn upload(&self, local_path: &Path, folder_id: &str) -> LedgerResult<RemoteFile> {
        let bytes = tokio::fs::read(local_path).await?;
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| LedgerError::snapshot_not_found(local_path.display().to_string()))?;

        let metadata = serde_json::json!({
            "name": name,
            "mimeType": SNAPSHOT_MIME,
            "parents": [folder_id],
        });
        let boundary = format!("debitmanager-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, &metadata, &bytes);

        let url = format!(
            "{}/files",
            self.settings.upload_base.trim_end_matches('/')
        );
        let response = self
            .send(
                self.http
                    .post(url)
                    .query(&[("uploadType", "multipart"), ("fields", "id,name,createdTime")])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body),
                "upload snapshot",
            )
            .await?;
        let file: RemoteFile = response
            .json()
            .await
            .map_err(|e| LedgerError::Network(format!("malformed upload response: {}", e)))?;
        info!(file = %file.id, name = %file.name, bytes = bytes.len(), "snapshot uploaded");
        Ok(file)
    }

    async fn list(&self, folder_id: &str) -> LedgerResult<Vec<RemoteFile>> {
        let q = format!("'{}' in parents and trashed=false", quote(folder_id));
        self.query_files(
            &q,
            "files(id, name, createdTime)",
            Some("createdTime desc"),
        )
        .await
    }

    async fn download(&self, file_id: &str, dest: &Path) -> LedgerResult<()> {
        let response = self
            .send(
                self.http
                    .get(self.file_url(file_id))
                    .query(&[("alt", "media")]),
                "download snapshot",
            )
            .await?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        debug!(file = file_id, bytes = bytes.len(), dest = %dest.display(), "snapshot downloaded");
        Ok(())
    }

    async fn delete(&self, file_id: &str) -> LedgerResult<()> {
        self.send(self.http.delete(self.file_url(file_id)), "delete snapshot")
            .await?;
        info!(file = file_id, "remote snapshot deleted");
        Ok(())
    }
}
