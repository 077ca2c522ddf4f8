//! Generic HTTP upload destination
//!
//! A single `PUT` of the raw snapshot bytes to a configured URL, with an
//! optional bearer token. Used when the cloud store is not signed in.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use crate::config::settings::UploadSettings;
use crate::error::LedgerResult;
use crate::remote::classify_status;

#[derive(Debug, Clone)]
pub struct GenericUploader {
    http: Client,
    settings: UploadSettings,
}

impl GenericUploader {
    pub fn new(http: Client, settings: UploadSettings) -> Self {
        Self { http, settings }
    }

    pub fn is_configured(&self) -> bool {
        self.settings
            .url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Upload the snapshot; `Ok(false)` when no endpoint is configured
    pub async fn upload(&self, snapshot: &Path) -> LedgerResult<bool> {
        let Some(url) = self.settings.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(false);
        };

        let bytes = tokio::fs::read(snapshot).await?;
        let len = bytes.len();
        let mut request = self
            .http
            .put(url)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        if let Some(token) = &self.settings.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, "generic upload", &body));
        }

        info!(url, bytes = len, "snapshot uploaded to generic endpoint");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn snapshot(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("snap.db");
        std::fs::write(&path, b"snapshot-bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_unconfigured_is_noop() {
        let temp = TempDir::new().unwrap();
        let uploader = GenericUploader::new(Client::new(), UploadSettings::default());
        assert!(!uploader.is_configured());
        assert!(!uploader.upload(&snapshot(&temp)).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_with_bearer_token() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/backups/latest"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let uploader = GenericUploader::new(
            Client::new(),
            UploadSettings {
                url: Some(format!("{}/backups/latest", server.uri())),
                auth_token: Some("secret".into()),
                timeout_secs: 5,
            },
        );
        assert!(uploader.upload(&snapshot(&temp)).await.unwrap());

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].body, b"snapshot-bytes");
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let temp = TempDir::new().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let uploader = GenericUploader::new(
            Client::new(),
            UploadSettings {
                url: Some(server.uri()),
                auth_token: None,
                timeout_secs: 5,
            },
        );
        let err = uploader.upload(&snapshot(&temp)).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Network);
    }
}
