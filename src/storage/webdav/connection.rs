use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::{AuthenticationError, StorageError};
use super::config::WebDAVConfig;

/// Property set requested on every PROPFIND
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
    <D:prop>
        <D:displayname/>
        <D:getcontentlength/>
        <D:getcontenttype/>
        <D:creationdate/>
        <D:getlastmodified/>
        <D:resourcetype/>
    </D:prop>
</D:propfind>"#;

/// HTTP plumbing for one WebDAV server: basic auth on every request.
pub struct WebDAVConnection {
    client: Client,
    config: WebDAVConfig,
    root_url: Url,
}

impl WebDAVConnection {
    pub fn new(config: WebDAVConfig) -> Result<Self, AuthenticationError> {
        if let Err(e) = config.validate() {
            warn!("Rejecting WebDAV configuration: {}", e);
            return Err(AuthenticationError::InvalidCredentials);
        }
        let root_url = config
            .root_url()
            .map_err(|_| AuthenticationError::InvalidCredentials)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                AuthenticationError::UnknownError
            })?;

        Ok(Self {
            client,
            config,
            root_url,
        })
    }

    pub fn config(&self) -> &WebDAVConfig {
        &self.config
    }

    pub fn root_url(&self) -> &Url {
        &self.root_url
    }

    fn propfind_method() -> Method {
        // PROPFIND is a valid token, this cannot fail
        Method::from_bytes(b"PROPFIND").unwrap_or(Method::GET)
    }

    /// Zero-depth PROPFIND on the server root to verify reachability and credentials
    pub async fn probe(&self) -> Result<(), AuthenticationError> {
        info!("🔍 Testing WebDAV connection to: {}", self.root_url);

        let response = self.client
            .request(Self::propfind_method(), self.root_url.clone())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Depth", "0")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(|e| {
                error!("❌ WebDAV connection failed: {}", e);
                AuthenticationError::NetworkError
            })?;

        match response.status() {
            StatusCode::MULTI_STATUS | StatusCode::OK => {
                info!("✅ WebDAV connection successful");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => {
                warn!("WebDAV server rejected credentials for user '{}'", self.config.username);
                Err(AuthenticationError::InvalidCredentials)
            }
            status => {
                warn!("WebDAV probe failed with status {}", status);
                Err(AuthenticationError::ServerError(format!("Status code: {}", status.as_u16())))
            }
        }
    }

    /// Depth-1 PROPFIND, returning the raw multi-status body
    pub async fn propfind(&self, url: &Url) -> Result<String, StorageError> {
        let response = self.client
            .request(Self::propfind_method(), url.clone())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .await
            .map_err(|e| {
                warn!("PROPFIND request to {} failed: {}", url, e);
                StorageError::NetworkError
            })?;

        let status = response.status();
        if status != StatusCode::MULTI_STATUS {
            warn!("PROPFIND on {} returned status {}", url, status);
            return Err(StorageError::ServerError(format!(
                "Failed to list directory '{}': status {}",
                url.path(),
                status.as_u16()
            )));
        }

        debug!("PROPFIND successful for: {}", url);
        response.text().await.map_err(|e| {
            warn!("Failed to read PROPFIND body from {}: {}", url, e);
            StorageError::NetworkError
        })
    }

    /// Authenticated GET returning the body bytes
    pub async fn get_bytes(&self, url: &Url) -> Result<Bytes, StorageError> {
        debug!("⬇️ Downloading: {}", url);

        let response = self.client
            .get(url.clone())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| {
                warn!("Download of {} failed: {}", url, e);
                StorageError::NetworkError
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::ServerError(format!(
                "Failed to download '{}': HTTP {}",
                url.path(),
                status.as_u16()
            )));
        }

        let content = response.bytes().await?;
        debug!("✅ Downloaded {} bytes from: {}", content.len(), url);
        Ok(content)
    }

    /// Resolves a directory path against the server root.
    ///
    /// Paths that already carry the root's own path prefix (hrefs handed back
    /// by the server) are resolved against the server origin; anything else is
    /// taken relative to the root, so `"/"` and `""` both mean the root itself.
    pub fn url_for_path(&self, path: &str) -> Result<Url, StorageError> {
        if let Ok(url) = Url::parse(path) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(url);
            }
        }

        let root_path = self.root_url.path();
        let joined = if path.starts_with(root_path) {
            self.root_url.join(path)
        } else {
            self.root_url.join(path.trim_start_matches('/'))
        };

        joined.map_err(|e| {
            warn!("Cannot resolve WebDAV path '{}': {}", path, e);
            StorageError::InvalidResponse
        })
    }
}
