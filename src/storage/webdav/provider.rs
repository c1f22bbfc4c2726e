use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use crate::config::Config;
use crate::errors::{AuthenticationError, StorageError};
use crate::models::{Album, Credentials, Photo, ProviderKind};
use crate::storage::{check_required_credentials, StorageProvider};
use super::config::WebDAVConfig;
use super::connection::WebDAVConnection;
use super::discovery::WebDAVDiscovery;

/// `StorageProvider` over a generic WebDAV server.
///
/// Albums are the collections directly under the server root. WebDAV has no
/// thumbnails, so thumbnail downloads return the full image.
pub struct WebDAVProvider {
    config: WebDAVConfig,
    session: Option<WebDAVDiscovery>,
}

impl Default for WebDAVProvider {
    fn default() -> Self {
        Self::new(WebDAVConfig::default())
    }
}

impl WebDAVProvider {
    pub fn new(config: WebDAVConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(WebDAVConfig::from_config(config))
    }

    fn session(&self) -> Result<&WebDAVDiscovery, StorageError> {
        self.session.as_ref().ok_or(StorageError::NotAuthenticated)
    }
}

#[async_trait]
impl StorageProvider for WebDAVProvider {
    fn provider_name(&self) -> &str {
        "WebDAV"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::WebDAV
    }

    fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), AuthenticationError> {
        check_required_credentials(ProviderKind::WebDAV, credentials)?;

        let config = self.config.with_credentials(credentials)?;
        let connection = WebDAVConnection::new(config)?;
        connection.probe().await?;

        info!("🔐 Authenticated against WebDAV server {}", connection.root_url());
        self.session = Some(WebDAVDiscovery::new(connection));
        Ok(())
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, StorageError> {
        self.session()?.discover_albums().await
    }

    async fn fetch_photos(&self, path: &str) -> Result<Vec<Photo>, StorageError> {
        self.session()?.discover_photos(path).await
    }

    async fn fetch_all_photos(&self) -> Result<Vec<Photo>, StorageError> {
        self.session()?.discover_all_photos().await
    }

    async fn download_photo(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        let session = self.session()?;
        let url = photo.full_image_url.as_ref().ok_or(StorageError::NotFound)?;
        session.download(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials;
    use chrono::Utc;

    #[test]
    fn test_fresh_provider_is_unauthenticated() {
        let provider = WebDAVProvider::default();
        assert_eq!(provider.provider_name(), "WebDAV");
        assert_eq!(provider.kind(), ProviderKind::WebDAV);
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn test_missing_keys_fail_without_network() {
        let mut provider = WebDAVProvider::default();
        for creds in [
            credentials([("username", "u"), ("password", "p")]),
            credentials([("serverURL", "https://x/"), ("password", "p")]),
            credentials([("serverURL", "https://x/"), ("username", "u")]),
            credentials([("serverURL", ""), ("username", "u"), ("password", "p")]),
        ] {
            assert_eq!(
                provider.authenticate(&creds).await,
                Err(AuthenticationError::InvalidCredentials)
            );
            assert!(!provider.is_authenticated());
        }
    }

    #[tokio::test]
    async fn test_unparseable_server_url_is_invalid_credentials() {
        let mut provider = WebDAVProvider::default();
        let creds = credentials([("serverURL", "::not a url::"), ("username", "u"), ("password", "p")]);
        assert_eq!(
            provider.authenticate(&creds).await,
            Err(AuthenticationError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_operations_require_authentication() {
        let provider = WebDAVProvider::default();
        let now = Utc::now();
        let photo = Photo::new("/a.jpg", "a.jpg", "/a.jpg", 1, now, now);

        assert_eq!(provider.fetch_albums().await, Err(StorageError::NotAuthenticated));
        assert_eq!(provider.fetch_photos("/").await, Err(StorageError::NotAuthenticated));
        assert_eq!(provider.fetch_all_photos().await, Err(StorageError::NotAuthenticated));
        assert_eq!(provider.download_photo(&photo).await, Err(StorageError::NotAuthenticated));
        assert_eq!(provider.download_thumbnail(&photo).await, Err(StorageError::NotAuthenticated));
    }
}
