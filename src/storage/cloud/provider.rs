use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::errors::{AuthenticationError, StorageError};
use crate::models::{Album, Credentials, Photo, ProviderKind, CREDENTIAL_PASSWORD, CREDENTIAL_USERNAME};
use crate::storage::{check_required_credentials, required_credential, StorageProvider};
use super::api::{CloudListing, ListingResponse, LoginRequest, LoginResponse, FILES_PATH, LOGIN_PATH};

#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CloudConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.cloud_base_url.clone(),
            timeout_seconds: config.request_timeout_seconds,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// `StorageProvider` for the token-based cloud drive.
///
/// Login trades username and password for a session token which is then sent
/// as a bearer credential. Listings use the schema in [`super::api`].
pub struct CloudProvider {
    config: CloudConfig,
    client: Option<Client>,
    username: Option<String>,
    session_token: Option<String>,
}

impl Default for CloudProvider {
    fn default() -> Self {
        Self::new(CloudConfig::default())
    }
}

impl CloudProvider {
    pub fn new(config: CloudConfig) -> Self {
        Self {
            config,
            client: None,
            username: None,
            session_token: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(CloudConfig::from_config(config))
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn session(&self) -> Result<(&Client, &str), StorageError> {
        match (&self.client, &self.session_token) {
            (Some(client), Some(token)) => Ok((client, token.as_str())),
            _ => Err(StorageError::NotAuthenticated),
        }
    }

    async fn fetch_listing(&self, path: &str) -> Result<CloudListing, StorageError> {
        let (client, token) = self.session()?;
        let endpoint = self.config.endpoint(FILES_PATH);

        let response = client
            .get(&endpoint)
            .query(&[("path", path)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!("Cloud listing of '{}' failed: {}", path, e);
                StorageError::NetworkError
            })?;

        if response.status() != StatusCode::OK {
            warn!("Cloud listing of '{}' returned status {}", path, response.status());
            return Err(StorageError::ServerError(format!(
                "Failed to list '{}': status {}",
                path,
                response.status().as_u16()
            )));
        }

        let body = response.bytes().await?;
        let listing: ListingResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Unparseable cloud listing for '{}': {}", path, e);
            StorageError::InvalidResponse
        })?;

        Ok(listing.data)
    }

    async fn get_bytes(&self, url: &Url) -> Result<Bytes, StorageError> {
        let (client, token) = self.session()?;

        debug!("⬇️ Downloading: {}", url);
        let response = client
            .get(url.clone())
            .bearer_auth(token)
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
}

#[async_trait]
impl StorageProvider for CloudProvider {
    fn provider_name(&self) -> &str {
        "Cloud Drive"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    fn is_authenticated(&self) -> bool {
        self.session_token.is_some()
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), AuthenticationError> {
        check_required_credentials(ProviderKind::Cloud, credentials)?;
        let username = required_credential(credentials, CREDENTIAL_USERNAME)?;
        let password = required_credential(credentials, CREDENTIAL_PASSWORD)?;

        let client = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| {
                error!("Failed to build HTTP client: {}", e);
                AuthenticationError::UnknownError
            })?;

        let endpoint = self.config.endpoint(LOGIN_PATH);
        info!("🔍 Logging in to cloud drive as '{}'", username);

        let response = client
            .post(&endpoint)
            .json(&LoginRequest {
                account: username.to_string(),
                passwd: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| {
                error!("❌ Cloud login request failed: {}", e);
                AuthenticationError::NetworkError
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Cloud login returned status {}", status);
            return Err(AuthenticationError::ServerError(format!("Status code: {}", status.as_u16())));
        }

        let body = response.bytes().await?;
        let token = serde_json::from_slice::<LoginResponse>(&body)
            .ok()
            .and_then(LoginResponse::into_token)
            .ok_or_else(|| {
                warn!("Cloud login response carried no session token");
                AuthenticationError::InvalidCredentials
            })?;

        info!("✅ Cloud drive session established");
        self.client = Some(client);
        self.username = Some(username.to_string());
        self.session_token = Some(token);
        Ok(())
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, StorageError> {
        let listing = self.fetch_listing("/").await?;
        let albums: Vec<Album> = listing.folders.into_iter().map(Album::from).collect();
        info!("📁 Found {} albums", albums.len());
        Ok(albums)
    }

    async fn fetch_photos(&self, path: &str) -> Result<Vec<Photo>, StorageError> {
        let listing = self.fetch_listing(path).await?;
        let photos: Vec<Photo> = listing
            .files
            .into_iter()
            .filter(|file| file.is_image())
            .map(Photo::from)
            .collect();
        debug!("Found {} photos in '{}'", photos.len(), path);
        Ok(photos)
    }

    async fn download_photo(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.session()?;
        let url = photo.full_image_url.as_ref().ok_or(StorageError::NotFound)?;
        self.get_bytes(url).await
    }

    async fn download_thumbnail(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.session()?;
        match photo.thumbnail_url.as_ref() {
            Some(url) => self.get_bytes(url).await,
            None => self.download_photo(photo).await,
        }
    }
}
