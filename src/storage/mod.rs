//! The provider contract every storage backend implements, plus the backends.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::errors::{AuthenticationError, StorageError};
use crate::models::{Album, Credentials, Photo, ProviderKind};

pub mod cloud;
pub mod webdav;

pub use cloud::CloudProvider;
pub use webdav::WebDAVProvider;

/// A backend that can list albums and photos and hand out image bytes.
///
/// A fresh instance starts unauthenticated. `authenticate` installs whatever
/// session material the backend needs; re-authenticating means building a new
/// instance.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Human readable backend name, e.g. "WebDAV"
    fn provider_name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    fn is_authenticated(&self) -> bool;

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), AuthenticationError>;

    async fn fetch_albums(&self) -> Result<Vec<Album>, StorageError>;

    async fn fetch_photos(&self, path: &str) -> Result<Vec<Photo>, StorageError>;

    /// Every photo the backend knows about, in no particular order.
    ///
    /// The default lists albums and concatenates each album's photos. A single
    /// failing album aborts the whole operation.
    async fn fetch_all_photos(&self) -> Result<Vec<Photo>, StorageError> {
        if !self.is_authenticated() {
            return Err(StorageError::NotAuthenticated);
        }

        let albums = self.fetch_albums().await?;
        let mut all_photos = Vec::new();

        for album in &albums {
            let photos = self.fetch_photos(&album.path).await?;
            debug!("Album '{}' contributed {} photos", album.name, photos.len());
            all_photos.extend(photos);
        }

        Ok(all_photos)
    }

    async fn download_photo(&self, photo: &Photo) -> Result<Bytes, StorageError>;

    /// Thumbnail bytes; backends without thumbnails serve the full image.
    async fn download_thumbnail(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.download_photo(photo).await
    }
}

/// Returns the value for `key`, treating blank values as missing.
pub(crate) fn required_credential<'a>(
    credentials: &'a Credentials,
    key: &str,
) -> Result<&'a str, AuthenticationError> {
    credentials
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or(AuthenticationError::InvalidCredentials)
}

/// Fails with `InvalidCredentials` unless every key the backend needs is present.
pub(crate) fn check_required_credentials(
    kind: ProviderKind,
    credentials: &Credentials,
) -> Result<(), AuthenticationError> {
    for key in kind.required_credentials() {
        required_credential(credentials, key)?;
    }
    Ok(())
}
