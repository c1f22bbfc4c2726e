//! Test doubles and fixtures shared by unit and integration tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::{AuthenticationError, StorageError};
use crate::models::{Album, Credentials, Photo, ProviderKind};
use crate::storage::StorageProvider;

/// Shared knobs and counters of a [`MockProvider`], usable after the provider
/// has been moved into a service.
#[derive(Debug, Default)]
pub struct MockHandle {
    failure: Mutex<Option<StorageError>>,
    pub authenticate_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub photo_downloads: AtomicUsize,
    pub thumbnail_downloads: AtomicUsize,
}

impl MockHandle {
    /// Makes every subsequent listing and download fail with `error`
    pub fn fail_with(&self, error: StorageError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap() = None;
    }

    fn check(&self) -> Result<(), StorageError> {
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn downloads(&self) -> usize {
        self.photo_downloads.load(Ordering::SeqCst) + self.thumbnail_downloads.load(Ordering::SeqCst)
    }
}

/// In-memory `StorageProvider` used in place of a real backend.
///
/// It does not override `fetch_all_photos`, so it exercises the contract's
/// album-by-album default.
pub struct MockProvider {
    name: String,
    authenticated: bool,
    auth_result: Result<(), AuthenticationError>,
    albums: Vec<Album>,
    photos: HashMap<String, Vec<Photo>>,
    images: HashMap<String, Bytes>,
    latency: Option<Duration>,
    handle: Arc<MockHandle>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Mock")
    }
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            authenticated: false,
            auth_result: Ok(()),
            albums: Vec::new(),
            photos: HashMap::new(),
            images: HashMap::new(),
            latency: None,
            handle: Arc::new(MockHandle::default()),
        }
    }

    pub fn handle(&self) -> Arc<MockHandle> {
        Arc::clone(&self.handle)
    }

    pub fn with_auth_result(mut self, result: Result<(), AuthenticationError>) -> Self {
        self.auth_result = result;
        self
    }

    /// Adds an album holding `photos`
    pub fn with_album(mut self, album: Album, photos: Vec<Photo>) -> Self {
        self.photos.insert(album.path.clone(), photos);
        self.albums.push(album);
        self
    }

    pub fn with_image(mut self, photo_id: &str, data: &'static [u8]) -> Self {
        self.images.insert(photo_id.to_string(), Bytes::from_static(data));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn simulate_io(&self) -> Result<(), StorageError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.authenticated {
            return Err(StorageError::NotAuthenticated);
        }
        self.handle.check()
    }

    fn image_for(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.images.get(&photo.id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl StorageProvider for MockProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Custom
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn authenticate(&mut self, _credentials: &Credentials) -> Result<(), AuthenticationError> {
        self.handle.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.auth_result.clone()?;
        self.authenticated = true;
        Ok(())
    }

    async fn fetch_albums(&self) -> Result<Vec<Album>, StorageError> {
        self.handle.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;
        Ok(self.albums.clone())
    }

    async fn fetch_photos(&self, path: &str) -> Result<Vec<Photo>, StorageError> {
        self.handle.list_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;
        self.photos.get(path).cloned().ok_or(StorageError::NotFound)
    }

    async fn download_photo(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.handle.photo_downloads.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;
        self.image_for(photo)
    }

    async fn download_thumbnail(&self, photo: &Photo) -> Result<Bytes, StorageError> {
        self.handle.thumbnail_downloads.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;
        self.image_for(photo)
    }
}

/// Midnight UTC on the given day of January 2024
pub fn day(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

/// A photo modified on `modified_day` of January 2024
pub fn sample_photo(id: &str, modified_day: u32) -> Photo {
    Photo::new(id, id, format!("/{}", id), 1024, day(1), day(modified_day))
}

/// Kind of entry in a generated PROPFIND document
#[derive(Debug, Clone, Copy)]
pub enum DavEntry<'a> {
    Directory,
    File {
        content_type: &'a str,
        size: u64,
        last_modified: &'a str,
    },
}

/// One `<d:response>` block
pub fn propfind_entry(href: &str, entry: DavEntry<'_>) -> String {
    match entry {
        DavEntry::Directory => format!(
            r#"<d:response>
        <d:href>{href}</d:href>
        <d:propstat>
            <d:prop>
                <d:resourcetype><d:collection/></d:resourcetype>
            </d:prop>
            <d:status>HTTP/1.1 200 OK</d:status>
        </d:propstat>
    </d:response>"#
        ),
        DavEntry::File {
            content_type,
            size,
            last_modified,
        } => format!(
            r#"<d:response>
        <d:href>{href}</d:href>
        <d:propstat>
            <d:prop>
                <d:getcontentlength>{size}</d:getcontentlength>
                <d:getcontenttype>{content_type}</d:getcontenttype>
                <d:getlastmodified>{last_modified}</d:getlastmodified>
                <d:resourcetype/>
            </d:prop>
            <d:status>HTTP/1.1 200 OK</d:status>
        </d:propstat>
    </d:response>"#
        ),
    }
}

/// Wraps response blocks in a multi-status document
pub fn multistatus(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
    {}
</d:multistatus>"#,
        entries.join("\n    ")
    )
}

pub fn credentials_for(server_url: &str) -> Credentials {
    crate::models::credentials([
        ("serverURL", server_url),
        ("username", "testuser"),
        ("password", "testpass"),
    ])
}
