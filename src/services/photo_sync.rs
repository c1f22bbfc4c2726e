use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, ImageCache};
use crate::config::Config;
use crate::errors::{AuthenticationError, StorageError, SyncError};
use crate::models::{Album, Credentials, ImageVariant, Photo, ProviderKind};
use crate::storage::{CloudProvider, StorageProvider, WebDAVProvider};

/// Everything a presentation layer observes about the library.
///
/// Lists are replaced wholesale, never patched, so a snapshot is always a
/// complete result of one load.
#[derive(Debug, Clone, Default)]
pub struct LibraryState {
    pub photos: Arc<Vec<Photo>>,
    pub albums: Arc<Vec<Album>>,
    pub is_loading: bool,
    pub error: Option<SyncError>,
    pub provider_name: Option<String>,
}

/// Mediates between the active storage provider and its consumers.
///
/// Holds at most one authenticated provider, the last loaded photo and album
/// lists, and a bounded cache of image bytes. Every method takes `&self`; share
/// the service behind an `Arc` to call it from several tasks. Concurrent loads
/// of the same list race and the last one to finish wins.
pub struct PhotoSyncService {
    config: Config,
    provider: RwLock<Option<Arc<dyn StorageProvider>>>,
    /// Bumped on every provider swap or disconnect so in-flight work from an
    /// older session does not publish into the new one.
    generation: AtomicU64,
    state: watch::Sender<LibraryState>,
    cache: ImageCache,
}

impl Default for PhotoSyncService {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl PhotoSyncService {
    pub fn new(config: &Config) -> Self {
        let (state, _) = watch::channel(LibraryState::default());
        Self {
            config: config.clone(),
            provider: RwLock::new(None),
            generation: AtomicU64::new(0),
            state,
            cache: ImageCache::new(config.cache_capacity),
        }
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        Self::new(&Config {
            cache_capacity: capacity,
            ..Config::default()
        })
    }

    // Provider management

    /// Builds the named backend, authenticates it and makes it the active provider.
    ///
    /// On failure the current provider stays in place and the error is returned.
    pub async fn configure_provider(
        &self,
        kind: ProviderKind,
        credentials: &Credentials,
    ) -> Result<(), AuthenticationError> {
        let provider: Box<dyn StorageProvider> = match kind {
            ProviderKind::WebDAV => Box::new(WebDAVProvider::from_config(&self.config)),
            ProviderKind::Cloud => Box::new(CloudProvider::from_config(&self.config)),
            ProviderKind::Custom => {
                warn!("Custom providers must be installed with connect()");
                return Err(AuthenticationError::UnknownError);
            }
        };

        self.connect(provider, credentials).await
    }

    /// Authenticates an already constructed provider and swaps it in.
    pub async fn connect(
        &self,
        mut provider: Box<dyn StorageProvider>,
        credentials: &Credentials,
    ) -> Result<(), AuthenticationError> {
        info!("🔌 Connecting to {} provider", provider.provider_name());

        if let Err(e) = provider.authenticate(credentials).await {
            warn!("Authentication with {} failed: {}", provider.provider_name(), e);
            return Err(e);
        }

        let name = provider.provider_name().to_string();
        let provider: Arc<dyn StorageProvider> = Arc::from(provider);

        {
            let mut slot = self.provider.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *slot = Some(provider);
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        // Photo ids are only unique per backend
        self.cache.clear();
        self.state.send_modify(|state| state.provider_name = Some(name.clone()));

        info!("✅ Active provider is now {}", name);
        Ok(())
    }

    /// Drops the active provider, both lists and every cached image. Idempotent.
    pub fn disconnect(&self) {
        {
            let mut slot = self.provider.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.take().is_some() {
                info!("🔌 Disconnected from storage provider");
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
        }

        self.cache.clear();
        self.state.send_modify(|state| {
            state.photos = Arc::new(Vec::new());
            state.albums = Arc::new(Vec::new());
            state.provider_name = None;
        });
    }

    fn active_provider(&self) -> Option<(Arc<dyn StorageProvider>, u64)> {
        let slot = self.provider.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.as_ref()
            .map(|provider| (Arc::clone(provider), self.generation.load(Ordering::SeqCst)))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // Data loading

    /// Common prologue of every load: fail with `NotAuthenticated` when no
    /// provider is active, otherwise mark the load as started.
    fn begin_load(&self, what: &str) -> Option<(Arc<dyn StorageProvider>, u64)> {
        match self.active_provider() {
            Some(active) => {
                debug!("Loading {} from {}", what, active.0.provider_name());
                self.state.send_modify(|state| {
                    state.is_loading = true;
                    state.error = None;
                });
                Some(active)
            }
            None => {
                warn!("Cannot load {}: no storage provider configured", what);
                self.state.send_modify(|state| {
                    state.error = Some(StorageError::NotAuthenticated.into());
                });
                None
            }
        }
    }

    /// Publishes the outcome of a load. A failure keeps the previous list.
    fn finish_load<T>(
        &self,
        generation: u64,
        result: Result<T, StorageError>,
        apply: impl FnOnce(&mut LibraryState, T),
    ) {
        let current = self.is_current(generation);
        self.state.send_modify(|state| {
            match result {
                Ok(value) if current => apply(state, value),
                Ok(_) => debug!("Discarding result from a replaced provider"),
                Err(e) if current => {
                    warn!("Load failed: {}", e);
                    state.error = Some(e.into());
                }
                Err(e) => debug!("Discarding error from a replaced provider: {}", e),
            }
            state.is_loading = false;
        });
    }

    pub async fn load_albums(&self) {
        let Some((provider, generation)) = self.begin_load("albums") else {
            return;
        };

        let result = provider.fetch_albums().await.map(sanitize_albums);
        self.finish_load(generation, result, |state, albums| {
            info!("📚 Loaded {} albums", albums.len());
            state.albums = Arc::new(albums);
        });
    }

    pub async fn load_all_photos(&self) {
        let Some((provider, generation)) = self.begin_load("all photos") else {
            return;
        };

        let result = provider.fetch_all_photos().await.map(prepare_photos);
        self.finish_load(generation, result, |state, photos| {
            info!("🖼️ Loaded {} photos", photos.len());
            state.photos = Arc::new(photos);
        });
    }

    pub async fn load_photos(&self, album: &Album) {
        let Some((provider, generation)) = self.begin_load(&format!("photos of '{}'", album.name)) else {
            return;
        };

        let result = provider.fetch_photos(&album.path).await.map(prepare_photos);
        self.finish_load(generation, result, |state, photos| {
            info!("🖼️ Loaded {} photos from album '{}'", photos.len(), album.name);
            state.photos = Arc::new(photos);
        });
    }

    // Image loading

    /// Image bytes for `photo`, served from the cache when possible.
    pub async fn load_image(&self, photo: &Photo, variant: ImageVariant) -> Result<Bytes, StorageError> {
        let key = CacheKey::new(photo.id.clone(), variant);

        if let Some(data) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return Ok(data);
        }

        let (provider, generation) = self.active_provider().ok_or(StorageError::NotAuthenticated)?;
        debug!("Cache miss for {}, downloading", key);

        let data = match variant {
            ImageVariant::Thumbnail => provider.download_thumbnail(photo).await?,
            ImageVariant::Full => provider.download_photo(photo).await?,
        };

        if self.is_current(generation) {
            self.cache.insert(key, data.clone());
        }

        Ok(data)
    }

    /// Purges cached image bytes, leaving lists and the provider alone.
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("🧹 Image cache cleared");
    }

    // Observation

    pub fn photos(&self) -> Arc<Vec<Photo>> {
        Arc::clone(&self.state.borrow().photos)
    }

    pub fn albums(&self) -> Arc<Vec<Album>> {
        Arc::clone(&self.state.borrow().albums)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<SyncError> {
        self.state.borrow().error.clone()
    }

    pub fn provider_name(&self) -> Option<String> {
        self.state.borrow().provider_name.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.active_provider().is_some()
    }

    pub fn snapshot(&self) -> LibraryState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
        self.state.subscribe()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn sanitize_albums(albums: Vec<Album>) -> Vec<Album> {
    let total = albums.len();
    let valid: Vec<Album> = albums.into_iter().filter(Album::is_valid).collect();
    if valid.len() != total {
        warn!("Dropped {} albums without id or path", total - valid.len());
    }
    valid
}

/// Drops records without identity and orders newest first, ties by id.
fn prepare_photos(photos: Vec<Photo>) -> Vec<Photo> {
    let total = photos.len();
    let mut valid: Vec<Photo> = photos.into_iter().filter(Photo::is_valid).collect();
    if valid.len() != total {
        warn!("Dropped {} photos without id or path", total - valid.len());
    }
    sort_photos(&mut valid);
    valid
}

pub fn sort_photos(photos: &mut [Photo]) {
    photos.sort_by(|a, b| {
        b.modified_date
            .cmp(&a.modified_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn photo(id: &str, day: u32) -> Photo {
        let when = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Photo::new(id, id, format!("/{}", id), 1, when, when)
    }

    #[test]
    fn test_sort_newest_first_ties_by_id() {
        let mut photos = vec![photo("b", 1), photo("c", 3), photo("a", 1), photo("d", 2)];
        sort_photos(&mut photos);
        let ids: Vec<_> = photos.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d", "a", "b"]);
    }

    #[test]
    fn test_prepare_drops_records_without_identity() {
        let mut broken = photo("x", 5);
        broken.path.clear();
        let prepared = prepare_photos(vec![photo("a", 1), broken]);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].id, "a");
    }

    #[test]
    fn test_new_service_is_empty() {
        let service = PhotoSyncService::default();
        assert!(service.photos().is_empty());
        assert!(service.albums().is_empty());
        assert!(!service.is_loading());
        assert!(service.error().is_none());
        assert!(!service.is_connected());
        assert_eq!(service.cache_len(), 0);
    }

    #[test]
    fn test_disconnect_without_provider_is_harmless() {
        let service = PhotoSyncService::default();
        service.disconnect();
        service.disconnect();
        assert!(service.photos().is_empty());
        assert!(service.albums().is_empty());
        assert!(!service.is_connected());
    }
}
