use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::StorageError;
use crate::models::{Album, Photo, DEFAULT_MIME_TYPE};
use crate::webdav_xml_parser::{parse_propfind_response, WebDAVItem};
use super::connection::WebDAVConnection;

/// Walks the directory tree of a WebDAV server.
///
/// The server tree is assumed to be acyclic. The recursive walk has no depth
/// limit unless `WebDAVConfig::max_depth` is set, so a very deep tree costs one
/// request and one stack frame per level.
pub struct WebDAVDiscovery {
    connection: WebDAVConnection,
}

impl WebDAVDiscovery {
    pub fn new(connection: WebDAVConnection) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &WebDAVConnection {
        &self.connection
    }

    /// Lists the direct children of `path`
    pub async fn list_directory(&self, path: &str) -> Result<Vec<WebDAVItem>, StorageError> {
        let url = self.connection.url_for_path(path)?;
        self.list_url(&url).await
    }

    /// Lists the direct children of `url`, without the entry describing `url` itself
    async fn list_url(&self, url: &Url) -> Result<Vec<WebDAVItem>, StorageError> {
        let body = self.connection.propfind(url).await?;

        let items = parse_propfind_response(&body, url, self.connection.config().guess_mime)
            .map_err(|e| {
                warn!("Unparseable PROPFIND response from {}: {}", url, e);
                StorageError::InvalidResponse
            })?;

        let listed = normalized_path(url);
        let children: Vec<WebDAVItem> = items
            .into_iter()
            .filter(|item| normalized_path(&item.url) != listed)
            .collect();

        debug!("Directory '{}': {} entries", url.path(), children.len());
        Ok(children)
    }

    /// Every directory directly under the root becomes an album
    pub async fn discover_albums(&self) -> Result<Vec<Album>, StorageError> {
        let items = self.list_directory("/").await?;

        let mut albums = Vec::new();
        for item in items.into_iter().filter(|item| item.is_directory) {
            let mut album = Album::new(item.path.clone(), item.name.clone(), item.path.clone(), 0);

            if self.connection.config().count_album_photos {
                match self.list_url(&item.url).await {
                    Ok(children) => {
                        let images: Vec<&WebDAVItem> = children
                            .iter()
                            .filter(|child| !child.is_directory && child.is_image())
                            .collect();
                        album.photo_count = images.len();
                        album.cover_photo_url = images.first().map(|image| image.url.clone());
                    }
                    Err(e) => {
                        warn!("Could not count photos in album '{}': {}", item.name, e);
                    }
                }
            }

            albums.push(album);
        }

        info!("📁 Found {} albums", albums.len());
        Ok(albums)
    }

    /// Images directly inside `path`, not descending into subdirectories
    pub async fn discover_photos(&self, path: &str) -> Result<Vec<Photo>, StorageError> {
        let items = self.list_directory(path).await?;

        let photos: Vec<Photo> = items
            .iter()
            .filter(|item| !item.is_directory && item.is_image())
            .map(item_to_photo)
            .collect();

        debug!("Found {} photos in '{}'", photos.len(), path);
        Ok(photos)
    }

    /// Depth-first walk from the root collecting every image
    pub async fn discover_all_photos(&self) -> Result<Vec<Photo>, StorageError> {
        info!("🔍 Discovering all photos recursively");
        let root = self.connection.url_for_path("/")?;
        let photos = self.collect_photos(root, 0).await?;
        info!("🎯 Recursive discovery found {} photos", photos.len());
        Ok(photos)
    }

    fn collect_photos(&self, url: Url, depth: usize) -> BoxFuture<'_, Result<Vec<Photo>, StorageError>> {
        async move {
            let items = self.list_url(&url).await?;
            let mut photos = Vec::new();

            for item in items {
                if item.is_directory {
                    if let Some(max_depth) = self.connection.config().max_depth {
                        if depth >= max_depth {
                            warn!("Skipping '{}': deeper than max depth {}", item.path, max_depth);
                            continue;
                        }
                    }
                    let nested = self.collect_photos(item.url.clone(), depth + 1).await?;
                    photos.extend(nested);
                } else if item.is_image() {
                    photos.push(item_to_photo(&item));
                }
            }

            Ok(photos)
        }
        .boxed()
    }

    pub async fn download(&self, url: &Url) -> Result<bytes::Bytes, StorageError> {
        self.connection.get_bytes(url).await
    }
}

pub(crate) fn item_to_photo(item: &WebDAVItem) -> Photo {
    Photo::new(
        item.path.clone(),
        item.name.clone(),
        item.path.clone(),
        item.size,
        item.created_date,
        item.modified_date,
    )
    .with_urls(Some(item.url.clone()), Some(item.url.clone()))
    .with_mime_type(item.content_type.clone().unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()))
}

/// Decoded path without the trailing slash, for comparing a listed directory
/// with the entries returned for it.
fn normalized_path(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
