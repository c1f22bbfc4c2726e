use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// A single photo as reported by a storage provider.
///
/// `id` is assigned by the backend and is unique within that backend's
/// namespace. For WebDAV it is the raw href of the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
    pub thumbnail_url: Option<Url>,
    pub full_image_url: Option<Url>,
    pub mime_type: String,
}

impl Photo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        created_date: DateTime<Utc>,
        modified_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            size,
            created_date,
            modified_date,
            thumbnail_url: None,
            full_image_url: None,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }

    pub fn with_urls(mut self, thumbnail_url: Option<Url>, full_image_url: Option<Url>) -> Self {
        self.thumbnail_url = thumbnail_url;
        self.full_image_url = full_image_url;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Providers must never hand out records without an identity or location.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.path.is_empty()
    }
}

/// A folder-like grouping of photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub path: String,
    /// Best effort, 0 when the provider did not count.
    pub photo_count: usize,
    pub cover_photo_url: Option<Url>,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        photo_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            photo_count,
            cover_photo_url: None,
        }
    }

    pub fn with_cover(mut self, cover_photo_url: Option<Url>) -> Self {
        self.cover_photo_url = cover_photo_url;
        self
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.path.is_empty()
    }
}

/// Which resolution of a photo's bytes is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageVariant {
    #[serde(rename = "thumbnail")]
    Thumbnail,
    #[serde(rename = "full")]
    Full,
}

impl ImageVariant {
    pub fn from_thumbnail(thumbnail: bool) -> Self {
        if thumbnail {
            ImageVariant::Thumbnail
        } else {
            ImageVariant::Full
        }
    }
}

impl std::fmt::Display for ImageVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageVariant::Thumbnail => write!(f, "thumb"),
            ImageVariant::Full => write!(f, "full"),
        }
    }
}
