//! JSON schema spoken with the cloud drive backend.
//!
//! The vendor protocol is undocumented; these shapes are the stable contract
//! this crate defines for the backend adapter and its test servers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{Album, Photo, DEFAULT_MIME_TYPE};

pub const LOGIN_PATH: &str = "/app/1.0/web/1.0/login";
pub const FILES_PATH: &str = "/files";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub account: String,
    pub passwd: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: Option<String>,
}

impl LoginResponse {
    pub fn into_token(self) -> Option<String> {
        self.data
            .and_then(|data| data.token)
            .filter(|token| !token.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListingResponse {
    pub data: CloudListing,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CloudListing {
    #[serde(default)]
    pub folders: Vec<CloudFolder>,
    #[serde(default)]
    pub files: Vec<CloudFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFolder {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub photo_count: Option<usize>,
    #[serde(default)]
    pub cover_url: Option<Url>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFile {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail_url: Option<Url>,
    #[serde(default)]
    pub url: Option<Url>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl CloudFile {
    pub fn mime_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type().to_ascii_lowercase().starts_with("image/")
    }
}

impl From<CloudFolder> for Album {
    fn from(folder: CloudFolder) -> Self {
        Album::new(folder.id, folder.name, folder.path, folder.photo_count.unwrap_or(0))
            .with_cover(folder.cover_url)
    }
}

impl From<CloudFile> for Photo {
    fn from(file: CloudFile) -> Self {
        let mime_type = file.mime_type().to_string();
        let modified = file.modified.or(file.created).unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let created = file.created.unwrap_or(modified);

        Photo::new(file.id, file.name, file.path, file.size.unwrap_or(0), created, modified)
            .with_urls(file.thumbnail_url, file.url)
            .with_mime_type(mime_type)
    }
}
