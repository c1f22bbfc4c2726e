//! Photo and album aggregation over remote storage backends.
//!
//! A [`PhotoSyncService`] owns at most one authenticated [`StorageProvider`]
//! (WebDAV or the token-based cloud drive), loads album and photo listings from
//! it, and serves image bytes through a bounded in-memory cache.

pub mod cache;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;
pub mod storage;
pub mod webdav_xml_parser;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use errors::{AppError, AuthenticationError, StorageError, SyncError};
pub use models::{Album, Credentials, ImageVariant, Photo, ProviderKind};
pub use services::{LibraryState, PhotoSyncService};
pub use storage::{CloudProvider, StorageProvider, WebDAVProvider};
