use anyhow::{anyhow, Result};
use std::env;

pub const DEFAULT_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_CLOUD_BASE_URL: &str = "https://webapi.115.com";

#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of image blobs kept in memory
    pub cache_capacity: usize,
    pub request_timeout_seconds: u64,
    pub cloud_base_url: String,
    pub webdav_count_album_photos: bool,
    pub webdav_max_depth: Option<usize>,
    pub webdav_guess_mime: bool,
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            cloud_base_url: DEFAULT_CLOUD_BASE_URL.to_string(),
            webdav_count_album_photos: false,
            webdav_max_depth: None,
            webdav_guess_mime: true,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            cache_capacity: env::var("PHOTO_SYNC_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.cache_capacity)
                .max(1),
            request_timeout_seconds: env::var("PHOTO_SYNC_REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
            cloud_base_url: env::var("PHOTO_SYNC_CLOUD_BASE_URL")
                .unwrap_or(defaults.cloud_base_url),
            webdav_count_album_photos: env::var("PHOTO_SYNC_WEBDAV_COUNT_ALBUM_PHOTOS")
                .ok()
                .map(|s| parse_bool(&s))
                .unwrap_or(defaults.webdav_count_album_photos),
            webdav_max_depth: env::var("PHOTO_SYNC_WEBDAV_MAX_DEPTH")
                .ok()
                .and_then(|s| s.trim().parse().ok()),
            webdav_guess_mime: env::var("PHOTO_SYNC_WEBDAV_GUESS_MIME")
                .ok()
                .map(|s| parse_bool(&s))
                .unwrap_or(defaults.webdav_guess_mime),
            log_filter: env::var("PHOTO_SYNC_LOG").ok().filter(|s| !s.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }

        if !self.cloud_base_url.starts_with("http://") && !self.cloud_base_url.starts_with("https://") {
            return Err(anyhow!("Cloud base URL must start with http:// or https://"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.cache_capacity, 100);
        assert_eq!(config.request_timeout(), std::time::Duration::from_secs(30));
        assert!(config.webdav_max_depth.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_cloud_url() {
        let config = Config {
            cloud_base_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = Config {
            request_timeout_seconds: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" YES "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
