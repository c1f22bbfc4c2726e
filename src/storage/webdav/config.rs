use anyhow::{anyhow, Result};
use url::Url;

use crate::config::Config;
use crate::errors::AuthenticationError;
use crate::models::{Credentials, CREDENTIAL_PASSWORD, CREDENTIAL_SERVER_URL, CREDENTIAL_USERNAME};
use crate::storage::required_credential;

/// WebDAV server configuration
#[derive(Debug, Clone)]
pub struct WebDAVConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    /// List every album once more to fill in photo counts and covers
    pub count_album_photos: bool,
    /// Deepest directory level the recursive walk descends into, unlimited when None
    pub max_depth: Option<usize>,
    /// Guess a content type from the file extension when the server sends none
    pub guess_mime: bool,
}

impl Default for WebDAVConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl WebDAVConfig {
    /// Tuning taken from the process configuration, credentials left empty
    pub fn from_config(config: &Config) -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_seconds: config.request_timeout_seconds,
            count_album_photos: config.webdav_count_album_photos,
            max_depth: config.webdav_max_depth,
            guess_mime: config.webdav_guess_mime,
        }
    }

    /// Copies `serverURL`, `username` and `password` out of a credential map
    pub fn with_credentials(&self, credentials: &Credentials) -> Result<Self, AuthenticationError> {
        Ok(Self {
            server_url: required_credential(credentials, CREDENTIAL_SERVER_URL)?.trim().to_string(),
            username: required_credential(credentials, CREDENTIAL_USERNAME)?.to_string(),
            password: required_credential(credentials, CREDENTIAL_PASSWORD)?.to_string(),
            ..self.clone()
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow!("Server URL cannot be empty"));
        }

        if self.username.is_empty() {
            return Err(anyhow!("Username cannot be empty"));
        }

        if self.password.is_empty() {
            return Err(anyhow!("Password cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow!("Server URL must start with http:// or https://"));
        }

        self.root_url()?;
        Ok(())
    }

    /// The server root as a URL whose path always ends in `/`, so relative
    /// joins stay inside it.
    pub fn root_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|e| anyhow!("Invalid server URL '{}': {}", self.server_url, e))?;

        if url.cannot_be_a_base() {
            return Err(anyhow!("Server URL '{}' cannot be used as a base", self.server_url));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials;

    fn configured(server_url: &str) -> WebDAVConfig {
        WebDAVConfig::default()
            .with_credentials(&credentials([
                ("serverURL", server_url),
                ("username", "alice"),
                ("password", "secret"),
            ]))
            .unwrap()
    }

    #[test]
    fn test_missing_credentials() {
        let result = WebDAVConfig::default()
            .with_credentials(&credentials([("serverURL", "https://x/"), ("username", "alice")]));
        assert_eq!(result.unwrap_err(), AuthenticationError::InvalidCredentials);
    }

    #[test]
    fn test_root_url_gets_trailing_slash() {
        let config = configured("https://nas.example.com/remote.php/webdav");
        assert_eq!(
            config.root_url().unwrap().as_str(),
            "https://nas.example.com/remote.php/webdav/"
        );

        let config = configured("https://nas.example.com");
        assert_eq!(config.root_url().unwrap().as_str(), "https://nas.example.com/");
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        assert!(configured("ftp://nas.example.com/").validate().is_err());
        assert!(configured("not a url").validate().is_err());
        assert!(configured("http://nas.example.com/dav/").validate().is_ok());
    }

    #[test]
    fn test_tuning_comes_from_process_config() {
        let config = Config {
            request_timeout_seconds: 5,
            webdav_max_depth: Some(2),
            webdav_guess_mime: false,
            ..Config::default()
        };
        let webdav = WebDAVConfig::from_config(&config);
        assert_eq!(webdav.timeout(), std::time::Duration::from_secs(5));
        assert_eq!(webdav.max_depth, Some(2));
        assert!(!webdav.guess_mime);
    }
}
