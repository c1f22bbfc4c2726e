use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credential material handed to `StorageProvider::authenticate`.
pub type Credentials = HashMap<String, String>;

pub const CREDENTIAL_SERVER_URL: &str = "serverURL";
pub const CREDENTIAL_USERNAME: &str = "username";
pub const CREDENTIAL_PASSWORD: &str = "password";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    #[serde(rename = "webdav")]
    WebDAV,
    #[serde(rename = "cloud")]
    Cloud,
    #[serde(rename = "custom")]
    Custom,
}

impl ProviderKind {
    /// Credential keys that must be present (and non-empty) for this backend.
    pub fn required_credentials(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::WebDAV => &[CREDENTIAL_SERVER_URL, CREDENTIAL_USERNAME, CREDENTIAL_PASSWORD],
            ProviderKind::Cloud => &[CREDENTIAL_USERNAME, CREDENTIAL_PASSWORD],
            ProviderKind::Custom => &[],
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::WebDAV => write!(f, "webdav"),
            ProviderKind::Cloud => write!(f, "cloud"),
            ProviderKind::Custom => write!(f, "custom"),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "webdav" => Ok(ProviderKind::WebDAV),
            "cloud" => Ok(ProviderKind::Cloud),
            "custom" => Ok(ProviderKind::Custom),
            _ => Err(format!("Invalid provider kind: {}", value)),
        }
    }
}

/// Builds a credential map from key/value pairs.
pub fn credentials<'a, I>(pairs: I) -> Credentials
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_round_trips_through_string() {
        for kind in [ProviderKind::WebDAV, ProviderKind::Cloud, ProviderKind::Custom] {
            assert_eq!(ProviderKind::try_from(kind.to_string()).unwrap(), kind);
        }
        assert!(ProviderKind::try_from("s3".to_string()).is_err());
    }

    #[test]
    fn test_required_credentials() {
        assert_eq!(ProviderKind::WebDAV.required_credentials().len(), 3);
        assert_eq!(
            ProviderKind::Cloud.required_credentials(),
            &["username", "password"]
        );
    }
}
