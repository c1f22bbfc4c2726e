// WebDAV backend modules organized by functionality

pub mod config;
pub mod connection;
pub mod discovery;
pub mod provider;

// Re-export main types for convenience
pub use config::WebDAVConfig;
pub use connection::WebDAVConnection;
pub use discovery::WebDAVDiscovery;
pub use provider::WebDAVProvider;
