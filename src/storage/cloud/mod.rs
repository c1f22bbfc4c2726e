// Token-based cloud drive backend

pub mod api;
pub mod provider;

pub use api::{CloudFile, CloudFolder, CloudListing, LoginRequest};
pub use provider::{CloudConfig, CloudProvider};
