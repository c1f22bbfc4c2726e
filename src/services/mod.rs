pub mod photo_sync;

pub use photo_sync::{LibraryState, PhotoSyncService};
