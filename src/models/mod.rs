// Re-export all model types for ease of use

pub mod photo;
pub mod source;

pub use photo::*;
pub use source::*;
