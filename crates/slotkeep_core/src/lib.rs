pub mod archive;
pub mod codec;
pub mod config;

pub use archive::{Archive, CoreError, CoreErrorCode};
pub use config::ArchiveConfig;
