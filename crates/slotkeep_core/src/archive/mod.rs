mod engine;
mod error;
mod index;
mod types;

pub use engine::{Archive, IMPORT_ANNOTATION};
pub use error::{CoreError, CoreErrorCode};
pub use index::ArchiveIndex;
pub use types::{ArchiveRow, PayloadEntry};
