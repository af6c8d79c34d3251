//! Catalog side of the pipeline: persistent store, cover transcoding, and
//! the idempotent import orchestrator.

pub mod cover;
pub mod import;
pub mod store;

pub use cover::CoverError;
pub use import::{ImportError, Importer, CHAPTER_BATCH_SIZE};
pub use store::Catalog;
