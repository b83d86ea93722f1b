//! Remote catalog and local package storage

mod catalog;
mod error;
mod item;
mod library;

pub use catalog::{CatalogTransport, HttpTransport, MemoryTransport, Reply, SoftwareCatalog};
pub use error::{CatalogError, SUMMARY_CHARS};
pub use item::{is_valid_name, SoftwareItem, MAX_NAME_LEN};
pub use library::LocalLibrary;
