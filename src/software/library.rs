use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{CatalogError, SoftwareItem};

/// Installed packages: one file per package in a single directory
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    dir: PathBuf,
}

impl LocalLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the software directory if it is missing
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Installed packages sorted by name. A missing or unreadable directory
    /// reads as empty.
    pub fn list(&self) -> Vec<SoftwareItem> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut items: Vec<SoftwareItem> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| SoftwareItem::new(name).ok())
            .collect();
        items.sort();
        items
    }

    pub fn contains(&self, item: &SoftwareItem) -> bool {
        self.path_of(item).is_file()
    }

    pub fn path_of(&self, item: &SoftwareItem) -> PathBuf {
        self.dir.join(item.name())
    }

    /// Store `content` as `item`, replacing any previous version.
    ///
    /// The body goes to a hidden temporary file first and is renamed into
    /// place, so a failed write never leaves a truncated package behind.
    pub fn install(&self, item: &SoftwareItem, content: &[u8]) -> Result<(), CatalogError> {
        self.ensure_dir()?;
        let target = self.path_of(item);
        let staging = self.dir.join(format!(".{}.part", item.name()));

        let written = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&staging, &target)) {
            warn!("Failed to install {}: {}", item, e);
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }

        info!("Installed {} ({} bytes)", item, content.len());
        Ok(())
    }

    pub fn read(&self, item: &SoftwareItem) -> std::io::Result<Vec<u8>> {
        fs::read(self.path_of(item))
    }
}
