use serde::{Deserialize, Serialize};
use std::fmt;

use super::CatalogError;

/// Longest accepted package name, in bytes
pub const MAX_NAME_LEN: usize = 64;

/// A package name that is safe to use as a file name in the software directory
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SoftwareItem(String);

impl SoftwareItem {
    pub fn new(name: impl Into<String>) -> Result<Self, CatalogError> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(CatalogError::InvalidName(name))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Non-empty, bounded, a single path component, and not hidden
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

impl fmt::Display for SoftwareItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SoftwareItem {
    type Error = CatalogError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::new(name)
    }
}

impl From<SoftwareItem> for String {
    fn from(item: SoftwareItem) -> Self {
        item.0
    }
}
