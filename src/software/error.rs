use thiserror::Error;

use crate::hardware::clip;

/// Characters of an error message that fit on the second display line
pub const SUMMARY_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Server answered with something other than 200
    #[error("Code {0}")]
    Status(u16),

    /// Request never got an answer (DNS, refused, timeout, I/O)
    #[error("{0}")]
    Transport(String),

    #[error("Bad list: {0}")]
    Listing(#[from] serde_json::Error),

    #[error("Too large (over {limit} bytes)")]
    TooLarge { limit: usize },

    #[error("Bad name {0:?}")]
    InvalidName(String),

    #[error("Storage: {0}")]
    Storage(#[from] std::io::Error),
}

impl CatalogError {
    /// Short form for the status screen
    pub fn summary(&self) -> String {
        clip(&self.to_string(), SUMMARY_CHARS).to_string()
    }

    /// The server was reached and refused the request
    pub fn is_status(&self) -> bool {
        matches!(self, CatalogError::Status(_))
    }
}
