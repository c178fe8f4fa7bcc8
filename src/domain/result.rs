//! Result type alias for Tidemark operations

use super::errors::TidemarkError;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, TidemarkError>;
