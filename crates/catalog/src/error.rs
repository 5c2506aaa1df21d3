//! Error types for the catalog crate.
//!
//! Everything that can go wrong while loading a snapshot or applying a
//! mutation to the catalog ends up in [`CatalogError`].

use thiserror::Error;

/// Errors that can occur while loading, validating or mutating the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// I/O error occurred while reading or writing a snapshot
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Snapshot JSON could not be decoded or encoded
    #[error("Malformed snapshot: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A field had a value outside its domain (vote code, star count, date...)
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., vote for a deleted film)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },

    /// Profile names are unique by convention
    #[error("Profile name already exists: {0}")]
    DuplicateProfile(String),

    /// A film with the same IMDb id is already on a list
    #[error("Film already added: {0}")]
    DuplicateFilm(String),

    /// Data validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl CatalogError {
    pub(crate) fn missing_film(id: u32) -> Self {
        CatalogError::MissingReference {
            entity: "Film".to_string(),
            id,
        }
    }

    pub(crate) fn missing_profile(id: u32) -> Self {
        CatalogError::MissingReference {
            entity: "Profile".to_string(),
            id,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
