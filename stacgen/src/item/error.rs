//! Errors raised while building an item.

use thiserror::Error;

use crate::error::{Classify, ErrorClass};
use crate::http::HttpError;
use crate::parser::ParserError;
use crate::raster::CogError;

/// A STAC item document that cannot be represented as a [`super::CatalogItem`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("invalid item document: {0}")]
    InvalidDocument(String),
}

impl Classify for ItemError {
    fn class(&self) -> ErrorClass {
        ErrorClass::FatalToJob
    }
}

/// Errors that abort assembly of one item.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The job message is inconsistent
    #[error("invalid job: {0}")]
    InvalidJob(String),

    /// Raster references were given but none could be read
    #[error("no raster could be processed out of {references} raster reference(s)")]
    NoRastersFound { references: usize },

    /// Parser lookup or parsing failed
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// The raster backend cannot run the COG check
    #[error(transparent)]
    Tooling(#[from] CogError),

    /// `metadata_url` could not be fetched
    #[error("failed to fetch metadata from {url}: {source}")]
    MetadataFetch {
        url: String,
        #[source]
        source: HttpError,
    },

    /// `metadata_url` did not hold a JSON object
    #[error("metadata at {url} is not a JSON object: {reason}")]
    InvalidMetadata { url: String, reason: String },

    /// The merged document is not a valid item
    #[error(transparent)]
    Item(#[from] ItemError),
}

impl Classify for AssemblyError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Tooling(e) => e.class(),
            Self::MetadataFetch { source, .. } => source.class(),
            Self::Parser(e) => e.class(),
            Self::Item(e) => e.class(),
            Self::InvalidJob(_) | Self::NoRastersFound { .. } | Self::InvalidMetadata { .. } => {
                ErrorClass::FatalToJob
            }
        }
    }
}
