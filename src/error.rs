use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The metadata token could not be split into its six fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    #[error("metadata token is empty")]
    EmptyToken,
    #[error("metadata token '{0}' contains no usable fields")]
    Unusable(String),
}

/// Why a report file yielded no measurement.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("report file '{0}' does not exist")]
    FileMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("'{0}' not found in report")]
    NotFound(&'static str),
    #[error("malformed report content: {0}")]
    MalformedContent(String),
    #[error("expected {expected} values, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("value {0} outside the accepted range")]
    OutOfRange(f64),
}

/// Reason attached to every dataless file.
#[derive(Debug, Error)]
pub enum DatalessReason {
    #[error("no metadata token in path")]
    NoToken,
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("capture date '{0}' is not a calendar date")]
    BadDate(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Failure modes of a single drift query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    #[error("no rows match the filter")]
    NoData,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("drift computation failed: {0}")]
    Internal(String),
}
