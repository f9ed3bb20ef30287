use thiserror::Error;

/// Failure of a single fingerprint computation.
///
/// The whole computation fails; no partial fingerprint is ever produced.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("not kogin pattern data (application = {0:?})")]
    NotPatternData(String),

    #[error("invalid stitch reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("stitch placement {0:?} needs an x and a y coordinate")]
    InvalidCoordinate(Vec<i64>),

    #[error("malformed pattern data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("listing line {line} is not `name<TAB>digest`: {content:?}")]
    InvalidLine { line: usize, content: String },
}
