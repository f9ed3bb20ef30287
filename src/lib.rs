mod conflict;
mod document;
mod error;
mod fingerprint;
mod listing;
mod resolve;
mod stitch;

pub use conflict::{detect, orient, Pair, Relation};
pub use document::{
    BoundingBox, PatternDocument, PatternNode, StitchRef, MAX_STITCH_LENGTH, PATTERN_APPLICATION,
};
pub use error::{FingerprintError, ListingError};
pub use fingerprint::{
    align, canonical_text, compute_fingerprint, fingerprint_document, hash_canonical,
    DigestAlgorithm, Fingerprint, FingerprintConfig,
};
pub use listing::{
    check, check_with, fingerprint_batch, missing_pivots, BatchOutcome, CheckOutcome,
    DigestTable,
};
pub use resolve::{
    absorb_redundant, group_overlaps, merge_overlaps, resolve, OverlapGroup, ResolutionStats,
};
pub use stitch::{GridPoint, Stitch, StitchSet};

/// Parses embedded pattern-data JSON and fingerprints it.
///
/// Relation tracing follows `KOGIN_FINGERPRINT_TRACE` on top of `config`.
pub fn fingerprint_json(
    raw: &str,
    config: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    let config = config.clone().with_env_overrides();
    let document = PatternDocument::from_json(raw)?;

    log::info!(
        "Fingerprinting pattern: {} layers, bbox {:?}, digest {:?}",
        document.data.len(),
        document.bbox,
        config.digest
    );

    let fingerprint = fingerprint_document(&document, &config)?;

    log::info!(
        "Pattern fingerprinted: {} ({} stitches, {} overlap groups)",
        fingerprint.digest,
        fingerprint.stitch_count,
        fingerprint.stats.overlap_groups
    );

    Ok(fingerprint)
}
