//! Canonical form and digest of a pattern's stitch content.
//!
//! Two pattern files that differ only in encoding order, redundant or
//! overlapping stitch layers, or position on the canvas hash to the same
//! fingerprint.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::document::{BoundingBox, PatternDocument, PatternNode};
use crate::error::FingerprintError;
use crate::resolve::{resolve, ResolutionStats};
use crate::stitch::{GridPoint, StitchSet};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DigestAlgorithm {
    /// Matches the digests in listing files written by earlier tooling.
    #[default]
    Sha1,
    Sha256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FingerprintConfig {
    pub digest: DigestAlgorithm,
    /// Log every detected relation at trace level.
    pub trace_relations: bool,
}

impl FingerprintConfig {
    /// Listing-compatible SHA-1 fingerprints.
    pub fn legacy() -> Self {
        Self::default()
    }

    pub fn sha256() -> Self {
        Self {
            digest: DigestAlgorithm::Sha256,
            ..Self::default()
        }
    }

    /// Turns relation tracing on when `KOGIN_FINGERPRINT_TRACE` is set.
    pub fn with_env_overrides(mut self) -> Self {
        if trace_enabled_from_env() {
            self.trace_relations = true;
        }
        self
    }
}

fn trace_enabled_from_env() -> bool {
    matches!(
        std::env::var("KOGIN_FINGERPRINT_TRACE").as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes") | Ok("YES")
    )
}

/// Result of a successful fingerprint computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    pub digest: String,
    pub canonical: String,
    pub stitch_count: usize,
    pub stats: ResolutionStats,
}

/// Fingerprints a parsed pattern tree placed within `bbox`.
pub fn compute_fingerprint(
    layers: &[PatternNode],
    bbox: BoundingBox,
    config: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    let extracted = StitchSet::extract(layers)?;
    let extracted_count = extracted.len();

    let (resolved, stats) = resolve(extracted, config.trace_relations);
    let aligned = align(resolved, bbox)?;
    let canonical = canonical_text(&aligned);
    let digest = hash_canonical(&canonical, config.digest);

    log::debug!(
        "Fingerprint {}: {} stitches extracted, {} after resolution ({} merged groups, {} indeterminate)",
        digest,
        extracted_count,
        aligned.len(),
        stats.overlap_groups,
        stats.indeterminate
    );

    Ok(Fingerprint {
        digest,
        canonical,
        stitch_count: aligned.len(),
        stats,
    })
}

/// Checks the document identity, then fingerprints its pattern data.
pub fn fingerprint_document(
    document: &PatternDocument,
    config: &FingerprintConfig,
) -> Result<Fingerprint, FingerprintError> {
    document.ensure_pattern_data()?;
    compute_fingerprint(&document.data, document.bbox, config)
}

/// Re-origins every stitch at the bounding box corner and sorts each
/// bucket by `(start, row)`.
pub fn align(mut set: StitchSet, bbox: BoundingBox) -> Result<StitchSet, FingerprintError> {
    for bucket in set.buckets_mut() {
        for point in bucket.iter_mut() {
            let (Some(x), Some(y)) = (
                point.x.checked_sub(bbox.left),
                point.y.checked_sub(bbox.top),
            ) else {
                return Err(FingerprintError::InvalidCoordinate(vec![point.x, point.y]));
            };
            *point = GridPoint::new(x, y);
        }
        bucket.sort();
    }
    Ok(set)
}

/// `length:x,y;x,y...` per non-empty bucket, ascending by length, joined
/// with `\n` and no trailing newline.
pub fn canonical_text(set: &StitchSet) -> String {
    set.buckets()
        .map(|(length, points)| {
            let entries = points
                .iter()
                .map(|point| format!("{},{}", point.x, point.y))
                .collect::<Vec<_>>()
                .join(";");
            format!("{}:{}", length, entries)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn hash_canonical(canonical: &str, algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Sha1 => format!("{:x}", Sha1::digest(canonical.as_bytes())),
        DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(canonical.as_bytes())),
    }
}
