use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::document::{PatternNode, StitchRef};
use crate::error::FingerprintError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i64,
    pub y: i64,
}

impl GridPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    fn offset(self, dx: i64, dy: i64) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }
}

/// A stitch as seen during conflict detection.
///
/// `index` is the stitch position inside its length bucket at the time the
/// relation was detected and is only valid until the bucket is next mutated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Stitch {
    pub row: i64,
    pub start: i64,
    pub length: usize,
    pub index: usize,
}

impl Stitch {
    /// Extraction rejects stitches whose end does not fit in `i64`, so this
    /// only saturates for sets built by hand.
    pub fn end(&self) -> i64 {
        i64::try_from(self.length)
            .ok()
            .and_then(|length| self.start.checked_add(length))
            .unwrap_or(i64::MAX)
    }

    pub fn key(&self) -> (usize, usize) {
        (self.length, self.index)
    }
}

/// Stitch placements bucketed by length. Bucket `n` holds the `(start, row)`
/// of every stitch spanning `n` grid columns. Buckets are kept sparse, so a
/// single very long stitch costs one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchSet {
    buckets: BTreeMap<usize, Vec<GridPoint>>,
}

impl StitchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flattens the layer tree into absolute stitch placements.
    pub fn extract(layers: &[PatternNode]) -> Result<Self, FingerprintError> {
        let mut set = Self::new();
        for layer in layers {
            collect_node(layer, GridPoint::new(0, 0), &mut set)?;
        }
        Ok(set)
    }

    /// Builds a set from `(start, row, length)` triples.
    pub fn from_placements(placements: &[(i64, i64, usize)]) -> Self {
        let mut set = Self::new();
        for &(start, row, length) in placements {
            set.push(length, GridPoint::new(start, row));
        }
        set
    }

    pub fn push(&mut self, length: usize, point: GridPoint) {
        self.buckets.entry(length).or_default().push(point);
    }

    pub fn bucket(&self, length: usize) -> &[GridPoint] {
        self.buckets.get(&length).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct lengths that still hold at least one stitch.
    pub fn bucket_count(&self) -> usize {
        self.buckets().count()
    }

    /// Non-empty buckets in ascending length order.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, &[GridPoint])> + '_ {
        self.buckets
            .iter()
            .filter(|(_, points)| !points.is_empty())
            .map(|(length, points)| (*length, points.as_slice()))
    }

    pub fn buckets_mut(&mut self) -> impl Iterator<Item = &mut Vec<GridPoint>> + '_ {
        self.buckets.values_mut()
    }

    pub fn stitches(&self) -> impl Iterator<Item = Stitch> + '_ {
        self.buckets().flat_map(|(length, points)| {
            points.iter().enumerate().map(move |(index, point)| Stitch {
                row: point.y,
                start: point.x,
                length,
                index,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Removes bucket entries by their original positions. Indices are
    /// applied highest first so pending ones stay valid.
    pub fn remove_indices(&mut self, length: usize, indices: &BTreeSet<usize>) {
        let Some(bucket) = self.buckets.get_mut(&length) else {
            return;
        };
        for &index in indices.iter().rev() {
            if index < bucket.len() {
                bucket.remove(index);
            }
        }
    }
}

fn collect_node(
    node: &PatternNode,
    offset: GridPoint,
    set: &mut StitchSet,
) -> Result<(), FingerprintError> {
    match node {
        PatternNode::Leaf { reference, coords } => {
            let stitch_ref = StitchRef::parse(reference)?;
            if stitch_ref.length == 0 {
                return Ok(());
            }
            // `StitchRef::parse` caps the length at `i64::MAX`.
            let span = stitch_ref.length as i64;
            for coord in coords {
                let [x, y, ..] = coord.as_slice() else {
                    return Err(FingerprintError::InvalidCoordinate(coord.clone()));
                };
                let point = offset
                    .offset(*x, *y)
                    .filter(|point| point.x.checked_add(span).is_some())
                    .ok_or_else(|| FingerprintError::InvalidCoordinate(coord.clone()))?;
                set.push(stitch_ref.length, point);
            }
            Ok(())
        }
        PatternNode::Group { x, y, children, .. } => {
            let offset = offset
                .offset(*x, *y)
                .ok_or_else(|| FingerprintError::InvalidCoordinate(vec![*x, *y]))?;
            for child in children {
                collect_node(child, offset, set)?;
            }
            Ok(())
        }
    }
}
