//! Same-row conflict detection and classification.
//!
//! Two stitches conflict when one starts inside the other's span, the end
//! column included. Every conflicting pair is oriented `(earlier, later)` and
//! classified into exactly one [`Relation`].

use std::collections::BTreeMap;

use crate::stitch::{Stitch, StitchSet};

/// Oriented conflicting pair: `earlier.start <= later.start <= earlier.end()`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pair {
    pub earlier: Stitch,
    pub later: Stitch,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Relation {
    /// Same start and same length.
    Identical(Pair),
    /// `later` lies entirely inside `earlier`.
    Contained(Pair),
    /// `later` runs past the end of `earlier`.
    Overlapping(Pair),
    /// None of the above. Unreachable for correctly oriented pairs.
    Indeterminate(Pair),
}

impl Relation {
    pub fn classify(pair: Pair) -> Self {
        let Pair { earlier, later } = pair;
        if earlier.start == later.start && earlier.length == later.length {
            Relation::Identical(pair)
        } else if later.end() <= earlier.end() {
            Relation::Contained(pair)
        } else if earlier.end() <= later.end() {
            Relation::Overlapping(pair)
        } else {
            Relation::Indeterminate(pair)
        }
    }

    pub fn pair(&self) -> Pair {
        match self {
            Relation::Identical(pair)
            | Relation::Contained(pair)
            | Relation::Overlapping(pair)
            | Relation::Indeterminate(pair) => *pair,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Relation::Identical(_) => "identical",
            Relation::Contained(_) => "contained",
            Relation::Overlapping(_) => "overlapping",
            Relation::Indeterminate(_) => "indeterminate",
        }
    }
}

/// Orients two same-row stitches if one starts within the other.
pub fn orient(a: Stitch, b: Stitch) -> Option<Pair> {
    if a.row != b.row {
        return None;
    }
    if a.start <= b.start && b.start <= a.end() {
        Some(Pair {
            earlier: a,
            later: b,
        })
    } else if b.start <= a.start && a.start <= b.end() {
        Some(Pair {
            earlier: b,
            later: a,
        })
    } else {
        None
    }
}

/// Detects and classifies every conflicting pair in the set.
///
/// Each row is scanned independently. Within a row, stitches are visited
/// longest first so a shorter stitch sharing a start with a longer one is
/// seen as contained rather than as an overlap. Every unordered pair is
/// compared exactly once, across lengths as well as within one length.
pub fn detect(set: &StitchSet) -> Vec<Relation> {
    let mut rows: BTreeMap<i64, Vec<Stitch>> = BTreeMap::new();
    for stitch in set.stitches() {
        rows.entry(stitch.row).or_default().push(stitch);
    }

    let mut relations = Vec::new();
    for stitches in rows.values_mut() {
        if stitches.len() < 2 {
            continue;
        }
        stitches.sort_by(|a, b| b.length.cmp(&a.length).then(a.index.cmp(&b.index)));

        for (i, first) in stitches.iter().enumerate() {
            for second in &stitches[i + 1..] {
                if let Some(pair) = orient(*first, *second) {
                    relations.push(Relation::classify(pair));
                }
            }
        }
    }

    relations
}
