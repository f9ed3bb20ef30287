//! Two-stage conflict resolution.
//!
//! Resolution runs exactly two stages, each with its own detection sweep:
//!
//! 1. [`absorb_redundant`] drops stitches that repeat or sit inside another.
//! 2. [`merge_overlaps`] fuses chains of overlapping stitches into one.
//!
//! The stitches produced by the second stage are not checked again. This is
//! not a fixpoint: for legitimate pattern data the merged stitches no longer
//! conflict, but nothing here guarantees convergence on arbitrary input.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::conflict::{detect, Pair, Relation};
use crate::stitch::{GridPoint, Stitch, StitchSet};

/// Counters describing what resolution changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub duplicates_removed: usize,
    pub contained_removed: usize,
    pub overlap_groups: usize,
    pub overlap_stitches_merged: usize,
    pub indeterminate: usize,
}

/// Bucket positions scheduled for removal, deduplicated per length.
#[derive(Debug, Default)]
struct RemovalPlan {
    by_length: BTreeMap<usize, BTreeSet<usize>>,
}

impl RemovalPlan {
    fn mark(&mut self, stitch: &Stitch) {
        self.by_length
            .entry(stitch.length)
            .or_default()
            .insert(stitch.index);
    }

    fn apply(self, set: &mut StitchSet) {
        for (length, indices) in &self.by_length {
            set.remove_indices(*length, indices);
        }
    }
}

/// Runs both resolution stages on an extracted set.
pub fn resolve(set: StitchSet, trace: bool) -> (StitchSet, ResolutionStats) {
    let mut stats = ResolutionStats::default();
    let set = absorb_redundant(set, &mut stats, trace);
    let set = merge_overlaps(set, &mut stats, trace);
    (set, stats)
}

/// Stage one: removes the later stitch of every identical or contained pair.
pub fn absorb_redundant(
    mut set: StitchSet,
    stats: &mut ResolutionStats,
    trace: bool,
) -> StitchSet {
    let relations = detect(&set);
    trace_relations("absorb", &relations, trace);

    let mut plan = RemovalPlan::default();
    let mut duplicates = HashSet::new();
    let mut contained = HashSet::new();
    for relation in &relations {
        match relation {
            Relation::Identical(pair) => {
                duplicates.insert(pair.later.key());
                plan.mark(&pair.later);
            }
            Relation::Contained(pair) => {
                contained.insert(pair.later.key());
                plan.mark(&pair.later);
            }
            Relation::Overlapping(_) | Relation::Indeterminate(_) => {}
        }
    }
    stats.duplicates_removed += duplicates.len();
    stats.contained_removed += contained.difference(&duplicates).count();

    let before = set.len();
    plan.apply(&mut set);
    log::debug!(
        "Absorb stage: {} relations, {} stitches removed",
        relations.len(),
        before - set.len()
    );
    set
}

/// Stage two: merges overlap chains and drops indeterminate pairs.
pub fn merge_overlaps(
    mut set: StitchSet,
    stats: &mut ResolutionStats,
    trace: bool,
) -> StitchSet {
    let relations = detect(&set);
    trace_relations("merge", &relations, trace);

    let mut plan = RemovalPlan::default();
    let mut overlapping = Vec::new();
    for relation in &relations {
        match relation {
            Relation::Overlapping(pair) => overlapping.push(*pair),
            Relation::Indeterminate(pair) => {
                stats.indeterminate += 1;
                log::warn!(
                    "Indeterminate stitch conflict dropped: row {} [{}, {}) vs [{}, {})",
                    pair.earlier.row,
                    pair.earlier.start,
                    pair.earlier.end(),
                    pair.later.start,
                    pair.later.end()
                );
                plan.mark(&pair.earlier);
                plan.mark(&pair.later);
            }
            Relation::Identical(_) | Relation::Contained(_) => {}
        }
    }

    let groups = group_overlaps(overlapping);
    let mut merged = Vec::with_capacity(groups.len());
    for group in &groups {
        plan.mark(&group.anchor);
        for member in &group.members {
            plan.mark(member);
        }
        merged.push((
            group.merged_length(),
            GridPoint::new(group.anchor.start, group.anchor.row),
        ));
        stats.overlap_stitches_merged += group.members.len() + 1;
    }
    stats.overlap_groups += groups.len();

    // Merged stitches are appended after removal so bucket positions held
    // by the plan still refer to the detected stitches.
    plan.apply(&mut set);
    for (length, point) in merged {
        set.push(length, point);
    }

    log::debug!(
        "Merge stage: {} relations, {} overlap groups, {} stitches after merge",
        relations.len(),
        groups.len(),
        set.len()
    );
    set
}

/// Overlapping stitches fused into one, anchored at the earliest start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapGroup {
    pub anchor: Stitch,
    pub members: Vec<Stitch>,
}

impl OverlapGroup {
    pub fn merged_end(&self) -> i64 {
        self.members
            .iter()
            .map(Stitch::end)
            .fold(self.anchor.end(), i64::max)
    }

    pub fn merged_length(&self) -> usize {
        self.merged_end().abs_diff(self.anchor.start) as usize
    }

    fn admit(&mut self, stitch: Stitch) {
        if stitch.start < self.anchor.start {
            let previous = std::mem::replace(&mut self.anchor, stitch);
            self.members.push(previous);
        } else {
            self.members.push(stitch);
        }
    }
}

/// Chains overlapping pairs: `(A, B)` and `(B, C)` become one group anchored
/// at `A` holding `B` and `C`. Pairs are taken in ascending start order and
/// members keep discovery order. Groups come back ordered left to right.
pub fn group_overlaps(mut pairs: Vec<Pair>) -> Vec<OverlapGroup> {
    pairs.sort_by_key(|pair| pair.earlier.start);

    let mut groups: Vec<Option<OverlapGroup>> = Vec::new();
    let mut owner: HashMap<(usize, usize), usize> = HashMap::new();

    for Pair { earlier, later } in pairs {
        let earlier_group = owner.get(&earlier.key()).copied();
        let later_group = owner.get(&later.key()).copied();

        match (earlier_group, later_group) {
            (None, None) => {
                owner.insert(earlier.key(), groups.len());
                owner.insert(later.key(), groups.len());
                groups.push(Some(OverlapGroup {
                    anchor: earlier,
                    members: vec![later],
                }));
            }
            (Some(id), None) => {
                if let Some(group) = groups[id].as_mut() {
                    group.admit(later);
                }
                owner.insert(later.key(), id);
            }
            (None, Some(id)) => {
                if let Some(group) = groups[id].as_mut() {
                    group.admit(earlier);
                }
                owner.insert(earlier.key(), id);
            }
            (Some(keep), Some(absorb)) if keep != absorb => {
                let Some(absorbed) = groups[absorb].take() else {
                    continue;
                };
                let moved = std::iter::once(absorbed.anchor).chain(absorbed.members);
                for stitch in moved {
                    owner.insert(stitch.key(), keep);
                    if let Some(group) = groups[keep].as_mut() {
                        group.admit(stitch);
                    }
                }
            }
            (Some(_), Some(_)) => {}
        }
    }

    let mut groups: Vec<OverlapGroup> = groups.into_iter().flatten().collect();
    groups.sort_by_key(|group| (group.anchor.start, group.anchor.row));
    groups
}

fn trace_relations(stage: &str, relations: &[Relation], trace: bool) {
    if !trace {
        return;
    }
    for relation in relations {
        let Pair { earlier, later } = relation.pair();
        log::trace!(
            "{} stage: row {} [{}, {}) / [{}, {}) {}",
            stage,
            earlier.row,
            earlier.start,
            earlier.end(),
            later.start,
            later.end(),
            relation.label()
        );
    }
}
