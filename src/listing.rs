use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::document::PatternDocument;
use crate::error::{FingerprintError, ListingError};
use crate::fingerprint::{fingerprint_document, FingerprintConfig};

/// `name -> digest` table persisted as `name\tdigest` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestTable {
    entries: BTreeMap<String, String>,
}

impl DigestTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, ListingError> {
        let mut table = Self::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let Some((name, digest)) = line.split_once('\t') else {
                return Err(ListingError::InvalidLine {
                    line: number + 1,
                    content: line.to_string(),
                });
            };
            let digest = digest.trim();
            if name.is_empty() || digest.is_empty() {
                return Err(ListingError::InvalidLine {
                    line: number + 1,
                    content: line.to_string(),
                });
            }
            table.insert(name, digest);
        }
        Ok(table)
    }

    /// Lines sorted by name, joined with `\n`, no trailing newline.
    pub fn to_listing(&self) -> String {
        self.entries
            .iter()
            .map(|(name, digest)| format!("{}\t{}", name, digest))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn insert(&mut self, name: impl Into<String>, digest: impl Into<String>) {
        self.entries.insert(name.into(), digest.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries
            .iter()
            .map(|(name, digest)| (name.as_str(), digest.as_str()))
    }

    pub fn contains_digest(&self, digest: &str) -> bool {
        self.entries.values().any(|value| value == digest)
    }

    pub fn names_for(&self, digest: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, value)| value.as_str() == digest)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Names sharing a digest with at least one other name. Each group is
    /// sorted and groups are ordered by their first name.
    pub fn repeated(&self) -> Vec<Vec<String>> {
        let mut by_digest: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, digest) in &self.entries {
            by_digest.entry(digest.as_str()).or_default().push(name.clone());
        }

        let mut groups: Vec<Vec<String>> = by_digest
            .into_values()
            .filter(|names| names.len() > 1)
            .collect();
        groups.sort();
        groups
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Exists(Vec<String>),
    Missing,
}

/// Looks a document's fingerprint up in an existing table, using the
/// default digest so it lines up with listing files.
pub fn check(
    document: &PatternDocument,
    table: &DigestTable,
) -> Result<CheckOutcome, FingerprintError> {
    check_with(document, table, &FingerprintConfig::default())
}

/// [`check`] with an explicit fingerprint configuration.
pub fn check_with(
    document: &PatternDocument,
    table: &DigestTable,
    config: &FingerprintConfig,
) -> Result<CheckOutcome, FingerprintError> {
    let fingerprint = fingerprint_document(document, config)?;
    let names = table.names_for(&fingerprint.digest);
    if names.is_empty() {
        Ok(CheckOutcome::Missing)
    } else {
        Ok(CheckOutcome::Exists(names))
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub table: DigestTable,
    pub failures: Vec<(String, FingerprintError)>,
}

/// Fingerprints every document in parallel. A failing document is logged
/// and reported; the remaining documents are still fingerprinted.
pub fn fingerprint_batch(
    entries: &[(String, PatternDocument)],
    config: &FingerprintConfig,
) -> BatchOutcome {
    let results: Vec<(String, Result<String, FingerprintError>)> = entries
        .par_iter()
        .map(|(name, document)| {
            let digest = fingerprint_document(document, config).map(|fp| fp.digest);
            (name.clone(), digest)
        })
        .collect();

    let mut outcome = BatchOutcome::default();
    for (name, result) in results {
        match result {
            Ok(digest) => outcome.table.insert(name, digest),
            Err(err) => {
                log::warn!("{} is broken or in the wrong format: {}", name, err);
                outcome.failures.push((name, err));
            }
        }
    }

    log::info!(
        "Fingerprinted {} patterns, {} failed",
        outcome.table.len(),
        outcome.failures.len()
    );
    outcome
}

/// Names of documents that carry no pivot data.
pub fn missing_pivots(entries: &[(String, PatternDocument)]) -> Vec<String> {
    let mut names: Vec<String> = entries
        .iter()
        .filter(|(_, document)| !document.has_pivots())
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}
