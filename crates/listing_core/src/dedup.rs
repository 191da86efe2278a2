use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{ListingRecord, Metadata};

/// Digest prefix lengths tried, in order, when a suffixed name is already taken.
const DIGEST_ESCALATION: [usize; 3] = [8, 16, 64];

/// Where a listing should be written, decided before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Content-equal listing already persisted during this run.
    AlreadyPersisted { category: String, directory: String },
    /// Write the listing under `{category}/{directory}`.
    Target { directory: String },
    /// Every candidate directory name is already claimed.
    Exhausted,
}

/// Run-scoped record of what has been persisted.
///
/// Tracks content fingerprints, how many distinct listings were stored under
/// each normalized title, and which `(category, directory)` pairs are taken.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashMap<Metadata, (String, String)>,
    title_counts: BTreeMap<String, usize>,
    claimed: HashSet<(String, String)>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, record: &ListingRecord) -> bool {
        self.seen.contains_key(record.metadata())
    }

    pub fn title_count(&self, base_title: &str) -> usize {
        self.title_counts.get(base_title).copied().unwrap_or(0)
    }

    pub fn is_claimed(&self, category: &str, directory: &str) -> bool {
        self.claimed
            .contains(&(category.to_string(), directory.to_string()))
    }

    /// Number of distinct listings persisted so far.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Pick the directory for `record`.
    ///
    /// First listing under a title gets the bare title; the n-th distinct one
    /// gets `{title}_{n-1}`. A taken name is extended with a growing prefix of
    /// the content digest, so the choice depends only on discovery order and
    /// content.
    pub fn resolve(&self, category: &str, base_title: &str, record: &ListingRecord) -> Resolution {
        if let Some((category, directory)) = self.seen.get(record.metadata()) {
            return Resolution::AlreadyPersisted {
                category: category.clone(),
                directory: directory.clone(),
            };
        }

        let count = self.title_count(base_title);
        let primary = if count == 0 {
            base_title.to_string()
        } else {
            format!("{base_title}_{count}")
        };
        if !self.is_claimed(category, &primary) {
            return Resolution::Target { directory: primary };
        }

        let digest = record.content_digest();
        DIGEST_ESCALATION
            .iter()
            .map(|&len| format!("{primary}_{}", &digest[..len]))
            .find(|candidate| !self.is_claimed(category, candidate))
            .map_or(Resolution::Exhausted, |directory| Resolution::Target {
                directory,
            })
    }

    /// Record a successful persist.
    pub fn register(
        &mut self,
        category: &str,
        base_title: &str,
        directory: &str,
        record: &ListingRecord,
    ) {
        self.claimed
            .insert((category.to_string(), directory.to_string()));
        *self.title_counts.entry(base_title.to_string()).or_insert(0) += 1;
        self.seen.insert(
            record.metadata().clone(),
            (category.to_string(), directory.to_string()),
        );
    }

    /// Titles stored more than once, sorted by title.
    pub fn collisions(&self) -> Vec<(String, usize)> {
        self.title_counts
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(title, &count)| (title.clone(), count))
            .collect()
    }
}
