//! Tag statistics
//!
//! Counts total and due cards per exact tag combination, then rolls those
//! counts up per individual tag for every tag that shows up in more than one
//! combination. A tag confined to one combination is already represented
//! exactly by that combination's entry and gets no entry of its own.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{tags_key, RevisionCandidate};

/// Card counts for one statistics key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagStats {
    pub total: usize,
    pub to_revise: usize,
}

impl TagStats {
    fn add(&mut self, other: TagStats) {
        self.total += other.total;
        self.to_revise += other.to_revise;
    }
}

struct TagGroup<'a> {
    stats: TagStats,
    tags: BTreeSet<&'a str>,
}

/// Aggregate statistics over the full candidate set (eligible or not)
///
/// Keys are tags keys and bare tag names (escaped the way [`tags_key`] escapes
/// them), sorted ascending. When a bare tag
/// name equals a single-tag combination key, the roll-up replaces that entry;
/// the roll-up already includes the combination's counts.
pub fn aggregate_tag_stats(candidates: &[RevisionCandidate]) -> BTreeMap<String, TagStats> {
    let mut groups: BTreeMap<&str, TagGroup<'_>> = BTreeMap::new();
    for candidate in candidates {
        let group = groups
            .entry(candidate.tags_key.as_str())
            .or_insert_with(|| TagGroup {
                stats: TagStats::default(),
                tags: candidate.tag_names.iter().map(String::as_str).collect(),
            });
        group.stats.add(TagStats {
            total: 1,
            to_revise: usize::from(candidate.eligible),
        });
    }

    // Number of distinct combinations each tag appears in
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for group in groups.values() {
        for &tag in &group.tags {
            *occurrences.entry(tag).or_default() += 1;
        }
    }

    let mut rollup: BTreeMap<&str, TagStats> = BTreeMap::new();
    for group in groups.values() {
        for &tag in &group.tags {
            if occurrences[tag] > 1 {
                rollup.entry(tag).or_default().add(group.stats);
            }
        }
    }

    tracing::debug!(
        groups = groups.len(),
        rolled_up = rollup.len(),
        "Aggregated tag statistics"
    );

    let mut result: BTreeMap<String, TagStats> = groups
        .into_iter()
        .map(|(key, group)| (key.to_string(), group.stats))
        .collect();
    for (tag, stats) in rollup {
        result.insert(tags_key(&[tag]), stats);
    }
    result
}
