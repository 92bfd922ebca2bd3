//! Series-grouped scheduler
//!
//! Orders the eligible candidates for one study session:
//!
//! 1. Candidates are bucketed by exact weight; buckets are processed from the
//!    highest weight down.
//! 2. Each bucket is shuffled and scanned. A standalone card is emitted as is.
//! 3. The first member of a series that comes up pulls in the whole series, in
//!    position order. Every member of that series is then dropped from the
//!    current bucket and from all buckets still to come, and the rest of the
//!    current bucket is reshuffled before scanning resumes.
//!
//! A series therefore always forms one contiguous block, placed where its most
//! urgent member would have been shown on weight alone.

use std::collections::{BTreeMap, HashMap, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::RevisionCandidate;
use crate::card::SeriesId;

/// Weight-bucketed scheduler keeping series together
pub struct SeriesGroupedScheduler<R: Rng> {
    rng: R,
}

impl SeriesGroupedScheduler<StdRng> {
    /// Scheduler with a deterministic shuffle order
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Scheduler seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> SeriesGroupedScheduler<R> {
    /// Scheduler shuffling buckets with the given generator
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Produce the study order for `candidates`
    ///
    /// Every candidate appears exactly once in the result. Candidates are
    /// expected to be eligible; a candidate without a weight is treated as
    /// weight 0. `series_size` is filled in on every returned candidate.
    pub fn schedule(&mut self, candidates: Vec<RevisionCandidate>) -> Vec<RevisionCandidate> {
        if candidates.is_empty() {
            return candidates;
        }

        // Full membership of every series, independent of weight
        let mut members: HashMap<SeriesId, Vec<usize>> = HashMap::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            if let Some(series) = candidate.series {
                members.entry(series).or_default().push(idx);
            }
        }
        for indices in members.values_mut() {
            indices.sort_by_key(|&idx| (candidates[idx].n_in_series, candidates[idx].id));
        }

        let mut buckets: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (idx, candidate) in candidates.iter().enumerate() {
            buckets
                .entry(candidate.weight.unwrap_or(0))
                .or_default()
                .push(idx);
        }

        let mut order: Vec<usize> = Vec::with_capacity(candidates.len());
        let mut emitted: HashSet<SeriesId> = HashSet::new();

        while let Some((weight, mut pending)) = buckets.pop_last() {
            pending.shuffle(&mut self.rng);
            let mut cursor = 0;

            while cursor < pending.len() {
                let idx = pending[cursor];
                let Some(series) = candidates[idx].series else {
                    order.push(idx);
                    cursor += 1;
                    continue;
                };

                if !emitted.insert(series) {
                    // Members are removed from every pending bucket when their
                    // series is emitted, so reaching one again is a bug.
                    debug_assert!(false, "series {series} reached after being emitted");
                    tracing::error!(%series, card = %candidates[idx].id, "Series member left behind in bucket");
                    cursor += 1;
                    continue;
                }

                let block = &members[&series];
                tracing::debug!(%series, weight, size = block.len(), "Emitting series block");
                order.extend_from_slice(block);

                let in_series = |i: &usize| candidates[*i].series == Some(series);

                // Rebuild the rest of this bucket without the emitted cards and
                // start scanning it afresh in a new random order.
                pending = pending[cursor..].iter().copied().filter(|i| !in_series(i)).collect();
                pending.shuffle(&mut self.rng);
                cursor = 0;

                for bucket in buckets.values_mut() {
                    bucket.retain(|i| !in_series(i));
                }
                buckets.retain(|_, bucket| !bucket.is_empty());
            }
        }

        debug_assert_eq!(order.len(), candidates.len());

        let series_sizes: HashMap<SeriesId, usize> = members
            .iter()
            .map(|(series, indices)| (*series, indices.len()))
            .collect();

        let mut slots: Vec<Option<RevisionCandidate>> = candidates.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .map(|mut candidate| {
                candidate.series_size = candidate
                    .series
                    .and_then(|series| series_sizes.get(&series).copied())
                    .unwrap_or(1);
                candidate
            })
            .collect()
    }
}
