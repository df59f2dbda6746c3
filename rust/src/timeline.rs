//! Dense indexing of the discretized time horizon.
//!
//! Maps sparse timestamps to contiguous slot indices so the solvers can address time
//! nodes with direct array indexing.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::models::{Job, Time};

/// Slot index into a [`Timeline`].
pub type SlotIndex = usize;

/// Sorted set of distinct timestamps with O(1) lookup both ways.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    to_slot: FxHashMap<Time, SlotIndex>,
    from_slot: Vec<Time>,
}

impl Timeline {
    /// Build from arbitrary timestamps; duplicates are ignored.
    pub fn from_timestamps<I: IntoIterator<Item = Time>>(timestamps: I) -> Self {
        let mut from_slot: Vec<Time> = timestamps.into_iter().collect();
        from_slot.sort_unstable();
        from_slot.dedup();

        let mut to_slot = FxHashMap::with_capacity_and_hasher(from_slot.len(), Default::default());
        for (slot, &t) in from_slot.iter().enumerate() {
            to_slot.insert(t, slot);
        }
        Self { to_slot, from_slot }
    }

    /// Every timestamp at which some job is available.
    pub fn covering(jobs: &[Arc<Job>]) -> Self {
        Self::from_timestamps(jobs.iter().flat_map(|job| job.timestamps()))
    }

    /// Every timestamp of `[min release, max deadline]`, gaps included.
    pub fn horizon(jobs: &[Arc<Job>]) -> Self {
        let start = jobs.iter().map(|j| j.release_time()).min();
        let end = jobs.iter().map(|j| j.deadline()).max();
        match (start, end) {
            (Some(start), Some(end)) => Self::from_timestamps(start..=end),
            _ => Self::default(),
        }
    }

    /// Slot index of a timestamp, if it is on the timeline.
    #[inline]
    pub fn slot(&self, t: Time) -> Option<SlotIndex> {
        self.to_slot.get(&t).copied()
    }

    /// Timestamp of a slot index.
    #[inline]
    pub fn time(&self, slot: SlotIndex) -> Time {
        self.from_slot[slot]
    }

    pub fn times(&self) -> &[Time] {
        &self.from_slot
    }

    /// Slots at which `job` is available, ascending.
    pub fn slots_of<'a>(&'a self, job: &'a Job) -> impl Iterator<Item = SlotIndex> + 'a {
        job.timestamps().filter_map(move |t| self.slot(t))
    }

    pub fn len(&self) -> usize {
        self.from_slot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_slot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPool, TimeInterval};

    #[test]
    fn test_lookup_both_ways() {
        let timeline = Timeline::from_timestamps(vec![9, 3, 5, 3]);

        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.slot(3), Some(0));
        assert_eq!(timeline.slot(9), Some(2));
        assert_eq!(timeline.slot(4), None);
        assert_eq!(timeline.time(1), 5);
    }

    #[test]
    fn test_covering_skips_gaps() {
        let mut pool = JobPool::new();
        pool.add_job_with_intervals(vec![TimeInterval::new(1, 2), TimeInterval::new(6, 6)], 1)
            .unwrap();
        pool.add_job(2, 3, 1).unwrap();

        let covering = Timeline::covering(pool.jobs());
        assert_eq!(covering.times(), &[1, 2, 3, 6]);

        let horizon = Timeline::horizon(pool.jobs());
        assert_eq!(horizon.times(), &[1, 2, 3, 4, 5, 6]);

        let first = &pool.jobs()[0];
        assert_eq!(covering.slots_of(first).collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    #[test]
    fn test_empty_jobs() {
        assert!(Timeline::horizon(&[]).is_empty());
        assert!(Timeline::covering(&[]).is_empty());
    }
}
