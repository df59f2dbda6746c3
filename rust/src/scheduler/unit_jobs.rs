//! Exact scheduler for unit-length, single-window jobs.
//!
//! Phase one walks the jobs by decreasing release time and gives each one the latest
//! timestamp at or before its deadline that still has spare capacity. Exhausted timestamps
//! are merged into their predecessor in a disjoint-set forest, so the lookup is amortized
//! near-constant. A job whose compacted deadline falls before its release cannot be served.
//!
//! Phase two sweeps the compacted deadlines in increasing order. At each one it runs the
//! jobs due there and fills the remaining capacity with released jobs, earliest compacted
//! deadline first.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::disjoint_set::{DisjointSet, NodeId};
use crate::models::{Job, JobSchedule, Schedule, Time};
use crate::{log_changes, log_checks, log_debug};

use super::core::{require_unit_jobs, schedule_from_job_schedules, Scheduler, SchedulerError};

/// How the two phases visit time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UnitJobsVariant {
    /// Sort jobs and deadlines, `O(n log n)`.
    #[default]
    NLogN,
    /// Bucket jobs by timestamp and walk the whole horizon, `O(n + T)`.
    T,
}

/// Outcome of packing unit jobs, including the jobs that did not fit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Packing {
    pub assigned: Vec<JobSchedule>,
    pub dropped: Vec<Arc<Job>>,
}

/// Latest free timestamp lookup with per-timestamp capacity.
struct DeadlineCompaction {
    sets: DisjointSet,
    node_of: FxHashMap<Time, NodeId>,
    load: FxHashMap<Time, usize>,
    max_concurrency: usize,
}

impl DeadlineCompaction {
    fn new(capacity: usize, max_concurrency: usize) -> Self {
        Self {
            sets: DisjointSet::with_capacity(capacity),
            node_of: FxHashMap::default(),
            load: FxHashMap::default(),
            max_concurrency,
        }
    }

    fn node(&mut self, t: Time) -> NodeId {
        if let Some(&node) = self.node_of.get(&t) {
            return node;
        }
        let node = self.sets.make_set(t);
        self.node_of.insert(t, node);
        self.load.insert(t, 0);
        node
    }

    /// Reserve the latest timestamp in `[release, deadline]` with spare capacity.
    fn reserve(&mut self, release: Time, deadline: Time) -> Option<Time> {
        let node = self.node(deadline);
        let slot = self.sets.value(node);
        if slot < release {
            return None;
        }

        let load = self.load.entry(slot).or_insert(0);
        *load += 1;
        if *load >= self.max_concurrency {
            let exhausted = self.node(slot);
            let previous = self.node(slot - 1);
            self.sets.union(exhausted, previous);
        }
        Some(slot)
    }
}

/// Two-phase deadline compaction and greedy sweep for unit jobs.
#[derive(Clone, Debug, Default)]
pub struct UnitJobsScheduler {
    variant: UnitJobsVariant,
    config: SchedulerConfig,
}

impl UnitJobsScheduler {
    pub fn new(variant: UnitJobsVariant, config: SchedulerConfig) -> Self {
        Self { variant, config }
    }

    fn validate(&self, jobs: &[Arc<Job>]) -> Result<(), SchedulerError> {
        require_unit_jobs(self.name(), jobs)?;
        match jobs.iter().find(|job| !job.is_single_interval()) {
            Some(job) => Err(SchedulerError::Unsupported {
                scheduler: self.name(),
                reason: format!("job {} has {} availability windows", job.id(), job.availability().len()),
            }),
            None => Ok(()),
        }
    }

    /// Positions of the jobs by increasing release time, ties by position.
    fn by_release(&self, jobs: &[Arc<Job>]) -> Vec<usize> {
        match self.variant {
            UnitJobsVariant::NLogN => {
                let mut order: Vec<usize> = (0..jobs.len()).collect();
                order.sort_by_key(|&j| (jobs[j].release_time(), j));
                order
            }
            UnitJobsVariant::T => {
                let mut buckets: FxHashMap<Time, Vec<usize>> = FxHashMap::default();
                for (j, job) in jobs.iter().enumerate() {
                    buckets.entry(job.release_time()).or_default().push(j);
                }
                let mut order = Vec::with_capacity(jobs.len());
                for t in horizon(jobs) {
                    if let Some(bucket) = buckets.get(&t) {
                        order.extend_from_slice(bucket);
                    }
                }
                order
            }
        }
    }

    /// Compacted deadline per job position, `None` for jobs that cannot fit.
    fn phase_one(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Vec<Option<Time>> {
        let mut deadlines = vec![None; jobs.len()];
        if max_concurrency == 0 {
            return deadlines;
        }

        let mut compaction = DeadlineCompaction::new(2 * jobs.len(), max_concurrency);
        for j in self.by_release(jobs).into_iter().rev() {
            let job = &jobs[j];
            deadlines[j] = compaction.reserve(job.release_time(), job.deadline());
            log_checks!(
                self.config.verbosity,
                "  Job {} [{}, {}] -> {:?}",
                job.id(),
                job.release_time(),
                job.deadline(),
                deadlines[j]
            );
        }
        deadlines
    }

    /// Execution timestamp per job position for every job that survived phase one.
    fn phase_two(
        &self,
        jobs: &[Arc<Job>],
        deadlines: &[Option<Time>],
        max_concurrency: usize,
    ) -> Vec<Option<Time>> {
        let mut execution = vec![None; jobs.len()];
        let released: Vec<usize> = self
            .by_release(jobs)
            .into_iter()
            .filter(|&j| deadlines[j].is_some())
            .collect();

        let sweep: Vec<Time> = match self.variant {
            UnitJobsVariant::NLogN => {
                let mut due: Vec<Time> = deadlines.iter().flatten().copied().collect();
                due.sort_unstable();
                due.dedup();
                due
            }
            UnitJobsVariant::T => horizon(jobs).collect(),
        };

        let mut available: BTreeSet<(Time, usize)> = BTreeSet::new();
        let mut next = 0;
        for t in sweep {
            while next < released.len() && jobs[released[next]].release_time() <= t {
                let j = released[next];
                if let Some(deadline) = deadlines[j] {
                    available.insert((deadline, j));
                }
                next += 1;
            }

            // Jobs due at t come first in deadline order; every earlier deadline is done
            if !available.first().is_some_and(|&(deadline, _)| deadline == t) {
                continue;
            }
            for _ in 0..max_concurrency {
                let Some((_, j)) = available.pop_first() else {
                    break;
                };
                execution[j] = Some(t);
            }
        }
        execution
    }

    /// Run both phases and report which jobs were placed and which were dropped.
    pub fn pack(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Packing, SchedulerError> {
        self.validate(jobs)?;

        let deadlines = self.phase_one(jobs, max_concurrency);
        let execution = self.phase_two(jobs, &deadlines, max_concurrency);

        let mut packing = Packing::default();
        for (job, slot) in jobs.iter().zip(execution) {
            match slot {
                Some(t) => packing.assigned.push(JobSchedule::single(Arc::clone(job), t)),
                None => packing.dropped.push(Arc::clone(job)),
            }
        }
        packing.assigned.sort();
        log_debug!(
            self.config.verbosity,
            "{}: placed {} jobs, dropped {}",
            self.name(),
            packing.assigned.len(),
            packing.dropped.len()
        );
        Ok(packing)
    }
}

/// Every timestamp from the earliest release to the latest deadline.
fn horizon(jobs: &[Arc<Job>]) -> std::ops::RangeInclusive<Time> {
    let start = jobs.iter().map(|job| job.release_time()).min().unwrap_or(0);
    let end = jobs.iter().map(|job| job.deadline()).max().unwrap_or(-1);
    start..=end
}

impl Scheduler for UnitJobsScheduler {
    fn name(&self) -> &'static str {
        match self.variant {
            UnitJobsVariant::NLogN => "UnitJobsSchedulerNLogN",
            UnitJobsVariant::T => "UnitJobsSchedulerT",
        }
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let packing = self.pack(jobs, max_concurrency)?;
        if !packing.dropped.is_empty() {
            log_changes!(
                self.config.verbosity,
                "{}: {} jobs cannot be served",
                self.name(),
                packing.dropped.len()
            );
            return Ok(Schedule::infeasible());
        }
        Ok(schedule_from_job_schedules(packing.assigned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPool, TimeInterval};
    use crate::test_support::assert_feasible_schedule;

    fn both_variants() -> [UnitJobsScheduler; 2] {
        [
            UnitJobsScheduler::new(UnitJobsVariant::NLogN, SchedulerConfig::default()),
            UnitJobsScheduler::new(UnitJobsVariant::T, SchedulerConfig::default()),
        ]
    }

    #[test]
    fn test_compaction_redirects_full_deadlines() {
        let mut compaction = DeadlineCompaction::new(4, 2);
        assert_eq!(compaction.reserve(0, 5), Some(5));
        assert_eq!(compaction.reserve(0, 5), Some(5));
        assert_eq!(compaction.reserve(0, 5), Some(4));
        assert_eq!(compaction.reserve(0, 4), Some(4));
        assert_eq!(compaction.reserve(0, 5), Some(3));
        assert_eq!(compaction.reserve(4, 5), None);
    }

    #[test]
    fn test_groups_jobs_at_shared_deadline() {
        let mut pool = JobPool::new();
        pool.add_unit_job(1, 4).unwrap();
        pool.add_unit_job(4, 8).unwrap();
        pool.add_unit_job(10, 10).unwrap();

        for scheduler in both_variants() {
            let schedule = scheduler.process(pool.jobs(), 2).unwrap();
            assert_feasible_schedule(pool.jobs(), 2, &schedule);
            assert_eq!(
                schedule.active_time_intervals,
                Some(vec![TimeInterval::new(4, 4), TimeInterval::new(10, 10)])
            );
            assert_eq!(schedule.job_schedules.as_ref().map(Vec::len), Some(3));
        }
    }

    #[test]
    fn test_pack_reports_dropped_jobs() {
        let mut pool = JobPool::new();
        pool.add_unit_job(1, 1).unwrap();
        pool.add_unit_job(1, 1).unwrap();

        for scheduler in both_variants() {
            let packing = scheduler.pack(pool.jobs(), 1).unwrap();
            assert_eq!(packing.assigned.len(), 1);
            assert_eq!(packing.assigned[0].execution_intervals, vec![TimeInterval::new(1, 1)]);
            assert_eq!(packing.dropped.len(), 1);

            let schedule = scheduler.process(pool.jobs(), 1).unwrap();
            assert_eq!(schedule, Schedule::infeasible());
        }
    }

    #[test]
    fn test_zero_concurrency_drops_everything() {
        let mut pool = JobPool::new();
        pool.add_unit_job(0, 3).unwrap();

        let packing = UnitJobsScheduler::default().pack(pool.jobs(), 0).unwrap();
        assert!(packing.assigned.is_empty());
        assert_eq!(packing.dropped.len(), 1);
    }

    #[test]
    fn test_rejects_unsupported_jobs() {
        let mut pool = JobPool::new();
        pool.add_job_with_intervals(vec![TimeInterval::new(0, 1), TimeInterval::new(3, 4)], 1)
            .unwrap();
        assert!(matches!(
            UnitJobsScheduler::default().process(pool.jobs(), 1),
            Err(SchedulerError::Unsupported { .. })
        ));

        let mut pool = JobPool::new();
        pool.add_job(0, 4, 2).unwrap();
        assert!(matches!(
            UnitJobsScheduler::default().process(pool.jobs(), 1),
            Err(SchedulerError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        for scheduler in both_variants() {
            let schedule = scheduler.process(&[], 2).unwrap();
            assert!(schedule.all_jobs_scheduled);
            assert_eq!(schedule.active_time_intervals, Some(vec![]));
            assert_eq!(schedule.job_schedules, Some(vec![]));
        }
    }
}
