//! Shared fixtures and checks for unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::interval::merge_timestamps;
use crate::models::{Job, JobPool, Schedule, Time};

/// Seeded random single-window jobs in `[0, max_time]`.
pub(crate) struct JobsGenerator {
    max_duration: Time,
    max_time: Time,
    rng: StdRng,
}

impl JobsGenerator {
    pub(crate) fn new(max_duration: Time, max_time: Time, seed: u64) -> Self {
        Self {
            max_duration,
            max_time,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn pool(&mut self, count: usize) -> JobPool {
        let mut pool = JobPool::new();
        for _ in 0..count {
            let duration = self.rng.random_range(1..=self.max_duration);
            let release = self.rng.random_range(0..=(self.max_time - duration + 1).max(0));
            let deadline = self
                .rng
                .random_range((release + duration - 1)..=self.max_time.max(release + duration - 1));
            pool.add_job(release, deadline, duration)
                .expect("generated jobs are valid");
        }
        pool
    }
}

/// Ten unit jobs in [1, 11], nine rigid jobs of length 10 in [2, 11], one job of length 10
/// in [1, 21]. With concurrency 10 the optimum keeps 20 timestamps active.
pub(crate) fn scenario_a() -> JobPool {
    let mut pool = JobPool::new();
    pool.add_job(1, 21, 10).unwrap();
    for _ in 0..10 {
        pool.add_unit_job(1, 11).unwrap();
    }
    for _ in 0..9 {
        pool.add_job(2, 11, 10).unwrap();
    }
    pool
}

/// Panic unless `schedule` serves every job of `jobs` within its windows, never exceeds
/// `max_concurrency`, and reports exactly the timestamps some job executes at as active.
pub(crate) fn assert_feasible_schedule(jobs: &[Arc<Job>], max_concurrency: usize, schedule: &Schedule) {
    assert!(schedule.all_jobs_scheduled, "schedule is infeasible");
    let active = schedule
        .active_time_intervals
        .as_ref()
        .expect("feasible schedule has active intervals");
    let job_schedules = schedule
        .job_schedules
        .as_ref()
        .expect("feasible schedule has job schedules");

    for pair in active.windows(2) {
        assert!(pair[0].end + 1 < pair[1].start, "active intervals not merged: {:?}", active);
    }
    assert_eq!(job_schedules.len(), jobs.len(), "wrong number of job schedules");

    let mut load: FxHashMap<Time, usize> = FxHashMap::default();
    for job in jobs {
        let matching: Vec<_> = job_schedules.iter().filter(|s| s.job.id() == job.id()).collect();
        assert_eq!(matching.len(), 1, "job {} scheduled {} times", job.id(), matching.len());
        let job_schedule = matching[0];

        assert_eq!(
            job_schedule.executed_time(),
            job.duration(),
            "job {} executes {:?}",
            job.id(),
            job_schedule.execution_intervals
        );
        for t in job_schedule.timestamps() {
            assert!(job.is_available_at(t), "job {} runs at {} outside its windows", job.id(), t);
            assert!(
                active.iter().any(|interval| interval.contains(t)),
                "job {} runs at inactive timestamp {}",
                job.id(),
                t
            );
            *load.entry(t).or_insert(0) += 1;
        }
    }

    for (&t, &count) in &load {
        assert!(count <= max_concurrency, "{} jobs run at {}", count, t);
    }
    assert_eq!(
        active,
        &merge_timestamps(load.keys().copied()),
        "active intervals differ from the union of executions"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobSchedule, TimeInterval};

    #[test]
    fn test_generator_respects_bounds() {
        let pool = JobsGenerator::new(3, 8, 1).pool(50);
        assert_eq!(pool.len(), 50);
        for job in pool.jobs() {
            assert!((1..=3).contains(&job.duration()));
            assert!(job.release_time() >= 0);
            assert!(job.deadline() <= 8);
            assert!(job.available_time() >= job.duration());
        }
    }

    #[test]
    #[should_panic(expected = "jobs run at")]
    fn test_assert_feasible_schedule_catches_overload() {
        let mut pool = JobPool::new();
        let a = pool.add_unit_job(0, 0).unwrap();
        let b = pool.add_unit_job(0, 0).unwrap();
        let schedule = Schedule::feasible(
            vec![TimeInterval::new(0, 0)],
            vec![JobSchedule::single(a, 0), JobSchedule::single(b, 0)],
        );
        assert_feasible_schedule(pool.jobs(), 1, &schedule);
    }
}
