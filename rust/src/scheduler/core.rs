//! Scheduler interface and error type shared by every strategy.

use std::sync::Arc;
use thiserror::Error;

use crate::flow::Capacity;
use crate::interval::merge_timestamps;
use crate::models::{Job, JobPool, JobSchedule, Schedule, Time};

/// Errors that can occur during scheduling.
///
/// Infeasibility is not an error; it is reported through [`Schedule::infeasible`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Invalid job: {0}")]
    InvalidJob(String),
    #[error("{scheduler} does not support this input: {reason}")]
    Unsupported {
        scheduler: &'static str,
        reason: String,
    },
    #[error("LP solver failed: {0}")]
    Solver(String),
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
    #[error("Unknown scheduler: {0}")]
    UnknownScheduler(String),
}

/// A scheduling strategy.
///
/// `process` returns a feasible schedule if and only if every job can be fully served inside
/// its availability with at most `max_concurrency` jobs running per timestamp.
pub trait Scheduler {
    /// Name used in batch files and logs.
    fn name(&self) -> &'static str;

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError>;

    fn process_pool(&self, pool: &JobPool, max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        self.process(pool.jobs(), max_concurrency)
    }
}

/// Sum of all job durations.
pub(crate) fn total_duration(jobs: &[Arc<Job>]) -> Time {
    jobs.iter().map(|j| j.duration()).sum()
}

/// Concurrency bound as a flow capacity. At most `jobs.len()` jobs ever run at once.
pub(crate) fn concurrency_capacity(jobs: &[Arc<Job>], max_concurrency: usize) -> Capacity {
    Capacity::try_from(max_concurrency.min(jobs.len())).unwrap_or(Capacity::MAX)
}

/// Feasible schedule whose active time is exactly the union of the execution timestamps.
pub(crate) fn schedule_from_job_schedules(job_schedules: Vec<JobSchedule>) -> Schedule {
    let active = merge_timestamps(job_schedules.iter().flat_map(|s| s.timestamps()));
    Schedule::feasible(active, job_schedules)
}

/// Reject jobs that are not unit-length.
pub(crate) fn require_unit_jobs(scheduler: &'static str, jobs: &[Arc<Job>]) -> Result<(), SchedulerError> {
    match jobs.iter().find(|j| !j.is_unit()) {
        Some(job) => Err(SchedulerError::Unsupported {
            scheduler,
            reason: format!("job {} has duration {}, expected 1", job.id(), job.duration()),
        }),
        None => Ok(()),
    }
}
