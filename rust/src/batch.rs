//! Batch input and output records.
//!
//! A batch holds several independent cases that share one concurrency bound. Each case is
//! scheduled with a fresh [`JobPool`], so job ids restart at zero per case.

use serde::{Deserialize, Serialize};

use crate::log_changes;
use crate::logging::verdict;
use crate::models::{JobId, JobPool, Schedule, Time, TimeInterval};
use crate::scheduler::{Scheduler, SchedulerError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub release_time: Time,
    pub deadline: Time,
    pub duration: Time,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCase {
    pub count: usize,
    pub jobs: Vec<BatchJob>,
}

impl BatchCase {
    /// Validate the case and allocate its jobs.
    pub fn to_pool(&self) -> Result<JobPool, SchedulerError> {
        if self.count != self.jobs.len() {
            return Err(SchedulerError::InvalidJob(format!(
                "case declares {} jobs but lists {}",
                self.count,
                self.jobs.len()
            )));
        }
        let mut pool = JobPool::new();
        for job in &self.jobs {
            pool.add_job(job.release_time, job.deadline, job.duration)?;
        }
        Ok(pool)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInput {
    pub count: usize,
    pub max_concurrency: usize,
    pub cases: Vec<BatchCase>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJobSchedule {
    pub job_id: JobId,
    pub execution_intervals: Vec<TimeInterval>,
}

/// [`Schedule`] with jobs referenced by id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSchedule {
    pub all_jobs_scheduled: bool,
    pub active_time_intervals: Option<Vec<TimeInterval>>,
    pub job_schedules: Option<Vec<BatchJobSchedule>>,
}

impl From<&Schedule> for BatchSchedule {
    fn from(schedule: &Schedule) -> Self {
        Self {
            all_jobs_scheduled: schedule.all_jobs_scheduled,
            active_time_intervals: schedule.active_time_intervals.clone(),
            job_schedules: schedule.job_schedules.as_ref().map(|schedules| {
                schedules
                    .iter()
                    .map(|s| BatchJobSchedule {
                        job_id: s.job.id(),
                        execution_intervals: s.execution_intervals.clone(),
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub count: usize,
    pub max_concurrency: usize,
    pub schedules: Vec<BatchSchedule>,
}

/// Schedule every case of `input` with `scheduler`.
pub fn run_batch(
    input: &BatchInput,
    scheduler: &dyn Scheduler,
    verbosity: u8,
) -> Result<BatchOutput, SchedulerError> {
    if input.count != input.cases.len() {
        return Err(SchedulerError::InvalidJob(format!(
            "batch declares {} cases but lists {}",
            input.count,
            input.cases.len()
        )));
    }

    let mut schedules = Vec::with_capacity(input.cases.len());
    for (i, case) in input.cases.iter().enumerate() {
        let pool = case.to_pool()?;
        let schedule = scheduler.process_pool(&pool, input.max_concurrency)?;
        log_changes!(
            verbosity,
            "Case #{} is processed by {}: {}",
            i,
            scheduler.name(),
            verdict(schedule.all_jobs_scheduled)
        );
        schedules.push(BatchSchedule::from(&schedule));
    }

    Ok(BatchOutput {
        count: input.count,
        max_concurrency: input.max_concurrency,
        schedules,
    })
}
