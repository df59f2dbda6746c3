//! Core data types for the scheduling system.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::interval::{covered_time, merge_time_intervals};
use crate::scheduler::SchedulerError;

/// Discrete time unit. All windows and execution slots are inclusive on both ends.
pub type Time = i64;

/// Stable job identity handed out by a [`JobPool`].
pub type JobId = u64;

/// Inclusive integer interval `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: Time,
    pub end: Time,
}

impl TimeInterval {
    pub fn new(start: Time, end: Time) -> Self {
        debug_assert!(start <= end, "inverted interval [{}, {}]", start, end);
        Self { start, end }
    }

    /// Build an interval, rejecting `start > end`.
    pub fn try_new(start: Time, end: Time) -> Result<Self, SchedulerError> {
        if start > end {
            return Err(SchedulerError::InvalidJob(format!(
                "interval start {} is after its end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of timestamps covered.
    #[inline]
    pub fn duration(&self) -> Time {
        self.end - self.start + 1
    }

    #[inline]
    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t <= self.end
    }

    /// True if `other` lies entirely within this interval.
    #[inline]
    pub fn covers(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn timestamps(&self) -> std::ops::RangeInclusive<Time> {
        self.start..=self.end
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A job to be scheduled.
///
/// The general form is a set of disjoint availability windows. The common single-window
/// case is the one-element specialization, exposed through [`Job::release_time`] and
/// [`Job::deadline`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    availability: Vec<TimeInterval>,
    duration: Time,
}

impl Job {
    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Sorted, disjoint, non-adjacent availability windows.
    pub fn availability(&self) -> &[TimeInterval] {
        &self.availability
    }

    #[inline]
    pub fn duration(&self) -> Time {
        self.duration
    }

    /// Earliest timestamp the job may execute at.
    pub fn release_time(&self) -> Time {
        self.availability.first().map_or(0, |w| w.start)
    }

    /// Latest timestamp the job may execute at.
    pub fn deadline(&self) -> Time {
        self.availability.last().map_or(-1, |w| w.end)
    }

    pub fn is_unit(&self) -> bool {
        self.duration == 1
    }

    pub fn is_single_interval(&self) -> bool {
        self.availability.len() == 1
    }

    /// Whether the job may execute at `t`.
    pub fn is_available_at(&self, t: Time) -> bool {
        let idx = self.availability.partition_point(|w| w.end < t);
        self.availability.get(idx).is_some_and(|w| w.start <= t)
    }

    /// Whether the job may execute at every timestamp of `interval`.
    pub fn is_available_during(&self, interval: &TimeInterval) -> bool {
        let idx = self.availability.partition_point(|w| w.end < interval.start);
        self.availability
            .get(idx)
            .is_some_and(|w| w.covers(interval))
    }

    /// Total number of timestamps the job may execute at.
    pub fn available_time(&self) -> Time {
        covered_time(&self.availability)
    }

    /// Every timestamp of every availability window, ascending.
    pub fn timestamps(&self) -> impl Iterator<Item = Time> + '_ {
        self.availability.iter().flat_map(TimeInterval::timestamps)
    }
}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Owns job identity allocation and input validation.
///
/// Ids increase monotonically per pool and are never reused.
#[derive(Clone, Debug, Default)]
pub struct JobPool {
    next_id: JobId,
    jobs: Vec<Arc<Job>>,
}

impl JobPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single-window job available during `[release_time, deadline]`.
    pub fn add_job(
        &mut self,
        release_time: Time,
        deadline: Time,
        duration: Time,
    ) -> Result<Arc<Job>, SchedulerError> {
        if release_time > deadline {
            return Err(SchedulerError::InvalidJob(format!(
                "release time {} is after deadline {}",
                release_time, deadline
            )));
        }
        self.add_job_with_intervals(vec![TimeInterval::new(release_time, deadline)], duration)
    }

    /// Add a unit-duration job.
    pub fn add_unit_job(
        &mut self,
        release_time: Time,
        deadline: Time,
    ) -> Result<Arc<Job>, SchedulerError> {
        self.add_job(release_time, deadline, 1)
    }

    /// Add a job with several availability windows.
    ///
    /// Overlapping or adjacent windows are merged.
    pub fn add_job_with_intervals(
        &mut self,
        intervals: Vec<TimeInterval>,
        duration: Time,
    ) -> Result<Arc<Job>, SchedulerError> {
        if duration < 0 {
            return Err(SchedulerError::InvalidJob(format!(
                "negative duration {}",
                duration
            )));
        }
        if intervals.is_empty() {
            return Err(SchedulerError::InvalidJob(
                "job has no availability window".to_string(),
            ));
        }
        if let Some(bad) = intervals.iter().find(|w| w.start > w.end) {
            return Err(SchedulerError::InvalidJob(format!(
                "availability window [{}, {}] is inverted",
                bad.start, bad.end
            )));
        }

        let job = Arc::new(Job {
            id: self.next_id,
            availability: merge_time_intervals(intervals),
            duration,
        });
        self.next_id += 1;
        self.jobs.push(Arc::clone(&job));
        Ok(job)
    }

    pub fn jobs(&self) -> &[Arc<Job>] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Sum of all job durations.
    pub fn total_duration(&self) -> Time {
        self.jobs.iter().map(|j| j.duration()).sum()
    }

    /// True if every job has duration 1.
    pub fn is_unit(&self) -> bool {
        self.jobs.iter().all(|j| j.is_unit())
    }
}

/// The processing time assigned to one job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSchedule {
    pub job: Arc<Job>,
    pub execution_intervals: Vec<TimeInterval>,
}

impl JobSchedule {
    pub fn new(job: Arc<Job>, execution_intervals: Vec<TimeInterval>) -> Self {
        Self {
            job,
            execution_intervals: merge_time_intervals(execution_intervals),
        }
    }

    /// Schedule that executes `job` at exactly one timestamp.
    pub fn single(job: Arc<Job>, t: Time) -> Self {
        Self {
            job,
            execution_intervals: vec![TimeInterval::new(t, t)],
        }
    }

    pub fn execution_start(&self) -> Option<Time> {
        self.execution_intervals.first().map(|i| i.start)
    }

    pub fn execution_end(&self) -> Option<Time> {
        self.execution_intervals.last().map(|i| i.end)
    }

    /// Number of timestamps the job executes at.
    pub fn executed_time(&self) -> Time {
        covered_time(&self.execution_intervals)
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Time> + '_ {
        self.execution_intervals
            .iter()
            .flat_map(TimeInterval::timestamps)
    }
}

impl PartialEq for JobSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for JobSchedule {}

impl PartialOrd for JobSchedule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JobSchedule {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.execution_start(), self.execution_end(), self.job.id()).cmp(&(
            other.execution_start(),
            other.execution_end(),
            other.job.id(),
        ))
    }
}

impl Hash for JobSchedule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.job.id().hash(state);
    }
}

/// Result of a scheduler run.
///
/// Feasibility is all-or-nothing: when `all_jobs_scheduled` is false both optional
/// fields are `None`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub all_jobs_scheduled: bool,
    pub active_time_intervals: Option<Vec<TimeInterval>>,
    pub job_schedules: Option<Vec<JobSchedule>>,
}

impl Schedule {
    pub fn infeasible() -> Self {
        Self {
            all_jobs_scheduled: false,
            active_time_intervals: None,
            job_schedules: None,
        }
    }

    /// Build a feasible schedule. Active intervals are merged and job schedules sorted.
    pub fn feasible(
        active_time_intervals: Vec<TimeInterval>,
        mut job_schedules: Vec<JobSchedule>,
    ) -> Self {
        job_schedules.sort();
        Self {
            all_jobs_scheduled: true,
            active_time_intervals: Some(merge_time_intervals(active_time_intervals)),
            job_schedules: Some(job_schedules),
        }
    }

    /// Total number of active timestamps, `None` when infeasible.
    pub fn active_time(&self) -> Option<Time> {
        self.active_time_intervals.as_deref().map(covered_time)
    }
}
