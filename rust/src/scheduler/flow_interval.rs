//! Slot elimination over elementary intervals instead of single timestamps.
//!
//! The window boundaries of all jobs cut the time axis into elementary intervals. Every
//! timestamp inside one interval sees the same set of available jobs, so an interval is a
//! single flow node whose capacity scales with the number of timestamps retained in it.
//! A binary search per interval finds how many of its timestamps can be dropped.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::flow::{Capacity, FlowNetwork, FlowSolution};
use crate::interval::merge_time_intervals;
use crate::models::{Job, JobSchedule, Schedule, Time, TimeInterval};
use crate::logging::verdict;
use crate::{log_changes, log_checks, log_debug};

use super::core::{concurrency_capacity, total_duration, Scheduler, SchedulerError};

/// Elementary intervals between consecutive window boundaries.
pub(crate) fn elementary_intervals(jobs: &[Arc<Job>]) -> Vec<TimeInterval> {
    let mut breakpoints: Vec<Time> = jobs
        .iter()
        .flat_map(|job| job.availability().iter().flat_map(|w| [w.start, w.end + 1]))
        .collect();
    breakpoints.sort_unstable();
    breakpoints.dedup();

    breakpoints
        .windows(2)
        .map(|pair| TimeInterval::new(pair[0], pair[1] - 1))
        .collect()
}

struct IntervalNetwork<'a> {
    jobs: &'a [Arc<Job>],
    intervals: Vec<TimeInterval>,
    /// Positions of the jobs available during each whole interval
    eligible: Vec<Vec<usize>>,
    retained: Vec<Time>,
    network: FlowNetwork,
    max_concurrency: Capacity,
    config: &'a SchedulerConfig,
}

impl<'a> IntervalNetwork<'a> {
    fn new(jobs: &'a [Arc<Job>], max_concurrency: usize, config: &'a SchedulerConfig) -> Self {
        let intervals = elementary_intervals(jobs);
        let eligible = intervals
            .iter()
            .map(|interval| {
                (0..jobs.len())
                    .filter(|&j| jobs[j].is_available_during(interval))
                    .collect()
            })
            .collect();

        let mut network = FlowNetwork::new(jobs.len() + intervals.len() + 2);
        for (j, job) in jobs.iter().enumerate() {
            network.add_edge(0, 1 + j, job.duration());
        }

        let mut this = Self {
            jobs,
            retained: vec![0; intervals.len()],
            intervals,
            eligible,
            network,
            max_concurrency: concurrency_capacity(jobs, max_concurrency),
            config,
        };
        for i in 0..this.intervals.len() {
            this.set_retained(i, this.intervals[i].duration());
        }
        this
    }

    fn interval_node(&self, i: usize) -> usize {
        1 + self.jobs.len() + i
    }

    fn sink(&self) -> usize {
        1 + self.jobs.len() + self.intervals.len()
    }

    /// Keep `length` timestamps of interval `i`.
    fn set_retained(&mut self, i: usize, length: Time) {
        let node = self.interval_node(i);
        for &j in &self.eligible[i] {
            self.network.add_edge(1 + j, node, length);
        }
        let sink = self.sink();
        self.network.add_edge(node, sink, self.max_concurrency.saturating_mul(length));
        self.retained[i] = length;
    }

    fn flow(&self) -> FlowSolution {
        self.network.max_flow(0, self.sink(), self.config.flow_method)
    }

    fn is_feasible(&self) -> bool {
        self.flow().value >= total_duration(self.jobs)
    }

    /// Drop as many timestamps from the end of interval `i` as feasibility allows.
    fn shrink(&mut self, i: usize) {
        let length = self.intervals[i].duration();
        // `left` timestamps can always be dropped, `right` never
        let (mut left, mut right) = (0, length + 1);
        while right - left > 1 {
            let middle = (left + right) / 2;
            self.set_retained(i, length - middle);
            let feasible = self.is_feasible();
            log_checks!(
                self.config.verbosity,
                "  Interval {}: dropping {} of {} -> {}",
                self.intervals[i],
                middle,
                length,
                verdict(feasible)
            );
            if feasible {
                left = middle;
            } else {
                right = middle;
            }
        }
        self.set_retained(i, length - left);
    }

    /// Lay each interval's flow out by wrap-around over its retained prefix.
    ///
    /// No job receives more than the retained length in one interval, so a job never
    /// occupies the same timestamp twice and at most `max_concurrency` jobs share one.
    fn job_schedules(&self, flow: &FlowSolution) -> Vec<JobSchedule> {
        let mut pieces: Vec<Vec<TimeInterval>> = vec![Vec::new(); self.jobs.len()];

        for (i, interval) in self.intervals.iter().enumerate() {
            let length = self.retained[i];
            if length == 0 {
                continue;
            }
            let mut cursor: Time = 0;
            for &j in &self.eligible[i] {
                let amount = flow.flow(1 + j, self.interval_node(i));
                if amount == 0 {
                    continue;
                }
                let from = cursor % length;
                let to = from + amount;
                if to <= length {
                    pieces[j].push(TimeInterval::new(interval.start + from, interval.start + to - 1));
                } else {
                    pieces[j].push(TimeInterval::new(interval.start + from, interval.start + length - 1));
                    pieces[j].push(TimeInterval::new(interval.start, interval.start + to - length - 1));
                }
                cursor += amount;
            }
        }

        self.jobs
            .iter()
            .zip(pieces)
            .map(|(job, intervals)| JobSchedule::new(Arc::clone(job), intervals))
            .collect()
    }
}

/// Greedy elimination on elementary intervals with per-interval binary search.
#[derive(Clone, Debug, Default)]
pub struct FlowIntervalScheduler {
    config: SchedulerConfig,
}

impl FlowIntervalScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }
}

impl Scheduler for FlowIntervalScheduler {
    fn name(&self) -> &'static str {
        "FlowIntervalScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let verbosity = self.config.verbosity;
        let mut network = IntervalNetwork::new(jobs, max_concurrency, &self.config);
        log_debug!(
            verbosity,
            "FlowIntervalScheduler: {} jobs, {} elementary intervals",
            jobs.len(),
            network.intervals.len()
        );

        if !network.is_feasible() {
            log_changes!(verbosity, "FlowIntervalScheduler: infeasible with every interval open");
            return Ok(Schedule::infeasible());
        }

        for i in 0..network.intervals.len() {
            network.shrink(i);
        }

        let flow = network.flow();
        if flow.value < total_duration(jobs) {
            return Err(SchedulerError::Invariant(
                "retained intervals became infeasible after shrinking".to_string(),
            ));
        }

        let job_schedules = network.job_schedules(&flow);
        let active = merge_time_intervals(
            job_schedules
                .iter()
                .flat_map(|s| s.execution_intervals.iter().copied())
                .collect(),
        );
        let schedule = Schedule::feasible(active, job_schedules);
        log_changes!(
            verbosity,
            "FlowIntervalScheduler: active time {}",
            schedule.active_time().unwrap_or(0)
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobPool;
    use crate::test_support::{assert_feasible_schedule, scenario_a};

    #[test]
    fn test_elementary_intervals() {
        let mut pool = JobPool::new();
        pool.add_job(0, 4, 1).unwrap();
        pool.add_job(2, 7, 1).unwrap();
        pool.add_job(10, 11, 1).unwrap();

        assert_eq!(
            elementary_intervals(pool.jobs()),
            vec![
                TimeInterval::new(0, 1),
                TimeInterval::new(2, 4),
                TimeInterval::new(5, 7),
                TimeInterval::new(8, 9),
                TimeInterval::new(10, 11),
            ]
        );
    }

    #[test]
    fn test_tight_example() {
        let pool = scenario_a();
        let schedule = FlowIntervalScheduler::default().process(pool.jobs(), 10).unwrap();

        assert_feasible_schedule(pool.jobs(), 10, &schedule);
        assert_eq!(schedule.active_time(), Some(20));
    }

    #[test]
    fn test_wrap_around_respects_concurrency() {
        // Three jobs of length 2 in a window of 3 with capacity 2 forces wrap-around
        let mut pool = JobPool::new();
        for _ in 0..3 {
            pool.add_job(0, 2, 2).unwrap();
        }

        let schedule = FlowIntervalScheduler::default().process(pool.jobs(), 2).unwrap();
        assert_feasible_schedule(pool.jobs(), 2, &schedule);
        assert_eq!(schedule.active_time(), Some(3));
    }

    #[test]
    fn test_infeasible() {
        let mut pool = JobPool::new();
        pool.add_job(0, 1, 2).unwrap();
        pool.add_job(0, 1, 2).unwrap();

        let schedule = FlowIntervalScheduler::default().process(pool.jobs(), 1).unwrap();
        assert!(!schedule.all_jobs_scheduled);
        assert!(schedule.job_schedules.is_none());
    }

    #[test]
    fn test_multi_interval_job() {
        let mut pool = JobPool::new();
        pool.add_job_with_intervals(vec![TimeInterval::new(0, 1), TimeInterval::new(5, 6)], 3)
            .unwrap();
        pool.add_job(5, 6, 1).unwrap();

        let schedule = FlowIntervalScheduler::default().process(pool.jobs(), 2).unwrap();
        assert_feasible_schedule(pool.jobs(), 2, &schedule);
        assert_eq!(schedule.active_time(), Some(3));
    }

    #[test]
    fn test_empty_input() {
        let schedule = FlowIntervalScheduler::default().process(&[], 1).unwrap();
        assert!(schedule.all_jobs_scheduled);
        assert_eq!(schedule.active_time(), Some(0));
    }
}
