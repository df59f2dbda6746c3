//! Exact schedulers for concurrency at most 2, built on maximum matching.
//!
//! With `max_concurrency = 2` each slot is modelled so that an empty slot contributes one
//! more matched edge than a used slot. A maximum matching that keeps every job served
//! therefore empties as many slots as possible. Both schedulers run two phases: the first
//! serves the jobs, the second adds the slot gadgets and grows the first matching.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::dcs::DegreeConstrainedSubgraph;
use crate::interval::merge_timestamps;
use crate::matching::{max_matching, Graph};
use crate::models::{Job, JobSchedule, Schedule};
use crate::timeline::Timeline;
use crate::{log_changes, log_debug};

use super::core::{require_unit_jobs, schedule_from_job_schedules, Scheduler, SchedulerError};

fn require_small_concurrency(scheduler: &'static str, max_concurrency: usize) -> Result<(), SchedulerError> {
    if max_concurrency > 2 {
        return Err(SchedulerError::Unsupported {
            scheduler,
            reason: format!("max concurrency {} is above 2", max_concurrency),
        });
    }
    Ok(())
}

/// Unit jobs against slot copies.
///
/// Job `j` is vertex `j`; copy `c` of slot `s` is vertex `n + B * s + c`. The second phase
/// joins the two copies of every slot.
#[derive(Clone, Debug, Default)]
pub struct MatchingScheduler {
    config: SchedulerConfig,
}

impl MatchingScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }
}

impl Scheduler for MatchingScheduler {
    fn name(&self) -> &'static str {
        "MatchingScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        require_unit_jobs(self.name(), jobs)?;
        require_small_concurrency(self.name(), max_concurrency)?;

        let verbosity = self.config.verbosity;
        let n = jobs.len();
        let copies = max_concurrency;
        let timeline = Timeline::covering(jobs);
        let copy_vertex = |slot: usize, copy: usize| n + copies * slot + copy;

        let mut graph = Graph::new(n + copies * timeline.len());
        for (j, job) in jobs.iter().enumerate() {
            for slot in timeline.slots_of(job) {
                for copy in 0..copies {
                    graph.add_edge(j, copy_vertex(slot, copy));
                }
            }
        }
        let mut matching = max_matching(&graph, None)?;
        log_debug!(
            verbosity,
            "MatchingScheduler: phase one matched {} of {} jobs",
            matching.len(),
            n
        );

        if copies == 2 {
            for slot in 0..timeline.len() {
                graph.add_edge(copy_vertex(slot, 0), copy_vertex(slot, 1));
            }
            matching = max_matching(&graph, Some(&matching))?;
        }

        let mut job_schedules = Vec::with_capacity(n);
        for (j, job) in jobs.iter().enumerate() {
            match matching.mate(j) {
                Some(vertex) if vertex >= n => {
                    let slot = (vertex - n) / copies;
                    job_schedules.push(JobSchedule::single(Arc::clone(job), timeline.time(slot)));
                }
                _ => {
                    log_changes!(verbosity, "MatchingScheduler: job {} cannot be served", job.id());
                    return Ok(Schedule::infeasible());
                }
            }
        }

        let schedule = schedule_from_job_schedules(job_schedules);
        log_changes!(
            verbosity,
            "MatchingScheduler: active time {}",
            schedule.active_time().unwrap_or(0)
        );
        Ok(schedule)
    }
}

/// Jobs of any length through an upper degree-constrained subgraph.
///
/// Job `j` is vertex `j` with bound equal to its duration. Slot `s` is vertex `n + 3s` with
/// bound `B`, plus two helper vertices `n + 3s + 1` and `n + 3s + 2` of bound 1. For `B = 2`
/// the second phase joins the three slot vertices into a triangle.
#[derive(Clone, Debug, Default)]
pub struct UpperDegreeConstrainedSubgraphScheduler {
    config: SchedulerConfig,
}

impl UpperDegreeConstrainedSubgraphScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }
}

impl Scheduler for UpperDegreeConstrainedSubgraphScheduler {
    fn name(&self) -> &'static str {
        "UpperDegreeConstrainedSubgraphScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        require_small_concurrency(self.name(), max_concurrency)?;

        let verbosity = self.config.verbosity;
        let n = jobs.len();
        let timeline = Timeline::covering(jobs);
        let slot_vertex = |slot: usize| n + 3 * slot;

        let mut bounds = Vec::with_capacity(n + 3 * timeline.len());
        for job in jobs {
            let bound = usize::try_from(job.duration()).map_err(|_| {
                SchedulerError::InvalidJob(format!("job {} has negative duration", job.id()))
            })?;
            bounds.push(bound);
        }
        for _ in 0..timeline.len() {
            bounds.extend([max_concurrency, 1, 1]);
        }

        let mut dcs = DegreeConstrainedSubgraph::new(bounds);
        for (j, job) in jobs.iter().enumerate() {
            for slot in timeline.slots_of(job) {
                dcs.add_edge(j, slot_vertex(slot))?;
            }
        }
        let mut matching = dcs.solve(None)?;

        if max_concurrency == 2 {
            for slot in 0..timeline.len() {
                let s = slot_vertex(slot);
                dcs.add_edge(s, s + 1)?;
                dcs.add_edge(s + 1, s + 2)?;
                dcs.add_edge(s + 2, s)?;
            }
            matching = dcs.solve(Some(&matching))?;
        }
        log_debug!(
            verbosity,
            "UpperDegreeConstrainedSubgraphScheduler: gadget has {} vertices, {} edges",
            dcs.gadget().vertex_count(),
            dcs.gadget().edge_count()
        );

        let subgraph = dcs.subgraph(&matching)?;
        let mut job_schedules = Vec::with_capacity(n);
        for (j, job) in jobs.iter().enumerate() {
            if subgraph.degree(j) != dcs.bound(j) {
                log_changes!(
                    verbosity,
                    "UpperDegreeConstrainedSubgraphScheduler: job {} gets {} of {}",
                    job.id(),
                    subgraph.degree(j),
                    job.duration()
                );
                return Ok(Schedule::infeasible());
            }
            let timestamps = subgraph
                .neighbors(j)
                .iter()
                .map(|&vertex| timeline.time((vertex - n) / 3));
            job_schedules.push(JobSchedule::new(Arc::clone(job), merge_timestamps(timestamps)));
        }

        let schedule = schedule_from_job_schedules(job_schedules);
        log_changes!(
            verbosity,
            "UpperDegreeConstrainedSubgraphScheduler: active time {}",
            schedule.active_time().unwrap_or(0)
        );
        Ok(schedule)
    }
}
