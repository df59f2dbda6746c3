//! Schedulers driven by the LP relaxation in [`crate::lp`].

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::lp::{solve_lp, FractionalSolution, LpOutcome, EPSILON};
use crate::models::{Job, Schedule, Time};
use crate::timeline::{SlotIndex, Timeline};
use crate::{log_changes, log_checks, log_debug};

use super::core::{Scheduler, SchedulerError};
use super::flow::{eliminate_slots, TimeExpandedNetwork};

fn schedule_of(network: &TimeExpandedNetwork<'_>) -> Result<Schedule, SchedulerError> {
    network
        .schedule()
        .ok_or_else(|| SchedulerError::Invariant("selected slots cannot serve every job".to_string()))
}

/// Solves the relaxation and serves the jobs inside its support.
///
/// The integral schedule opens every slot with positive activity. Use
/// [`LinearProgrammingArbitraryPreemptionScheduler::solve_fractional`] for the fractional
/// activities themselves.
#[derive(Clone, Debug, Default)]
pub struct LinearProgrammingArbitraryPreemptionScheduler {
    config: SchedulerConfig,
}

impl LinearProgrammingArbitraryPreemptionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn solve_fractional(
        &self,
        jobs: &[Arc<Job>],
        max_concurrency: usize,
    ) -> Result<LpOutcome, SchedulerError> {
        solve_lp(jobs, max_concurrency)
    }
}

impl Scheduler for LinearProgrammingArbitraryPreemptionScheduler {
    fn name(&self) -> &'static str {
        "LinearProgrammingArbitraryPreemptionScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let verbosity = self.config.verbosity;
        let solution = match self.solve_fractional(jobs, max_concurrency)? {
            LpOutcome::Optimal(solution) => solution,
            LpOutcome::Infeasible => {
                log_changes!(verbosity, "{}: relaxation is infeasible", self.name());
                return Ok(Schedule::infeasible());
            }
        };
        log_debug!(
            verbosity,
            "{}: fractional active time {:.3}",
            self.name(),
            solution.total_activity()
        );

        let mut network = TimeExpandedNetwork::new(
            jobs,
            solution.timeline.clone(),
            max_concurrency,
            self.config.flow_method,
        );
        for (slot, &activity) in solution.activity.iter().enumerate() {
            if activity > EPSILON {
                network.open_slot(slot);
            }
        }
        if !network.is_feasible() {
            // Entries below tolerance were dropped
            for slot in 0..network.slot_count() {
                network.open_slot(slot);
            }
        }
        schedule_of(&network)
    }
}

/// Rounds the relaxation deadline by deadline and repairs the result with max flow.
#[derive(Clone, Debug, Default)]
pub struct LinearProgrammingRoundedScheduler {
    config: SchedulerConfig,
}

/// Open slots so that every deadline `d` has at least `ceil(activity up to d)` open slots at
/// or before it, choosing the latest slots first.
pub fn round_activity(solution: &FractionalSolution, jobs: &[Arc<Job>]) -> Vec<bool> {
    let timeline: &Timeline = &solution.timeline;
    let mut open = vec![false; timeline.len()];

    let mut deadlines: Vec<Time> = jobs.iter().map(|job| job.deadline()).collect();
    deadlines.sort_unstable();
    deadlines.dedup();

    for deadline in deadlines {
        let prefix = timeline.times().partition_point(|&t| t <= deadline);
        let activity: f64 = solution.activity[..prefix].iter().sum();
        let need = (activity - EPSILON).ceil().max(0.0) as usize;

        let mut opened = open[..prefix].iter().filter(|&&o| o).count();
        for slot in (0..prefix).rev() {
            if opened >= need {
                break;
            }
            if !open[slot] {
                open[slot] = true;
                opened += 1;
            }
        }
    }
    open
}

impl LinearProgrammingRoundedScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Keep the rounded slots, open everything else, then close the extra slots left to right.
    fn repair(&self, network: &mut TimeExpandedNetwork<'_>, rounded: &[bool]) {
        let added: Vec<SlotIndex> = (0..network.slot_count()).filter(|&s| !rounded[s]).collect();
        for &slot in &added {
            network.open_slot(slot);
        }
        eliminate_slots(network, &added, self.config.verbosity);
    }
}

impl Scheduler for LinearProgrammingRoundedScheduler {
    fn name(&self) -> &'static str {
        "LinearProgrammingRoundedScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let verbosity = self.config.verbosity;
        let solution = match solve_lp(jobs, max_concurrency)? {
            LpOutcome::Optimal(solution) => solution,
            LpOutcome::Infeasible => {
                log_changes!(verbosity, "{}: relaxation is infeasible", self.name());
                return Ok(Schedule::infeasible());
            }
        };

        let rounded = round_activity(&solution, jobs);
        let mut network = TimeExpandedNetwork::new(
            jobs,
            solution.timeline.clone(),
            max_concurrency,
            self.config.flow_method,
        );
        for slot in (0..rounded.len()).filter(|&s| rounded[s]) {
            network.open_slot(slot);
        }
        log_debug!(
            verbosity,
            "{}: lower bound {}, rounded to {} slots",
            self.name(),
            solution.lower_bound(),
            network.open_slots().len()
        );

        // At most ceil(LP) slots, so a feasible rounding is optimal
        if network.is_feasible() {
            return schedule_of(&network);
        }

        log_checks!(verbosity, "{}: rounding infeasible, repairing", self.name());
        self.repair(&mut network, &rounded);
        let repaired = schedule_of(&network)?;

        let mut greedy = TimeExpandedNetwork::fully_open(
            jobs,
            solution.timeline.clone(),
            max_concurrency,
            self.config.flow_method,
        );
        let order: Vec<SlotIndex> = (0..greedy.slot_count()).collect();
        eliminate_slots(&mut greedy, &order, verbosity);
        let greedy = schedule_of(&greedy)?;

        let schedule = if greedy.active_time() < repaired.active_time() {
            greedy
        } else {
            repaired
        };
        log_changes!(
            verbosity,
            "{}: active time {}",
            self.name(),
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
    fn test_round_activity_meets_prefix_demand() {
        let mut pool = JobPool::new();
        pool.add_job(0, 3, 1).unwrap();
        pool.add_job(0, 5, 1).unwrap();

        let solution = FractionalSolution {
            timeline: Timeline::covering(pool.jobs()),
            activity: vec![0.25, 0.25, 0.25, 0.25, 0.5, 0.0],
            execution: vec![Vec::new(); 2],
        };
        // ceil(1.0) = 1 by t=3, ceil(1.5) = 2 by t=5
        assert_eq!(
            round_activity(&solution, pool.jobs()),
            vec![false, false, false, true, false, true]
        );
    }

    #[test]
    fn test_preemption_scheduler() {
        let mut pool = JobPool::new();
        pool.add_job(0, 4, 2).unwrap();
        pool.add_job(2, 6, 3).unwrap();

        let scheduler = LinearProgrammingArbitraryPreemptionScheduler::default();
        let LpOutcome::Optimal(solution) = scheduler.solve_fractional(pool.jobs(), 2).unwrap() else {
            panic!("expected an optimal relaxation");
        };
        assert_eq!(solution.lower_bound(), 3);

        let schedule = scheduler.process(pool.jobs(), 2).unwrap();
        assert_feasible_schedule(pool.jobs(), 2, &schedule);
        assert!(schedule.active_time().unwrap() >= 3);
    }

    #[test]
    fn test_rounded_scheduler_tight_example() {
        let pool = scenario_a();
        let schedule = LinearProgrammingRoundedScheduler::default()
            .process(pool.jobs(), 10)
            .unwrap();

        assert_feasible_schedule(pool.jobs(), 10, &schedule);
        assert!(schedule.active_time().unwrap() <= 40);
    }

    #[test]
    fn test_infeasible() {
        let mut pool = JobPool::new();
        pool.add_job(0, 2, 3).unwrap();
        pool.add_job(0, 2, 3).unwrap();

        for scheduler in [
            &LinearProgrammingRoundedScheduler::default() as &dyn Scheduler,
            &LinearProgrammingArbitraryPreemptionScheduler::default(),
        ] {
            let schedule = scheduler.process(pool.jobs(), 1).unwrap();
            assert_eq!(schedule, Schedule::infeasible());
        }
    }

    #[test]
    fn test_empty_input() {
        let schedule = LinearProgrammingRoundedScheduler::default().process(&[], 1).unwrap();
        assert_eq!(schedule.active_time(), Some(0));
    }
}
