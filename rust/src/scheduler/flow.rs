//! Greedy slot elimination over a time-expanded flow network.
//!
//! Network layout: source, one node per job, one node per timeline slot, sink.
//! `source -> job` carries the job's duration, `job -> slot` carries 1 while the slot is
//! open, `slot -> sink` carries the concurrency bound. All jobs are served iff the max flow
//! equals the total duration.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

use crate::config::{Optimization, SchedulerConfig, TimeOrdering};
use crate::flow::{Capacity, FlowMethod, FlowNetwork, FlowSolution, NodeIndex};
use crate::interval::merge_timestamps;
use crate::models::{Job, JobSchedule, Schedule};
use crate::timeline::{SlotIndex, Timeline};
use crate::{log_changes, log_checks, log_debug};

use super::core::{
    concurrency_capacity, schedule_from_job_schedules, total_duration, Scheduler, SchedulerError,
};

/// Jobs-by-slots flow network whose slots can be opened and closed in place.
#[derive(Clone, Debug)]
pub(crate) struct TimeExpandedNetwork<'a> {
    jobs: &'a [Arc<Job>],
    timeline: Timeline,
    network: FlowNetwork,
    /// Positions of the jobs available at each slot
    slot_jobs: Vec<Vec<usize>>,
    open: Vec<bool>,
    demand: Capacity,
    method: FlowMethod,
}

impl<'a> TimeExpandedNetwork<'a> {
    /// Build with every slot closed.
    pub(crate) fn new(
        jobs: &'a [Arc<Job>],
        timeline: Timeline,
        max_concurrency: usize,
        method: FlowMethod,
    ) -> Self {
        let n = jobs.len();
        let slots = timeline.len();
        let mut network = FlowNetwork::new(n + slots + 2);
        let mut slot_jobs = vec![Vec::new(); slots];

        for (j, job) in jobs.iter().enumerate() {
            network.add_edge(0, 1 + j, job.duration());
            for slot in timeline.slots_of(job) {
                slot_jobs[slot].push(j);
            }
        }
        let bound = concurrency_capacity(jobs, max_concurrency);
        for slot in 0..slots {
            network.add_edge(1 + n + slot, 1 + n + slots, bound);
        }

        Self {
            jobs,
            timeline,
            network,
            slot_jobs,
            open: vec![false; slots],
            demand: total_duration(jobs),
            method,
        }
    }

    /// Build with every slot open.
    pub(crate) fn fully_open(
        jobs: &'a [Arc<Job>],
        timeline: Timeline,
        max_concurrency: usize,
        method: FlowMethod,
    ) -> Self {
        let mut network = Self::new(jobs, timeline, max_concurrency, method);
        for slot in 0..network.slot_count() {
            network.open_slot(slot);
        }
        network
    }

    fn source(&self) -> NodeIndex {
        0
    }

    fn job_node(&self, j: usize) -> NodeIndex {
        1 + j
    }

    fn slot_node(&self, slot: SlotIndex) -> NodeIndex {
        1 + self.jobs.len() + slot
    }

    fn sink(&self) -> NodeIndex {
        1 + self.jobs.len() + self.timeline.len()
    }

    pub(crate) fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.timeline.len()
    }

    /// Number of jobs that may run at `slot`.
    pub(crate) fn slot_load(&self, slot: SlotIndex) -> usize {
        self.slot_jobs[slot].len()
    }

    pub(crate) fn is_open(&self, slot: SlotIndex) -> bool {
        self.open[slot]
    }

    pub(crate) fn open_slots(&self) -> Vec<SlotIndex> {
        (0..self.slot_count()).filter(|&s| self.open[s]).collect()
    }

    pub(crate) fn open_slot(&mut self, slot: SlotIndex) {
        if self.open[slot] {
            return;
        }
        let target = self.slot_node(slot);
        for &j in &self.slot_jobs[slot] {
            self.network.add_edge(1 + j, target, 1);
        }
        self.open[slot] = true;
    }

    pub(crate) fn close_slot(&mut self, slot: SlotIndex) {
        if !self.open[slot] {
            return;
        }
        let target = self.slot_node(slot);
        for &j in &self.slot_jobs[slot] {
            self.network.remove_edge(1 + j, target);
        }
        self.open[slot] = false;
    }

    pub(crate) fn flow(&self) -> FlowSolution {
        self.network.max_flow(self.source(), self.sink(), self.method)
    }

    /// Whether the open slots can serve every job.
    pub(crate) fn is_feasible(&self) -> bool {
        self.network.max_flow_value(self.source(), self.sink(), self.method) >= self.demand
    }

    /// Close `slot` if the remaining slots stay feasible. Returns whether it was closed.
    pub(crate) fn try_close(&mut self, slot: SlotIndex) -> bool {
        if !self.open[slot] {
            return false;
        }
        self.close_slot(slot);
        if self.is_feasible() {
            true
        } else {
            self.open_slot(slot);
            false
        }
    }

    /// Per-job execution intervals read off the saturated job-to-slot arcs of `flow`.
    pub(crate) fn job_schedules(&self, flow: &FlowSolution) -> Vec<JobSchedule> {
        self.jobs
            .iter()
            .enumerate()
            .map(|(j, job)| {
                let timestamps = self
                    .timeline
                    .slots_of(job)
                    .filter(|&slot| flow.flow(self.job_node(j), self.slot_node(slot)) > 0)
                    .map(|slot| self.timeline.time(slot));
                JobSchedule::new(Arc::clone(job), merge_timestamps(timestamps))
            })
            .collect()
    }

    /// Schedule for the current open slots, or `None` when they are infeasible.
    pub(crate) fn schedule(&self) -> Option<Schedule> {
        let flow = self.flow();
        if flow.value < self.demand {
            return None;
        }
        Some(schedule_from_job_schedules(self.job_schedules(&flow)))
    }
}

/// Order in which slots are offered for closing.
pub(crate) fn slot_ordering(network: &TimeExpandedNetwork<'_>, ordering: TimeOrdering) -> Vec<SlotIndex> {
    let mut slots: Vec<SlotIndex> = (0..network.slot_count()).collect();
    match ordering {
        TimeOrdering::Increasing => {}
        TimeOrdering::Shuffled { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            slots.shuffle(&mut rng);
        }
        TimeOrdering::DensityFirst => {
            slots.sort_by_key(|&s| (network.slot_load(s), s));
        }
    }
    slots
}

/// Close slots in `order`, keeping each closure only if all jobs still fit.
pub(crate) fn eliminate_slots(network: &mut TimeExpandedNetwork<'_>, order: &[SlotIndex], verbosity: u8) {
    for &slot in order {
        let t = network.timeline().time(slot);
        if network.try_close(slot) {
            log_checks!(verbosity, "  Closed t={}", t);
        } else {
            log_checks!(verbosity, "  Kept t={} (needed)", t);
        }
    }
}

/// Greedy slot elimination with a configurable ordering and optional local search.
#[derive(Clone, Debug, Default)]
pub struct FlowScheduler {
    config: SchedulerConfig,
}

impl FlowScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Repeatedly trade two open slots for one closed slot while all jobs still fit.
    fn local_search(&self, network: &mut TimeExpandedNetwork<'_>) {
        let verbosity = self.config.verbosity;
        while let Some((a, b, c)) = self.find_exchange(network) {
            log_changes!(
                verbosity,
                "  Local search: closed t={}, t={}, opened t={}",
                network.timeline().time(a),
                network.timeline().time(b),
                network.timeline().time(c)
            );
        }

        let open = network.open_slots();
        eliminate_slots(network, &open, verbosity);
    }

    /// Apply the first improving exchange found, if any.
    fn find_exchange(&self, network: &mut TimeExpandedNetwork<'_>) -> Option<(SlotIndex, SlotIndex, SlotIndex)> {
        let open = network.open_slots();
        let closed: Vec<SlotIndex> = (0..network.slot_count()).filter(|&s| !network.is_open(s)).collect();

        for (i, &a) in open.iter().enumerate() {
            for &b in &open[i + 1..] {
                network.close_slot(a);
                network.close_slot(b);
                for &c in &closed {
                    network.open_slot(c);
                    if network.is_feasible() {
                        return Some((a, b, c));
                    }
                    network.close_slot(c);
                }
                network.open_slot(a);
                network.open_slot(b);
            }
        }
        None
    }
}

impl Scheduler for FlowScheduler {
    fn name(&self) -> &'static str {
        "FlowScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let verbosity = self.config.verbosity;
        let mut network = TimeExpandedNetwork::fully_open(
            jobs,
            Timeline::covering(jobs),
            max_concurrency,
            self.config.flow_method,
        );
        log_debug!(
            verbosity,
            "FlowScheduler: {} jobs, {} slots, demand {}",
            jobs.len(),
            network.slot_count(),
            total_duration(jobs)
        );

        if !network.is_feasible() {
            log_changes!(verbosity, "FlowScheduler: infeasible with every slot open");
            return Ok(Schedule::infeasible());
        }

        let order = slot_ordering(&network, self.config.time_ordering);
        eliminate_slots(&mut network, &order, verbosity);
        if self.config.optimization == Optimization::LocalSearch {
            self.local_search(&mut network);
        }

        let schedule = network.schedule().ok_or_else(|| {
            SchedulerError::Invariant("open slots became infeasible after elimination".to_string())
        })?;
        log_changes!(
            verbosity,
            "FlowScheduler: active time {}",
            schedule.active_time().unwrap_or(0)
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPool, TimeInterval};
    use crate::test_support::{assert_feasible_schedule, scenario_a};

    #[test]
    fn test_network_open_and_close() {
        let mut pool = JobPool::new();
        pool.add_job(0, 2, 2).unwrap();
        pool.add_job(1, 1, 1).unwrap();

        let mut network =
            TimeExpandedNetwork::new(pool.jobs(), Timeline::covering(pool.jobs()), 1, FlowMethod::Dinic);
        assert!(!network.is_feasible());

        for slot in 0..3 {
            network.open_slot(slot);
        }
        assert!(network.is_feasible());
        assert_eq!(network.slot_load(1), 2);

        // The unit job pins t=1
        assert!(!network.try_close(1));
        assert!(network.is_open(1));
        assert!(!network.try_close(0));
        assert!(!network.try_close(2));
    }

    #[test]
    fn test_infeasible_when_window_too_short() {
        let mut pool = JobPool::new();
        pool.add_job(3, 4, 3).unwrap();

        let schedule = FlowScheduler::default().process(pool.jobs(), 5).unwrap();
        assert_eq!(schedule, Schedule::infeasible());
    }

    #[test]
    fn test_tight_example() {
        let pool = scenario_a();
        let schedule = FlowScheduler::default().process(pool.jobs(), 10).unwrap();

        assert_feasible_schedule(pool.jobs(), 10, &schedule);
        assert_eq!(schedule.active_time(), Some(20));
    }

    #[test]
    fn test_shared_slot_for_overlapping_jobs() {
        let mut pool = JobPool::new();
        pool.add_job(0, 5, 2).unwrap();
        pool.add_job(2, 9, 2).unwrap();

        let schedule = FlowScheduler::default().process(pool.jobs(), 2).unwrap();
        assert_feasible_schedule(pool.jobs(), 2, &schedule);
        assert_eq!(schedule.active_time(), Some(2));
    }

    #[test]
    fn test_orderings_and_local_search_stay_feasible() {
        let mut pool = JobPool::new();
        pool.add_job(0, 6, 3).unwrap();
        pool.add_job(1, 3, 1).unwrap();
        pool.add_job(4, 8, 2).unwrap();
        pool.add_job_with_intervals(vec![TimeInterval::new(0, 1), TimeInterval::new(7, 8)], 2)
            .unwrap();

        let orderings = [
            TimeOrdering::Increasing,
            TimeOrdering::Shuffled { seed: 42 },
            TimeOrdering::DensityFirst,
        ];
        for ordering in orderings {
            for optimization in [Optimization::None, Optimization::LocalSearch] {
                let config = SchedulerConfig::new(None, Some(ordering), Some(optimization), None);
                let schedule = FlowScheduler::new(config).process(pool.jobs(), 2).unwrap();
                assert_feasible_schedule(pool.jobs(), 2, &schedule);
            }
        }
    }

    #[test]
    fn test_local_search_never_worsens() {
        let pool = scenario_a();
        let plain = SchedulerConfig::new(None, Some(TimeOrdering::DensityFirst), None, None);
        let searched = SchedulerConfig::new(
            None,
            Some(TimeOrdering::DensityFirst),
            Some(Optimization::LocalSearch),
            None,
        );

        let a = FlowScheduler::new(plain).process(pool.jobs(), 10).unwrap();
        let b = FlowScheduler::new(searched).process(pool.jobs(), 10).unwrap();
        assert_feasible_schedule(pool.jobs(), 10, &b);
        assert!(b.active_time().unwrap() <= a.active_time().unwrap());
    }

    #[test]
    fn test_local_search_trades_two_slots_for_one_at_any_bound() {
        let mut pool = JobPool::new();
        pool.add_job_with_intervals(vec![TimeInterval::new(0, 0), TimeInterval::new(2, 2)], 1)
            .unwrap();
        pool.add_job_with_intervals(vec![TimeInterval::new(1, 1), TimeInterval::new(2, 2)], 1)
            .unwrap();

        let mut network =
            TimeExpandedNetwork::new(pool.jobs(), Timeline::covering(pool.jobs()), 3, FlowMethod::default());
        network.open_slot(0);
        network.open_slot(1);
        // Neither slot can be closed on its own
        eliminate_slots(&mut network, &[0, 1], 0);
        assert_eq!(network.open_slots(), vec![0, 1]);

        FlowScheduler::default().local_search(&mut network);
        assert_eq!(network.open_slots(), vec![2]);
        assert_feasible_schedule(pool.jobs(), 3, &network.schedule().unwrap());
    }

    #[test]
    fn test_density_first_ordering() {
        let mut pool = JobPool::new();
        pool.add_job(0, 2, 1).unwrap();
        pool.add_job(1, 2, 1).unwrap();
        pool.add_job(2, 2, 1).unwrap();

        let network =
            TimeExpandedNetwork::fully_open(pool.jobs(), Timeline::covering(pool.jobs()), 1, FlowMethod::default());
        assert_eq!(slot_ordering(&network, TimeOrdering::DensityFirst), vec![0, 1, 2]);
        assert_eq!(slot_ordering(&network, TimeOrdering::Increasing), vec![0, 1, 2]);

        let mut shuffled = slot_ordering(&network, TimeOrdering::Shuffled { seed: 7 });
        shuffled.sort_unstable();
        assert_eq!(shuffled, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_input() {
        let schedule = FlowScheduler::default().process(&[], 3).unwrap();
        assert!(schedule.all_jobs_scheduled);
        assert_eq!(schedule.active_time_intervals, Some(vec![]));
        assert_eq!(schedule.job_schedules, Some(vec![]));
    }
}
