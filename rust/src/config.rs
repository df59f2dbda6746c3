//! Configuration types for the scheduling system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::flow::FlowMethod;
use crate::logging::VERBOSITY_SILENT;
use crate::scheduler::{
    BruteForceScheduler, FlowIntervalScheduler, FlowScheduler,
    LinearProgrammingArbitraryPreemptionScheduler, LinearProgrammingRoundedScheduler,
    MatchingScheduler, Scheduler, SchedulerError, UnitJobsScheduler, UnitJobsVariant,
    UpperDegreeConstrainedSubgraphScheduler,
};

/// Order in which the flow scheduler tries to close time slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOrdering {
    /// Left to right.
    #[default]
    Increasing,
    /// Seeded random permutation.
    Shuffled { seed: u64 },
    /// Slots with the fewest available jobs first, ties by time.
    DensityFirst,
}

/// Post-processing applied after greedy elimination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Optimization {
    #[default]
    None,
    /// Replace two active slots by one inactive slot while feasibility holds.
    LocalSearch,
}

/// Configuration shared by all schedulers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max-flow algorithm used for feasibility checks
    pub flow_method: FlowMethod,
    /// Slot elimination order for the flow scheduler
    pub time_ordering: TimeOrdering,
    /// Optimization hook run after elimination
    pub optimization: Optimization,
    /// Logging verbosity (see `logging`)
    pub verbosity: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            flow_method: FlowMethod::default(),
            time_ordering: TimeOrdering::default(),
            optimization: Optimization::default(),
            verbosity: VERBOSITY_SILENT,
        }
    }
}

impl SchedulerConfig {
    pub fn new(
        flow_method: Option<FlowMethod>,
        time_ordering: Option<TimeOrdering>,
        optimization: Option<Optimization>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            flow_method: flow_method.unwrap_or(defaults.flow_method),
            time_ordering: time_ordering.unwrap_or(defaults.time_ordering),
            optimization: optimization.unwrap_or(defaults.optimization),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }
}

/// Every available strategy, addressable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerKind {
    BruteForce,
    Flow,
    FlowInterval,
    Matching,
    UpperDegreeConstrainedSubgraph,
    LinearProgrammingArbitraryPreemption,
    LinearProgrammingRounded,
    UnitJobsNLogN,
    UnitJobsT,
}

impl SchedulerKind {
    pub const ALL: [SchedulerKind; 9] = [
        SchedulerKind::BruteForce,
        SchedulerKind::Flow,
        SchedulerKind::FlowInterval,
        SchedulerKind::Matching,
        SchedulerKind::UpperDegreeConstrainedSubgraph,
        SchedulerKind::LinearProgrammingArbitraryPreemption,
        SchedulerKind::LinearProgrammingRounded,
        SchedulerKind::UnitJobsNLogN,
        SchedulerKind::UnitJobsT,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SchedulerKind::BruteForce => "BruteForceScheduler",
            SchedulerKind::Flow => "FlowScheduler",
            SchedulerKind::FlowInterval => "FlowIntervalScheduler",
            SchedulerKind::Matching => "MatchingScheduler",
            SchedulerKind::UpperDegreeConstrainedSubgraph => "UpperDegreeConstrainedSubgraphScheduler",
            SchedulerKind::LinearProgrammingArbitraryPreemption => {
                "LinearProgrammingArbitraryPreemptionScheduler"
            }
            SchedulerKind::LinearProgrammingRounded => "LinearProgrammingRoundedScheduler",
            SchedulerKind::UnitJobsNLogN => "UnitJobsSchedulerNLogN",
            SchedulerKind::UnitJobsT => "UnitJobsSchedulerT",
        }
    }

    /// Instantiate the strategy with `config`.
    pub fn build(self, config: SchedulerConfig) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::BruteForce => Box::new(BruteForceScheduler::new(config)),
            SchedulerKind::Flow => Box::new(FlowScheduler::new(config)),
            SchedulerKind::FlowInterval => Box::new(FlowIntervalScheduler::new(config)),
            SchedulerKind::Matching => Box::new(MatchingScheduler::new(config)),
            SchedulerKind::UpperDegreeConstrainedSubgraph => {
                Box::new(UpperDegreeConstrainedSubgraphScheduler::new(config))
            }
            SchedulerKind::LinearProgrammingArbitraryPreemption => {
                Box::new(LinearProgrammingArbitraryPreemptionScheduler::new(config))
            }
            SchedulerKind::LinearProgrammingRounded => {
                Box::new(LinearProgrammingRoundedScheduler::new(config))
            }
            SchedulerKind::UnitJobsNLogN => {
                Box::new(UnitJobsScheduler::new(UnitJobsVariant::NLogN, config))
            }
            SchedulerKind::UnitJobsT => Box::new(UnitJobsScheduler::new(UnitJobsVariant::T, config)),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Batch files name the unit-job scheduler without its variant; it is the horizon sweep.
        if s == "UnitJobsScheduler" {
            return Ok(SchedulerKind::UnitJobsT);
        }
        SchedulerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SchedulerError::UnknownScheduler(s.to_string()))
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
