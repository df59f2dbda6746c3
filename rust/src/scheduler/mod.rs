//! Active-time scheduling strategies.
//!
//! Every strategy implements [`Scheduler`]: given jobs and a concurrency bound it either
//! returns a feasible schedule that tries to keep few timestamps active, or reports that
//! no feasible schedule exists.

mod brute_force;
mod core;
mod flow;
mod flow_interval;
mod linear_programming;
mod matching;
mod unit_jobs;

pub use self::brute_force::{BruteForceScheduler, MAX_BRUTE_FORCE_SLOTS};
pub use self::core::{Scheduler, SchedulerError};
pub use self::flow::FlowScheduler;
pub use self::flow_interval::FlowIntervalScheduler;
pub use self::linear_programming::{
    round_activity, LinearProgrammingArbitraryPreemptionScheduler, LinearProgrammingRoundedScheduler,
};
pub use self::matching::{MatchingScheduler, UpperDegreeConstrainedSubgraphScheduler};
pub use self::unit_jobs::{Packing, UnitJobsScheduler, UnitJobsVariant};
