//! Active-time scheduling.
//!
//! Jobs with integer availability windows and durations run on a machine that executes at
//! most `max_concurrency` jobs per timestamp. The goal is to serve every job while keeping
//! as few timestamps active as possible. The crate provides exact and approximate
//! strategies built on max flow, blossom matching, degree-constrained subgraphs, an LP
//! relaxation and a disjoint-set greedy for unit jobs.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod batch;
pub mod config;
pub mod dcs;
pub mod disjoint_set;
pub mod flow;
pub mod interval;
pub mod logging;
pub mod lp;
pub mod matching;
pub mod models;
pub mod scheduler;
pub mod timeline;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod test_support;

pub use batch::{run_batch, BatchInput, BatchOutput};
pub use config::{Optimization, SchedulerConfig, SchedulerKind, TimeOrdering};
pub use flow::{FlowMethod, FlowNetwork};
pub use interval::{merge_time_intervals, merge_timestamps};
pub use matching::{is_matching_feasible, max_matching, Graph, Matching};
pub use models::{Job, JobId, JobPool, JobSchedule, Schedule, Time, TimeInterval};
pub use scheduler::{Scheduler, SchedulerError};
