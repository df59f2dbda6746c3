//! Exhaustive search over subsets of the timeline. Ground truth for small inputs.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::models::{Job, Schedule};
use crate::timeline::Timeline;
use crate::{log_changes, log_checks};

use super::core::{Scheduler, SchedulerError};
use super::flow::TimeExpandedNetwork;

/// Largest timeline the subset enumeration accepts.
pub const MAX_BRUTE_FORCE_SLOTS: usize = 63;

/// Tries every subset of timestamps and keeps a smallest feasible one.
#[derive(Clone, Debug, Default)]
pub struct BruteForceScheduler {
    config: SchedulerConfig,
}

impl BruteForceScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }
}

impl Scheduler for BruteForceScheduler {
    fn name(&self) -> &'static str {
        "BruteForceScheduler"
    }

    fn process(&self, jobs: &[Arc<Job>], max_concurrency: usize) -> Result<Schedule, SchedulerError> {
        let verbosity = self.config.verbosity;
        let timeline = Timeline::covering(jobs);
        let slots = timeline.len();
        if slots > MAX_BRUTE_FORCE_SLOTS {
            return Err(SchedulerError::Unsupported {
                scheduler: self.name(),
                reason: format!("{} timestamps exceed the limit of {}", slots, MAX_BRUTE_FORCE_SLOTS),
            });
        }

        let network = |mask: u64| {
            let mut network = TimeExpandedNetwork::new(
                jobs,
                timeline.clone(),
                max_concurrency,
                self.config.flow_method,
            );
            for slot in (0..slots).filter(|&s| mask & (1 << s) != 0) {
                network.open_slot(slot);
            }
            network
        };

        let full_mask = if slots == 0 { 0 } else { u64::MAX >> (64 - slots) };
        let Some(mut best) = network(full_mask).schedule() else {
            log_changes!(verbosity, "BruteForceScheduler: infeasible with every slot open");
            return Ok(Schedule::infeasible());
        };
        let mut best_size = slots as u32;

        // Later masks of equal size replace earlier ones
        for mask in 0..full_mask {
            if mask.count_ones() > best_size {
                continue;
            }
            if let Some(schedule) = network(mask).schedule() {
                log_checks!(verbosity, "  Feasible subset {:#b} of size {}", mask, mask.count_ones());
                best_size = mask.count_ones();
                best = schedule;
            }
        }

        log_changes!(
            verbosity,
            "BruteForceScheduler: optimal active time {}",
            best.active_time().unwrap_or(0)
        );
        Ok(best)
    }
}
