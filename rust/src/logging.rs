//! Verbosity-gated logging macros shared by every scheduler.
//!
//! Logging compiles down to a single integer comparison when disabled (verbosity=0).
//! Levels:
//! - 0: SILENT (nothing)
//! - 1: CHANGES (feasibility verdicts, slots kept or closed, final active time)
//! - 2: CHECKS (every tentative close/reopen, binary-search probes, search improvements)
//! - 3: DEBUG (graph sizes, matching sizes, LP activity, union-find redirections)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Word used in log lines for a feasibility check outcome.
pub fn verdict(feasible: bool) -> &'static str {
    if feasible {
        "feasible"
    } else {
        "infeasible"
    }
}

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: feasibility verdicts, retained time slots, final active time.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: tentative slot closures, binary-search probes, candidate evaluation.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: solver internals such as graph sizes and fractional LP values.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Optimization, SchedulerConfig, SchedulerKind};
    use crate::test_support::scenario_a;

    #[test]
    fn test_verbosity_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_CHANGES);
        assert!(VERBOSITY_CHANGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_verdict() {
        assert_eq!(verdict(true), "feasible");
        assert_eq!(verdict(false), "infeasible");
    }

    #[test]
    fn test_disabled_levels_skip_their_arguments() {
        let mut flow_calls = 0;
        let mut max_flow = || {
            flow_calls += 1;
            28
        };
        log_changes!(VERBOSITY_SILENT, "flow {}", max_flow());
        log_checks!(VERBOSITY_CHANGES, "flow {}", max_flow());
        log_debug!(VERBOSITY_CHECKS, "flow {}", max_flow());
        log_debug!(VERBOSITY_DEBUG, "flow {}", max_flow());
        assert_eq!(flow_calls, 1);
    }

    #[test]
    fn test_verbosity_never_changes_the_schedule() {
        let pool = scenario_a();
        for kind in [SchedulerKind::Flow, SchedulerKind::FlowInterval] {
            let silent = kind.build(SchedulerConfig::default());
            let chatty = kind.build(SchedulerConfig::new(
                None,
                None,
                Some(Optimization::LocalSearch),
                Some(VERBOSITY_DEBUG),
            ));
            let quiet = kind.build(SchedulerConfig::new(
                None,
                None,
                Some(Optimization::LocalSearch),
                Some(VERBOSITY_SILENT),
            ));
            assert_eq!(
                chatty.process_pool(&pool, 10).unwrap(),
                quiet.process_pool(&pool, 10).unwrap(),
                "{}",
                kind
            );
            assert_eq!(silent.process_pool(&pool, 10).unwrap().active_time(), Some(20));
        }
    }
}
