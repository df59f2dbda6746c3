//! Python bindings.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{SchedulerConfig, SchedulerKind};
use crate::models::{JobId, JobPool, Time};
use crate::scheduler::SchedulerError;

type PyInterval = (Time, Time);
type PyJobSchedule = (JobId, Vec<PyInterval>);
type PySchedule = (bool, Option<Vec<PyInterval>>, Option<Vec<PyJobSchedule>>);

fn to_py_err(err: SchedulerError) -> PyErr {
    match err {
        SchedulerError::InvalidJob(_)
        | SchedulerError::Unsupported { .. }
        | SchedulerError::UnknownScheduler(_) => PyValueError::new_err(err.to_string()),
        SchedulerError::Solver(_) | SchedulerError::Invariant(_) => {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}

/// Schedule `(release_time, deadline, duration)` jobs with the named strategy.
///
/// # Returns
/// * `(all_jobs_scheduled, active_intervals, job_schedules)`; both lists are `None` when
///   the jobs cannot all be served. Job ids are positions in `jobs`.
///
/// # Raises
/// * ValueError for malformed jobs, unknown scheduler names and unsupported inputs
/// * RuntimeError for solver failures
#[pyfunction]
#[pyo3(signature = (scheduler, max_concurrency, jobs, verbosity=0))]
fn schedule(
    scheduler: &str,
    max_concurrency: usize,
    jobs: Vec<(Time, Time, Time)>,
    verbosity: u8,
) -> PyResult<PySchedule> {
    let kind: SchedulerKind = scheduler.parse().map_err(to_py_err)?;
    let config = SchedulerConfig::new(None, None, None, Some(verbosity));

    let mut pool = JobPool::new();
    for (release_time, deadline, duration) in jobs {
        pool.add_job(release_time, deadline, duration)
            .map_err(to_py_err)?;
    }

    let result = kind
        .build(config)
        .process_pool(&pool, max_concurrency)
        .map_err(to_py_err)?;

    let intervals = |list: &[crate::models::TimeInterval]| -> Vec<PyInterval> {
        list.iter().map(|i| (i.start, i.end)).collect()
    };
    Ok((
        result.all_jobs_scheduled,
        result.active_time_intervals.as_deref().map(intervals),
        result.job_schedules.as_ref().map(|schedules| {
            schedules
                .iter()
                .map(|s| (s.job.id(), intervals(&s.execution_intervals)))
                .collect()
        }),
    ))
}

/// Names accepted by `schedule`.
#[pyfunction]
fn scheduler_names() -> Vec<&'static str> {
    SchedulerKind::ALL.iter().map(|kind| kind.name()).collect()
}

#[pymodule]
fn active_time(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(schedule, m)?)?;
    m.add_function(wrap_pyfunction!(scheduler_names, m)?)?;
    Ok(())
}
