//! Linear-programming relaxation of active-time scheduling.
//!
//! Variables are `x[j, t]` (fraction of job `j` processed at slot `t`) and `y[t]` (unused
//! capacity at slot `t`). The program is
//!
//! ```text
//! minimise   -sum_t y[t]
//! subject to -sum_t x[j, t]            <= -p[j]   for every job j
//!             sum_j x[j, t] + B * y[t] <=  B      for every slot t
//!             x[j, t] + y[t]           <=  1      for every job j available at t
//!             x, y >= 0
//! ```
//!
//! and the activity of slot `t` is `1 - y[t]`. The optimal total activity is a lower bound on
//! the optimal active time.

use good_lp::{
    default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use std::sync::Arc;

use crate::models::Job;
use crate::scheduler::SchedulerError;
use crate::timeline::{SlotIndex, Timeline};

/// Tolerance used when reading fractional values.
pub const EPSILON: f64 = 1e-6;

/// What a variable of the program stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LpVariable {
    /// Amount of job (by position) processed at a slot.
    Execution { job: usize, slot: SlotIndex },
    /// Unused capacity at a slot.
    Slack { slot: SlotIndex },
}

/// Sparse row `sum coefficients <= bound`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub coefficients: Vec<(usize, f64)>,
    pub bound: f64,
}

/// Program in inequality form: minimise `objective . z` subject to every constraint, `z >= 0`.
#[derive(Clone, Debug)]
pub struct LinearProgram {
    pub objective: Vec<f64>,
    pub constraints: Vec<LinearConstraint>,
    pub variables: Vec<LpVariable>,
    timeline: Timeline,
    job_count: usize,
}

/// Solved relaxation.
#[derive(Clone, Debug)]
pub struct FractionalSolution {
    pub timeline: Timeline,
    /// `1 - y[t]` per slot, clamped to `[0, 1]`.
    pub activity: Vec<f64>,
    /// Per job (by position): `(slot, x[j, t])` for every positive entry.
    pub execution: Vec<Vec<(SlotIndex, f64)>>,
}

impl FractionalSolution {
    /// Total fractional active time.
    pub fn total_activity(&self) -> f64 {
        self.activity.iter().sum()
    }

    /// Smallest integer active time compatible with the relaxation.
    pub fn lower_bound(&self) -> i64 {
        (self.total_activity() - EPSILON).ceil().max(0.0) as i64
    }
}

#[derive(Clone, Debug)]
pub enum LpOutcome {
    Optimal(FractionalSolution),
    Infeasible,
}

/// Build the relaxation over `timeline` (normally every timestamp some job may use).
pub fn build_lp(jobs: &[Arc<Job>], max_concurrency: usize, timeline: Timeline) -> LinearProgram {
    // Bounds above the job count add nothing and only hurt conditioning
    let capacity = max_concurrency.min(jobs.len()) as f64;
    let mut variables: Vec<LpVariable> = Vec::new();
    let mut objective: Vec<f64> = Vec::new();

    // Slack variables come first, so y[t] has index t.
    for slot in 0..timeline.len() {
        variables.push(LpVariable::Slack { slot });
        objective.push(-1.0);
    }

    let mut per_slot: Vec<Vec<usize>> = vec![Vec::new(); timeline.len()];
    let mut per_job: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    for (j, job) in jobs.iter().enumerate() {
        for slot in timeline.slots_of(job) {
            let index = variables.len();
            variables.push(LpVariable::Execution { job: j, slot });
            objective.push(0.0);
            per_slot[slot].push(index);
            per_job[j].push(index);
        }
    }

    let mut constraints = Vec::with_capacity(jobs.len() + timeline.len() + variables.len());
    for (j, job) in jobs.iter().enumerate() {
        constraints.push(LinearConstraint {
            coefficients: per_job[j].iter().map(|&x| (x, -1.0)).collect(),
            bound: -(job.duration() as f64),
        });
    }
    for (slot, xs) in per_slot.iter().enumerate() {
        let mut coefficients: Vec<(usize, f64)> = xs.iter().map(|&x| (x, 1.0)).collect();
        coefficients.push((slot, capacity));
        constraints.push(LinearConstraint {
            coefficients,
            bound: capacity,
        });
    }
    for (slot, xs) in per_slot.iter().enumerate() {
        for &x in xs {
            constraints.push(LinearConstraint {
                coefficients: vec![(x, 1.0), (slot, 1.0)],
                bound: 1.0,
            });
        }
    }

    LinearProgram {
        objective,
        constraints,
        variables,
        timeline,
        job_count: jobs.len(),
    }
}

impl LinearProgram {
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Solve with the configured `good_lp` backend.
    ///
    /// Infeasibility is an outcome; any other solver failure is a [`SchedulerError::Solver`].
    pub fn solve(&self) -> Result<LpOutcome, SchedulerError> {
        if self.variables.is_empty() {
            return Ok(LpOutcome::Optimal(FractionalSolution {
                timeline: self.timeline.clone(),
                activity: Vec::new(),
                execution: vec![Vec::new(); self.job_count],
            }));
        }

        let mut vars = ProblemVariables::new();
        let z: Vec<Variable> = (0..self.variable_count())
            .map(|_| vars.add(variable().min(0.0)))
            .collect();

        let objective: Expression = self
            .objective
            .iter()
            .zip(&z)
            .filter(|(c, _)| **c != 0.0)
            .map(|(&c, &v)| c * v)
            .sum();

        let mut problem = vars.minimise(objective).using(default_solver);
        for row in &self.constraints {
            let mut lhs = Expression::with_capacity(row.coefficients.len());
            for &(index, coefficient) in &row.coefficients {
                lhs.add_mul(coefficient, z[index]);
            }
            problem = problem.with(lhs.leq(row.bound));
        }

        let solution = match problem.solve() {
            Ok(solution) => solution,
            Err(ResolutionError::Infeasible) => return Ok(LpOutcome::Infeasible),
            Err(err) => return Err(SchedulerError::Solver(err.to_string())),
        };

        let mut activity = vec![1.0; self.timeline.len()];
        let mut execution: Vec<Vec<(SlotIndex, f64)>> = vec![Vec::new(); self.job_count];
        for (var, &handle) in self.variables.iter().zip(&z) {
            let value = solution.value(handle);
            match *var {
                LpVariable::Slack { slot } => activity[slot] = (1.0 - value).clamp(0.0, 1.0),
                LpVariable::Execution { job, slot } => {
                    if value > EPSILON {
                        execution[job].push((slot, value));
                    }
                }
            }
        }

        Ok(LpOutcome::Optimal(FractionalSolution {
            timeline: self.timeline.clone(),
            activity,
            execution,
        }))
    }
}

/// Build and solve the relaxation over every timestamp some job may use.
pub fn solve_lp(jobs: &[Arc<Job>], max_concurrency: usize) -> Result<LpOutcome, SchedulerError> {
    build_lp(jobs, max_concurrency, Timeline::covering(jobs)).solve()
}
