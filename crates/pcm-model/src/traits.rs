//! The math-program backend contract.
//!
//! A backend receives a fully resolved [`LinearProgram`] and reports what the
//! solver found. It never sees parameters, keys or the container; the façade
//! maps values back through the container after the call returns.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::container::LinearProgram;
use crate::error::BuildResult;

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationStatus {
    Optimal,
    LocallySolved,
    AlmostOptimal,
    Infeasible,
    DualInfeasible,
    TimeLimit,
    IterationLimit,
    NumericalError,
    OtherError,
}

impl TerminationStatus {
    /// Statuses for which the primal point can be reported as a result.
    pub fn is_feasible_point(&self) -> bool {
        matches!(
            self,
            TerminationStatus::Optimal
                | TerminationStatus::LocallySolved
                | TerminationStatus::AlmostOptimal
        )
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationStatus::Optimal => "OPTIMAL",
            TerminationStatus::LocallySolved => "LOCALLY_SOLVED",
            TerminationStatus::AlmostOptimal => "ALMOST_OPTIMAL",
            TerminationStatus::Infeasible => "INFEASIBLE",
            TerminationStatus::DualInfeasible => "DUAL_INFEASIBLE",
            TerminationStatus::TimeLimit => "TIME_LIMIT",
            TerminationStatus::IterationLimit => "ITERATION_LIMIT",
            TerminationStatus::NumericalError => "NUMERICAL_ERROR",
            TerminationStatus::OtherError => "OTHER_ERROR",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimalStatus {
    FeasiblePoint,
    InfeasiblePoint,
    NoSolution,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DualStatus {
    FeasiblePoint,
    InfeasiblePoint,
    NoSolution,
    /// The backend does not report duals
    NotReported,
}

/// Options forwarded to [`MathBackend::optimize`].
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    pub time_limit: Option<Duration>,
}

/// What a backend reports after one solve.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    pub termination: TerminationStatus,
    pub primal_status: PrimalStatus,
    pub dual_status: DualStatus,
    pub objective_value: f64,
    /// One value per declared variable, in declaration order
    pub primal: Vec<f64>,
    /// One value per constraint, when the backend reports them
    pub duals: Option<Vec<f64>>,
    pub solve_time: Option<Duration>,
}

impl BackendSolution {
    /// Solution that carries only a failure status.
    pub fn failed(termination: TerminationStatus) -> Self {
        Self {
            termination,
            primal_status: PrimalStatus::NoSolution,
            dual_status: DualStatus::NoSolution,
            objective_value: f64::NAN,
            primal: Vec::new(),
            duals: None,
            solve_time: None,
        }
    }
}

/// Solves a resolved linear program.
pub trait MathBackend: Send + Sync {
    /// Unique identifier (e.g., "clarabel")
    fn id(&self) -> &str;

    /// Solve the program.
    ///
    /// Infeasibility is reported through [`BackendSolution::termination`];
    /// `Err` is reserved for failures to run the solver at all.
    fn optimize(
        &self,
        program: &LinearProgram,
        options: &BackendOptions,
    ) -> BuildResult<BackendSolution>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that backends can sit behind `Box<dyn MathBackend>` and cross threads.
    #[test]
    fn test_backend_trait_is_object_safe_and_thread_safe() {
        fn _accepts(_b: &dyn MathBackend) {}
        fn _assert_send_sync<T: Send + Sync>() {}
        _assert_send_sync::<Box<dyn MathBackend>>();
    }

    /// Test which termination statuses count as a usable solution.
    #[test]
    fn test_only_solved_statuses_are_feasible_points() {
        assert!(TerminationStatus::Optimal.is_feasible_point());
        assert!(TerminationStatus::AlmostOptimal.is_feasible_point());
        assert!(!TerminationStatus::Infeasible.is_feasible_point());
        assert!(!TerminationStatus::TimeLimit.is_feasible_point());
    }

    /// Test that a failed solve carries no primal values.
    #[test]
    fn test_failed_solution_has_no_point() {
        let sol = BackendSolution::failed(TerminationStatus::Infeasible);
        assert!(sol.primal.is_empty());
        assert!(sol.objective_value.is_nan());
        assert_eq!(sol.primal_status, PrimalStatus::NoSolution);
    }
}
