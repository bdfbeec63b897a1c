//! Clarabel interior-point backend via `good_lp`.

use good_lp::solvers::clarabel::clarabel;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel, Variable,
};
use tracing::{debug, warn};
use web_time::Instant;

use crate::container::{LinearConstraint, LinearProgram, ObjectiveSense, Sense};
use crate::error::{BuildError, BuildResult};
use crate::traits::{
    BackendOptions, BackendSolution, DualStatus, MathBackend, PrimalStatus, TerminationStatus,
};

/// Absolute tolerance for rows that have no variable terms left.
const CONSTANT_ROW_TOLERANCE: f64 = 1e-9;

/// Pure-Rust LP backend. Reports primal values only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl MathBackend for ClarabelBackend {
    fn id(&self) -> &str {
        "clarabel"
    }

    fn optimize(
        &self,
        program: &LinearProgram,
        options: &BackendOptions,
    ) -> BuildResult<BackendSolution> {
        if let Some(limit) = options.time_limit {
            warn!(
                limit_seconds = limit.as_secs_f64(),
                "clarabel backend ignores the time limit"
            );
        }
        let start = Instant::now();

        // Rows whose terms all resolved away are checked here, not handed to the solver.
        let (constant, rows): (Vec<&LinearConstraint>, Vec<&LinearConstraint>) =
            program.constraints.iter().partition(|c| c.terms.is_empty());
        if let Some(violated) = constant.iter().find(|c| !constant_row_holds(c)) {
            debug!(constraint = %violated.name, "constant row is violated");
            return Ok(BackendSolution::failed(TerminationStatus::Infeasible));
        }
        if program.variables.is_empty() {
            return Ok(solved(program, Vec::new(), start));
        }

        let mut vars = variables!();
        let handles: Vec<Variable> = program
            .variables
            .iter()
            .map(|decl| {
                let mut def = variable().name(decl.name.clone());
                if let Some(lower) = decl.lower {
                    def = def.min(lower);
                }
                if let Some(upper) = decl.upper {
                    def = def.max(upper);
                }
                vars.add(def)
            })
            .collect();

        let mut objective = Expression::from(0.0);
        for &(i, coeff) in &program.objective.terms {
            objective += coeff * handles[i];
        }
        let unsolved = match program.objective.sense {
            ObjectiveSense::Minimize => vars.minimise(objective),
            ObjectiveSense::Maximize => vars.maximise(objective),
        };
        let mut model = unsolved.using(clarabel);
        for row in rows {
            let mut lhs = Expression::from(0.0);
            for &(i, coeff) in &row.terms {
                lhs += coeff * handles[i];
            }
            let rhs = row.rhs;
            model = match row.sense {
                Sense::LessEqual => model.with(constraint!(lhs <= rhs)),
                Sense::GreaterEqual => model.with(constraint!(lhs >= rhs)),
                Sense::Equal => model.with(constraint!(lhs == rhs)),
            };
        }

        match model.solve() {
            Ok(solution) => {
                let primal = handles.iter().map(|v| solution.value(*v)).collect();
                Ok(solved(program, primal, start))
            }
            Err(ResolutionError::Infeasible) => {
                Ok(BackendSolution::failed(TerminationStatus::Infeasible))
            }
            Err(ResolutionError::Unbounded) => {
                Ok(BackendSolution::failed(TerminationStatus::DualInfeasible))
            }
            Err(err) => Err(BuildError::Backend(format!("clarabel failed: {err:?}"))),
        }
    }
}

fn constant_row_holds(row: &LinearConstraint) -> bool {
    // the row reads `0 (sense) rhs`
    match row.sense {
        Sense::LessEqual => 0.0 <= row.rhs + CONSTANT_ROW_TOLERANCE,
        Sense::GreaterEqual => 0.0 >= row.rhs - CONSTANT_ROW_TOLERANCE,
        Sense::Equal => row.rhs.abs() <= CONSTANT_ROW_TOLERANCE,
    }
}

fn solved(program: &LinearProgram, primal: Vec<f64>, start: Instant) -> BackendSolution {
    BackendSolution {
        termination: TerminationStatus::Optimal,
        primal_status: PrimalStatus::FeasiblePoint,
        dual_status: DualStatus::NotReported,
        objective_value: program.objective.evaluate(&primal),
        primal,
        duals: None,
        solve_time: Some(start.elapsed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{LinearObjective, VariableDecl};

    fn var(name: &str, lower: Option<f64>, upper: Option<f64>) -> VariableDecl {
        VariableDecl {
            name: name.to_string(),
            lower,
            upper,
        }
    }

    fn row(terms: Vec<(usize, f64)>, sense: Sense, rhs: f64) -> LinearConstraint {
        LinearConstraint {
            name: "c".to_string(),
            terms,
            sense,
            rhs,
        }
    }

    #[test]
    fn test_clarabel_backend_id() {
        assert_eq!(ClarabelBackend.id(), "clarabel");
    }

    #[test]
    fn test_solves_small_dispatch() {
        // min 10 x + 20 y  s.t.  x + y = 30, x <= 20
        let program = LinearProgram {
            variables: vec![var("x", Some(0.0), Some(20.0)), var("y", Some(0.0), None)],
            constraints: vec![row(vec![(0, 1.0), (1, 1.0)], Sense::Equal, 30.0)],
            objective: LinearObjective {
                sense: ObjectiveSense::Minimize,
                terms: vec![(0, 10.0), (1, 20.0)],
                constant: 0.0,
            },
        };
        let sol = ClarabelBackend
            .optimize(&program, &BackendOptions::default())
            .unwrap();
        assert_eq!(sol.termination, TerminationStatus::Optimal);
        assert!((sol.primal[0] - 20.0).abs() < 1e-4);
        assert!((sol.primal[1] - 10.0).abs() < 1e-4);
        assert!((sol.objective_value - 400.0).abs() < 1e-2);
        assert!(sol.duals.is_none());
        assert!(sol.solve_time.is_some());
    }

    #[test]
    fn test_violated_constant_row_is_infeasible() {
        let program = LinearProgram {
            variables: vec![var("x", Some(0.0), Some(1.0))],
            constraints: vec![row(Vec::new(), Sense::GreaterEqual, 5.0)],
            objective: LinearObjective {
                sense: ObjectiveSense::Minimize,
                terms: vec![(0, 1.0)],
                constant: 0.0,
            },
        };
        let sol = ClarabelBackend
            .optimize(&program, &BackendOptions::default())
            .unwrap();
        assert_eq!(sol.termination, TerminationStatus::Infeasible);
        assert!(sol.primal.is_empty());
    }

    #[test]
    fn test_constant_rows_within_tolerance_hold() {
        assert!(constant_row_holds(&row(Vec::new(), Sense::Equal, 1e-12)));
        assert!(constant_row_holds(&row(Vec::new(), Sense::LessEqual, 0.0)));
        assert!(!constant_row_holds(&row(Vec::new(), Sense::LessEqual, -1.0)));
    }
}
