//! C5 — Solver Interface.
//!
//! A narrow adapter from the backend-agnostic [`Problem`] to a concrete MIP
//! solver and back to a plain solution vector. This is the only module in
//! the crate that imports a solver crate; swapping backends means touching
//! only this file. See `spec.md` §4.5.

use good_lp::{variable, Expression, ResolutionError, Solution, SolverModel};

use crate::error::TedError;
use crate::ilp::{Problem, Relation, VarKind};

/// A variable assignment, indexed the same way as `Problem::var_kinds`.
pub type MipSolution = Vec<f64>;

/// Abstract adapter to any MIP backend. `spec.md` §4.5 requires an exact
/// integer solver — an LP relaxation would not make the match-variable
/// counting in C4 sound, since `m[g,r]` must be genuinely binary.
pub trait MipSolver {
    /// Solves `problem` to optimality, or reports why it could not.
    fn solve(&self, problem: &Problem) -> Result<MipSolution, TedError>;
}

/// The default [`MipSolver`], backed by `good_lp`'s bundled pure-Rust
/// `microlp` branch-and-bound solver. Chosen so this crate has no system
/// library build dependency; a consumer wanting `good_lp`'s `coin_cbc` or
/// `highs` backends instead can implement [`MipSolver`] with those and pass
/// it to [`crate::evaluate_with_solver`].
#[derive(Debug, Default, Clone, Copy)]
pub struct GoodLpSolver;

impl MipSolver for GoodLpSolver {
    fn solve(&self, problem: &Problem) -> Result<MipSolution, TedError> {
        if problem.var_kinds.is_empty() {
            return Ok(Vec::new());
        }

        let mut vars = good_lp::ProblemVariables::new();
        let handles: Vec<_> = problem
            .var_kinds
            .iter()
            .map(|kind| match kind {
                VarKind::Binary => vars.add(variable().binary()),
                VarKind::NonNegativeInteger => vars.add(variable().integer().min(0)),
            })
            .collect();

        let objective = linear_expr(&problem.objective, &handles);
        let mut model = vars.minimise(objective).using(good_lp::microlp);

        for row in &problem.constraints {
            let expr = linear_expr(&row.coeffs, &handles);
            let constraint = match row.relation {
                Relation::Le => expr.leq(row.rhs),
                Relation::Ge => expr.geq(row.rhs),
                Relation::Eq => expr.eq(row.rhs),
            };
            model = model.with(constraint);
        }

        let solution = model.solve().map_err(|err| match err {
            ResolutionError::Infeasible => TedError::InfeasibleProblem,
            other => TedError::SolverFailure(other.to_string()),
        })?;

        Ok(handles.iter().map(|&v| solution.value(v)).collect())
    }
}

fn linear_expr(coeffs: &[(usize, f64)], handles: &[good_lp::Variable]) -> Expression {
    coeffs
        .iter()
        .map(|&(idx, coeff)| coeff * handles[idx])
        .sum()
}
