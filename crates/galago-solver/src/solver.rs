use thiserror::Error;

use galago_expr::eval::{Assignment, Value};
use galago_expr::expr::Expr;

/// Why a formula was reported unsatisfiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsatKind {
    /// The constraint set is provably empty.
    Proven,
    /// The bounded search window was exhausted without a decision; treated
    /// like UNSAT by the explorer but logged.
    WindowExhausted,
    /// The formula contains atoms outside the supported fragment (reals,
    /// strings, or non-`var cmp const` shapes).
    Unsupported,
}

/// Outcome of a satisfiability query over a path formula.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Sat(Solution),
    Unsat(UnsatKind),
}

/// A satisfying assignment for the variables of a formula. Never empty:
/// solvers signal failure with the [`SolveOutcome::Unsat`] sentinel
/// instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    values: Assignment,
}

impl Solution {
    /// Wrap an assignment; `None` when it is empty.
    pub fn new(values: Assignment) -> Option<Solution> {
        if values.is_empty() {
            None
        } else {
            Some(Solution { values })
        }
    }

    pub fn values(&self) -> &Assignment {
        &self.values
    }

    pub fn into_values(self) -> Assignment {
        self.values
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }
}

/// Error raised by a solver backend. The shipped bounded solver never
/// fails; external backends surface transport or translation failures
/// here.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// Abstract solving capability consumed by the explorer.
///
/// Implementations decide a single formula per call and must return the
/// UNSAT sentinel rather than an error for unsatisfiable or unsupported
/// inputs.
pub trait PathSolver {
    fn solve(&self, formula: &Expr) -> Result<SolveOutcome, SolverError>;
}
