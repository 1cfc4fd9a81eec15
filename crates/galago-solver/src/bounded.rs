use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use galago_expr::eval::{Assignment, Value};
use galago_expr::expr::{BinOp, Expr, UnOp};
use galago_expr::negate::negate;
use galago_expr::sorts::Sort;

use crate::solver::{PathSolver, SolveOutcome, Solution, SolverError, UnsatKind};

/// Default number of candidate values scanned per variable.
pub const DEFAULT_SEARCH_WIDTH: u32 = 1000;

/// Bounded linear solver over per-variable integer constraints.
///
/// Decides conjunctions whose atoms have the shape `var cmp const` (either
/// operand order), descending `Or` nodes by disjunctive enumeration and
/// returning the first satisfiable disjunct. Exploration problems in the
/// target domain are enumerable user choices and small integer ranges, so
/// the per-variable scan is deliberately bounded by `search_width`.
#[derive(Debug, Clone)]
pub struct BoundedSolver {
    search_width: u32,
}

impl BoundedSolver {
    pub fn new() -> Self {
        BoundedSolver {
            search_width: DEFAULT_SEARCH_WIDTH,
        }
    }

    pub fn with_search_width(search_width: u32) -> Self {
        BoundedSolver {
            search_width: search_width.max(1),
        }
    }

    pub fn search_width(&self) -> u32 {
        self.search_width
    }
}

impl Default for BoundedSolver {
    fn default() -> Self {
        BoundedSolver::new()
    }
}

/// One normalized atom: `var op value` with the variable on the left.
#[derive(Debug, Clone, PartialEq)]
struct Atom {
    var: String,
    op: BinOp,
    value: i64,
}

/// One conjunct of the disjunctive split of a formula.
#[derive(Debug, Clone, Default)]
struct Conjunct {
    atoms: Vec<Atom>,
    unsupported: bool,
    contradiction: bool,
}

impl Conjunct {
    fn atom(atom: Atom) -> Self {
        Conjunct {
            atoms: vec![atom],
            ..Conjunct::default()
        }
    }

    fn unsupported() -> Self {
        Conjunct {
            unsupported: true,
            ..Conjunct::default()
        }
    }

    fn contradiction() -> Self {
        Conjunct {
            contradiction: true,
            ..Conjunct::default()
        }
    }

    fn merge(mut self, other: &Conjunct) -> Conjunct {
        self.atoms.extend(other.atoms.iter().cloned());
        self.unsupported |= other.unsupported;
        self.contradiction |= other.contradiction;
        self
    }
}

/// Split a formula into a disjunction of conjunctions of atoms. `And` over
/// `Or` children distributes, so each returned conjunct is an independent
/// candidate.
fn conjuncts(expr: &Expr) -> Vec<Conjunct> {
    match expr {
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            let mut out = conjuncts(lhs);
            out.extend(conjuncts(rhs));
            out
        }
        Expr::Binary(BinOp::And, lhs, rhs) => {
            let left = conjuncts(lhs);
            let right = conjuncts(rhs);
            let mut out = Vec::with_capacity(left.len() * right.len());
            for l in &left {
                for r in &right {
                    out.push(l.clone().merge(r));
                }
            }
            out
        }
        Expr::Unary(UnOp::Not, inner) => {
            let pushed = negate(inner);
            if matches!(pushed, Expr::Unary(UnOp::Not, _)) {
                vec![Conjunct::unsupported()]
            } else {
                conjuncts(&pushed)
            }
        }
        Expr::BoolConst(true) => vec![Conjunct::default()],
        Expr::BoolConst(false) => vec![Conjunct::contradiction()],
        Expr::Binary(op, lhs, rhs) if op.is_comparison() => match as_atom(*op, lhs, rhs) {
            Some(atom) => vec![Conjunct::atom(atom)],
            None => vec![Conjunct::unsupported()],
        },
        _ => vec![Conjunct::unsupported()],
    }
}

/// Normalize a comparison to `var op const` with the variable on the left,
/// flipping the operator when the variable is on the right. Only integer
/// variables against integer constants are in the supported fragment.
fn as_atom(op: BinOp, lhs: &Expr, rhs: &Expr) -> Option<Atom> {
    match (lhs, rhs) {
        (Expr::Var(name, Sort::Int), Expr::IntConst(k)) => Some(Atom {
            var: name.clone(),
            op,
            value: *k,
        }),
        (Expr::IntConst(k), Expr::Var(name, Sort::Int)) => Some(Atom {
            var: name.clone(),
            op: op.flip(),
            value: *k,
        }),
        _ => None,
    }
}

/// Bounds induced on one variable by the atoms of a conjunct.
#[derive(Debug, Default)]
struct VarBounds {
    min: Option<i64>,
    max: Option<i64>,
    forbidden: HashSet<i64>,
    required: Option<i64>,
}

impl VarBounds {
    fn tighten_min(&mut self, value: i64) {
        self.min = Some(self.min.map_or(value, |m| m.max(value)));
    }

    fn tighten_max(&mut self, value: i64) {
        self.max = Some(self.max.map_or(value, |m| m.min(value)));
    }
}

enum ConjunctOutcome {
    Sat(Assignment),
    Unsat(UnsatKind),
}

impl BoundedSolver {
    fn solve_conjunct(&self, atoms: &[Atom]) -> ConjunctOutcome {
        let mut bounds: IndexMap<&str, VarBounds> = IndexMap::new();
        for atom in atoms {
            let entry = bounds.entry(atom.var.as_str()).or_default();
            match atom.op {
                BinOp::Eq => {
                    if let Some(required) = entry.required {
                        if required != atom.value {
                            return ConjunctOutcome::Unsat(UnsatKind::Proven);
                        }
                    }
                    entry.required = Some(atom.value);
                }
                BinOp::Ne => {
                    entry.forbidden.insert(atom.value);
                }
                BinOp::Lt => match atom.value.checked_sub(1) {
                    Some(max) => entry.tighten_max(max),
                    None => return ConjunctOutcome::Unsat(UnsatKind::Proven),
                },
                BinOp::Le => entry.tighten_max(atom.value),
                BinOp::Gt => match atom.value.checked_add(1) {
                    Some(min) => entry.tighten_min(min),
                    None => return ConjunctOutcome::Unsat(UnsatKind::Proven),
                },
                BinOp::Ge => entry.tighten_min(atom.value),
                _ => return ConjunctOutcome::Unsat(UnsatKind::Unsupported),
            }
        }

        let mut assignment = Assignment::new();
        for (name, var_bounds) in &bounds {
            match self.pick_value(var_bounds) {
                Ok(value) => {
                    assignment.insert(name.to_string(), Value::Int(value));
                }
                Err(kind) => return ConjunctOutcome::Unsat(kind),
            }
        }
        ConjunctOutcome::Sat(assignment)
    }

    /// Pick the first admissible value for one variable, or report why
    /// none exists.
    fn pick_value(&self, bounds: &VarBounds) -> Result<i64, UnsatKind> {
        if let Some(required) = bounds.required {
            let admissible = bounds.min.map_or(true, |m| required >= m)
                && bounds.max.map_or(true, |m| required <= m)
                && !bounds.forbidden.contains(&required);
            return if admissible {
                Ok(required)
            } else {
                Err(UnsatKind::Proven)
            };
        }

        if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
            if min > max {
                return Err(UnsatKind::Proven);
            }
        }

        let width = i64::from(self.search_width);
        // Anchor the scan at the lower bound when one exists; otherwise at
        // the natural origin of enumerable choice domains, shifted down
        // when the upper bound forces negative values.
        let lo = match (bounds.min, bounds.max) {
            (Some(min), _) => min,
            (None, None) => 0,
            (None, Some(max)) => {
                if max >= 0 {
                    0
                } else {
                    max.saturating_sub(width - 1)
                }
            }
        };
        let window_hi = lo.saturating_add(width - 1);
        let hi = bounds.max.map_or(window_hi, |max| window_hi.min(max));

        let mut candidate = lo;
        while candidate <= hi {
            if !bounds.forbidden.contains(&candidate) {
                return Ok(candidate);
            }
            if candidate == i64::MAX {
                break;
            }
            candidate += 1;
        }

        let range_fully_scanned =
            matches!((bounds.min, bounds.max), (Some(_), Some(max)) if hi == max);
        if range_fully_scanned {
            Err(UnsatKind::Proven)
        } else {
            Err(UnsatKind::WindowExhausted)
        }
    }
}

impl PathSolver for BoundedSolver {
    fn solve(&self, formula: &Expr) -> Result<SolveOutcome, SolverError> {
        let mut saw_window_exhausted = false;
        let mut saw_unsupported = false;

        for conjunct in conjuncts(formula) {
            if conjunct.contradiction {
                continue;
            }
            if conjunct.unsupported || conjunct.atoms.is_empty() {
                saw_unsupported = true;
                continue;
            }
            match self.solve_conjunct(&conjunct.atoms) {
                ConjunctOutcome::Sat(assignment) => match Solution::new(assignment) {
                    Some(solution) => return Ok(SolveOutcome::Sat(solution)),
                    None => saw_unsupported = true,
                },
                ConjunctOutcome::Unsat(UnsatKind::WindowExhausted) => {
                    debug!(width = self.search_width, "search window exhausted for disjunct");
                    saw_window_exhausted = true;
                }
                ConjunctOutcome::Unsat(UnsatKind::Unsupported) => saw_unsupported = true,
                ConjunctOutcome::Unsat(UnsatKind::Proven) => {}
            }
        }

        let kind = if saw_window_exhausted {
            UnsatKind::WindowExhausted
        } else if saw_unsupported {
            UnsatKind::Unsupported
        } else {
            UnsatKind::Proven
        };
        Ok(SolveOutcome::Unsat(kind))
    }
}
