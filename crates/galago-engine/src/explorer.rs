use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use galago_expr::eval::{Assignment, Value};
use galago_expr::expr::{BinOp, Expr};
use galago_expr::negate::negate;
use galago_expr::sorts::Sort;
use galago_runtime::path_condition::{PathCondition, PathConstraint, Provenance};
use galago_solver::bounded::{BoundedSolver, DEFAULT_SEARCH_WIDTH};
use galago_solver::solver::{PathSolver, SolveOutcome, SolverError, UnsatKind};

use crate::report::TerminatedReason;

/// Cooperative cancellation handle, checked between iterations. An
/// in-flight host execution is never aborted; the host is responsible for
/// responsive cancellation of its own work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Exploration options.
#[derive(Debug, Clone)]
pub struct ExploreOptions {
    /// Hard upper bound on total host executions.
    pub max_iterations: u32,
    /// Solver scan window per variable.
    pub search_width: u32,
    /// How many times to re-query the solver for a fresh assignment when a
    /// candidate keeps producing already-tried values.
    pub max_solution_retries: u32,
    pub cancel: CancelToken,
}

impl Default for ExploreOptions {
    fn default() -> Self {
        ExploreOptions {
            max_iterations: 100,
            search_width: DEFAULT_SEARCH_WIDTH,
            max_solution_retries: 3,
            cancel: CancelToken::new(),
        }
    }
}

/// Error raised by the host program during one execution.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<&str> for HostError {
    fn from(message: &str) -> Self {
        HostError(message.to_string())
    }
}

impl From<String> for HostError {
    fn from(message: String) -> Self {
        HostError(message)
    }
}

/// Exploration failure.
#[derive(Debug, Error)]
pub enum ExploreError {
    /// Bad option values at session start. Fatal to the session.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A solver backend failure (never raised by the shipped bounded
    /// solver).
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// The host raised; carries the path records collected so far.
    #[error("host execution failed: {message}")]
    Host {
        message: String,
        partial: Vec<PathRecord>,
    },
}

/// One explored path: the seeds that drove it, the path condition it
/// produced, and how long the host execution took.
#[derive(Debug, Clone)]
pub struct PathRecord {
    pub seeds: Assignment,
    pub path_condition: PathCondition,
    pub duration: Duration,
}

impl PathRecord {
    pub fn rendered_constraints(&self) -> Vec<String> {
        self.path_condition.rendered()
    }
}

/// The result of a completed exploration.
#[derive(Debug, Clone)]
pub struct ExplorationReport {
    pub paths: Vec<PathRecord>,
    pub iterations: u32,
    pub terminated_reason: TerminatedReason,
}

/// A candidate formula produced by negating one suffix position of a
/// recorded path condition.
#[derive(Debug, Clone)]
struct Candidate {
    formula: Expr,
    suffix_pos: usize,
}

/// Explore with the shipped bounded solver.
pub fn explore<F>(
    initial_seeds: Assignment,
    execute: F,
    options: &ExploreOptions,
) -> Result<ExplorationReport, ExploreError>
where
    F: FnMut(&Assignment) -> Result<PathCondition, HostError>,
{
    let solver = BoundedSolver::with_search_width(options.search_width);
    explore_with_solver(initial_seeds, execute, &solver, options)
}

/// Explore with a caller-provided solver capability.
///
/// Each iteration runs the host once with the current seeds, fingerprints
/// the collected path condition, and, when the path is new, pushes one
/// candidate formula per suffix position onto the work stack (two for
/// three-way compares), deepest positions popped first. Candidates are
/// solved
/// until a fresh assignment is found; assignments already tried are
/// excluded by appending disequalities and re-querying, a bounded number
/// of times.
pub fn explore_with_solver<F, S>(
    initial_seeds: Assignment,
    mut execute: F,
    solver: &S,
    options: &ExploreOptions,
) -> Result<ExplorationReport, ExploreError>
where
    F: FnMut(&Assignment) -> Result<PathCondition, HostError>,
    S: PathSolver + ?Sized,
{
    validate(options)?;
    if initial_seeds.is_empty() {
        return Err(ExploreError::InvalidConfig(
            "at least one symbolic variable seed is required".to_string(),
        ));
    }

    let mut seeds = initial_seeds;
    let mut seen: HashSet<u64> = HashSet::new();
    let mut tried: HashSet<String> = HashSet::new();
    tried.insert(assignment_key(&seeds));
    let mut work_stack: Vec<Candidate> = Vec::new();
    let mut paths: Vec<PathRecord> = Vec::new();
    let mut iterations: u32 = 0;

    let terminated_reason = 'exploration: loop {
        if options.cancel.is_cancelled() {
            break TerminatedReason::Cancelled;
        }
        if iterations >= options.max_iterations {
            break TerminatedReason::MaxIterations;
        }

        let started = Instant::now();
        let pc = match execute(&seeds) {
            Ok(pc) => pc,
            Err(err) => {
                return Err(ExploreError::Host {
                    message: err.to_string(),
                    partial: paths,
                })
            }
        };
        iterations += 1;
        let duration = started.elapsed();

        if seen.insert(pc.fingerprint()) {
            debug!(
                iteration = iterations,
                constraints = pc.len(),
                "new path condition recorded"
            );
            push_suffix_candidates(&mut work_stack, &pc);
            paths.push(PathRecord {
                seeds: seeds.clone(),
                path_condition: pc,
                duration,
            });
        } else {
            debug!(iteration = iterations, "path condition already explored");
        }

        loop {
            let Some(candidate) = work_stack.pop() else {
                break 'exploration TerminatedReason::Exhausted;
            };
            match solve_fresh(solver, &candidate, &seeds, &tried, options)? {
                Some(next) => {
                    tried.insert(assignment_key(&next));
                    seeds = next;
                    continue 'exploration;
                }
                None => continue,
            }
        }
    };

    info!(
        iterations,
        paths = paths.len(),
        ?terminated_reason,
        "exploration finished"
    );
    Ok(ExplorationReport {
        paths,
        iterations,
        terminated_reason,
    })
}

fn validate(options: &ExploreOptions) -> Result<(), ExploreError> {
    if options.max_iterations == 0 {
        return Err(ExploreError::InvalidConfig(
            "max_iterations must be positive".to_string(),
        ));
    }
    if options.search_width == 0 {
        return Err(ExploreError::InvalidConfig(
            "search_width must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Push one candidate per alternative of every suffix position. Positions
/// are pushed shallow-first so the deepest position is popped first.
fn push_suffix_candidates(work_stack: &mut Vec<Candidate>, pc: &PathCondition) {
    let entries = pc.constraints();
    for suffix_pos in 1..=entries.len() {
        let prefix = &entries[..suffix_pos - 1];
        for alternative in alternatives(&entries[suffix_pos - 1]) {
            work_stack.push(Candidate {
                formula: candidate_formula(prefix, alternative),
                suffix_pos,
            });
        }
    }
}

/// The alternative facts to explore instead of a recorded constraint: the
/// structural negation for branches and switch cases, the two other sign
/// buckets for three-way compares.
fn alternatives(entry: &PathConstraint) -> Vec<Expr> {
    match entry.provenance {
        Provenance::Branch | Provenance::SwitchCase => vec![negate(&entry.expr)],
        Provenance::ThreeWay { .. } => match &entry.expr {
            Expr::Binary(observed, lhs, rhs)
                if matches!(observed, BinOp::Lt | BinOp::Eq | BinOp::Gt) =>
            {
                [BinOp::Lt, BinOp::Eq, BinOp::Gt]
                    .into_iter()
                    .filter(|bucket| bucket != observed)
                    .map(|bucket| Expr::Binary(bucket, lhs.clone(), rhs.clone()))
                    .collect()
            }
            other => vec![negate(other)],
        },
    }
}

/// `c1 && ... && c_{i-1} && alternative`, left-associated.
fn candidate_formula(prefix: &[PathConstraint], alternative: Expr) -> Expr {
    let mut acc: Option<Expr> = None;
    for entry in prefix {
        let expr = entry.expr.clone();
        acc = Some(match acc {
            None => expr,
            Some(conj) => conj.and(expr),
        });
    }
    match acc {
        None => alternative,
        Some(conj) => conj.and(alternative),
    }
}

/// Solve a candidate, excluding already-tried assignments by value. The
/// solver is re-queried with appended disequalities up to
/// `max_solution_retries` times; `None` means the candidate is discarded.
fn solve_fresh<S>(
    solver: &S,
    candidate: &Candidate,
    seeds: &Assignment,
    tried: &HashSet<String>,
    options: &ExploreOptions,
) -> Result<Option<Assignment>, ExploreError>
where
    S: PathSolver + ?Sized,
{
    let mut formula = candidate.formula.clone();
    for _ in 0..=options.max_solution_retries {
        match solver.solve(&formula)? {
            SolveOutcome::Sat(solution) => {
                let mut next = seeds.clone();
                for (name, value) in solution.values() {
                    next.insert(name.clone(), value.clone());
                }
                if !tried.contains(&assignment_key(&next)) {
                    debug!(suffix_pos = candidate.suffix_pos, "fresh assignment found");
                    return Ok(Some(next));
                }
                match exclusion_clause(solution.values()) {
                    Some(clause) => formula = formula.and(clause),
                    None => return Ok(None),
                }
            }
            SolveOutcome::Unsat(kind) => {
                if kind != UnsatKind::Proven {
                    debug!(?kind, suffix_pos = candidate.suffix_pos, "candidate discarded");
                }
                return Ok(None);
            }
        }
    }
    debug!(
        suffix_pos = candidate.suffix_pos,
        retries = options.max_solution_retries,
        "no fresh assignment within retry bound"
    );
    Ok(None)
}

/// A disjunction of disequalities ruling out exactly this solution, for
/// the dedup retry. Only integer bindings can be excluded; `None` when
/// there are none.
fn exclusion_clause(values: &Assignment) -> Option<Expr> {
    let mut clause: Option<Expr> = None;
    for (name, value) in values {
        if let Value::Int(n) = value {
            let ne = Expr::var(name.clone(), Sort::Int).ne(Expr::int(*n));
            clause = Some(match clause {
                None => ne,
                Some(existing) => existing.or(ne),
            });
        }
    }
    clause
}

/// Canonical by-value key of an assignment, independent of insertion
/// order.
fn assignment_key(assignment: &Assignment) -> String {
    let mut entries: Vec<String> = assignment
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    entries.sort();
    entries.join(",")
}
