use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

use indexmap::IndexMap;
use tracing::warn;

use galago_expr::eval::Value;
use galago_expr::sorts::Sort;

use crate::path_condition::{PathCondition, PathConstraint, Provenance};
use crate::tag::LabelRegistry;

/// Default bound on nested recorder entries per thread.
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 10;

/// Recorder configuration, fixed at session construction.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Master gate: when false, every entry point degrades to its concrete
    /// computation.
    pub interception_enabled: bool,
    /// Emit per-event diagnostics at `debug` level.
    pub debug: bool,
    /// Reentrancy bound; at this nesting depth entry points become no-ops.
    pub max_recursion_depth: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            interception_enabled: true,
            debug: false,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl RecorderConfig {
    /// Configuration from the `GALAGO_INTERCEPTION`, `GALAGO_DEBUG`, and
    /// `GALAGO_MAX_RECURSION_DEPTH` environment variables, for hosts that
    /// cannot pass configuration through comparison sites.
    pub fn from_env() -> Self {
        let mut config = RecorderConfig::default();
        if let Ok(value) = std::env::var("GALAGO_INTERCEPTION") {
            config.interception_enabled = !matches!(value.as_str(), "0" | "false" | "off");
        }
        if let Ok(value) = std::env::var("GALAGO_DEBUG") {
            config.debug = matches!(value.as_str(), "1" | "true" | "on");
        }
        if let Ok(value) = std::env::var("GALAGO_MAX_RECURSION_DEPTH") {
            if let Ok(depth) = value.parse() {
                config.max_recursion_depth = depth;
            }
        }
        config
    }
}

/// A declared symbolic variable: its sort and current concrete seed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VarInfo {
    pub sort: Sort,
    pub seed: Value,
}

/// Per-thread recording state: the active path condition, the reentrancy
/// depth, and the one-shot warning latch.
#[derive(Default)]
struct ThreadState {
    pc: PathCondition,
    depth: u32,
    depth_warned: bool,
    next_seq: u64,
}

thread_local! {
    static THREAD_STATE: RefCell<ThreadState> = RefCell::new(ThreadState::default());
}

static GLOBAL_SESSION: OnceLock<Session> = OnceLock::new();

/// A concolic recording session.
///
/// Owns the process-wide shared state: the registered symbolic labels, the
/// symbolic variable registry, the recorder configuration, and the
/// shutdown flag. The path-condition buffer and the reentrancy depth are
/// per-thread; each recording thread accumulates its own path condition.
pub struct Session {
    pub(crate) labels: Mutex<LabelRegistry>,
    pub(crate) vars: Mutex<IndexMap<String, VarInfo>>,
    shutting_down: AtomicBool,
    pub(crate) config: RecorderConfig,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session::with_config(RecorderConfig::default())
    }

    pub fn with_config(config: RecorderConfig) -> Self {
        Session {
            labels: Mutex::new(LabelRegistry::new()),
            vars: Mutex::new(IndexMap::new()),
            shutting_down: AtomicBool::new(false),
            config,
        }
    }

    /// The process-wide default session, a thin façade over the explicit
    /// form for hosts that cannot thread a session through comparison
    /// sites. Configured from the environment on first use.
    pub fn global() -> &'static Session {
        GLOBAL_SESSION.get_or_init(|| Session::with_config(RecorderConfig::from_env()))
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    // ----- label registry -----

    /// Register a label as user-symbolic.
    pub fn add_label(&self, label: impl Into<String>) {
        self.labels.lock().expect_unpoisoned().add(label);
    }

    /// Clear all registered labels.
    pub fn clear_labels(&self) {
        self.labels.lock().expect_unpoisoned().clear();
    }

    // ----- shutdown -----

    /// Flip the process-wide shutdown flag; all subsequent recorder calls
    /// degrade to their concrete computations. Installed from the host's
    /// shutdown hook so late comparisons cannot allocate new constraints.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    // ----- per-thread path condition -----

    /// Snapshot the calling thread's path condition without clearing it.
    pub fn snapshot_pc(&self) -> PathCondition {
        THREAD_STATE.with(|state| state.borrow().pc.snapshot())
    }

    /// Take the calling thread's path condition, leaving an empty buffer.
    pub fn flush(&self) -> PathCondition {
        THREAD_STATE.with(|state| std::mem::take(&mut state.borrow_mut().pc))
    }

    /// Clear the calling thread's path condition.
    pub fn reset_pc(&self) {
        THREAD_STATE.with(|state| state.borrow_mut().pc.reset());
    }

    /// Number of constraints collected on the calling thread.
    pub fn constraint_count(&self) -> usize {
        THREAD_STATE.with(|state| state.borrow().pc.len())
    }

    pub(crate) fn append_constraint(&self, expr: galago_expr::expr::Expr, provenance: Provenance) {
        THREAD_STATE.with(|state| {
            let mut state = state.borrow_mut();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.pc.append(PathConstraint {
                expr,
                provenance,
                seq,
            });
        });
    }

    pub(crate) fn reset_thread_state(&self) {
        THREAD_STATE.with(|state| {
            let mut state = state.borrow_mut();
            state.pc.reset();
            state.next_seq = 0;
            state.depth_warned = false;
        });
    }

    // ----- reentrancy guard -----

    /// Mark the calling thread as inside recorder plumbing for the scope
    /// of the returned guard. Entry points reached while the nesting depth
    /// is at the configured bound degrade to their concrete computations;
    /// the depth is decremented on every exit path when the guard drops.
    pub fn recorder_scope(&self) -> RecorderScope {
        THREAD_STATE.with(|state| state.borrow_mut().depth += 1);
        RecorderScope { _private: () }
    }

    /// True when the calling thread's nesting depth has reached the bound;
    /// emits the one-shot diagnostic on the first trip.
    pub(crate) fn depth_exceeded(&self, event: &'static str) -> bool {
        THREAD_STATE.with(|state| {
            let mut state = state.borrow_mut();
            if state.depth < self.config.max_recursion_depth {
                return false;
            }
            if !state.depth_warned {
                state.depth_warned = true;
                warn!(
                    event,
                    depth = state.depth,
                    bound = self.config.max_recursion_depth,
                    "recorder reentrancy bound reached; suppressing constraint collection for this call chain"
                );
            }
            true
        })
    }

    /// Recording is allowed unless interception is disabled or the process
    /// is shutting down.
    pub(crate) fn recording_allowed(&self) -> bool {
        self.config.interception_enabled && !self.is_shutting_down()
    }
}

/// Scoped reentrancy marker returned by [`Session::recorder_scope`].
#[must_use = "the depth is released when the scope is dropped"]
pub struct RecorderScope {
    _private: (),
}

impl Drop for RecorderScope {
    fn drop(&mut self) {
        THREAD_STATE.with(|state| {
            let mut state = state.borrow_mut();
            if state.depth > 0 {
                state.depth -= 1;
            }
        });
    }
}

/// Lock helper: the registries hold no invariants that survive a panic, so
/// a poisoned lock is recovered rather than propagated into host code.
pub(crate) trait ExpectUnpoisoned<T> {
    fn expect_unpoisoned(self) -> T;
}

impl<'a, T> ExpectUnpoisoned<std::sync::MutexGuard<'a, T>>
    for Result<std::sync::MutexGuard<'a, T>, std::sync::PoisonError<std::sync::MutexGuard<'a, T>>>
{
    fn expect_unpoisoned(self) -> std::sync::MutexGuard<'a, T> {
        self.unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
