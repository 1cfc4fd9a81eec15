//! Recorder entry points called by the host's instrumentation.
//!
//! Every entry point computes and returns the concrete result of the
//! intercepted operation. When recording is enabled, the reentrancy bound
//! is not hit, and an operand is user-symbolic, it also appends the
//! corresponding constraint to the calling thread's path condition. Entry
//! points never raise into host code: any internal failure degrades to
//! "record nothing, return the concrete result".

use std::cmp::Ordering;

use tracing::debug;

use galago_expr::expr::{BinOp, Expr};
use galago_expr::sorts::Sort;

use crate::path_condition::Provenance;
use crate::session::{ExpectUnpoisoned, Session};
use crate::tag::Tag;

/// Comparison kind of a two-way branch test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpKind {
    pub fn as_binop(self) -> BinOp {
        match self {
            CmpKind::Eq => BinOp::Eq,
            CmpKind::Ne => BinOp::Ne,
            CmpKind::Lt => BinOp::Lt,
            CmpKind::Le => BinOp::Le,
            CmpKind::Gt => BinOp::Gt,
            CmpKind::Ge => BinOp::Ge,
        }
    }

    pub fn complement(self) -> CmpKind {
        match self {
            CmpKind::Eq => CmpKind::Ne,
            CmpKind::Ne => CmpKind::Eq,
            CmpKind::Lt => CmpKind::Ge,
            CmpKind::Ge => CmpKind::Lt,
            CmpKind::Le => CmpKind::Gt,
            CmpKind::Gt => CmpKind::Le,
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpKind::Eq => ord == Ordering::Equal,
            CmpKind::Ne => ord != Ordering::Equal,
            CmpKind::Lt => ord == Ordering::Less,
            CmpKind::Le => ord != Ordering::Greater,
            CmpKind::Gt => ord == Ordering::Greater,
            CmpKind::Ge => ord != Ordering::Less,
        }
    }
}

/// Identity comparison kind for reference operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Eq,
    Ne,
}

/// Unary branch opcode classes: tests of a single operand against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOpcode {
    IfEq,
    IfNe,
    IfLt,
    IfGe,
    IfGt,
    IfLe,
}

impl BranchOpcode {
    /// The comparison against zero this opcode performs when taken.
    pub fn comparison(self) -> CmpKind {
        match self {
            BranchOpcode::IfEq => CmpKind::Eq,
            BranchOpcode::IfNe => CmpKind::Ne,
            BranchOpcode::IfLt => CmpKind::Lt,
            BranchOpcode::IfGe => CmpKind::Ge,
            BranchOpcode::IfGt => CmpKind::Gt,
            BranchOpcode::IfLe => CmpKind::Le,
        }
    }
}

impl Session {
    /// Intercepted two-way integer branch test.
    pub fn icmp_jump(&self, v1: i64, v2: i64, tag1: &Tag, tag2: &Tag, kind: CmpKind) -> bool {
        let _scope = self.recorder_scope();
        let result = kind.holds(v1.cmp(&v2));
        if !self.recording_allowed() || self.depth_exceeded("icmp_jump") {
            return result;
        }
        if let Some((s1, s2)) = self.operand_pair(tag1, Expr::int(v1), tag2, Expr::int(v2)) {
            let op = if result { kind } else { kind.complement() };
            self.append_constraint(Expr::binary(op.as_binop(), s1, s2), Provenance::Branch);
            if self.config.debug {
                debug!(v1, v2, ?kind, result, "icmp_jump");
            }
        }
        result
    }

    /// Intercepted reference identity test over identity words.
    pub fn acmp_jump(&self, id1: u64, id2: u64, tag1: &Tag, tag2: &Tag, kind: IdentityKind) -> bool {
        let _scope = self.recorder_scope();
        let result = match kind {
            IdentityKind::Eq => id1 == id2,
            IdentityKind::Ne => id1 != id2,
        };
        if !self.recording_allowed() || self.depth_exceeded("acmp_jump") {
            return result;
        }
        let conc1 = Expr::int(id1 as i64);
        let conc2 = Expr::int(id2 as i64);
        if let Some((s1, s2)) = self.operand_pair(tag1, conc1, tag2, conc2) {
            let held = match kind {
                IdentityKind::Eq => BinOp::Eq,
                IdentityKind::Ne => BinOp::Ne,
            };
            let op = if result { held } else { held.complement() };
            self.append_constraint(Expr::binary(op, s1, s2), Provenance::Branch);
            if self.config.debug {
                debug!(id1, id2, ?kind, result, "acmp_jump");
            }
        }
        result
    }

    /// Intercepted three-way long compare; returns -1, 0, or 1.
    pub fn lcmp(&self, a: i64, b: i64, tag1: &Tag, tag2: &Tag) -> i32 {
        let _scope = self.recorder_scope();
        let result = match a.cmp(&b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        };
        if !self.recording_allowed() || self.depth_exceeded("lcmp") {
            return result;
        }
        if let Some((s1, s2)) = self.operand_pair(tag1, Expr::int(a), tag2, Expr::int(b)) {
            self.record_three_way(s1, s2, result);
            if self.config.debug {
                debug!(a, b, result, "lcmp");
            }
        }
        result
    }

    /// Intercepted three-way float compare, NaN yields -1.
    pub fn fcmpl(&self, a: f32, b: f32, tag1: &Tag, tag2: &Tag) -> i32 {
        self.float_cmp("fcmpl", a as f64, b as f64, tag1, tag2, -1)
    }

    /// Intercepted three-way float compare, NaN yields +1.
    pub fn fcmpg(&self, a: f32, b: f32, tag1: &Tag, tag2: &Tag) -> i32 {
        self.float_cmp("fcmpg", a as f64, b as f64, tag1, tag2, 1)
    }

    /// Intercepted three-way double compare, NaN yields -1.
    pub fn dcmpl(&self, a: f64, b: f64, tag1: &Tag, tag2: &Tag) -> i32 {
        self.float_cmp("dcmpl", a, b, tag1, tag2, -1)
    }

    /// Intercepted three-way double compare, NaN yields +1.
    pub fn dcmpg(&self, a: f64, b: f64, tag1: &Tag, tag2: &Tag) -> i32 {
        self.float_cmp("dcmpg", a, b, tag1, tag2, 1)
    }

    fn float_cmp(
        &self,
        event: &'static str,
        a: f64,
        b: f64,
        tag1: &Tag,
        tag2: &Tag,
        nan_result: i32,
    ) -> i32 {
        let _scope = self.recorder_scope();
        let result = match a.partial_cmp(&b) {
            None => nan_result,
            Some(Ordering::Less) => -1,
            Some(Ordering::Equal) => 0,
            Some(Ordering::Greater) => 1,
        };
        if !self.recording_allowed() || self.depth_exceeded(event) {
            return result;
        }
        if let Some((s1, s2)) = self.operand_pair(tag1, Expr::real(a), tag2, Expr::real(b)) {
            self.record_three_way(s1, s2, result);
            if self.config.debug {
                debug!(a, b, result, event);
            }
        }
        result
    }

    /// Intercepted unary branch: a test of the tagged variable against
    /// zero of its sort, complemented when the branch was not taken.
    pub fn branch(&self, tag: &Tag, opcode: BranchOpcode, taken: bool) -> bool {
        let _scope = self.recorder_scope();
        if !self.recording_allowed() || self.depth_exceeded("branch") {
            return taken;
        }
        if let Some(var) = self.tagged_var(tag) {
            let zero = match &var {
                Expr::Var(_, Sort::Int) => Expr::int(0),
                Expr::Var(_, Sort::Real) => Expr::real(0.0),
                // Zero tests only make sense on numeric variables.
                _ => return taken,
            };
            let kind = opcode.comparison();
            let op = if taken { kind } else { kind.complement() };
            self.append_constraint(Expr::binary(op.as_binop(), var, zero), Provenance::Branch);
            if self.config.debug {
                debug!(?opcode, taken, "branch");
            }
        }
        taken
    }

    /// Intercepted multi-way select. `selected_case == -1` denotes the
    /// default arm, which records no constraint.
    pub fn switch_case(&self, tag: &Tag, selected_case: i32) -> i32 {
        let _scope = self.recorder_scope();
        if selected_case == -1 {
            return selected_case;
        }
        if !self.recording_allowed() || self.depth_exceeded("switch_case") {
            return selected_case;
        }
        if let Some(var) = self.tagged_var(tag) {
            if matches!(var, Expr::Var(_, Sort::Int)) {
                self.append_constraint(
                    var.eq(Expr::int(selected_case as i64)),
                    Provenance::SwitchCase,
                );
                if self.config.debug {
                    debug!(selected_case, "switch_case");
                }
            }
        }
        selected_case
    }

    // ----- constraint construction -----

    fn record_three_way(&self, s1: Expr, s2: Expr, observed: i32) {
        let op = match observed.cmp(&0) {
            Ordering::Less => BinOp::Lt,
            Ordering::Equal => BinOp::Eq,
            Ordering::Greater => BinOp::Gt,
        };
        self.append_constraint(
            Expr::binary(op, s1, s2),
            Provenance::ThreeWay {
                observed: observed as i8,
            },
        );
    }

    /// Resolve both operands, substituting a `Var` node for each operand
    /// whose tag carries a registered label with a declared variable.
    /// Returns `None` when neither operand is user-symbolic: the
    /// relevance filter that keeps purely concrete events out of the
    /// buffer.
    fn operand_pair(
        &self,
        tag1: &Tag,
        concrete1: Expr,
        tag2: &Tag,
        concrete2: Expr,
    ) -> Option<(Expr, Expr)> {
        let s1 = self.tagged_var(tag1);
        let s2 = self.tagged_var(tag2);
        if s1.is_none() && s2.is_none() {
            return None;
        }
        Some((s1.unwrap_or(concrete1), s2.unwrap_or(concrete2)))
    }

    /// The `Var` node for a tag's registered label, if it names a declared
    /// symbolic variable.
    fn tagged_var(&self, tag: &Tag) -> Option<Expr> {
        let label = {
            let labels = self.labels.lock().expect_unpoisoned();
            labels.registered_label(tag).map(str::to_string)
        };
        let label = label?;
        let sort = self.var_sort(&label)?;
        Some(Expr::var(label, sort))
    }
}
