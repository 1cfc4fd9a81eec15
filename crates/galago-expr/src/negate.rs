use crate::expr::{BinOp, Expr, UnOp};

/// Return an expression logically equivalent to the negation of `expr`.
///
/// Comparison roots are complemented (`== ↔ !=`, `< ↔ >=`, `<= ↔ >`),
/// conjunctions and disjunctions are rewritten by De Morgan, and a double
/// negation is eliminated. Anything else is wrapped in a boolean `Not`.
///
/// Total and pure; an involution on comparison-rooted and
/// connective-rooted trees.
pub fn negate(expr: &Expr) -> Expr {
    match expr {
        Expr::Binary(op, lhs, rhs) if op.is_comparison() => {
            Expr::Binary(op.complement(), lhs.clone(), rhs.clone())
        }
        Expr::Binary(BinOp::And, lhs, rhs) => {
            Expr::Binary(BinOp::Or, Box::new(negate(lhs)), Box::new(negate(rhs)))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            Expr::Binary(BinOp::And, Box::new(negate(lhs)), Box::new(negate(rhs)))
        }
        Expr::Unary(UnOp::Not, inner) => (**inner).clone(),
        other => Expr::Unary(UnOp::Not, Box::new(other.clone())),
    }
}
