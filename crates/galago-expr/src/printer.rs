use crate::expr::{Expr, UnOp};

/// Render an expression in the stable text grammar.
///
/// Binary nodes are fully parenthesized, so the rendering is unambiguous
/// and reproducible; this is the form persisted in session reports and used
/// for path-condition fingerprints. Real literals render with a decimal
/// point, string literals with quotes and escapes.
pub fn render(expr: &Expr) -> String {
    match expr {
        Expr::Var(name, _) => name.clone(),
        Expr::IntConst(n) => n.to_string(),
        Expr::RealConst(x) => format!("{x:?}"),
        Expr::StrConst(s) => format!("{s:?}"),
        Expr::BoolConst(b) => b.to_string(),
        Expr::Binary(op, lhs, rhs) => {
            format!("({} {} {})", render(lhs), op.symbol(), render(rhs))
        }
        Expr::Unary(UnOp::Not, inner) => format!("!{}", render(inner)),
        Expr::Unary(UnOp::Neg, inner) => format!("-{}", render(inner)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sorts::Sort;

    fn x() -> Expr {
        Expr::var("x", Sort::Int)
    }

    #[test]
    fn render_simple_comparison() {
        assert_eq!(render(&x().ge(Expr::int(0))), "(x >= 0)");
        assert_eq!(render(&x().lt(Expr::int(10))), "(x < 10)");
    }

    #[test]
    fn render_negative_integer() {
        assert_eq!(render(&Expr::int(-5)), "-5");
        assert_eq!(render(&x().ne(Expr::int(-1))), "(x != -1)");
    }

    #[test]
    fn render_real_keeps_decimal_point() {
        assert_eq!(render(&Expr::real(1.0)), "1.0");
        assert_eq!(render(&Expr::real(-0.5)), "-0.5");
    }

    #[test]
    fn render_string_is_quoted_and_escaped() {
        assert_eq!(render(&Expr::string("abc")), "\"abc\"");
        assert_eq!(render(&Expr::string("a\"b")), "\"a\\\"b\"");
    }

    #[test]
    fn render_boolean_literals() {
        assert_eq!(render(&Expr::bool(true)), "true");
        assert_eq!(render(&Expr::bool(false)), "false");
    }

    #[test]
    fn render_conjunction_is_parenthesized() {
        let expr = x().ge(Expr::int(0)).and(x().lt(Expr::int(100)));
        assert_eq!(render(&expr), "((x >= 0) && (x < 100))");
    }

    #[test]
    fn render_disjunction_of_comparisons() {
        let expr = x().le(Expr::int(0)).or(Expr::var("y", Sort::Int).ge(Expr::int(10)));
        assert_eq!(render(&expr), "((x <= 0) || (y >= 10))");
    }

    #[test]
    fn render_not_and_neg() {
        assert_eq!(render(&x().eq(Expr::int(5)).not()), "!(x == 5)");
        assert_eq!(render(&x().neg()), "-x");
        assert_eq!(render(&Expr::var("b", Sort::Bool).not()), "!b");
    }

    #[test]
    fn render_arithmetic_inside_comparison() {
        let expr = x().add(Expr::int(1)).mul(Expr::int(3)).ge(Expr::int(0));
        assert_eq!(render(&expr), "(((x + 1) * 3) >= 0)");
    }

    #[test]
    fn render_div_and_rem() {
        let expr = x().div(Expr::int(2)).eq(x().rem(Expr::int(2)));
        assert_eq!(render(&expr), "((x / 2) == (x % 2))");
    }

    #[test]
    fn display_delegates_to_render() {
        let expr = x().gt(Expr::int(10));
        assert_eq!(expr.to_string(), "(x > 10)");
    }

    #[test]
    fn equal_trees_render_identically() {
        let a = x().eq(Expr::int(3));
        let b = x().eq(Expr::int(3));
        assert_eq!(render(&a), render(&b));
    }
}
