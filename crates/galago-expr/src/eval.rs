use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{BinOp, Expr, UnOp};
use crate::sorts::Sort;

/// A concrete value of one of the expression sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
}

impl Value {
    pub fn sort(&self) -> Sort {
        match self {
            Value::Bool(_) => Sort::Bool,
            Value::Int(_) => Sort::Int,
            Value::Real(_) => Sort::Real,
            Value::Str(_) => Sort::Str,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Real(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// A binding of variable names to concrete values, iteration-ordered.
pub type Assignment = IndexMap<String, Value>;

/// Error produced when an expression cannot be evaluated under an
/// assignment.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),
    #[error("variable '{name}' is declared {declared} but bound to a {bound} value")]
    BindingSortMismatch {
        name: String,
        declared: Sort,
        bound: Sort,
    },
    #[error("operator {op} cannot be applied to {lhs} and {rhs}")]
    IllSorted { op: &'static str, lhs: Sort, rhs: Sort },
    #[error("boolean negation applied to {0}")]
    NotOnNonBool(Sort),
    #[error("arithmetic negation applied to {0}")]
    NegOnNonNumeric(Sort),
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in {0}")]
    Overflow(&'static str),
}

/// Evaluate an expression to a concrete value under `env`.
pub fn evaluate(expr: &Expr, env: &Assignment) -> Result<Value, EvalError> {
    match expr {
        Expr::Var(name, sort) => {
            let value = env
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundVariable(name.clone()))?;
            if value.sort() == *sort {
                Ok(value)
            } else {
                Err(EvalError::BindingSortMismatch {
                    name: name.clone(),
                    declared: *sort,
                    bound: value.sort(),
                })
            }
        }
        Expr::IntConst(n) => Ok(Value::Int(*n)),
        Expr::RealConst(x) => Ok(Value::Real(*x)),
        Expr::StrConst(s) => Ok(Value::Str(s.clone())),
        Expr::BoolConst(b) => Ok(Value::Bool(*b)),
        Expr::Binary(op, lhs, rhs) => {
            let l = evaluate(lhs, env)?;
            let r = evaluate(rhs, env)?;
            apply_binary(*op, l, r)
        }
        Expr::Unary(UnOp::Not, inner) => match evaluate(inner, env)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError::NotOnNonBool(other.sort())),
        },
        Expr::Unary(UnOp::Neg, inner) => match evaluate(inner, env)? {
            Value::Int(n) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or(EvalError::Overflow("-")),
            Value::Real(x) => Ok(Value::Real(-x)),
            other => Err(EvalError::NegOnNonNumeric(other.sort())),
        },
    }
}

fn apply_binary(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    if op.is_comparison() {
        compare(op, l, r)
    } else if op.is_connective() {
        match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
                BinOp::And => a && b,
                _ => a || b,
            })),
            (l, r) => Err(EvalError::IllSorted {
                op: op.symbol(),
                lhs: l.sort(),
                rhs: r.sort(),
            }),
        }
    } else {
        arithmetic(op, l, r)
    }
}

fn compare(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    let outcome = match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => ordered(op, a.cmp(b)),
        (Value::Real(a), Value::Real(b)) => float_compare(op, *a, *b),
        (Value::Int(a), Value::Real(b)) => float_compare(op, *a as f64, *b),
        (Value::Real(a), Value::Int(b)) => float_compare(op, *a, *b as f64),
        (Value::Str(a), Value::Str(b)) if matches!(op, BinOp::Eq | BinOp::Ne) => {
            Some((a == b) == (op == BinOp::Eq))
        }
        (Value::Bool(a), Value::Bool(b)) if matches!(op, BinOp::Eq | BinOp::Ne) => {
            Some((a == b) == (op == BinOp::Eq))
        }
        _ => None,
    };
    outcome.map(Value::Bool).ok_or(EvalError::IllSorted {
        op: op.symbol(),
        lhs: l.sort(),
        rhs: r.sort(),
    })
}

fn ordered(op: BinOp, ord: std::cmp::Ordering) -> Option<bool> {
    use std::cmp::Ordering::*;
    Some(match op {
        BinOp::Eq => ord == Equal,
        BinOp::Ne => ord != Equal,
        BinOp::Lt => ord == Less,
        BinOp::Le => ord != Greater,
        BinOp::Gt => ord == Greater,
        BinOp::Ge => ord != Less,
        _ => return None,
    })
}

/// IEEE semantics: every ordering comparison against NaN is false, and
/// NaN is unequal to everything including itself.
fn float_compare(op: BinOp, a: f64, b: f64) -> Option<bool> {
    match a.partial_cmp(&b) {
        Some(ord) => ordered(op, ord),
        None => Some(op == BinOp::Ne),
    }
}

fn arithmetic(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => int_arithmetic(op, *a, *b),
        (Value::Real(a), Value::Real(b)) => Ok(Value::Real(real_arithmetic(op, *a, *b))),
        (Value::Int(a), Value::Real(b)) => Ok(Value::Real(real_arithmetic(op, *a as f64, *b))),
        (Value::Real(a), Value::Int(b)) => Ok(Value::Real(real_arithmetic(op, *a, *b as f64))),
        _ => Err(EvalError::IllSorted {
            op: op.symbol(),
            lhs: l.sort(),
            rhs: r.sort(),
        }),
    }
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => a.checked_add(b).ok_or(EvalError::Overflow("+"))?,
        BinOp::Sub => a.checked_sub(b).ok_or(EvalError::Overflow("-"))?,
        BinOp::Mul => a.checked_mul(b).ok_or(EvalError::Overflow("*"))?,
        BinOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
        BinOp::Div => a.checked_div(b).ok_or(EvalError::Overflow("/"))?,
        BinOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
        BinOp::Rem => a.checked_rem(b).ok_or(EvalError::Overflow("%"))?,
        _ => unreachable!("non-arithmetic operator"),
    };
    Ok(Value::Int(result))
}

fn real_arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        _ => unreachable!("non-arithmetic operator"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, Value)]) -> Assignment {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn evaluates_integer_comparison_under_assignment() {
        let expr = Expr::var("x", Sort::Int).gt(Expr::int(10));
        let sigma = env(&[("x", Value::Int(11))]);
        assert_eq!(evaluate(&expr, &sigma), Ok(Value::Bool(true)));
        let sigma = env(&[("x", Value::Int(10))]);
        assert_eq!(evaluate(&expr, &sigma), Ok(Value::Bool(false)));
    }

    #[test]
    fn evaluates_connectives() {
        let expr = Expr::var("x", Sort::Int)
            .ge(Expr::int(0))
            .and(Expr::var("x", Sort::Int).lt(Expr::int(100)));
        assert_eq!(
            evaluate(&expr, &env(&[("x", Value::Int(42))])),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate(&expr, &env(&[("x", Value::Int(-1))])),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn evaluates_arithmetic_with_coercion() {
        let expr = Expr::var("x", Sort::Int).add(Expr::real(0.5));
        assert_eq!(
            evaluate(&expr, &env(&[("x", Value::Int(2))])),
            Ok(Value::Real(2.5))
        );
    }

    #[test]
    fn unbound_variable_is_reported() {
        let expr = Expr::var("missing", Sort::Int).eq(Expr::int(0));
        assert_eq!(
            evaluate(&expr, &env(&[])),
            Err(EvalError::UnboundVariable("missing".to_string()))
        );
    }

    #[test]
    fn binding_sort_mismatch_is_reported() {
        let expr = Expr::var("x", Sort::Int).eq(Expr::int(0));
        let sigma = env(&[("x", Value::Str("oops".to_string()))]);
        assert!(matches!(
            evaluate(&expr, &sigma),
            Err(EvalError::BindingSortMismatch { .. })
        ));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = Expr::int(1).div(Expr::int(0));
        assert_eq!(evaluate(&expr, &env(&[])), Err(EvalError::DivisionByZero));
        let expr = Expr::int(1).rem(Expr::int(0));
        assert_eq!(evaluate(&expr, &env(&[])), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let expr = Expr::int(i64::MAX).add(Expr::int(1));
        assert_eq!(evaluate(&expr, &env(&[])), Err(EvalError::Overflow("+")));
    }

    #[test]
    fn nan_compares_unequal_to_everything() {
        let nan = Expr::real(f64::NAN);
        assert_eq!(
            evaluate(&nan.clone().eq(Expr::real(1.0)), &env(&[])),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            evaluate(&nan.clone().ne(nan.clone()), &env(&[])),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate(&nan.clone().lt(Expr::real(1.0)), &env(&[])),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn string_equality_and_disequality() {
        let expr = Expr::var("s", Sort::Str).eq(Expr::string("abc"));
        assert_eq!(
            evaluate(&expr, &env(&[("s", Value::Str("abc".to_string()))])),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            evaluate(&expr, &env(&[("s", Value::Str("xyz".to_string()))])),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn negation_evaluates_oppositely() {
        use crate::negate::negate;
        let expr = Expr::var("x", Sort::Int).le(Expr::int(7));
        for value in [-1, 7, 8] {
            let sigma = env(&[("x", Value::Int(value))]);
            let direct = evaluate(&expr, &sigma).unwrap().as_bool().unwrap();
            let negated = evaluate(&negate(&expr), &sigma).unwrap().as_bool().unwrap();
            assert_eq!(direct, !negated);
        }
    }
}
