use thiserror::Error;

use crate::sorts::Sort;

/// Binary operators over expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Boolean connectives
    And,
    Or,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_connective(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    /// The comparison obtained by swapping the operands.
    ///
    /// `Eq` and `Ne` are symmetric; non-comparison operators are returned
    /// unchanged.
    pub fn flip(self) -> BinOp {
        match self {
            BinOp::Lt => BinOp::Gt,
            BinOp::Le => BinOp::Ge,
            BinOp::Gt => BinOp::Lt,
            BinOp::Ge => BinOp::Le,
            other => other,
        }
    }

    /// The logical complement of a comparison.
    ///
    /// Non-comparison operators are returned unchanged.
    pub fn complement(self) -> BinOp {
        match self {
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            BinOp::Lt => BinOp::Ge,
            BinOp::Ge => BinOp::Lt,
            BinOp::Le => BinOp::Gt,
            BinOp::Gt => BinOp::Le,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
        }
    }
}

/// Unary operators over expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    /// Boolean negation.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Abstract constraint expression, solver-agnostic.
///
/// Expressions are immutable after construction and shared by structural
/// reference; equality is structural over the whole tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable reference by name, with its declared sort.
    Var(String, Sort),
    /// Integer literal.
    IntConst(i64),
    /// Real literal.
    RealConst(f64),
    /// String literal.
    StrConst(String),
    /// Boolean literal.
    BoolConst(bool),
    /// Binary operation.
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Unary operation.
    Unary(UnOp, Box<Expr>),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<String>, sort: Sort) -> Self {
        Expr::Var(name.into(), sort)
    }

    pub fn int(n: i64) -> Self {
        Expr::IntConst(n)
    }

    pub fn real(x: f64) -> Self {
        Expr::RealConst(x)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::StrConst(s.into())
    }

    pub fn bool(b: bool) -> Self {
        Expr::BoolConst(b)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(BinOp::Eq, self, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::binary(BinOp::Ne, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinOp::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::binary(BinOp::Le, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinOp::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::binary(BinOp::Ge, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinOp::Or, self, other)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::binary(BinOp::Add, self, other)
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::binary(BinOp::Sub, self, other)
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::binary(BinOp::Mul, self, other)
    }

    pub fn div(self, other: Expr) -> Self {
        Expr::binary(BinOp::Div, self, other)
    }

    pub fn rem(self, other: Expr) -> Self {
        Expr::binary(BinOp::Rem, self, other)
    }

    pub fn not(self) -> Self {
        Expr::Unary(UnOp::Not, Box::new(self))
    }

    pub fn neg(self) -> Self {
        Expr::Unary(UnOp::Neg, Box::new(self))
    }
}

/// Error produced by sort inference on a malformed composition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("operator {op} cannot compare {lhs} with {rhs}")]
    IncomparableOperands { op: &'static str, lhs: Sort, rhs: Sort },
    #[error("connective {op} expects boolean operands, got {lhs} and {rhs}")]
    NonBooleanConnective { op: &'static str, lhs: Sort, rhs: Sort },
    #[error("arithmetic operator {op} expects matching numeric operands, got {lhs} and {rhs}")]
    NonNumericArithmetic { op: &'static str, lhs: Sort, rhs: Sort },
    #[error("boolean negation applied to {0}")]
    NotOnNonBool(Sort),
    #[error("arithmetic negation applied to {0}")]
    NegOnNonNumeric(Sort),
}

impl Expr {
    /// Infer the sort of this expression, failing fast on malformed
    /// compositions.
    ///
    /// Comparisons yield `Bool`; an `Int` operand mixed with a `Real`
    /// operand coerces to `Real`. Ordering comparisons require numeric
    /// operands; equality also accepts matching `Str` or `Bool` operands.
    pub fn sort(&self) -> Result<Sort, SortError> {
        match self {
            Expr::Var(_, sort) => Ok(*sort),
            Expr::IntConst(_) => Ok(Sort::Int),
            Expr::RealConst(_) => Ok(Sort::Real),
            Expr::StrConst(_) => Ok(Sort::Str),
            Expr::BoolConst(_) => Ok(Sort::Bool),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.sort()?;
                let r = rhs.sort()?;
                if op.is_comparison() {
                    Self::comparison_sort(*op, l, r)
                } else if op.is_connective() {
                    if l == Sort::Bool && r == Sort::Bool {
                        Ok(Sort::Bool)
                    } else {
                        Err(SortError::NonBooleanConnective {
                            op: op.symbol(),
                            lhs: l,
                            rhs: r,
                        })
                    }
                } else {
                    Self::arithmetic_sort(*op, l, r)
                }
            }
            Expr::Unary(UnOp::Not, inner) => match inner.sort()? {
                Sort::Bool => Ok(Sort::Bool),
                other => Err(SortError::NotOnNonBool(other)),
            },
            Expr::Unary(UnOp::Neg, inner) => match inner.sort()? {
                sort if sort.is_numeric() => Ok(sort),
                other => Err(SortError::NegOnNonNumeric(other)),
            },
        }
    }

    fn comparison_sort(op: BinOp, l: Sort, r: Sort) -> Result<Sort, SortError> {
        let numeric_pair = l.is_numeric() && r.is_numeric();
        let matching_eq = l == r && matches!(op, BinOp::Eq | BinOp::Ne);
        if numeric_pair || matching_eq {
            Ok(Sort::Bool)
        } else {
            Err(SortError::IncomparableOperands {
                op: op.symbol(),
                lhs: l,
                rhs: r,
            })
        }
    }

    fn arithmetic_sort(op: BinOp, l: Sort, r: Sort) -> Result<Sort, SortError> {
        match (l, r) {
            (Sort::Int, Sort::Int) => Ok(Sort::Int),
            (Sort::Real, Sort::Real) | (Sort::Int, Sort::Real) | (Sort::Real, Sort::Int) => {
                Ok(Sort::Real)
            }
            _ => Err(SortError::NonNumericArithmetic {
                op: op.symbol(),
                lhs: l,
                rhs: r,
            }),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::printer::render(self))
    }
}
