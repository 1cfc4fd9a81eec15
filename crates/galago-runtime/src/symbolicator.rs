use thiserror::Error;

use galago_expr::eval::{Assignment, Value};
use galago_expr::sorts::Sort;

use crate::session::{ExpectUnpoisoned, Session, VarInfo};
use crate::tag::Tag;

/// Error raised when declaring or reseeding symbolic variables.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolicError {
    #[error("symbolic variable name must not be empty")]
    EmptyName,
    #[error("symbolic variable '{name}' is declared {existing}, cannot re-declare as {requested}")]
    SortConflict {
        name: String,
        existing: Sort,
        requested: Sort,
    },
    #[error("unknown symbolic variable '{0}'")]
    UnknownVariable(String),
    #[error("seed for '{name}' has sort {got}, variable is declared {declared}")]
    SeedSortMismatch {
        name: String,
        declared: Sort,
        got: Sort,
    },
}

impl Session {
    /// Declare (or reseed) an integer symbolic variable and return its tag.
    ///
    /// The variable's name doubles as its symbolic label; the returned tag
    /// is what the host attaches to the concrete value at instrumentation
    /// time.
    pub fn make_symbolic_int(&self, name: &str, seed: i64) -> Result<Tag, SymbolicError> {
        self.make_symbolic(name, Sort::Int, Value::Int(seed))
    }

    /// Declare (or reseed) a real symbolic variable and return its tag.
    pub fn make_symbolic_real(&self, name: &str, seed: f64) -> Result<Tag, SymbolicError> {
        self.make_symbolic(name, Sort::Real, Value::Real(seed))
    }

    /// Declare (or reseed) a string symbolic variable and return its tag.
    pub fn make_symbolic_str(&self, name: &str, seed: &str) -> Result<Tag, SymbolicError> {
        self.make_symbolic(name, Sort::Str, Value::Str(seed.to_string()))
    }

    fn make_symbolic(&self, name: &str, sort: Sort, seed: Value) -> Result<Tag, SymbolicError> {
        if name.is_empty() {
            return Err(SymbolicError::EmptyName);
        }
        {
            let mut vars = self.vars.lock().expect_unpoisoned();
            if let Some(existing) = vars.get(name) {
                if existing.sort != sort {
                    return Err(SymbolicError::SortConflict {
                        name: name.to_string(),
                        existing: existing.sort,
                        requested: sort,
                    });
                }
            }
            vars.insert(name.to_string(), VarInfo { sort, seed });
        }
        self.add_label(name);
        Ok(Tag::of(name))
    }

    /// The declared sort of a symbolic variable.
    pub fn var_sort(&self, name: &str) -> Option<Sort> {
        self.vars
            .lock()
            .expect_unpoisoned()
            .get(name)
            .map(|info| info.sort)
    }

    /// The current seed of a symbolic variable.
    pub fn seed_of(&self, name: &str) -> Option<Value> {
        self.vars
            .lock()
            .expect_unpoisoned()
            .get(name)
            .map(|info| info.seed.clone())
    }

    /// The current seeds of every declared variable, in declaration order.
    pub fn seeds(&self) -> Assignment {
        self.vars
            .lock()
            .expect_unpoisoned()
            .iter()
            .map(|(name, info)| (name.clone(), info.seed.clone()))
            .collect()
    }

    /// Reseed declared variables from `assignment`; sorts must match.
    pub fn set_seeds(&self, assignment: &Assignment) -> Result<(), SymbolicError> {
        let mut vars = self.vars.lock().expect_unpoisoned();
        for (name, value) in assignment {
            let info = vars
                .get_mut(name)
                .ok_or_else(|| SymbolicError::UnknownVariable(name.clone()))?;
            if info.sort != value.sort() {
                return Err(SymbolicError::SeedSortMismatch {
                    name: name.clone(),
                    declared: info.sort,
                    got: value.sort(),
                });
            }
            info.seed = value.clone();
        }
        Ok(())
    }

    /// Clear session state: registered labels, declared variables, and the
    /// calling thread's path condition.
    pub fn reset(&self) {
        self.clear_labels();
        self.vars.lock().expect_unpoisoned().clear();
        self.reset_thread_state();
    }
}
