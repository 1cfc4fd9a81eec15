#![doc = include_str!("../README.md")]

//! Expression algebra for concolic path constraints.
//!
//! This crate defines the solver-agnostic expression trees that the recorder
//! builds at comparison sites, together with sort inference, a stable text
//! rendering used in diagnostics and persisted output, structural negation,
//! and a concrete evaluator over variable assignments.

pub mod eval;
pub mod expr;
pub mod negate;
pub mod printer;
pub mod sorts;
