#![doc = include_str!("../README.md")]

//! Constraint solving for concolic path exploration.
//!
//! The explorer hands candidate path formulas to a [`solver::PathSolver`];
//! the shipped [`bounded::BoundedSolver`] decides conjunctions of simple
//! per-variable integer bounds, equalities, and disequalities within a
//! configurable search window, enumerating disjuncts recursively.

pub mod bounded;
pub mod solver;
