#![doc = include_str!("../README.md")]

//! Concolic path exploration.
//!
//! [`explorer::explore`] drives the fixpoint loop: execute the host with
//! the current seeds, collect the path condition, negate suffixes of it to
//! form candidate formulas, solve for fresh inputs, and iterate until no
//! new paths can be generated or a bound is reached. [`report`] shapes the
//! result into the persisted JSON document.

pub mod explorer;
pub mod report;
