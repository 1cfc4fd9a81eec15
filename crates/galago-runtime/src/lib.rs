#![doc = include_str!("../README.md")]

//! Runtime recording support for concolic path exploration.
//!
//! The host's instrumentation calls the recorder entry points on
//! [`session::Session`] at every tracked comparison, branch, and switch;
//! constraints accumulate in a per-thread path-condition buffer that the
//! host snapshots between executions and hands to the explorer.

pub mod path_condition;
pub mod recorder;
pub mod session;
pub mod symbolicator;
pub mod tag;
