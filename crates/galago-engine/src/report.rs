use serde::{Deserialize, Serialize};

use galago_expr::eval::Assignment;

use crate::explorer::ExplorationReport;

/// Schema version of the persisted session report.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Why an exploration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatedReason {
    /// The work queue emptied: no further candidate inputs exist.
    #[serde(rename = "exhausted")]
    Exhausted,
    /// The execution bound was reached first.
    #[serde(rename = "max_iterations")]
    MaxIterations,
    /// The cancel token was flipped between iterations.
    #[serde(rename = "cancelled")]
    Cancelled,
}

/// One explored path in the persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReport {
    pub seeds: Assignment,
    pub constraints: Vec<String>,
    pub duration_ns: u64,
}

/// The per-session JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub schema_version: u32,
    pub paths: Vec<PathReport>,
    pub iterations: u32,
    pub terminated_reason: TerminatedReason,
}

impl SessionReport {
    pub fn from_exploration(report: &ExplorationReport) -> Self {
        SessionReport {
            schema_version: REPORT_SCHEMA_VERSION,
            paths: report
                .paths
                .iter()
                .map(|path| PathReport {
                    seeds: path.seeds.clone(),
                    constraints: path.rendered_constraints(),
                    duration_ns: path.duration.as_nanos() as u64,
                })
                .collect(),
            iterations: report.iterations,
            terminated_reason: report.terminated_reason,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
