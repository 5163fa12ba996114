use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a frontier over one crawl run
///
/// `Idle -> Running -> (Exhausted | CeilingReached) -> Done`. A frontier that
/// reported `Exhausted` returns to `Running` if in-flight pages enqueue more
/// work before the run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontierState {
    Idle,
    Running,
    Exhausted,
    CeilingReached,
    Done,
}

impl FrontierState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Exhausted => "exhausted",
            Self::CeilingReached => "ceiling_reached",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for FrontierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every reachable in-scope page was visited
    Exhausted,

    /// The page ceiling stopped the run with work still queued
    CeilingReached,

    /// A fatal error stopped the run
    Aborted,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::CeilingReached => "ceiling_reached",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
