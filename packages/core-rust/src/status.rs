//! Node status reporting model.
//!
//! Mirrors the status badge a flow editor draws under a node: a fill colour,
//! a shape and a short text.

use std::fmt;

use serde::Serialize;

/// What caused an emission cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Scheduled tick.
    Timer,
    /// Inbound message from upstream.
    Input,
    /// Administrative inject request. Shown as `input` in status texts.
    Manual,
}

impl TriggerSource {
    /// Label used in status texts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timer => "sent",
            Self::Input | Self::Manual => "input",
        }
    }
}

/// Status updates reported by a simulator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeStatus {
    /// Configuration accepted, waiting for the first tick.
    Starting,
    /// A payload was emitted.
    Sent { source: TriggerSource, at_ms: u64 },
    /// A payload was built but suppressed because no trigger field changed.
    NoChange { at_ms: u64 },
    /// Configuration could not be parsed; the node is not running.
    ConfigError { message: String },
    /// The node stopped and its status badge is cleared.
    Cleared,
}

/// Badge fill colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    Blue,
    Green,
    Grey,
    Red,
}

/// Badge shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    Dot,
    Ring,
}

/// Renderable status badge. `None` for a cleared status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusIndicator {
    pub fill: StatusFill,
    pub shape: StatusShape,
    pub text: String,
}

impl NodeStatus {
    /// Badge for this status, or `None` when the badge should be cleared.
    #[must_use]
    pub fn indicator(&self) -> Option<StatusIndicator> {
        let (fill, shape) = match self {
            Self::Starting => (StatusFill::Blue, StatusShape::Ring),
            Self::Sent { .. } => (StatusFill::Green, StatusShape::Dot),
            Self::NoChange { .. } => (StatusFill::Grey, StatusShape::Ring),
            Self::ConfigError { .. } => (StatusFill::Red, StatusShape::Ring),
            Self::Cleared => return None,
        };
        Some(StatusIndicator {
            fill,
            shape,
            text: self.to_string(),
        })
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting..."),
            Self::Sent { source, at_ms } => write!(f, "{} {}", source.as_str(), clock_time(*at_ms)),
            Self::NoChange { at_ms } => write!(f, "no change {}", clock_time(*at_ms)),
            Self::ConfigError { message } => write!(f, "invalid configuration: {message}"),
            Self::Cleared => Ok(()),
        }
    }
}

/// Formats epoch milliseconds as a `HH:MM:SS` time of day.
///
/// Always UTC, independent of the host time zone.
fn clock_time(at_ms: u64) -> String {
    let secs = at_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}
