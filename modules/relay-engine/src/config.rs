use std::fmt;
use std::str::FromStr;

use crate::error::ParseConfigError;

/// How plain (non-stoppable) events are delivered. Fixed per dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FanOut {
    /// Schedule every listener, then wait for all of them. The handle
    /// resolves once the last one finishes, or fails on cancellation.
    #[default]
    Awaited,
    /// Schedule every listener and resolve the handle immediately. Listeners
    /// run untracked and the dispatch's cancellation token is ignored.
    Detached,
}

/// What happens to in-flight listener tasks when a dispatch is cancelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CancelPolicy {
    /// Abort the tasks. Work a listener has already done stays done.
    #[default]
    Abort,
    /// Stop waiting but let the tasks run to completion. Their failures
    /// still reach the error handler.
    Detach,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub fan_out: FanOut,
    pub on_cancel: CancelPolicy,
}

impl DispatcherConfig {
    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_on_cancel(mut self, on_cancel: CancelPolicy) -> Self {
        self.on_cancel = on_cancel;
        self
    }
}

impl FromStr for FanOut {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "awaited" => Ok(FanOut::Awaited),
            "detached" => Ok(FanOut::Detached),
            _ => Err(ParseConfigError {
                kind: "fan-out mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for CancelPolicy {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(CancelPolicy::Abort),
            "detach" => Ok(CancelPolicy::Detach),
            _ => Err(ParseConfigError {
                kind: "cancel policy",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOut::Awaited => f.write_str("awaited"),
            FanOut::Detached => f.write_str("detached"),
        }
    }
}

impl fmt::Display for CancelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelPolicy::Abort => f.write_str("abort"),
            CancelPolicy::Detach => f.write_str("detach"),
        }
    }
}
