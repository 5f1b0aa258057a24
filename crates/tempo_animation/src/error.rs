//! Tween error types

use crate::scheduler::TweenId;
use std::fmt;
use thiserror::Error;

/// Tween-related errors
#[derive(Error, Debug)]
pub enum TweenError {
    /// Duration must be positive and finite
    #[error("Invalid tween duration: {0} (must be > 0)")]
    InvalidDuration(f32),

    /// Easing name or raw value does not map to a curve
    #[error("Unknown easing kind: {0}")]
    UnknownEasingKind(String),

    /// Tick step must be >= 0
    #[error("Invalid time delta: {0} (must be >= 0)")]
    InvalidTimeDelta(f32),

    /// A spatial target was mutably borrowed when a tween tried to read it
    #[error("Spatial target is mutably borrowed elsewhere")]
    TargetBusy,

    /// `tick()` was called from inside a tween callback
    #[error("Scheduler is already ticking; tick() cannot be nested inside a callback")]
    ReentrantTick,

    /// One or more callbacks failed; every other tween was still processed
    #[error("{} tween callback(s) failed during tick", .failures.len())]
    CallbackFailed { failures: Vec<CallbackFailure> },
}

/// Which callback of a tween failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackPhase {
    ValueChanged,
    Complete,
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackPhase::ValueChanged => f.write_str("on_changed"),
            CallbackPhase::Complete => f.write_str("on_done"),
        }
    }
}

/// A callback error captured during a tick
#[derive(Debug)]
pub struct CallbackFailure {
    pub tween: TweenId,
    pub phase: CallbackPhase,
    pub error: anyhow::Error,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}: {:#}", self.tween, self.phase, self.error)
    }
}

/// Result type for tween operations
pub type Result<T> = std::result::Result<T, TweenError>;
