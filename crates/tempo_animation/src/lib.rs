//! Tempo Animation System
//!
//! Time-based interpolation of scalars and vectors driven by an external tick.
//!
//! # Features
//!
//! - **Easing**: the classic Penner curves (quad, cubic, quart, quint, sine,
//!   expo, circ) in In, Out and InOut forms
//! - **Tweens**: scalar and 3-component vector tweens with value and
//!   completion callbacks
//! - **Spatial Helpers**: position and shortest-path rotation tweens that
//!   write into a [`tempo_core::SpatialTarget`]
//! - **Scheduler**: cancellable handles, snapshot ticks, and callback
//!   failures that never stall other tweens
//!
//! # Example
//!
//! ```rust
//! use tempo_animation::{EasingKind, TweenScheduler};
//! use tempo_core::{Transform, Vec3};
//!
//! let scheduler = TweenScheduler::new();
//! let crate_box = Transform::from_euler_angles(Vec3::new(0.0, 350.0, 0.0)).shared();
//!
//! scheduler
//!     .change_rotation(EasingKind::EaseOutCubic, &crate_box, Vec3::new(0.0, 10.0, 0.0), 0.5)
//!     .unwrap();
//!
//! // 60 fps
//! while scheduler.has_active_tweens() {
//!     scheduler.tick(1.0 / 60.0).unwrap();
//! }
//!
//! let yaw = crate_box.borrow().euler_angles.y;
//! assert!((yaw - 370.0).abs() < 1e-3);
//! ```

pub mod easing;
pub mod error;
pub mod scheduler;
pub mod tween;

pub use easing::{evaluate, EasingKind};
pub use error::{CallbackFailure, CallbackPhase, Result, TweenError};
pub use scheduler::{SchedulerHandle, TickStats, TweenFinished, TweenId, TweenScheduler};
pub use tween::{
    shortest_angle_delta, shortest_rotation_delta, TweenSpec, TweenState, TweenTask, TweenValue,
    ValueKind,
};
