//! Tempo Core Runtime
//!
//! Foundation shared by the Tempo crates:
//!
//! - **Vector Math**: `Vec3` with the component-wise operations tweens need
//! - **Spatial Targets**: the position/orientation capability tweens write into
//! - **Routines**: a frame-driven cooperative executor for sequencing work
//!
//! # Example
//!
//! ```rust
//! use tempo_core::routine::{wait_frames, RoutineRunner};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let runner = RoutineRunner::new();
//! let done = Rc::new(Cell::new(false));
//! let flag = done.clone();
//!
//! runner.run_async_then(wait_frames(2), move || flag.set(true));
//!
//! runner.step().unwrap();
//! runner.step().unwrap();
//! assert!(!done.get());
//! runner.step().unwrap();
//! assert!(done.get());
//! ```

pub mod error;
pub mod math;
pub mod routine;
pub mod spatial;

pub use error::RoutineError;
pub use math::Vec3;
pub use routine::{yield_now, Completion, RoutineHandle, RoutineId, RoutineRunner};
pub use spatial::{SharedTarget, SpatialTarget, Transform};
