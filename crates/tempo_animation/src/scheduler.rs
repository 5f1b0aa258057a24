//! Tween scheduler
//!
//! Owns every running tween and advances them from an external tick source.
//! The driver calls [`TweenScheduler::tick`] once per frame with the elapsed
//! time; callers only ever hold [`TweenId`] handles.
//!
//! Callbacks may capture a [`SchedulerHandle`] and start or cancel tweens
//! while a tick is in progress. Tweens started that way first advance on the
//! next tick; cancellations take effect immediately and the task is evicted
//! at the end of the current tick.

use crate::easing::EasingKind;
use crate::error::{CallbackFailure, CallbackPhase, Result, TweenError};
use crate::tween::{TweenSpec, TweenState, TweenTask, TweenValue};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::future::Future;
use std::ops::Deref;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tempo_core::spatial::{SharedTarget, SpatialTarget};
use tempo_core::Vec3;

new_key_type! {
    /// Handle to a scheduled tween
    pub struct TweenId;
}

type IdList = SmallVec<[TweenId; 16]>;

/// Internal state of the tween scheduler
struct SchedulerInner {
    tasks: SlotMap<TweenId, TweenTask>,
    ticking: bool,
}

/// Counters for a single tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Tweens whose clock moved this tick
    pub advanced: usize,
    /// Tweens that reached their end this tick
    pub completed: usize,
    /// Completed or cancelled tweens removed at the end of the tick
    pub evicted: usize,
}

/// The scheduler that ticks all running tweens
///
/// Dereferences to [`SchedulerHandle`] for creating, cancelling and querying
/// tweens. Only the owner can tick; dropping it drops every tween with its
/// callbacks.
pub struct TweenScheduler {
    handle: SchedulerHandle,
}

impl TweenScheduler {
    pub fn new() -> Self {
        Self {
            handle: SchedulerHandle {
                inner: Rc::new(RefCell::new(SchedulerInner {
                    tasks: SlotMap::with_key(),
                    ticking: false,
                })),
            },
        }
    }

    /// Cloneable handle, suitable for capturing in callbacks
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Advance every running tween by `dt` seconds
    ///
    /// Only tweens that were running when the tick started are advanced.
    /// Each one receives its value callback, then its completion callback if
    /// it reached the end. Completed and cancelled tweens are evicted before
    /// returning.
    ///
    /// A negative (or NaN) `dt` is rejected before anything changes. Callback
    /// errors do not stop the tick; they are collected and returned as
    /// [`TweenError::CallbackFailed`] once every tween has been processed.
    pub fn tick(&self, dt: f32) -> Result<TickStats> {
        if !(dt >= 0.0) {
            return Err(TweenError::InvalidTimeDelta(dt));
        }

        let inner = &self.handle.inner;
        let snapshot: IdList = {
            let mut guard = inner.borrow_mut();
            if guard.ticking {
                return Err(TweenError::ReentrantTick);
            }
            guard.ticking = true;
            guard
                .tasks
                .iter()
                .filter(|(_, task)| task.state() == TweenState::Running)
                .map(|(id, _)| id)
                .collect()
        };
        let _ticking = TickingGuard(inner);

        let mut stats = TickStats::default();
        let mut failures = Vec::new();

        for id in snapshot {
            // The value callback is taken out so it can run with the
            // scheduler unborrowed
            let (finished, emit) = {
                let mut guard = inner.borrow_mut();
                let Some(task) = guard.tasks.get_mut(id) else {
                    continue;
                };
                if task.state() != TweenState::Running {
                    continue;
                }
                let finished = task.advance(dt);
                (finished, task.take_emit())
            };
            stats.advanced += 1;

            if let Some(mut emit) = emit {
                let result = emit.invoke();
                if let Some(task) = inner.borrow_mut().tasks.get_mut(id) {
                    task.restore(emit);
                }
                if let Err(error) = result {
                    tracing::warn!(?id, "tween on_changed failed: {:#}", error);
                    failures.push(CallbackFailure {
                        tween: id,
                        phase: CallbackPhase::ValueChanged,
                        error,
                    });
                }
            }

            if !finished {
                continue;
            }

            let on_done = {
                let mut guard = inner.borrow_mut();
                match guard.tasks.get_mut(id) {
                    Some(task) if task.state() == TweenState::Running => task.complete(),
                    // Cancelled from its own value callback
                    _ => continue,
                }
            };
            stats.completed += 1;
            tracing::debug!(?id, "tween completed");

            if let Some(on_done) = on_done {
                if let Err(error) = on_done() {
                    tracing::warn!(?id, "tween on_done failed: {:#}", error);
                    failures.push(CallbackFailure {
                        tween: id,
                        phase: CallbackPhase::Complete,
                        error,
                    });
                }
            }
        }

        let evicted = self.handle.evict_terminal();
        stats.evicted = evicted.len();
        // Callbacks are dropped outside the borrow
        drop(evicted);

        tracing::trace!(
            dt,
            advanced = stats.advanced,
            completed = stats.completed,
            evicted = stats.evicted,
            "tween tick"
        );

        if failures.is_empty() {
            Ok(stats)
        } else {
            Err(TweenError::CallbackFailed { failures })
        }
    }
}

impl Default for TweenScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TweenScheduler {
    type Target = SchedulerHandle;

    fn deref(&self) -> &SchedulerHandle {
        &self.handle
    }
}

impl Drop for TweenScheduler {
    fn drop(&mut self) {
        // Callbacks holding a handle keep the shared state alive; dropping
        // the tasks breaks that cycle.
        let tasks = std::mem::take(&mut self.handle.inner.borrow_mut().tasks);
        drop(tasks);
    }
}

/// Clears the ticking flag even if a callback unwinds
struct TickingGuard<'a>(&'a RefCell<SchedulerInner>);

impl Drop for TickingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.ticking = false;
        }
    }
}

/// Shared access to a tween scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Schedule a tween
    ///
    /// Fails with [`TweenError::InvalidDuration`] unless the duration is
    /// positive and finite. A tween spawned during a tick first advances on
    /// the next one.
    pub fn spawn(&self, spec: impl Into<TweenTask>) -> Result<TweenId> {
        let task = spec.into();
        task.validate()?;

        let (easing, duration, kind) = (task.easing(), task.duration(), task.value_kind());
        let id = self.inner.borrow_mut().tasks.insert(task);
        tracing::debug!(?id, %easing, duration, ?kind, "tween created");
        Ok(id)
    }

    /// Tween a scalar from `from` to `to`
    ///
    /// Shorthand for `spawn(TweenSpec::scalar(..).on_changed(..))`. Build the
    /// spec directly to leave out `on_changed` or to add `on_done`.
    pub fn change_scalar<F>(
        &self,
        easing: EasingKind,
        from: f32,
        to: f32,
        duration: f32,
        on_changed: F,
    ) -> Result<TweenId>
    where
        F: FnMut(f32) -> anyhow::Result<()> + 'static,
    {
        self.spawn(TweenSpec::scalar(easing, from, to, duration).on_changed(on_changed))
    }

    /// Tween a vector from `from` to `to`
    ///
    /// See [`TweenSpec::vector_to`] for optional callbacks.
    pub fn change_vector_to<F>(
        &self,
        easing: EasingKind,
        from: Vec3,
        to: Vec3,
        duration: f32,
        on_changed: F,
    ) -> Result<TweenId>
    where
        F: FnMut(Vec3) -> anyhow::Result<()> + 'static,
    {
        self.spawn(TweenSpec::vector_to(easing, from, to, duration).on_changed(on_changed))
    }

    /// Tween a vector from `from` by `delta`
    ///
    /// See [`TweenSpec::vector_by`] for optional callbacks.
    pub fn change_vector_by<F>(
        &self,
        easing: EasingKind,
        from: Vec3,
        delta: Vec3,
        duration: f32,
        on_changed: F,
    ) -> Result<TweenId>
    where
        F: FnMut(Vec3) -> anyhow::Result<()> + 'static,
    {
        self.spawn(TweenSpec::vector_by(easing, from, delta, duration).on_changed(on_changed))
    }

    /// Move a spatial target to `to`
    ///
    /// Fails with [`TweenError::TargetBusy`] if the target is mutably
    /// borrowed. To get a completion callback, spawn
    /// `TweenSpec::position(..)?.on_done(..)` instead.
    pub fn change_position<T>(
        &self,
        easing: EasingKind,
        target: &SharedTarget<T>,
        to: Vec3,
        duration: f32,
    ) -> Result<TweenId>
    where
        T: SpatialTarget + 'static,
    {
        self.spawn(TweenSpec::position(easing, target, to, duration)?)
    }

    /// Rotate a spatial target to the Euler angles `to`, the short way round
    ///
    /// Same failure and callback notes as [`Self::change_position`].
    pub fn change_rotation<T>(
        &self,
        easing: EasingKind,
        target: &SharedTarget<T>,
        to: Vec3,
        duration: f32,
    ) -> Result<TweenId>
    where
        T: SpatialTarget + 'static,
    {
        self.spawn(TweenSpec::rotation(easing, target, to, duration)?)
    }

    /// Cancel a tween; neither of its callbacks fires again
    ///
    /// Unknown, completed and already cancelled handles are ignored. Returns
    /// whether the tween was running.
    pub fn cancel(&self, id: TweenId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let ticking = inner.ticking;
        let Some(task) = inner.tasks.get_mut(id) else {
            return false;
        };
        if !task.cancel() {
            return false;
        }
        tracing::debug!(?id, "tween cancelled");

        if !ticking {
            let removed = inner.tasks.remove(id);
            drop(inner);
            drop(removed);
        }
        true
    }

    /// Cancel every running tween, returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let ids: IdList = self.inner.borrow().tasks.keys().collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Lifecycle state, `None` once the tween has been evicted
    pub fn state(&self, id: TweenId) -> Option<TweenState> {
        self.inner.borrow().tasks.get(id).map(TweenTask::state)
    }

    /// Seconds the tween has advanced
    pub fn elapsed(&self, id: TweenId) -> Option<f32> {
        self.inner.borrow().tasks.get(id).map(TweenTask::elapsed)
    }

    /// Fraction of the tween's duration elapsed
    pub fn progress(&self, id: TweenId) -> Option<f32> {
        self.inner.borrow().tasks.get(id).map(TweenTask::progress)
    }

    /// Current interpolated value
    pub fn value(&self, id: TweenId) -> Option<TweenValue> {
        self.inner.borrow().tasks.get(id).map(TweenTask::value)
    }

    /// Whether the tween is still running
    pub fn is_active(&self, id: TweenId) -> bool {
        self.state(id) == Some(TweenState::Running)
    }

    /// Number of running tweens
    pub fn active_count(&self) -> usize {
        self.inner
            .borrow()
            .tasks
            .values()
            .filter(|task| task.state() == TweenState::Running)
            .count()
    }

    pub fn has_active_tweens(&self) -> bool {
        self.active_count() > 0
    }

    /// Future resolving once the tween is no longer running
    ///
    /// Meant to be awaited from a routine, e.g. to sequence tweens.
    pub fn finished(&self, id: TweenId) -> TweenFinished {
        TweenFinished {
            handle: self.clone(),
            id,
        }
    }

    fn evict_terminal(&self) -> Vec<TweenTask> {
        let mut inner = self.inner.borrow_mut();
        let ids: IdList = inner
            .tasks
            .iter()
            .filter(|(_, task)| task.state().is_terminal())
            .map(|(id, _)| id)
            .collect();
        ids.into_iter()
            .filter_map(|id| inner.tasks.remove(id))
            .collect()
    }
}

/// Future returned by [`SchedulerHandle::finished`]
///
/// Never registers a waker: it is re-checked each time its routine is
/// polled, so await it only inside a `tempo_core::RoutineRunner` unit.
pub struct TweenFinished {
    handle: SchedulerHandle,
    id: TweenId,
}

impl Future for TweenFinished {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.handle.is_active(self.id) {
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}
