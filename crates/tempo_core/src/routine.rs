//! Cooperative routine runner
//!
//! Runs units of work (futures) on a single-threaded, frame-driven executor.
//! The driver calls [`RoutineRunner::step`] once per frame; each step polls
//! every queued unit once. Units never run concurrently with each other.
//!
//! Two ways to chain work:
//!
//! - [`RoutineHandle::run_async_then`] starts a unit and returns immediately;
//!   the callback fires on the runner right after the unit finishes.
//! - [`RoutineHandle::run_sync`] is awaited from inside a unit. The child is
//!   scheduled on the runner and the caller stays suspended until the child
//!   has fully completed.
//!
//! ```rust
//! use tempo_core::routine::{yield_now, RoutineRunner};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let runner = RoutineRunner::new();
//! let handle = runner.handle();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let parent_log = log.clone();
//! runner.run_async(async move {
//!     parent_log.borrow_mut().push("parent start");
//!     let child_log = parent_log.clone();
//!     handle
//!         .run_sync(async move {
//!             yield_now().await;
//!             child_log.borrow_mut().push("child done");
//!         })
//!         .await;
//!     parent_log.borrow_mut().push("parent resumed");
//! });
//!
//! assert!(runner.run_until_idle(10).unwrap());
//! assert_eq!(*log.borrow(), ["parent start", "child done", "parent resumed"]);
//! ```

use crate::error::{Result, RoutineError};
use futures::task::noop_waker;
use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

new_key_type! {
    /// Handle to a unit scheduled on a routine runner
    pub struct RoutineId;
}

type BoxedUnit = Pin<Box<dyn Future<Output = ()> + 'static>>;
type DoneCallback = Box<dyn FnOnce() + 'static>;

struct Routine {
    future: BoxedUnit,
    on_done: Option<DoneCallback>,
}

struct RunnerInner {
    /// `None` while the unit is being polled
    routines: SlotMap<RoutineId, Option<Routine>>,
    /// Units waiting for the next poll, in start order
    queue: VecDeque<RoutineId>,
    stepping: bool,
}

/// Owner of the cooperative executor
///
/// Dropping the runner drops every unfinished unit.
pub struct RoutineRunner {
    inner: Rc<RefCell<RunnerInner>>,
}

impl RoutineRunner {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RunnerInner {
                routines: SlotMap::with_key(),
                queue: VecDeque::new(),
                stepping: false,
            })),
        }
    }

    /// Cloneable handle for starting work, typically captured by units
    pub fn handle(&self) -> RoutineHandle {
        RoutineHandle {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Start a unit without a completion callback
    pub fn run_async<F>(&self, unit: F) -> RoutineId
    where
        F: Future<Output = ()> + 'static,
    {
        self.handle().run_async(unit)
    }

    /// Start a unit and invoke `on_done` once it finishes
    pub fn run_async_then<F, D>(&self, unit: F, on_done: D) -> RoutineId
    where
        F: Future<Output = ()> + 'static,
        D: FnOnce() + 'static,
    {
        self.handle().run_async_then(unit, on_done)
    }

    /// Poll every queued unit once
    ///
    /// Units started while stepping are polled in the same step, so a child
    /// started through `run_sync` makes progress immediately. Units that are
    /// still pending are queued for the next step.
    ///
    /// Returns the number of units polled.
    pub fn step(&self) -> Result<usize> {
        let mut current = {
            let mut inner = self.inner.borrow_mut();
            if inner.stepping {
                return Err(RoutineError::Reentrant);
            }
            inner.stepping = true;
            std::mem::take(&mut inner.queue)
        };

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut next = VecDeque::with_capacity(current.len());
        let mut polled = 0;

        while let Some(id) = current.pop_front() {
            let taken = self
                .inner
                .borrow_mut()
                .routines
                .get_mut(id)
                .and_then(Option::take);
            let Some(mut routine) = taken else {
                continue;
            };

            polled += 1;
            match routine.future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    self.inner.borrow_mut().routines.remove(id);
                    tracing::debug!(?id, "routine finished");
                    if let Some(on_done) = routine.on_done.take() {
                        on_done();
                    }
                }
                Poll::Pending => {
                    if let Some(slot) = self.inner.borrow_mut().routines.get_mut(id) {
                        *slot = Some(routine);
                        next.push_back(id);
                    }
                }
            }

            // Units started by that poll join the current step
            current.extend(self.inner.borrow_mut().queue.drain(..));
        }

        let mut inner = self.inner.borrow_mut();
        inner.queue = next;
        inner.stepping = false;
        tracing::trace!(polled, pending = inner.routines.len(), "routine step");

        Ok(polled)
    }

    /// Step until every unit has finished or `max_steps` is reached
    ///
    /// Returns `true` if the runner drained.
    pub fn run_until_idle(&self, max_steps: usize) -> Result<bool> {
        for _ in 0..max_steps {
            if self.is_idle() {
                return Ok(true);
            }
            self.step()?;
        }
        Ok(self.is_idle())
    }

    /// Number of units that have not finished yet
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().routines.len()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.borrow().routines.is_empty()
    }

    pub fn is_running(&self, id: RoutineId) -> bool {
        self.inner.borrow().routines.contains_key(id)
    }
}

impl Default for RoutineRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RoutineRunner {
    fn drop(&mut self) {
        // Units usually capture a handle; dropping them breaks the Rc cycle.
        // They are dropped outside the borrow so their destructors may use it.
        let routines = {
            let mut inner = self.inner.borrow_mut();
            inner.queue.clear();
            std::mem::take(&mut inner.routines)
        };
        drop(routines);
    }
}

/// Cloneable access to a routine runner
#[derive(Clone)]
pub struct RoutineHandle {
    inner: Rc<RefCell<RunnerInner>>,
}

impl RoutineHandle {
    /// Start a unit and return immediately
    ///
    /// The unit first runs on the next `step()`, or later in the current one
    /// if called while the runner is stepping.
    pub fn run_async<F>(&self, unit: F) -> RoutineId
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawn(Box::pin(unit), None)
    }

    /// Start a unit and invoke `on_done` on the runner once it finishes
    pub fn run_async_then<F, D>(&self, unit: F, on_done: D) -> RoutineId
    where
        F: Future<Output = ()> + 'static,
        D: FnOnce() + 'static,
    {
        self.spawn(Box::pin(unit), Some(Box::new(on_done)))
    }

    /// Run `unit` as a child of the calling unit
    ///
    /// Await the returned future from inside a unit: the caller is suspended
    /// until the child has run to completion on this runner, and resumes
    /// with the child's output.
    pub fn run_sync<F, T>(&self, unit: F) -> Completion<T>
    where
        F: Future<Output = T> + 'static,
        T: 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        let id = self.spawn(
            Box::pin(async move {
                let value = unit.await;
                *out.borrow_mut() = Some(value);
            }),
            None,
        );
        Completion { id, slot }
    }

    fn spawn(&self, future: BoxedUnit, on_done: Option<DoneCallback>) -> RoutineId {
        let mut inner = self.inner.borrow_mut();
        let id = inner.routines.insert(Some(Routine { future, on_done }));
        inner.queue.push_back(id);
        tracing::debug!(?id, "routine started");
        id
    }
}

/// Output of a child unit started with [`RoutineHandle::run_sync`]
///
/// Never registers a waker: it resolves when its caller is polled again by
/// the runner after the child finished. Await it only inside a unit run by
/// a [`RoutineRunner`].
pub struct Completion<T> {
    id: RoutineId,
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Completion<T> {
    /// Id of the child unit
    pub fn id(&self) -> RoutineId {
        self.id
    }
}

impl<T> Future for Completion<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<T> {
        match self.slot.borrow_mut().take() {
            Some(value) => Poll::Ready(value),
            None => Poll::Pending,
        }
    }
}

/// Suspend the current unit until the next step
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}

/// Suspend the current unit for `frames` steps
pub async fn wait_frames(frames: u32) {
    for _ in 0..frames {
        yield_now().await;
    }
}
