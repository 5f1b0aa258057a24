//! Tween tasks
//!
//! A tween moves a value from `start` by `delta` over `duration` seconds along
//! an easing curve. [`TweenSpec`] describes one before it is scheduled;
//! [`TweenTask`] is the scheduler-owned state once it is running.

use crate::easing::EasingKind;
use crate::error::{Result, TweenError};
use std::rc::Rc;
use tempo_core::spatial::{SharedTarget, SpatialTarget};
use tempo_core::Vec3;

/// Callback receiving the interpolated value each tick
pub type ValueCallback<V> = Box<dyn FnMut(V) -> anyhow::Result<()>>;

/// Callback fired once when a tween completes
pub type DoneCallback = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Lifecycle of a tween
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenState {
    Running,
    Completed,
    Cancelled,
}

impl TweenState {
    /// Completed and Cancelled have no way out
    pub fn is_terminal(self) -> bool {
        !matches!(self, TweenState::Running)
    }
}

/// Shape of the interpolated value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vector3,
}

/// An interpolated value
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenValue {
    Scalar(f32),
    Vector3(Vec3),
}

impl TweenValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TweenValue::Scalar(_) => ValueKind::Scalar,
            TweenValue::Vector3(_) => ValueKind::Vector3,
        }
    }
}

/// Per-axis rotation delta that always takes the shorter way round
///
/// The result lies in `[-180, 180)` degrees: 350° to 10° is +20°, not -340°.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    (to - from + 180.0).rem_euclid(360.0) - 180.0
}

/// [`shortest_angle_delta`] applied to each Euler axis
pub fn shortest_rotation_delta(from: Vec3, to: Vec3) -> Vec3 {
    from.zip_map(to, shortest_angle_delta)
}

/// Description of a tween, submitted with `SchedulerHandle::spawn`
///
/// ```rust
/// use tempo_animation::{EasingKind, TweenScheduler, TweenSpec};
///
/// let scheduler = TweenScheduler::new();
/// let id = scheduler
///     .spawn(
///         TweenSpec::scalar(EasingKind::EaseOutQuad, 0.0, 1.0, 0.25)
///             .on_changed(|opacity| {
///                 println!("opacity = {opacity}");
///                 Ok(())
///             })
///             .on_done(|| Ok(())),
///     )
///     .unwrap();
/// assert!(scheduler.is_active(id));
/// ```
pub struct TweenSpec<V> {
    easing: EasingKind,
    start: V,
    delta: V,
    duration: f32,
    on_changed: Option<ValueCallback<V>>,
    on_done: Option<DoneCallback>,
}

impl<V> TweenSpec<V> {
    /// Receive the interpolated value on every tick, including the last one
    pub fn on_changed<F>(mut self, callback: F) -> Self
    where
        F: FnMut(V) -> anyhow::Result<()> + 'static,
    {
        self.on_changed = Some(Box::new(callback));
        self
    }

    /// Run once when the tween completes; never runs for a cancelled tween
    pub fn on_done<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.on_done = Some(Box::new(callback));
        self
    }

    pub fn easing(&self) -> EasingKind {
        self.easing
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    fn new(easing: EasingKind, start: V, delta: V, duration: f32) -> Self {
        Self {
            easing,
            start,
            delta,
            duration,
            on_changed: None,
            on_done: None,
        }
    }
}

impl<V: Copy> TweenSpec<V> {
    pub fn start(&self) -> V {
        self.start
    }

    pub fn delta(&self) -> V {
        self.delta
    }
}

impl TweenSpec<f32> {
    /// Scalar tween from `from` to `to`
    pub fn scalar(easing: EasingKind, from: f32, to: f32, duration: f32) -> Self {
        Self::new(easing, from, to - from, duration)
    }
}

impl TweenSpec<Vec3> {
    /// Vector tween from `from` to `to`
    pub fn vector_to(easing: EasingKind, from: Vec3, to: Vec3, duration: f32) -> Self {
        Self::new(easing, from, to - from, duration)
    }

    /// Vector tween from `from` by `delta`
    pub fn vector_by(easing: EasingKind, from: Vec3, delta: Vec3, duration: f32) -> Self {
        Self::new(easing, from, delta, duration)
    }

    /// Move `target` from its current position to `to`
    ///
    /// Fails with [`TweenError::TargetBusy`] if the target is mutably
    /// borrowed, e.g. when called from inside one of its own setters.
    pub fn position<T>(
        easing: EasingKind,
        target: &SharedTarget<T>,
        to: Vec3,
        duration: f32,
    ) -> Result<Self>
    where
        T: SpatialTarget + 'static,
    {
        let from = read_target(target, T::position)?;
        Ok(Self::vector_to(easing, from, to, duration)
            .on_changed(write_through(target, T::set_position)))
    }

    /// Rotate `target` from its current Euler angles to `to`, the short way round
    pub fn rotation<T>(
        easing: EasingKind,
        target: &SharedTarget<T>,
        to: Vec3,
        duration: f32,
    ) -> Result<Self>
    where
        T: SpatialTarget + 'static,
    {
        let from = read_target(target, T::euler_angles)?;
        Ok(
            Self::vector_by(easing, from, shortest_rotation_delta(from, to), duration)
                .on_changed(write_through(target, T::set_euler_angles)),
        )
    }
}

fn read_target<T>(target: &SharedTarget<T>, read: fn(&T) -> Vec3) -> Result<Vec3>
where
    T: SpatialTarget,
{
    let target = target.try_borrow().map_err(|_| TweenError::TargetBusy)?;
    Ok(read(&*target))
}

fn write_through<T>(
    target: &SharedTarget<T>,
    write: fn(&mut T, Vec3),
) -> impl FnMut(Vec3) -> anyhow::Result<()>
where
    T: SpatialTarget + 'static,
{
    let target = Rc::clone(target);
    move |value| {
        let mut target = target
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("spatial target is borrowed elsewhere"))?;
        write(&mut *target, value);
        Ok(())
    }
}

/// Start, delta and value callback, kept together per value kind
enum Track {
    Scalar {
        start: f32,
        delta: f32,
        on_changed: Option<ValueCallback<f32>>,
    },
    Vector3 {
        start: Vec3,
        delta: Vec3,
        on_changed: Option<ValueCallback<Vec3>>,
    },
}

/// A value callback taken out of its task for the duration of the call
pub(crate) enum Emit {
    Scalar(ValueCallback<f32>, f32),
    Vector3(ValueCallback<Vec3>, Vec3),
}

impl Emit {
    pub(crate) fn invoke(&mut self) -> anyhow::Result<()> {
        match self {
            Emit::Scalar(callback, value) => callback(*value),
            Emit::Vector3(callback, value) => callback(*value),
        }
    }
}

/// Scheduler-owned state of one running tween
pub struct TweenTask {
    easing: EasingKind,
    duration: f32,
    elapsed: f32,
    state: TweenState,
    track: Track,
    on_done: Option<DoneCallback>,
}

impl TweenTask {
    pub fn easing(&self) -> EasingKind {
        self.easing
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Seconds advanced so far, within `[0, duration]`
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Fraction of the duration elapsed, `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        self.elapsed / self.duration
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub fn value_kind(&self) -> ValueKind {
        match self.track {
            Track::Scalar { .. } => ValueKind::Scalar,
            Track::Vector3 { .. } => ValueKind::Vector3,
        }
    }

    /// Interpolated value at the current elapsed time
    pub fn value(&self) -> TweenValue {
        let (easing, elapsed, duration) = (self.easing, self.elapsed, self.duration);
        match &self.track {
            Track::Scalar { start, delta, .. } => {
                TweenValue::Scalar(easing.evaluate(*start, *delta, elapsed, duration))
            }
            Track::Vector3 { start, delta, .. } => TweenValue::Vector3(
                start.zip_map(*delta, |s, d| easing.evaluate(s, d, elapsed, duration)),
            ),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.duration > 0.0 && self.duration.is_finite() {
            Ok(())
        } else {
            Err(TweenError::InvalidDuration(self.duration))
        }
    }

    /// Move the clock forward, returns true once the end is reached
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        debug_assert_eq!(self.state, TweenState::Running);
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.elapsed >= self.duration
    }

    /// Take the value callback out together with the value to deliver
    pub(crate) fn take_emit(&mut self) -> Option<Emit> {
        let value = self.value();
        match (&mut self.track, value) {
            (Track::Scalar { on_changed, .. }, TweenValue::Scalar(v)) => {
                on_changed.take().map(|callback| Emit::Scalar(callback, v))
            }
            (Track::Vector3 { on_changed, .. }, TweenValue::Vector3(v)) => {
                on_changed.take().map(|callback| Emit::Vector3(callback, v))
            }
            _ => unreachable!("tween value does not match its track"),
        }
    }

    /// Put back a callback taken with [`Self::take_emit`]
    pub(crate) fn restore(&mut self, emit: Emit) {
        match (&mut self.track, emit) {
            (Track::Scalar { on_changed, .. }, Emit::Scalar(callback, _)) => {
                *on_changed = Some(callback);
            }
            (Track::Vector3 { on_changed, .. }, Emit::Vector3(callback, _)) => {
                *on_changed = Some(callback);
            }
            _ => unreachable!("value callback does not match its track"),
        }
    }

    /// Running -> Completed, handing back the completion callback
    pub(crate) fn complete(&mut self) -> Option<DoneCallback> {
        debug_assert_eq!(self.state, TweenState::Running);
        self.state = TweenState::Completed;
        self.on_done.take()
    }

    /// Running -> Cancelled, false if already terminal
    pub(crate) fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = TweenState::Cancelled;
        true
    }
}

impl From<TweenSpec<f32>> for TweenTask {
    fn from(spec: TweenSpec<f32>) -> Self {
        TweenTask {
            easing: spec.easing,
            duration: spec.duration,
            elapsed: 0.0,
            state: TweenState::Running,
            track: Track::Scalar {
                start: spec.start,
                delta: spec.delta,
                on_changed: spec.on_changed,
            },
            on_done: spec.on_done,
        }
    }
}

impl From<TweenSpec<Vec3>> for TweenTask {
    fn from(spec: TweenSpec<Vec3>) -> Self {
        TweenTask {
            easing: spec.easing,
            duration: spec.duration,
            elapsed: 0.0,
            state: TweenState::Running,
            track: Track::Vector3 {
                start: spec.start,
                delta: spec.delta,
                on_changed: spec.on_changed,
            },
            on_done: spec.on_done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempo_core::Transform;

    #[test]
    fn test_shortest_angle_delta() {
        assert_eq!(shortest_angle_delta(350.0, 10.0), 20.0);
        assert_eq!(shortest_angle_delta(10.0, 350.0), -20.0);
        assert_eq!(shortest_angle_delta(0.0, 90.0), 90.0);
        assert_eq!(shortest_angle_delta(90.0, 0.0), -90.0);
        assert_eq!(shortest_angle_delta(-170.0, 170.0), -20.0);
        assert_eq!(shortest_angle_delta(0.0, 720.0), 0.0);
        assert_eq!(shortest_angle_delta(0.0, 180.0), -180.0);
    }

    #[test]
    fn test_scalar_spec_stores_delta() {
        let spec = TweenSpec::scalar(EasingKind::Linear, 4.0, 10.0, 2.0);
        assert_eq!(spec.start(), 4.0);
        assert_eq!(spec.delta(), 6.0);

        let task = TweenTask::from(spec);
        assert_eq!(task.value_kind(), ValueKind::Scalar);
        assert_eq!(task.state(), TweenState::Running);
        assert_eq!(task.elapsed(), 0.0);
        assert_eq!(task.value(), TweenValue::Scalar(4.0));
    }

    #[test]
    fn test_vector_specs() {
        let from = Vec3::new(1.0, 1.0, 1.0);
        let to = TweenSpec::vector_to(EasingKind::Linear, from, Vec3::new(3.0, 0.0, 1.0), 1.0);
        assert_eq!(to.delta(), Vec3::new(2.0, -1.0, 0.0));

        let by = TweenSpec::vector_by(EasingKind::Linear, from, Vec3::new(2.0, -1.0, 0.0), 1.0);
        assert_eq!(by.delta(), to.delta());
    }

    #[test]
    fn test_advance_clamps_to_duration() {
        let mut task = TweenTask::from(TweenSpec::scalar(EasingKind::Linear, 0.0, 10.0, 2.0));

        assert!(!task.advance(0.5));
        assert_eq!(task.elapsed(), 0.5);
        assert!(!task.advance(0.0));
        assert_eq!(task.elapsed(), 0.5);
        assert!(task.advance(5.0));
        assert_eq!(task.elapsed(), 2.0);
        assert_eq!(task.progress(), 1.0);
        assert_eq!(task.value(), TweenValue::Scalar(10.0));
    }

    #[test]
    fn test_validate_duration() {
        for duration in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let task = TweenTask::from(TweenSpec::scalar(EasingKind::Linear, 0.0, 1.0, duration));
            assert!(matches!(task.validate(), Err(TweenError::InvalidDuration(_))));
        }

        let task = TweenTask::from(TweenSpec::scalar(EasingKind::Linear, 0.0, 1.0, 0.01));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_emit_round_trip_keeps_callback() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut task = TweenTask::from(
            TweenSpec::scalar(EasingKind::Linear, 0.0, 4.0, 1.0).on_changed(move |v| {
                sink.borrow_mut().push(v);
                Ok(())
            }),
        );

        task.advance(0.25);
        let mut emit = task.take_emit().unwrap();
        assert!(task.take_emit().is_none());
        emit.invoke().unwrap();
        task.restore(emit);

        task.advance(0.25);
        let mut emit = task.take_emit().unwrap();
        emit.invoke().unwrap();

        assert_eq!(*seen.borrow(), [1.0, 2.0]);
    }

    #[test]
    fn test_cancel_only_from_running() {
        let mut task = TweenTask::from(TweenSpec::scalar(EasingKind::Linear, 0.0, 1.0, 1.0));
        assert!(task.cancel());
        assert_eq!(task.state(), TweenState::Cancelled);
        assert!(!task.cancel());
        assert!(task.state().is_terminal());
    }

    #[test]
    fn test_position_spec_reads_current_position() {
        let target = Transform::from_position(Vec3::new(1.0, 2.0, 3.0)).shared();
        let spec =
            TweenSpec::position(EasingKind::Linear, &target, Vec3::new(2.0, 2.0, 2.0), 1.0).unwrap();

        assert_eq!(spec.start(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(spec.delta(), Vec3::new(1.0, 0.0, -1.0));
    }

    #[test]
    fn test_rotation_spec_wraps_delta() {
        let target = Transform::from_euler_angles(Vec3::new(350.0, 0.0, 90.0)).shared();
        let spec =
            TweenSpec::rotation(EasingKind::Linear, &target, Vec3::new(10.0, 270.0, 90.0), 1.0)
                .unwrap();

        assert_eq!(spec.delta(), Vec3::new(20.0, -90.0, 0.0));
    }

    #[test]
    fn test_write_through_reports_busy_target() {
        let target = Transform::default().shared();
        let mut write = write_through(&target, Transform::set_position);

        let _held = target.borrow();
        assert!(write(Vec3::ONE).is_err());
    }

    #[test]
    fn test_spatial_specs_report_busy_target() {
        let target = Transform::default().shared();
        let _held = target.borrow_mut();

        assert!(matches!(
            TweenSpec::position(EasingKind::Linear, &target, Vec3::ONE, 1.0),
            Err(TweenError::TargetBusy)
        ));
        assert!(matches!(
            TweenSpec::rotation(EasingKind::Linear, &target, Vec3::ONE, 1.0),
            Err(TweenError::TargetBusy)
        ));
    }
}
