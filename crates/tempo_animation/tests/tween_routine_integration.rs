//! Integration tests for tweens + spatial targets + routines
//!
//! These tests verify that:
//! - Spatial tweens write through to their targets and land exactly
//! - Rotations take the shorter way round
//! - Routines can sequence tweens by awaiting their completion
//! - Tweens started from callbacks chain cleanly across ticks

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tempo_animation::{EasingKind, TweenError, TweenScheduler, TweenSpec, TweenState};
use tempo_core::{RoutineRunner, SpatialTarget, Transform, Vec3};

const FRAME: f32 = 1.0 / 60.0;

/// Target that records every write
#[derive(Default)]
struct Recorder {
    position: Vec3,
    euler_angles: Vec3,
    rotations: Vec<Vec3>,
}

impl SpatialTarget for Recorder {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn euler_angles(&self) -> Vec3 {
        self.euler_angles
    }

    fn set_euler_angles(&mut self, euler_angles: Vec3) {
        self.euler_angles = euler_angles;
        self.rotations.push(euler_angles);
    }
}

fn run_to_idle(scheduler: &TweenScheduler, max_frames: usize) {
    for _ in 0..max_frames {
        if !scheduler.has_active_tweens() {
            return;
        }
        scheduler.tick(FRAME).unwrap();
    }
    panic!("tweens still running after {max_frames} frames");
}

/// Rotating 350° to 10° goes forward through 360°, not back through 180°
#[test]
fn test_rotation_wraps_the_short_way() {
    let scheduler = TweenScheduler::new();
    let target = Rc::new(RefCell::new(Recorder {
        euler_angles: Vec3::new(0.0, 350.0, 0.0),
        ..Default::default()
    }));

    scheduler
        .change_rotation(EasingKind::Linear, &target, Vec3::new(0.0, 10.0, 0.0), 1.0)
        .unwrap();
    run_to_idle(&scheduler, 120);

    let target = target.borrow();
    let yaws: Vec<f32> = target.rotations.iter().map(|r| r.y).collect();
    assert!(yaws.windows(2).all(|w| w[1] >= w[0]));
    assert!(yaws.iter().all(|y| (350.0..=370.0).contains(y)));
    assert_eq!(target.euler_angles.y.rem_euclid(360.0), 10.0);
    assert_eq!(target.euler_angles.x, 0.0);
}

#[test]
fn test_position_lands_exactly_for_every_curve() {
    let scheduler = TweenScheduler::new();
    let destination = Vec3::new(3.0, -1.5, 12.0);

    let targets: Vec<_> = EasingKind::ALL
        .iter()
        .map(|&easing| {
            let target = Transform::from_position(Vec3::new(-2.0, 4.0, 0.5)).shared();
            scheduler
                .change_position(easing, &target, destination, 0.4)
                .unwrap();
            target
        })
        .collect();

    run_to_idle(&scheduler, 60);

    for (easing, target) in EasingKind::ALL.iter().zip(&targets) {
        assert_eq!(target.borrow().position, destination, "{easing}");
    }
}

#[test]
fn test_elapsed_is_monotonic_and_clamped() {
    let scheduler = TweenScheduler::new();
    let id = scheduler
        .change_scalar(EasingKind::EaseInOutSine, 0.0, 1.0, 1.0, |_| Ok(()))
        .unwrap();

    let mut last = 0.0;
    for dt in [0.0, 0.1, 0.0, 0.35, 0.2, 0.05] {
        scheduler.tick(dt).unwrap();
        let elapsed = scheduler.elapsed(id).unwrap();
        assert!(elapsed >= last);
        assert!(elapsed <= 1.0);
        last = elapsed;
    }
    assert!(scheduler.is_active(id));

    scheduler.tick(10.0).unwrap();
    assert_eq!(scheduler.state(id), None);
}

/// A routine drives a three-step sequence by awaiting each tween
#[test]
fn test_routine_sequences_tweens() {
    let scheduler = TweenScheduler::new();
    let runner = RoutineRunner::new();
    let target = Transform::default().shared();
    let log = Rc::new(RefCell::new(Vec::new()));

    let (tweens, routine_target, routine_log) = (scheduler.handle(), target.clone(), log.clone());
    let routine = runner.run_async(async move {
        let steps = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        for to in steps {
            let id = tweens
                .change_position(EasingKind::EaseOutQuad, &routine_target, to, 0.25)
                .unwrap();
            tweens.finished(id).await;
            routine_log.borrow_mut().push(routine_target.borrow().position);
        }
    });

    let mut frames = 0;
    while runner.is_running(routine) {
        runner.step().unwrap();
        scheduler.tick(FRAME).unwrap();
        frames += 1;
        assert!(frames < 200, "sequence did not finish");
    }

    assert_eq!(
        *log.borrow(),
        [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        ]
    );
    // Each step needs at least 15 frames
    assert!(frames >= 45);
}

/// run_sync suspends the caller until the child unit, and its tween, is done
#[test]
fn test_run_sync_waits_for_tween() {
    let scheduler = TweenScheduler::new();
    let runner = RoutineRunner::new();
    let routines = runner.handle();
    let order = Rc::new(RefCell::new(Vec::new()));

    let (tweens, parent_order) = (scheduler.handle(), order.clone());
    runner.run_async(async move {
        parent_order.borrow_mut().push("parent start");
        let child_order = parent_order.clone();
        let fade = routines
            .run_sync(async move {
                let id = tweens
                    .change_scalar(EasingKind::Linear, 1.0, 0.0, 0.1, |_| Ok(()))
                    .unwrap();
                tweens.finished(id).await;
                child_order.borrow_mut().push("fade done");
                0.0f32
            })
            .await;
        assert_eq!(fade, 0.0);
        parent_order.borrow_mut().push("parent resumed");
    });

    for _ in 0..30 {
        runner.step().unwrap();
        scheduler.tick(FRAME).unwrap();
    }

    assert_eq!(*order.borrow(), ["parent start", "fade done", "parent resumed"]);
    assert!(runner.is_idle());
}

/// Completion callbacks can chain the next tween; it starts on the next tick
#[test]
fn test_chain_from_completion_callback() {
    let scheduler = TweenScheduler::new();
    let handle = scheduler.handle();
    let values = Rc::new(RefCell::new(Vec::new()));
    let chained = Rc::new(Cell::new(false));

    let (sink, flag) = (values.clone(), chained.clone());
    scheduler
        .spawn(TweenSpec::scalar(EasingKind::Linear, 0.0, 1.0, 0.5).on_done(move || {
            let sink = sink.clone();
            handle.change_scalar(EasingKind::Linear, 1.0, 0.0, 0.5, move |v| {
                sink.borrow_mut().push(v);
                Ok(())
            })?;
            flag.set(true);
            Ok(())
        }))
        .unwrap();

    scheduler.tick(0.5).unwrap();
    assert!(chained.get());
    assert!(values.borrow().is_empty());
    assert_eq!(scheduler.active_count(), 1);

    scheduler.tick(0.25).unwrap();
    scheduler.tick(0.25).unwrap();
    assert_eq!(*values.borrow(), [0.5, 0.0]);
    assert!(!scheduler.has_active_tweens());
}

/// Ticking from inside a callback is refused without disturbing the outer tick
#[test]
fn test_nested_tick_is_rejected() {
    let scheduler = Rc::new(TweenScheduler::new());
    let nested = Rc::new(RefCell::new(None));

    let (inner_scheduler, result) = (Rc::downgrade(&scheduler), nested.clone());
    let id = scheduler
        .change_scalar(EasingKind::Linear, 0.0, 1.0, 1.0, move |_| {
            if let Some(scheduler) = inner_scheduler.upgrade() {
                *result.borrow_mut() = Some(scheduler.tick(0.1));
            }
            Ok(())
        })
        .unwrap();

    scheduler.tick(0.5).unwrap();
    assert!(matches!(*nested.borrow(), Some(Err(TweenError::ReentrantTick))));
    assert_eq!(scheduler.elapsed(id), Some(0.5));
    assert_eq!(scheduler.state(id), Some(TweenState::Running));
}
