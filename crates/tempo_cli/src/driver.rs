//! Fixed-rate scene driver
//!
//! Plays a [`SceneConfig`] frame by frame: each frame steps the routine runner
//! (which starts tweens and resolves `after` chains) and then ticks the tween
//! scheduler by the fixed frame time.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tempo_animation::{
    EasingKind, SchedulerHandle, TweenId, TweenScheduler, TweenSpec, TweenValue,
};
use tempo_core::{RoutineHandle, RoutineRunner};
use tracing::{debug, info};

use crate::config::{Motion, SceneConfig, TweenConfig};

/// One value delivered by a tween
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub frame: u32,
    pub time: f32,
    pub tween: String,
    pub value: TweenValue,
}

/// Everything observed while playing a scene
#[derive(Debug, Default)]
pub struct SceneReport {
    /// Frames driven
    pub frames: u32,
    /// False when `max_frames` cut the scene short
    pub finished: bool,
    pub samples: Vec<Sample>,
    /// Tween names with the scene time they completed at
    pub completed: Vec<(String, f32)>,
}

impl SceneReport {
    /// Last value delivered by the named tween
    pub fn final_value(&self, tween: &str) -> Option<TweenValue> {
        self.samples
            .iter()
            .rev()
            .find(|sample| sample.tween == tween)
            .map(|sample| sample.value)
    }
}

/// State shared by the routines that start scene tweens
struct Playback {
    tweens: SchedulerHandle,
    routines: RoutineHandle,
    specs: Vec<TweenConfig>,
    /// Indices of the tweens that start after each tween
    followers: Vec<Vec<usize>>,
    frame: Cell<u32>,
    frame_time: f32,
    report: RefCell<SceneReport>,
    /// First tween that failed to start; ends the playback
    failure: RefCell<Option<anyhow::Error>>,
}

impl Playback {
    fn now(&self) -> f32 {
        self.frame.get() as f32 * self.frame_time
    }

    /// Schedule a routine that starts tween `index`, waits for it and then
    /// starts its followers
    fn start_chain(self: &Rc<Self>, index: usize) {
        let playback = Rc::clone(self);
        self.routines.run_async(async move {
            let id = match playback.spawn(index) {
                Ok(id) => id,
                Err(error) => {
                    tracing::error!("{:#}", error);
                    playback.failure.borrow_mut().get_or_insert(error);
                    return;
                }
            };
            playback.tweens.finished(id).await;
            for &follower in &playback.followers[index] {
                playback.start_chain(follower);
            }
        });
    }

    fn spawn(self: &Rc<Self>, index: usize) -> Result<TweenId> {
        let config = &self.specs[index];
        let name = config.name.clone();
        let on_done = self.record_completion(name.clone());

        let id = match config.motion()? {
            Motion::Scalar { from, to } => {
                let record = self.record_sample(name.clone(), TweenValue::Scalar);
                self.tweens.spawn(
                    TweenSpec::scalar(config.easing, from, to, config.duration)
                        .on_changed(record)
                        .on_done(on_done),
                )
            }
            Motion::VectorTo { from, to } => {
                let record = self.record_sample(name.clone(), TweenValue::Vector3);
                self.tweens.spawn(
                    TweenSpec::vector_to(config.easing, from, to, config.duration)
                        .on_changed(record)
                        .on_done(on_done),
                )
            }
            Motion::VectorBy { from, by } => {
                let record = self.record_sample(name.clone(), TweenValue::Vector3);
                self.tweens.spawn(
                    TweenSpec::vector_by(config.easing, from, by, config.duration)
                        .on_changed(record)
                        .on_done(on_done),
                )
            }
        }
        .with_context(|| format!("Failed to start tween '{}'", name))?;

        debug!(tween = %name, ?id, at = self.now(), "scene tween started");
        Ok(id)
    }

    fn record_sample<V>(
        self: &Rc<Self>,
        tween: String,
        wrap: fn(V) -> TweenValue,
    ) -> impl FnMut(V) -> anyhow::Result<()> {
        let playback = Rc::downgrade(self);
        move |value| {
            if let Some(playback) = playback.upgrade() {
                let frame = playback.frame.get();
                playback.report.borrow_mut().samples.push(Sample {
                    frame,
                    time: playback.now(),
                    tween: tween.clone(),
                    value: wrap(value),
                });
            }
            Ok(())
        }
    }

    fn record_completion(self: &Rc<Self>, tween: String) -> impl FnOnce() -> anyhow::Result<()> {
        let playback = Rc::downgrade(self);
        move || {
            if let Some(playback) = playback.upgrade() {
                let at = playback.now();
                info!(tween = %tween, at, "tween finished");
                playback.report.borrow_mut().completed.push((tween, at));
            }
            Ok(())
        }
    }
}

/// Play a scene to completion or until `driver.max_frames`
///
/// The scene is validated first. A tween that fails to start aborts the
/// playback with that error.
pub fn play(scene: SceneConfig) -> Result<SceneReport> {
    scene.validate()?;

    let scheduler = TweenScheduler::new();
    let runner = RoutineRunner::new();
    let frame_time = scene.driver.frame_time();
    let max_frames = scene.driver.max_frames;

    let mut followers = vec![Vec::new(); scene.tweens.len()];
    let mut roots = Vec::new();
    let positions: FxHashMap<&str, usize> = scene
        .tweens
        .iter()
        .enumerate()
        .map(|(index, tween)| (tween.name.as_str(), index))
        .collect();
    for (index, tween) in scene.tweens.iter().enumerate() {
        match tween.after.as_deref() {
            Some(after) => {
                let leader = positions
                    .get(after)
                    .copied()
                    .with_context(|| format!("Unknown tween '{}'", after))?;
                followers[leader].push(index);
            }
            None => roots.push(index),
        }
    }
    drop(positions);

    let playback = Rc::new(Playback {
        tweens: scheduler.handle(),
        routines: runner.handle(),
        specs: scene.tweens,
        followers,
        frame: Cell::new(0),
        frame_time,
        report: RefCell::new(SceneReport::default()),
        failure: RefCell::new(None),
    });
    for index in roots {
        playback.start_chain(index);
    }

    info!(
        tweens = playback.specs.len(),
        fps = scene.driver.fps,
        max_frames,
        "playing scene"
    );

    let mut finished = false;
    for frame in 1..=max_frames {
        playback.frame.set(frame);
        runner.step()?;
        scheduler
            .tick(frame_time)
            .with_context(|| format!("Tween callbacks failed at frame {}", frame))?;
        // One more step lets routines waiting on this frame's completions
        // start their followers before the idle check
        runner.step()?;

        if let Some(error) = playback.failure.borrow_mut().take() {
            return Err(error.context(format!("Scene aborted at frame {}", frame)));
        }
        if runner.is_idle() && !scheduler.has_active_tweens() {
            finished = true;
            break;
        }
    }

    let frames = playback.frame.get();
    if !finished {
        tracing::warn!(frames, "scene stopped at max_frames with tweens still running");
    }

    drop(runner);
    drop(scheduler);
    let mut report = playback.report.take();
    report.frames = frames;
    report.finished = finished || playback.specs.is_empty();
    Ok(report)
}

/// Normalized samples of a curve, `steps + 1` points from t = 0 to t = 1
pub fn sample_curve(easing: EasingKind, steps: u32) -> Vec<(f32, f32)> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            (t, easing.apply(t))
        })
        .collect()
}
