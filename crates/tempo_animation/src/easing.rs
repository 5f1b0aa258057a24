//! Easing functions for tweens
//!
//! Every curve maps normalized time `t` in `[0, 1]` to normalized progress,
//! starting at 0 and ending at 1. [`EasingKind::evaluate`] scales that onto a
//! `start`/`distance` pair for a given elapsed time and duration.

use crate::error::TweenError;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// Named easing curve
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingKind {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
}

impl EasingKind {
    /// Every curve, in declaration order
    pub const ALL: [EasingKind; 22] = [
        EasingKind::Linear,
        EasingKind::EaseInQuad,
        EasingKind::EaseOutQuad,
        EasingKind::EaseInOutQuad,
        EasingKind::EaseInCubic,
        EasingKind::EaseOutCubic,
        EasingKind::EaseInOutCubic,
        EasingKind::EaseInQuart,
        EasingKind::EaseOutQuart,
        EasingKind::EaseInOutQuart,
        EasingKind::EaseInQuint,
        EasingKind::EaseOutQuint,
        EasingKind::EaseInOutQuint,
        EasingKind::EaseInSine,
        EasingKind::EaseOutSine,
        EasingKind::EaseInOutSine,
        EasingKind::EaseInExpo,
        EasingKind::EaseOutExpo,
        EasingKind::EaseInOutExpo,
        EasingKind::EaseInCirc,
        EasingKind::EaseOutCirc,
        EasingKind::EaseInOutCirc,
    ];

    /// snake_case identifier, as used in scene files
    pub fn name(self) -> &'static str {
        match self {
            EasingKind::Linear => "linear",
            EasingKind::EaseInQuad => "ease_in_quad",
            EasingKind::EaseOutQuad => "ease_out_quad",
            EasingKind::EaseInOutQuad => "ease_in_out_quad",
            EasingKind::EaseInCubic => "ease_in_cubic",
            EasingKind::EaseOutCubic => "ease_out_cubic",
            EasingKind::EaseInOutCubic => "ease_in_out_cubic",
            EasingKind::EaseInQuart => "ease_in_quart",
            EasingKind::EaseOutQuart => "ease_out_quart",
            EasingKind::EaseInOutQuart => "ease_in_out_quart",
            EasingKind::EaseInQuint => "ease_in_quint",
            EasingKind::EaseOutQuint => "ease_out_quint",
            EasingKind::EaseInOutQuint => "ease_in_out_quint",
            EasingKind::EaseInSine => "ease_in_sine",
            EasingKind::EaseOutSine => "ease_out_sine",
            EasingKind::EaseInOutSine => "ease_in_out_sine",
            EasingKind::EaseInExpo => "ease_in_expo",
            EasingKind::EaseOutExpo => "ease_out_expo",
            EasingKind::EaseInOutExpo => "ease_in_out_expo",
            EasingKind::EaseInCirc => "ease_in_circ",
            EasingKind::EaseOutCirc => "ease_out_circ",
            EasingKind::EaseInOutCirc => "ease_in_out_circ",
        }
    }

    /// Value at `elapsed` seconds into a tween of `duration` seconds
    ///
    /// `elapsed` is clamped into `[0, duration]` here, whatever the caller did.
    /// Both ends are exact: `start` at 0 and `start + distance` at `duration`.
    /// A non-positive duration counts as already finished.
    pub fn evaluate(self, start: f32, distance: f32, elapsed: f32, duration: f32) -> f32 {
        if !(duration > 0.0) || elapsed >= duration {
            return start + distance;
        }
        if !(elapsed > 0.0) {
            return start;
        }

        distance * self.apply(elapsed / duration) + start
    }

    /// Apply the curve to a progress value (0.0 to 1.0)
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingKind::Linear => t,

            EasingKind::EaseInQuad => t * t,
            EasingKind::EaseOutQuad => -t * (t - 2.0),
            EasingKind::EaseInOutQuad => in_out(t, |u| u * u, |u| -(u * (u - 2.0) - 1.0), 1.0),

            EasingKind::EaseInCubic => t.powi(3),
            EasingKind::EaseOutCubic => (t - 1.0).powi(3) + 1.0,
            EasingKind::EaseInOutCubic => in_out(t, |u| u.powi(3), |u| u.powi(3) + 2.0, 2.0),

            EasingKind::EaseInQuart => t.powi(4),
            EasingKind::EaseOutQuart => -((t - 1.0).powi(4) - 1.0),
            EasingKind::EaseInOutQuart => in_out(t, |u| u.powi(4), |u| -(u.powi(4) - 2.0), 2.0),

            EasingKind::EaseInQuint => t.powi(5),
            EasingKind::EaseOutQuint => (t - 1.0).powi(5) + 1.0,
            EasingKind::EaseInOutQuint => in_out(t, |u| u.powi(5), |u| u.powi(5) + 2.0, 2.0),

            EasingKind::EaseInSine => 1.0 - (t * FRAC_PI_2).cos(),
            EasingKind::EaseOutSine => (t * FRAC_PI_2).sin(),
            EasingKind::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,

            // The 2^10x family never reaches 0 or 1 on its own
            EasingKind::EaseInExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    2f32.powf(10.0 * (t - 1.0))
                }
            }
            EasingKind::EaseOutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f32.powf(-10.0 * t)
                }
            }
            EasingKind::EaseInOutExpo => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    in_out(
                        t,
                        |u| 2f32.powf(10.0 * (u - 1.0)),
                        |u| 2.0 - 2f32.powf(-10.0 * u),
                        1.0,
                    )
                }
            }

            EasingKind::EaseInCirc => -((1.0 - t * t).sqrt() - 1.0),
            EasingKind::EaseOutCirc => {
                let t = t - 1.0;
                (1.0 - t * t).sqrt()
            }
            EasingKind::EaseInOutCirc => in_out(
                t,
                |u| -((1.0 - u * u).sqrt() - 1.0),
                |u| (1.0 - u * u).sqrt() + 1.0,
                2.0,
            ),
        }
    }
}

/// Split a curve at the half-way point
///
/// `u` runs over `[0, 2)`. The first half uses `ease_in(u)`, the second
/// `ease_out(u - shift)`; both are halved so the result spans `[0, 1]`.
#[inline]
fn in_out(t: f32, ease_in: impl Fn(f32) -> f32, ease_out: impl Fn(f32) -> f32, shift: f32) -> f32 {
    let u = t * 2.0;
    if u < 1.0 {
        ease_in(u) / 2.0
    } else {
        ease_out(u - shift) / 2.0
    }
}

/// Free-function form of [`EasingKind::evaluate`]
pub fn evaluate(kind: EasingKind, start: f32, distance: f32, elapsed: f32, duration: f32) -> f32 {
    kind.evaluate(start, distance, elapsed, duration)
}

impl fmt::Display for EasingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EasingKind {
    type Err = TweenError;

    /// Accepts `ease_in_out_quad` as well as `EaseInOutQuad`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        EasingKind::ALL
            .into_iter()
            .find(|kind| kind.name().replace('_', "") == wanted)
            .ok_or_else(|| TweenError::UnknownEasingKind(s.to_string()))
    }
}

impl TryFrom<u8> for EasingKind {
    type Error = TweenError;

    /// Declaration order, `Linear` is 0
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        EasingKind::ALL
            .get(raw as usize)
            .copied()
            .ok_or_else(|| TweenError::UnknownEasingKind(raw.to_string()))
    }
}
