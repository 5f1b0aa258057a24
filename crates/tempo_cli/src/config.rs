//! Tempo scene file handling

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tempo_animation::EasingKind;
use tempo_core::Vec3;

/// Top-level scene description (scene.toml)
#[derive(Debug, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default, rename = "tween")]
    pub tweens: Vec<TweenConfig>,
}

/// Frame driver settings
#[derive(Debug, Deserialize, Serialize)]
pub struct DriverConfig {
    /// Fixed update rate
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Hard stop, even if tweens are still running
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,
}

fn default_fps() -> u32 {
    60
}

fn default_max_frames() -> u32 {
    600
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_frames: default_max_frames(),
        }
    }
}

impl DriverConfig {
    /// Seconds per frame
    pub fn frame_time(&self) -> f32 {
        1.0 / self.fps as f32
    }
}

/// A scalar or a `[x, y, z]` vector
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SceneValue {
    Scalar(f32),
    Vector([f32; 3]),
}

impl SceneValue {
    fn is_vector(self) -> bool {
        matches!(self, SceneValue::Vector(_))
    }
}

/// One tween in the scene
#[derive(Debug, Deserialize, Serialize)]
pub struct TweenConfig {
    pub name: String,
    #[serde(default)]
    pub easing: EasingKind,
    #[serde(default = "default_duration")]
    pub duration: f32,
    pub from: SceneValue,
    #[serde(default)]
    pub to: Option<SceneValue>,
    #[serde(default)]
    pub by: Option<SceneValue>,
    /// Start once the named tween has finished
    #[serde(default)]
    pub after: Option<String>,
}

fn default_duration() -> f32 {
    1.0
}

/// Resolved shape of a tween's motion
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    Scalar { from: f32, to: f32 },
    VectorTo { from: Vec3, to: Vec3 },
    VectorBy { from: Vec3, by: Vec3 },
}

impl TweenConfig {
    /// Resolve `from`/`to`/`by` into a motion of one value kind
    pub fn motion(&self) -> Result<Motion> {
        let motion = match (self.from, self.to, self.by) {
            (_, Some(_), Some(_)) => {
                anyhow::bail!("tween '{}' sets both `to` and `by`", self.name)
            }
            (_, None, None) => {
                anyhow::bail!("tween '{}' needs either `to` or `by`", self.name)
            }
            (SceneValue::Scalar(from), Some(SceneValue::Scalar(to)), None) => {
                Motion::Scalar { from, to }
            }
            (SceneValue::Scalar(from), None, Some(SceneValue::Scalar(by))) => Motion::Scalar {
                from,
                to: from + by,
            },
            (SceneValue::Vector(from), Some(SceneValue::Vector(to)), None) => Motion::VectorTo {
                from: from.into(),
                to: to.into(),
            },
            (SceneValue::Vector(from), None, Some(SceneValue::Vector(by))) => Motion::VectorBy {
                from: from.into(),
                by: by.into(),
            },
            (from, _, _) => anyhow::bail!(
                "tween '{}' mixes scalar and vector values (`from` is a {})",
                self.name,
                if from.is_vector() { "vector" } else { "scalar" }
            ),
        };
        Ok(motion)
    }
}

impl SceneConfig {
    /// Load and validate a scene file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Scene file {} does not exist", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Parse and validate scene TOML
    pub fn parse(content: &str) -> Result<Self> {
        let config: SceneConfig = toml::from_str(content).context("Failed to parse scene")?;
        config.validate()?;
        Ok(config)
    }

    /// Check driver limits, tween values and `after` references
    ///
    /// `after` may only name a tween declared earlier in the file, which
    /// also rules out cycles.
    pub fn validate(&self) -> Result<()> {
        if self.driver.fps == 0 {
            anyhow::bail!("driver.fps must be greater than 0");
        }

        let mut seen = FxHashSet::default();
        for tween in &self.tweens {
            if !(tween.duration > 0.0 && tween.duration.is_finite()) {
                anyhow::bail!(
                    "tween '{}' has invalid duration {} (must be > 0)",
                    tween.name,
                    tween.duration
                );
            }
            tween.motion()?;

            if let Some(after) = &tween.after {
                if !seen.contains(after.as_str()) {
                    anyhow::bail!(
                        "tween '{}' runs after '{}', which is not declared before it",
                        tween.name,
                        after
                    );
                }
            }
            if !seen.insert(tween.name.as_str()) {
                anyhow::bail!("duplicate tween name '{}'", tween.name);
            }
        }
        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize scene")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
[driver]
fps = 30

[[tween]]
name = "fade"
easing = "ease_out_quad"
duration = 0.5
from = 1.0
to = 0.0

[[tween]]
name = "slide"
duration = 2.0
from = [0.0, 0.0, 0.0]
by = [4.0, 0.0, -1.0]
after = "fade"
"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneConfig::parse(SCENE).unwrap();
        assert_eq!(scene.driver.fps, 30);
        assert_eq!(scene.driver.max_frames, 600);
        assert_eq!(scene.tweens.len(), 2);

        let fade = &scene.tweens[0];
        assert_eq!(fade.easing, EasingKind::EaseOutQuad);
        assert_eq!(fade.motion().unwrap(), Motion::Scalar { from: 1.0, to: 0.0 });

        let slide = &scene.tweens[1];
        assert_eq!(slide.easing, EasingKind::Linear);
        assert_eq!(slide.after.as_deref(), Some("fade"));
        assert_eq!(
            slide.motion().unwrap(),
            Motion::VectorBy {
                from: Vec3::ZERO,
                by: Vec3::new(4.0, 0.0, -1.0)
            }
        );
    }

    #[test]
    fn test_defaults() {
        let scene = SceneConfig::parse("").unwrap();
        assert_eq!(scene.driver.fps, 60);
        assert_eq!(scene.driver.max_frames, 600);
        assert!(scene.tweens.is_empty());
    }

    #[test]
    fn test_scalar_by_resolves_to_end_value() {
        let scene = SceneConfig::parse(
            "[[tween]]\nname = \"grow\"\nfrom = 2.0\nby = 3.0\n",
        )
        .unwrap();
        assert_eq!(
            scene.tweens[0].motion().unwrap(),
            Motion::Scalar { from: 2.0, to: 5.0 }
        );
    }

    #[test]
    fn test_unknown_easing_is_rejected() {
        let err = SceneConfig::parse(
            "[[tween]]\nname = \"x\"\neasing = \"bounce\"\nfrom = 0.0\nto = 1.0\n",
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("bounce"));
    }

    #[test]
    fn test_invalid_scenes() {
        let cases = [
            ("[driver]\nfps = 0\n", "fps"),
            (
                "[[tween]]\nname = \"x\"\nduration = 0.0\nfrom = 0.0\nto = 1.0\n",
                "invalid duration",
            ),
            ("[[tween]]\nname = \"x\"\nfrom = 0.0\n", "either `to` or `by`"),
            (
                "[[tween]]\nname = \"x\"\nfrom = 0.0\nto = 1.0\nby = 1.0\n",
                "both `to` and `by`",
            ),
            (
                "[[tween]]\nname = \"x\"\nfrom = 0.0\nto = [1.0, 2.0, 3.0]\n",
                "mixes scalar and vector",
            ),
            (
                "[[tween]]\nname = \"x\"\nfrom = 0.0\nto = 1.0\nafter = \"y\"\n",
                "not declared before",
            ),
            (
                "[[tween]]\nname = \"x\"\nfrom = 0.0\nto = 1.0\n\n[[tween]]\nname = \"x\"\nfrom = 0.0\nto = 1.0\n",
                "duplicate",
            ),
        ];

        for (scene, expected) in cases {
            let err = SceneConfig::parse(scene).unwrap_err();
            assert!(
                format!("{err:#}").contains(expected),
                "{scene:?}: {err:#}"
            );
        }
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let scene = SceneConfig::parse(SCENE).unwrap();
        let reparsed = SceneConfig::parse(&scene.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.tweens.len(), 2);
        assert_eq!(reparsed.tweens[1].by, Some(SceneValue::Vector([4.0, 0.0, -1.0])));
    }
}
