//! Spatial targets
//!
//! A spatial target is anything with a position and an orientation that a
//! tween can write into. Callers own the target and share it with the
//! scheduler through `Rc<RefCell<T>>`, reading back the writes as they land.

use crate::math::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

/// Capability consumed by position and rotation tweens
///
/// Orientation is expressed as Euler angles in degrees.
pub trait SpatialTarget {
    fn position(&self) -> Vec3;

    fn set_position(&mut self, position: Vec3);

    fn euler_angles(&self) -> Vec3;

    fn set_euler_angles(&mut self, angles: Vec3);
}

/// Shared, caller-owned spatial target
pub type SharedTarget<T> = Rc<RefCell<T>>;

/// Plain position + orientation pair
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub euler_angles: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, euler_angles: Vec3) -> Self {
        Self {
            position,
            euler_angles,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            euler_angles: Vec3::ZERO,
        }
    }

    pub fn from_euler_angles(euler_angles: Vec3) -> Self {
        Self {
            position: Vec3::ZERO,
            euler_angles,
        }
    }

    /// Wrap into a shared handle suitable for binding to tweens
    pub fn shared(self) -> SharedTarget<Transform> {
        Rc::new(RefCell::new(self))
    }
}

impl SpatialTarget for Transform {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn euler_angles(&self) -> Vec3 {
        self.euler_angles
    }

    fn set_euler_angles(&mut self, angles: Vec3) {
        self.euler_angles = angles;
    }
}
