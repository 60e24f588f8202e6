use serde::{Deserialize, Serialize};

pub mod hash;

// ----------------------------------------------
// Vec3
// ----------------------------------------------

// World space position.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }
}

// ----------------------------------------------
// Quat
// ----------------------------------------------

// Orientation as a unit quaternion. Default is identity.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    // Rotation of `angle_radians` around the Y (up) axis.
    #[inline]
    pub fn from_yaw(angle_radians: f32) -> Self {
        let (s, c) = (angle_radians * 0.5).sin_cos();
        Self { x: 0.0, y: s, z: 0.0, w: c }
    }
}

impl Default for Quat {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

// ----------------------------------------------
// Transform
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    #[inline]
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub const fn from_position(position: Vec3) -> Self {
        Self { position, rotation: Quat::identity() }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self { position: Vec3::zero(), rotation: Quat::identity() }
    }
}

// ----------------------------------------------
// ParentId
// ----------------------------------------------

// Opaque handle of a host scene node an instance can be attached to.
// `None` in place of a ParentId means the pool root.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentId(pub u64);

impl std::fmt::Display for ParentId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
