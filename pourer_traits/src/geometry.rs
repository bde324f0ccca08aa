//! Shared geometry vocabulary for the robot-facing interfaces.
//!
//! Units: positions and dimensions in millimetres, joint values and angular
//! tolerances in degrees.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};

/// Position + orientation of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self::at(Vector3::new(x, y, z))
    }

    /// Translation only, identity orientation.
    pub fn at(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    pub fn identity() -> Self {
        Self::from_position(0.0, 0.0, 0.0)
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self::new(iso.translation.vector, iso.rotation)
    }

    /// `self ∘ other`: express `other` (given relative to `self`) in `self`'s parent frame.
    pub fn compose(&self, other: &Pose) -> Pose {
        Self::from_isometry(&(self.to_isometry() * other.to_isometry()))
    }

    /// Map a point given in this pose's frame into the parent frame.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.to_isometry()
            .transform_point(&Point3::from(*p))
            .coords
    }

    /// Same orientation, position shifted by `delta` in the parent frame.
    pub fn translated(&self, delta: Vector3<f64>) -> Pose {
        Pose::new(self.position + delta, self.orientation)
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Joint configuration of an arm, one value per joint (degrees).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JointPositions(pub Vec<f64>);

impl JointPositions {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self(values.into())
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Planner output: a waypoint path for the movable frame and the matching
/// joint-space trajectory, index for index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Plan {
    pub path: Vec<Pose>,
    pub trajectory: Vec<JointPositions>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// Path and trajectory describe the same waypoints.
    pub fn is_consistent(&self) -> bool {
        !self.trajectory.is_empty() && self.path.len() == self.trajectory.len()
    }

    /// Final joint configuration, if any.
    pub fn end(&self) -> Option<&JointPositions> {
        self.trajectory.last()
    }

    /// The same motion played backwards: path and trajectory reversed in lockstep.
    pub fn reversed(&self) -> Plan {
        Plan {
            path: self.path.iter().rev().copied().collect(),
            trajectory: self.trajectory.iter().rev().cloned().collect(),
        }
    }
}

/// Collision shape dimensions (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { x: f64, y: f64, z: f64 },
    Capsule { radius: f64, length: f64 },
}

/// Labelled collision geometry placed at a pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub label: String,
    pub pose: Pose,
    pub shape: Shape,
}

/// A named frame attached to a parent frame, optionally carrying geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLink {
    pub name: String,
    pub parent: String,
    pub transform: Pose,
    pub geometry: Option<Geometry>,
}

/// Everything besides the robot itself that a planning call must respect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldState {
    pub obstacles: Vec<Geometry>,
    pub frames: Vec<FrameLink>,
}

/// What the planner may tolerate or must respect while moving.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintProfile {
    /// No constraint beyond collision avoidance.
    Free,
    /// Straight-line motion of the movable frame.
    Linear {
        line_tolerance_mm: f64,
        orientation_tolerance_deg: f64,
    },
    /// Straight-line motion; contact between the two frames is allowed.
    LinearWithAllowedCollision { frame_a: String, frame_b: String },
    /// Keep orientation within tolerance, path shape free.
    OrientationOnly { tolerance_deg: f64 },
    Combined(Vec<ConstraintProfile>),
}

impl ConstraintProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Linear { .. } => "linear",
            Self::LinearWithAllowedCollision { .. } => "linear_allow_collision",
            Self::OrientationOnly { .. } => "orientation_only",
            Self::Combined(_) => "combined",
        }
    }
}

/// Axis-aligned detection box in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub label: String,
    pub confidence: f64,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

/// Pinhole camera model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

/// Unordered 3D points (mm).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    pub points: Vec<Vector3<f64>>,
}

impl PointCloud {
    pub fn new(points: Vec<Vector3<f64>>) -> Self {
        Self { points }
    }
    pub fn len(&self) -> usize {
        self.points.len()
    }
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A single sensor field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Reading {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
        }
    }
}
