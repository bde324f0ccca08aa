//! Configuration types for the pour engine.
//!
//! These are the runtime configuration structs handed to the orchestrator at
//! construction. They are separate from the TOML-deserialized config in
//! `pourer_config`; see `conversions` for the bridge.
//!
//! Units: mm for lengths, degrees for angles and joint values.

use crate::pour_params::{WeightBucket, default_buckets};
use nalgebra::{UnitQuaternion, Vector3};
use pourer_traits::{CameraIntrinsics, Geometry, JointPositions, Pose, Shape};

/// Planning requests and the static scene.
#[derive(Debug, Clone)]
pub struct MotionCfg {
    /// Hard cap on planning attempts per request (each with a new seed).
    pub max_plan_attempts: u32,
    /// Seed of the first attempt; attempt `n` uses `initial_seed + n`.
    pub initial_seed: u64,
    pub world_frame: String,
    pub arm_frame: String,
    /// Frame the planner moves to the goal pose.
    pub gripper_frame: String,
    /// Additional frames present in the robot's frame tree.
    pub extra_frames: Vec<String>,
    /// Table, walls, ceiling, sensor housing. Constant across cycles.
    pub obstacles: Vec<Geometry>,
    /// Straight-line deviation allowed for linear moves.
    pub line_tolerance_mm: f64,
    /// Orientation drift allowed for linear moves.
    pub line_orientation_tolerance_deg: f64,
}

impl MotionCfg {
    /// Every frame a world-state link may name as parent.
    pub fn robot_frames(&self) -> Vec<String> {
        let mut frames = vec![
            self.world_frame.clone(),
            self.arm_frame.clone(),
            self.gripper_frame.clone(),
        ];
        frames.extend(self.extra_frames.iter().cloned());
        frames
    }
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            max_plan_attempts: 10,
            initial_seed: 0,
            world_frame: "world".into(),
            arm_frame: "arm".into(),
            gripper_frame: "gripper".into(),
            extra_frames: Vec::new(),
            obstacles: default_obstacles(),
            line_tolerance_mm: 5.0,
            line_orientation_tolerance_deg: 2.0,
        }
    }
}

/// Static obstacles of the demo cell, robot base at the origin.
pub fn default_obstacles() -> Vec<Geometry> {
    let boxed = |label: &str, x: f64, y: f64, z: f64, sx: f64, sy: f64, sz: f64| Geometry {
        label: label.into(),
        pose: Pose::from_position(x, y, z),
        shape: Shape::Box {
            x: sx,
            y: sy,
            z: sz,
        },
    };
    vec![
        boxed("table", 0.0, 300.0, -10.0, 1600.0, 1200.0, 20.0),
        boxed("wall_back", 0.0, -350.0, 500.0, 1600.0, 20.0, 1000.0),
        boxed("wall_side", 820.0, 300.0, 500.0, 20.0, 1200.0, 1000.0),
        boxed("ceiling", 0.0, 300.0, 1150.0, 1600.0, 1200.0, 20.0),
        Geometry {
            label: "camera_housing".into(),
            pose: Pose::from_position(0.0, 400.0, 1060.0),
            shape: Shape::Capsule {
                radius: 60.0,
                length: 200.0,
            },
        },
    ]
}

/// Pour motion shape and the weight table.
#[derive(Debug, Clone)]
pub struct PourCfg {
    /// Index of the joint that tilts the bottle.
    pub wrist_joint: usize,
    /// Tilt applied for every pour; the weight table adds its offset on top.
    pub base_tilt_deg: f64,
    /// Gripper height above the cup rim while pouring.
    pub pour_height_mm: f64,
    /// Horizontal distance from gripper to bottle lip, toward the cup.
    pub lip_offset_mm: f64,
    /// Orientation tolerance while carrying a filled bottle.
    pub upright_tolerance_deg: f64,
    pub buckets: Vec<WeightBucket>,
}

impl Default for PourCfg {
    fn default() -> Self {
        Self {
            wrist_joint: 3,
            base_tilt_deg: 90.0,
            pour_height_mm: 120.0,
            lip_offset_mm: 80.0,
            upright_tolerance_deg: 5.0,
            buckets: default_buckets(),
        }
    }
}

/// Overhead camera used for bounding-box localization.
#[derive(Debug, Clone)]
pub struct CameraCfg {
    pub intrinsics: CameraIntrinsics,
    /// Camera frame expressed in world.
    pub pose: Pose,
    pub camera_to_surface_mm: f64,
    /// Assumed height of every detected object (not measured per object).
    pub object_height_mm: f64,
    /// Detector label treated as a cup.
    pub cup_label: String,
}

impl Default for CameraCfg {
    fn default() -> Self {
        Self {
            intrinsics: CameraIntrinsics {
                fx: 600.0,
                fy: 600.0,
                cx: 320.0,
                cy: 240.0,
                width: 640,
                height: 480,
            },
            // Looking straight down at the table from 1 m.
            pose: Pose::new(
                Vector3::new(0.0, 400.0, 1000.0),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
            ),
            camera_to_surface_mm: 1000.0,
            object_height_mm: 100.0,
            cup_label: "cup".into(),
        }
    }
}

/// Point-cloud cleaning and cylinder acceptance window (world frame).
#[derive(Debug, Clone)]
pub struct CylinderCfg {
    pub roi_min: Vector3<f64>,
    pub roi_max: Vector3<f64>,
    pub ground_z_mm: f64,
    /// Points closer than this to the ground plane are dropped.
    pub ground_margin_mm: f64,
    /// Max XY gap between neighbouring points of one cluster.
    pub cluster_tolerance_mm: f64,
    pub min_points: usize,
    pub expected_radius_mm: f64,
    pub radius_tolerance_mm: f64,
    pub expected_height_mm: f64,
    pub height_tolerance_mm: f64,
}

impl Default for CylinderCfg {
    fn default() -> Self {
        Self {
            roi_min: Vector3::new(-600.0, -200.0, -10.0),
            roi_max: Vector3::new(600.0, 800.0, 400.0),
            ground_z_mm: 0.0,
            ground_margin_mm: 5.0,
            cluster_tolerance_mm: 15.0,
            min_points: 30,
            expected_radius_mm: 40.0,
            radius_tolerance_mm: 10.0,
            expected_height_mm: 100.0,
            height_tolerance_mm: 20.0,
        }
    }
}

/// Scale polling.
#[derive(Debug, Clone)]
pub struct WeightCfg {
    /// Numeric field of the scale's readings holding grams.
    pub field: String,
    pub samples: usize,
    pub delay_ms: u64,
}

impl Default for WeightCfg {
    fn default() -> Self {
        Self {
            field: "weight_g".into(),
            samples: 10,
            delay_ms: 50,
        }
    }
}

/// Fixed places in the cell.
#[derive(Debug, Clone)]
pub struct PlacesCfg {
    pub home: JointPositions,
    /// Bottle base positions for each pickup location.
    pub pickup_far: Pose,
    pub pickup_mid: Pose,
    pub pickup_scale: Pose,
    /// Stand-off before the straight-line grasp approach.
    pub approach_mm: f64,
    /// Vertical lift after grasping.
    pub lift_mm: f64,
    /// Gripper height above the cup rim for the touch demo.
    pub touch_offset_mm: f64,
    /// Grasp height above the bottle base.
    pub grasp_height_mm: f64,
    pub bottle_radius_mm: f64,
    pub bottle_length_mm: f64,
}

impl Default for PlacesCfg {
    fn default() -> Self {
        Self {
            home: JointPositions::new([90.0, 400.0, 300.0, 0.0, 0.0, 0.0]),
            pickup_far: Pose::from_position(0.0, 650.0, 0.0),
            pickup_mid: Pose::from_position(0.0, 500.0, 0.0),
            pickup_scale: Pose::from_position(300.0, 350.0, 0.0),
            approach_mm: 100.0,
            lift_mm: 80.0,
            touch_offset_mm: 10.0,
            grasp_height_mm: 120.0,
            bottle_radius_mm: 40.0,
            bottle_length_mm: 250.0,
        }
    }
}

/// Second arm that counter-balances the pour.
#[derive(Debug, Clone)]
pub struct AssistCfg {
    pub balance: JointPositions,
    pub rest: JointPositions,
}

impl Default for AssistCfg {
    fn default() -> Self {
        Self {
            balance: JointPositions::new([0.0, -20.0, 40.0, 0.0, 30.0, 0.0]),
            rest: JointPositions::new([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        }
    }
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct PourerCfg {
    pub motion: MotionCfg,
    pub pour: PourCfg,
    pub camera: CameraCfg,
    pub cylinder: CylinderCfg,
    pub weight: WeightCfg,
    pub places: PlacesCfg,
    pub assist: AssistCfg,
}
