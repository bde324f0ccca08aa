//! `From` implementations bridging `pourer_config` types to `pourer_core` types.
//!
//! Angles in the TOML schema are roll/pitch/yaw degrees; runtime poses carry
//! unit quaternions.

use nalgebra::{UnitQuaternion, Vector3};
use pourer_traits::{CameraIntrinsics, Geometry, JointPositions, Pose, Shape};

use crate::config::{
    AssistCfg, CameraCfg, CylinderCfg, MotionCfg, PlacesCfg, PourCfg, PourerCfg, WeightCfg,
    default_obstacles,
};
use crate::error::Result;
use crate::pour_params::{WeightBucket, default_buckets};

fn pose(position: [f64; 3], rpy_deg: [f64; 3]) -> Pose {
    Pose::new(
        Vector3::from(position),
        UnitQuaternion::from_euler_angles(
            rpy_deg[0].to_radians(),
            rpy_deg[1].to_radians(),
            rpy_deg[2].to_radians(),
        ),
    )
}

// ── Geometry ─────────────────────────────────────────────────────────────────

// Free function: both `Geometry` and `ObstacleCfg` live in other crates.
fn geometry_from(c: &pourer_config::ObstacleCfg) -> Geometry {
    // Missing dimensions become zero and are rejected by world-state validation.
    let shape = match c.kind {
        pourer_config::ShapeKind::Box => {
            let [x, y, z] = c.size.unwrap_or_default();
            Shape::Box { x, y, z }
        }
        pourer_config::ShapeKind::Capsule => Shape::Capsule {
            radius: c.radius.unwrap_or_default(),
            length: c.length.unwrap_or_default(),
        },
    };
    Geometry {
        label: c.label.clone(),
        pose: pose(c.position, c.rpy_deg),
        shape,
    }
}

// ── MotionCfg ────────────────────────────────────────────────────────────────

impl From<&pourer_config::MotionCfg> for MotionCfg {
    fn from(c: &pourer_config::MotionCfg) -> Self {
        Self {
            max_plan_attempts: c.max_plan_attempts,
            initial_seed: c.initial_seed,
            world_frame: c.world_frame.clone(),
            arm_frame: c.arm_frame.clone(),
            gripper_frame: c.gripper_frame.clone(),
            extra_frames: c.extra_frames.clone(),
            obstacles: c.obstacles.as_ref().map_or_else(default_obstacles, |obs| {
                obs.iter().map(geometry_from).collect()
            }),
            line_tolerance_mm: c.line_tolerance_mm,
            line_orientation_tolerance_deg: c.line_orientation_tolerance_deg,
        }
    }
}

// ── Pour table ───────────────────────────────────────────────────────────────

impl From<&pourer_config::BucketRow> for WeightBucket {
    fn from(r: &pourer_config::BucketRow) -> Self {
        Self {
            lower_g: r.lower_g,
            upper_g: r.upper_g,
            angle_offset_deg: r.angle_offset_deg,
            duration_lower_ms: r.duration_lower_ms,
            duration_upper_ms: r.duration_upper_ms,
        }
    }
}

impl PourCfg {
    /// Shape parameters from `c`, bucket table supplied separately because
    /// resolving it may read a file.
    pub fn from_config(c: &pourer_config::PourCfg, buckets: Vec<WeightBucket>) -> Self {
        Self {
            wrist_joint: c.wrist_joint,
            base_tilt_deg: c.base_tilt_deg,
            pour_height_mm: c.pour_height_mm,
            lip_offset_mm: c.lip_offset_mm,
            upright_tolerance_deg: c.upright_tolerance_deg,
            buckets,
        }
    }
}

// ── Perception ───────────────────────────────────────────────────────────────

impl From<&pourer_config::CameraCfg> for CameraCfg {
    fn from(c: &pourer_config::CameraCfg) -> Self {
        Self {
            intrinsics: CameraIntrinsics {
                fx: c.fx,
                fy: c.fy,
                cx: c.cx,
                cy: c.cy,
                width: c.width,
                height: c.height,
            },
            pose: pose(c.position, c.rpy_deg),
            camera_to_surface_mm: c.camera_to_surface_mm,
            object_height_mm: c.object_height_mm,
            cup_label: c.cup_label.clone(),
        }
    }
}

impl From<&pourer_config::CylinderCfg> for CylinderCfg {
    fn from(c: &pourer_config::CylinderCfg) -> Self {
        Self {
            roi_min: Vector3::from(c.roi_min),
            roi_max: Vector3::from(c.roi_max),
            ground_z_mm: c.ground_z_mm,
            ground_margin_mm: c.ground_margin_mm,
            cluster_tolerance_mm: c.cluster_tolerance_mm,
            min_points: c.min_points,
            expected_radius_mm: c.expected_radius_mm,
            radius_tolerance_mm: c.radius_tolerance_mm,
            expected_height_mm: c.expected_height_mm,
            height_tolerance_mm: c.height_tolerance_mm,
        }
    }
}

// ── Weight, places, assist ───────────────────────────────────────────────────

impl From<&pourer_config::WeightCfg> for WeightCfg {
    fn from(c: &pourer_config::WeightCfg) -> Self {
        Self {
            field: c.field.clone(),
            samples: c.samples,
            delay_ms: c.delay_ms,
        }
    }
}

impl From<&pourer_config::PlacesCfg> for PlacesCfg {
    fn from(c: &pourer_config::PlacesCfg) -> Self {
        Self {
            home: JointPositions::new(c.home.clone()),
            pickup_far: pose(c.pickup_far, [0.0; 3]),
            pickup_mid: pose(c.pickup_mid, [0.0; 3]),
            pickup_scale: pose(c.pickup_scale, [0.0; 3]),
            approach_mm: c.approach_mm,
            lift_mm: c.lift_mm,
            touch_offset_mm: c.touch_offset_mm,
            grasp_height_mm: c.grasp_height_mm,
            bottle_radius_mm: c.bottle_radius_mm,
            bottle_length_mm: c.bottle_length_mm,
        }
    }
}

impl From<&pourer_config::AssistCfg> for AssistCfg {
    fn from(c: &pourer_config::AssistCfg) -> Self {
        Self {
            balance: JointPositions::new(c.balance.clone()),
            rest: JointPositions::new(c.rest.clone()),
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl TryFrom<&pourer_config::Config> for PourerCfg {
    type Error = eyre::Report;

    /// Fails only when the pour table CSV cannot be read.
    fn try_from(c: &pourer_config::Config) -> Result<Self> {
        let buckets = match c.pour_buckets()? {
            Some(rows) => rows.iter().map(WeightBucket::from).collect(),
            None => default_buckets(),
        };
        Ok(Self {
            motion: (&c.motion).into(),
            pour: PourCfg::from_config(&c.pour, buckets),
            camera: (&c.camera).into(),
            cylinder: (&c.cylinder).into(),
            weight: (&c.weight).into(),
            places: (&c.places).into(),
            assist: (&c.assist).into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_runtime_defaults() {
        let from_toml = PourerCfg::try_from(&pourer_config::Config::default()).unwrap();
        let native = PourerCfg::default();
        assert_eq!(from_toml.pour.buckets, native.pour.buckets);
        assert_eq!(from_toml.motion.obstacles, native.motion.obstacles);
        assert_eq!(from_toml.places.home, native.places.home);
        assert_eq!(from_toml.assist.balance, native.assist.balance);
        assert_eq!(from_toml.camera.intrinsics, native.camera.intrinsics);
        let a = from_toml.camera.pose.transform_point(&Vector3::new(0.0, 0.0, 900.0));
        let b = native.camera.pose.transform_point(&Vector3::new(0.0, 0.0, 900.0));
        assert!((a - b).norm() < 1e-9);
    }

    #[test]
    fn inline_obstacles_become_world_geometry() {
        let cfg = pourer_config::load_toml(
            r#"
[[motion.obstacles]]
label = "post"
kind = "box"
position = [100.0, 200.0, 50.0]
size = [40.0, 40.0, 100.0]

[[motion.obstacles]]
label = "pipe"
kind = "capsule"
radius = 15.0
length = 300.0
"#,
        )
        .unwrap();
        let rt = PourerCfg::try_from(&cfg).unwrap();
        let obs = &rt.motion.obstacles;
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].label, "post");
        assert_eq!(obs[0].shape, Shape::Box { x: 40.0, y: 40.0, z: 100.0 });
        assert!((obs[0].pose.position - Vector3::new(100.0, 200.0, 50.0)).norm() < 1e-9);
        assert_eq!(obs[1].shape, Shape::Capsule { radius: 15.0, length: 300.0 });
    }

    #[test]
    fn inline_buckets_replace_builtin() {
        let cfg = pourer_config::load_toml(
            "[[pour.buckets]]\nlower_g = 100\nupper_g = 200\nangle_offset_deg = 3.0\nduration_lower_ms = 900\nduration_upper_ms = 800\n",
        )
        .unwrap();
        let rt = PourerCfg::try_from(&cfg).unwrap();
        assert_eq!(rt.pour.buckets.len(), 1);
        assert_eq!(rt.pour.buckets[0].angle_offset_deg, 3.0);
    }
}
