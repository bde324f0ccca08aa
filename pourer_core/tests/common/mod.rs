#![allow(dead_code)]
//! Shared rig: mock collaborators wired into an orchestrator on a manual clock.

use std::sync::Arc;

use nalgebra::Vector3;
use pourer_core::config::PourerCfg;
use pourer_core::mocks::{
    FixedCloud, FixedDetector, FixedScale, LinePlanner, RecordingArm, RecordingGripper,
};
use pourer_core::Orchestrator;
use pourer_traits::{BoundingBox, ManualClock, PointCloud};

pub struct Rig {
    pub orch: Orchestrator,
    pub arm: RecordingArm,
    pub assist: RecordingArm,
    pub gripper: RecordingGripper,
    pub clock: Arc<ManualClock>,
}

/// Detection box whose center unprojects onto the rim of a cup standing at
/// world `(x, y)` under the default overhead camera.
pub fn cup_box(x: f64, y: f64) -> BoundingBox {
    let cfg = PourerCfg::default();
    let k = cfg.camera.intrinsics;
    let depth = cfg.camera.camera_to_surface_mm - cfg.camera.object_height_mm;
    let cam_y = cfg.camera.pose.position.y;
    let u = k.cx + k.fx * x / depth;
    let v = k.cy + k.fy * (cam_y - y) / depth;
    BoundingBox {
        label: "cup".into(),
        confidence: 0.9,
        x_min: u - 15.0,
        y_min: v - 20.0,
        x_max: u + 15.0,
        y_max: v + 20.0,
    }
}

/// Camera-frame cloud of an upright cylinder standing at world `(x, y)`,
/// plus a patch of table.
pub fn cup_cloud(x: f64, y: f64, radius: f64, height: f64) -> PointCloud {
    let cfg = PourerCfg::default();
    let cam = cfg.camera.pose.position;
    let to_camera = |p: Vector3<f64>| Vector3::new(p.x - cam.x, cam.y - p.y, cam.z - p.z);
    let mut points = Vec::new();
    for ring in 0..15 {
        let z = height * f64::from(ring + 1) / 15.0;
        for step in 0..30 {
            // visible half facing the camera's side
            let t = std::f64::consts::PI * f64::from(step) / 29.0;
            points.push(to_camera(Vector3::new(x + radius * t.cos(), y - radius * t.sin(), z)));
        }
    }
    for i in 0..50 {
        points.push(to_camera(Vector3::new(-500.0 + 20.0 * f64::from(i), 200.0, 0.0)));
    }
    PointCloud::new(points)
}

pub fn rig_with(
    cfg: PourerCfg,
    boxes: Vec<BoundingBox>,
    scale_g: f64,
    planner: LinePlanner,
) -> Rig {
    let clock = Arc::new(ManualClock::new());
    let arm = RecordingArm::new(cfg.places.home.clone());
    let assist = RecordingArm::new(cfg.assist.rest.clone());
    let gripper = RecordingGripper::new(true);
    let orch = Orchestrator::builder()
        .with_planner(planner)
        .with_arm(arm.clone())
        .with_gripper(gripper.clone())
        .with_assist_arm(assist.clone())
        .with_scale(FixedScale {
            field: cfg.weight.field.clone(),
            grams: scale_g,
        })
        .with_detector(FixedDetector(boxes))
        .with_clock(clock.clone())
        .with_config(cfg)
        .build()
        .expect("rig should build");
    Rig {
        orch,
        arm,
        assist,
        gripper,
        clock,
    }
}

pub fn rig(cups: &[(f64, f64)], scale_g: f64) -> Rig {
    rig_with(
        PourerCfg::default(),
        cups.iter().map(|&(x, y)| cup_box(x, y)).collect(),
        scale_g,
        LinePlanner::new(8),
    )
}

pub fn cloud_rig(cloud: PointCloud) -> Orchestrator {
    let cfg = PourerCfg::default();
    Orchestrator::builder()
        .with_planner(LinePlanner::new(4))
        .with_arm(RecordingArm::new(cfg.places.home.clone()))
        .with_gripper(RecordingGripper::new(true))
        .with_point_cloud(FixedCloud(cloud))
        .with_clock(Arc::new(ManualClock::new()))
        .with_config(cfg)
        .build()
        .expect("rig should build")
}
