//! Simulated overhead camera: a detector that projects known cup positions
//! into pixel boxes, and a depth source that samples their surfaces.
use nalgebra::{Point3, Vector3};
use pourer_traits::{
    BoundingBox, BoxError, CameraIntrinsics, Detector, PointCloud, PointCloudSource, Pose,
};

use crate::util::Noise;

/// Upright cylinders standing on the table, world frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SimScene {
    /// Base centers (mm).
    pub cups: Vec<Vector3<f64>>,
    pub cup_radius_mm: f64,
    pub cup_height_mm: f64,
    /// Camera frame expressed in world.
    pub camera_pose: Pose,
}

impl SimScene {
    fn to_camera(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.camera_pose
            .to_isometry()
            .inverse_transform_point(&Point3::from(*p))
            .coords
    }
}

pub struct SimDetector {
    scene: SimScene,
    intrinsics: CameraIntrinsics,
    label: String,
}

impl SimDetector {
    pub fn new(scene: SimScene, intrinsics: CameraIntrinsics, label: impl Into<String>) -> Self {
        Self {
            scene,
            intrinsics,
            label: label.into(),
        }
    }
}

impl Detector for SimDetector {
    fn detect(&mut self) -> Result<Vec<BoundingBox>, BoxError> {
        let k = self.intrinsics;
        let s = &self.scene;
        let boxes: Vec<BoundingBox> = s
            .cups
            .iter()
            .filter_map(|base| {
                let rim = s.to_camera(&(base + Vector3::z() * s.cup_height_mm));
                if rim.z <= 0.0 {
                    return None;
                }
                let (u, v) = (k.cx + k.fx * rim.x / rim.z, k.cy + k.fy * rim.y / rim.z);
                let in_view = (0.0..f64::from(k.width)).contains(&u)
                    && (0.0..f64::from(k.height)).contains(&v);
                if !in_view {
                    return None;
                }
                let (hw, hh) = (k.fx * s.cup_radius_mm / rim.z, k.fy * s.cup_radius_mm / rim.z);
                Some(BoundingBox {
                    label: self.label.clone(),
                    confidence: 0.9,
                    x_min: u - hw,
                    y_min: v - hh,
                    x_max: u + hw,
                    y_max: v + hh,
                })
            })
            .collect();
        tracing::debug!(count = boxes.len(), "sim detections");
        Ok(boxes)
    }
}

pub struct SimPointCloud {
    scene: SimScene,
    noise: Noise,
    noise_mm: f64,
}

impl SimPointCloud {
    pub fn new(scene: SimScene, noise_mm: f64) -> Self {
        Self {
            scene,
            noise: Noise::new(0x5EED),
            noise_mm,
        }
    }
}

impl PointCloudSource for SimPointCloud {
    /// Cup walls plus a ring of table around each cup, in the camera frame.
    fn next_cloud(&mut self) -> Result<PointCloud, BoxError> {
        const RINGS: u32 = 12;
        const STEPS: u32 = 36;
        let s = &self.scene;
        let mut points = Vec::new();
        for base in &s.cups {
            for ring in 1..=RINGS {
                let z = s.cup_height_mm * f64::from(ring) / f64::from(RINGS);
                for step in 0..STEPS {
                    let t = std::f64::consts::TAU * f64::from(step) / f64::from(STEPS);
                    let r = s.cup_radius_mm + self.noise.next_scaled(self.noise_mm);
                    let p = base + Vector3::new(r * t.cos(), r * t.sin(), z);
                    points.push(s.to_camera(&p));
                }
            }
            for step in 0..STEPS {
                let t = std::f64::consts::TAU * f64::from(step) / f64::from(STEPS);
                let r = s.cup_radius_mm * 2.5;
                points.push(s.to_camera(&(base + Vector3::new(r * t.cos(), r * t.sin(), 0.0))));
            }
        }
        tracing::debug!(points = points.len(), "sim point cloud");
        Ok(PointCloud::new(points))
    }
}
