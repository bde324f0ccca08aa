//! Object localization from perception data.
//!
//! Two independent strategies:
//! - **Bounding-box unprojection**: detection center pixel pushed through the
//!   pinhole model at a fixed assumed depth (camera-to-surface distance minus
//!   an assumed object height). The height is a configured constant, not a
//!   per-object measurement; tall or short objects land slightly off.
//! - **Cylinder fit**: clean a point cloud, split it into XY-connected
//!   clusters, fit an upright cylinder to each and keep the best one inside
//!   the expected radius/height window.
use crate::cluster::ClusterStats;
use crate::config::{CameraCfg, CylinderCfg};
use nalgebra::{Matrix3, Vector3};
use pourer_traits::{BoundingBox, PointCloud, Pose};
use std::collections::{HashMap, VecDeque};

/// Camera-frame pose of each detection's center at the assumed depth.
/// No detections -> empty; the caller decides what count is acceptable.
pub fn unproject_detections(boxes: &[BoundingBox], camera: &CameraCfg) -> Vec<Pose> {
    let depth = camera.camera_to_surface_mm - camera.object_height_mm;
    let k = &camera.intrinsics;
    boxes
        .iter()
        .map(|b| {
            let (u, v) = b.center();
            let x = (u - k.cx) * depth / k.fx;
            let y = (v - k.cy) * depth / k.fy;
            Pose::from_position(x, y, depth)
        })
        .collect()
}

/// Detected upright cylinder. `found == false` means no coherent object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CupObservation {
    /// Center of the cylinder volume (world frame).
    pub center: Vector3<f64>,
    pub height: f64,
    pub radius: f64,
    pub found: bool,
}

impl CupObservation {
    pub fn not_found() -> Self {
        Self {
            center: Vector3::zeros(),
            height: 0.0,
            radius: 0.0,
            found: false,
        }
    }

    /// Center of the rim.
    pub fn top(&self) -> Vector3<f64> {
        self.center + Vector3::new(0.0, 0.0, self.height / 2.0)
    }
}

/// Express a camera-frame cloud in the world frame.
pub fn cloud_to_world(cloud: &PointCloud, camera_pose: &Pose) -> Vec<Vector3<f64>> {
    cloud
        .points
        .iter()
        .map(|p| camera_pose.transform_point(p))
        .collect()
}

/// Drop non-finite points, points outside the region of interest and points
/// on (or within the margin of) the ground plane.
pub fn clean_cloud(points: &[Vector3<f64>], cfg: &CylinderCfg) -> Vec<Vector3<f64>> {
    let floor = cfg.ground_z_mm + cfg.ground_margin_mm;
    points
        .iter()
        .filter(|p| p.iter().all(|v| v.is_finite()))
        .filter(|p| {
            (0..3).all(|i| p[i] >= cfg.roi_min[i] && p[i] <= cfg.roi_max[i])
        })
        .filter(|p| p.z > floor)
        .copied()
        .collect()
}

/// Group points whose XY distance chains within `tolerance`.
pub fn cluster_xy(points: &[Vector3<f64>], tolerance: f64) -> Vec<Vec<Vector3<f64>>> {
    let cell = tolerance.max(1e-6);
    let key = |p: &Vector3<f64>| ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        grid.entry(key(p)).or_default().push(i);
    }

    let tol_sq = tolerance * tolerance;
    let mut visited = vec![false; points.len()];
    let mut clusters = Vec::new();
    let mut queue = VecDeque::new();
    for seed in 0..points.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        let mut members = Vec::new();
        while let Some(i) = queue.pop_front() {
            let p = points[i];
            members.push(p);
            let (cx, cy) = key(&p);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(bucket) = grid.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    for &j in bucket {
                        if visited[j] {
                            continue;
                        }
                        let q = points[j];
                        let d = (q.x - p.x).powi(2) + (q.y - p.y).powi(2);
                        if d <= tol_sq {
                            visited[j] = true;
                            queue.push_back(j);
                        }
                    }
                }
            }
        }
        clusters.push(members);
    }
    clusters
}

/// Algebraic (Kåsa) least-squares circle through the XY projection.
///
/// Works on partial arcs, which is all a single depth camera sees of a cup.
/// Returns `(center_x, center_y, radius)`, or `None` when degenerate.
pub fn fit_circle_xy(points: &[Vector3<f64>]) -> Option<(f64, f64, f64)> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;

    // Centered coordinates keep the normal equations well conditioned.
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for p in points {
        let (x, y) = (p.x - mx, p.y - my);
        let row = Vector3::new(x, y, 1.0);
        ata += row * row.transpose();
        atb += row * -(x * x + y * y);
    }
    let sol = ata.lu().solve(&atb)?;
    let (d, e, f) = (sol[0], sol[1], sol[2]);
    let (cx, cy) = (-d / 2.0, -e / 2.0);
    let r_sq = cx * cx + cy * cy - f;
    if !(r_sq.is_finite() && r_sq > 0.0) {
        return None;
    }
    Some((cx + mx, cy + my, r_sq.sqrt()))
}

/// Fit an upright cylinder standing on the ground plane to world-frame points.
pub fn fit_cylinder(points: &[Vector3<f64>], cfg: &CylinderCfg) -> CupObservation {
    let cleaned = clean_cloud(points, cfg);
    let clusters = cluster_xy(&cleaned, cfg.cluster_tolerance_mm);
    tracing::debug!(
        raw = points.len(),
        cleaned = cleaned.len(),
        clusters = clusters.len(),
        "point cloud cleaned"
    );

    let mut best: Option<(usize, CupObservation)> = None;
    for members in clusters.iter().filter(|c| c.len() >= cfg.min_points) {
        let Some(obs) = fit_cluster(members, cfg) else {
            continue;
        };
        let radius_ok = (obs.radius - cfg.expected_radius_mm).abs() <= cfg.radius_tolerance_mm;
        let height_ok = (obs.height - cfg.expected_height_mm).abs() <= cfg.height_tolerance_mm;
        if tracing::enabled!(tracing::Level::TRACE) {
            let stats: ClusterStats = members.iter().copied().collect();
            let (mean, sd) = (stats.mean(), stats.std_dev());
            tracing::trace!(
                points = stats.len(),
                mean_x = mean.x,
                mean_y = mean.y,
                mean_z = mean.z,
                sd_x = sd.x,
                sd_y = sd.y,
                sd_z = sd.z,
                radius = obs.radius,
                height = obs.height,
                radius_ok,
                height_ok,
                "cylinder candidate"
            );
        }
        if radius_ok && height_ok && best.is_none_or(|(n, _)| members.len() > n) {
            best = Some((members.len(), obs));
        }
    }
    best.map(|(_, obs)| obs).unwrap_or_else(CupObservation::not_found)
}

fn fit_cluster(members: &[Vector3<f64>], cfg: &CylinderCfg) -> Option<CupObservation> {
    let (cx, cy, radius) = fit_circle_xy(members)?;
    let top = members.iter().map(|p| p.z).fold(f64::NEG_INFINITY, f64::max);
    let height = top - cfg.ground_z_mm;
    if !(height.is_finite() && height > 0.0) {
        return None;
    }
    Some(CupObservation {
        center: Vector3::new(cx, cy, cfg.ground_z_mm + height / 2.0),
        height,
        radius,
        found: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn cup_points(cx: f64, cy: f64, r: f64, h: f64, arc: f64) -> Vec<Vector3<f64>> {
        let mut pts = Vec::new();
        for k in 0..12 {
            let z = h * (k as f64 + 0.5) / 12.0;
            for a in 0..24 {
                let t = -arc / 2.0 + arc * a as f64 / 23.0;
                pts.push(Vector3::new(cx + r * t.cos(), cy + r * t.sin(), z));
            }
        }
        // rim
        pts.push(Vector3::new(cx + r, cy, h));
        pts
    }

    fn bbox_at(u: f64, v: f64) -> BoundingBox {
        BoundingBox {
            label: "cup".into(),
            confidence: 0.9,
            x_min: u - 20.0,
            y_min: v - 30.0,
            x_max: u + 20.0,
            y_max: v + 30.0,
        }
    }

    #[test]
    fn principal_point_unprojects_to_optical_axis() {
        let cam = CameraCfg::default();
        let poses = unproject_detections(&[bbox_at(cam.intrinsics.cx, cam.intrinsics.cy)], &cam);
        assert_eq!(poses.len(), 1);
        let p = poses[0].position;
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.z, cam.camera_to_surface_mm - cam.object_height_mm);
    }

    #[test]
    fn offset_pixel_scales_with_depth() {
        let cam = CameraCfg::default();
        let k = cam.intrinsics;
        let poses = unproject_detections(&[bbox_at(k.cx + 60.0, k.cy)], &cam);
        // 60 px * 900 mm / 600 px
        assert!((poses[0].position.x - 90.0).abs() < 1e-9);
    }

    #[test]
    fn no_detections_is_empty_not_error() {
        assert!(unproject_detections(&[], &CameraCfg::default()).is_empty());
    }

    #[test]
    fn circle_fit_recovers_partial_arc() {
        let pts = cup_points(120.0, 450.0, 40.0, 100.0, PI / 2.0);
        let (cx, cy, r) = fit_circle_xy(&pts).expect("fit");
        assert!((cx - 120.0).abs() < 1e-6, "cx={cx}");
        assert!((cy - 450.0).abs() < 1e-6, "cy={cy}");
        assert!((r - 40.0).abs() < 1e-6, "r={r}");
    }

    #[test]
    fn collinear_points_do_not_fit() {
        let pts: Vec<_> = (0..10).map(|i| Vector3::new(i as f64, 0.0, 1.0)).collect();
        assert!(fit_circle_xy(&pts).is_none());
    }

    #[test]
    fn cylinder_found_among_ground_and_clutter() {
        let cfg = CylinderCfg::default();
        let mut pts = cup_points(-200.0, 450.0, 40.0, 100.0, PI);
        // ground plane
        for i in 0..40 {
            pts.push(Vector3::new(-400.0 + 20.0 * i as f64, 300.0, 0.0));
        }
        // small box far away: too small to be a cup
        for i in 0..40 {
            pts.push(Vector3::new(300.0 + (i % 5) as f64, 200.0 + (i / 5) as f64, 30.0));
        }
        // outside region of interest
        pts.push(Vector3::new(5000.0, 0.0, 50.0));
        pts.push(Vector3::new(f64::NAN, 0.0, 50.0));

        let obs = fit_cylinder(&pts, &cfg);
        assert!(obs.found);
        assert!((obs.center.x + 200.0).abs() < 1e-6);
        assert!((obs.center.y - 450.0).abs() < 1e-6);
        assert!((obs.radius - 40.0).abs() < 1e-6);
        assert!((obs.height - 100.0).abs() < 1e-9);
        assert!((obs.top().z - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_scene_is_not_found() {
        let cfg = CylinderCfg::default();
        let ground: Vec<_> = (0..100)
            .map(|i| Vector3::new(i as f64 * 5.0, 300.0, 1.0))
            .collect();
        let obs = fit_cylinder(&ground, &cfg);
        assert!(!obs.found);
    }

    #[test]
    fn wrong_radius_is_rejected() {
        let cfg = CylinderCfg::default();
        let pts = cup_points(0.0, 400.0, 90.0, 100.0, PI);
        assert!(!fit_cylinder(&pts, &cfg).found);
    }

    #[test]
    fn clusters_split_on_gap() {
        let mut pts: Vec<_> = (0..10).map(|i| Vector3::new(i as f64, 0.0, 10.0)).collect();
        pts.extend((0..10).map(|i| Vector3::new(100.0 + i as f64, 0.0, 10.0)));
        let clusters = cluster_xy(&pts, 5.0);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.len() == 10));
    }

    #[test]
    fn cloud_transform_uses_camera_pose() {
        let cam = CameraCfg::default();
        let cloud = PointCloud::new(vec![Vector3::new(0.0, 0.0, 900.0)]);
        let world = cloud_to_world(&cloud, &cam.pose);
        assert!((world[0] - Vector3::new(0.0, 400.0, 100.0)).norm() < 1e-9);
    }
}
