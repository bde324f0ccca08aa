//! Service order for multi-cup pours.
use nalgebra::Vector3;

/// Farthest-from-origin first, so the arm never sweeps back over cups it
/// already filled. Stable: equal distances keep their input order.
pub fn sort_by_distance_descending(points: &mut [Vector3<f64>]) {
    points.sort_by(|a, b| b.norm_squared().total_cmp(&a.norm_squared()));
}
