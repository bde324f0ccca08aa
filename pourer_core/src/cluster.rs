//! Running centroid / spread of a set of 3D points.
//!
//! Diagnostic only: calibration runs and localization traces report these
//! numbers, nothing in the control path reads them.

use nalgebra::Vector3;

#[derive(Debug, Clone, Default)]
pub struct ClusterStats {
    points: Vec<Vector3<f64>>,
    sum: Vector3<f64>,
}

impl ClusterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, p: Vector3<f64>) {
        self.sum += p;
        self.points.push(p);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    /// Arithmetic centroid; origin when empty.
    pub fn mean(&self) -> Vector3<f64> {
        if self.points.is_empty() {
            return Vector3::zeros();
        }
        self.sum / self.points.len() as f64
    }

    /// Per-axis population standard deviation (divides by N).
    pub fn std_dev(&self) -> Vector3<f64> {
        if self.points.is_empty() {
            return Vector3::zeros();
        }
        let mean = self.mean();
        let n = self.points.len() as f64;
        let sq = self
            .points
            .iter()
            .map(|p| (p - mean).component_mul(&(p - mean)))
            .fold(Vector3::zeros(), |acc, d| acc + d);
        (sq / n).map(f64::sqrt)
    }
}

impl Extend<Vector3<f64>> for ClusterStats {
    fn extend<I: IntoIterator<Item = Vector3<f64>>>(&mut self, iter: I) {
        for p in iter {
            self.push(p);
        }
    }
}

impl FromIterator<Vector3<f64>> for ClusterStats {
    fn from_iter<I: IntoIterator<Item = Vector3<f64>>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.extend(iter);
        stats
    }
}
