//! Bottle weight -> pour angle / duration.
//!
//! A table of contiguous weight buckets, heaviest first. Within a bucket the
//! duration is interpolated linearly between the bucket's end values; the
//! angle offset is constant per bucket. Outside the table the nearest end
//! bucket's edge value is used.
use crate::error::{BuildError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBucket {
    pub lower_g: i32,
    pub upper_g: i32,
    pub angle_offset_deg: f64,
    /// Duration at `lower_g`.
    pub duration_lower_ms: u64,
    /// Duration at `upper_g`.
    pub duration_upper_ms: u64,
}

impl WeightBucket {
    #[inline]
    fn contains(&self, w: i32) -> bool {
        (self.lower_g..=self.upper_g).contains(&w)
    }

    fn duration_at(&self, w: i32) -> u64 {
        if w == self.upper_g {
            return self.duration_upper_ms;
        }
        if w == self.lower_g {
            return self.duration_lower_ms;
        }
        // f64 so full-range buckets cannot overflow
        let frac = (f64::from(w) - f64::from(self.lower_g))
            / (f64::from(self.upper_g) - f64::from(self.lower_g));
        let lo = self.duration_lower_ms as f64;
        let hi = self.duration_upper_ms as f64;
        (lo + (hi - lo) * frac).round() as u64
    }
}

/// Result of the interpolation; a plain value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PourParameters {
    pub angle_offset_deg: f64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct PourParameterModel {
    // Invariant: non-empty, sorted heaviest first, contiguous and continuous.
    buckets: Vec<WeightBucket>,
}

impl PourParameterModel {
    /// Validate and sort a bucket table.
    ///
    /// Buckets must tile a single weight range without gaps or overlap, and
    /// neighbouring buckets must agree on the duration at their shared edge.
    pub fn new(mut buckets: Vec<WeightBucket>) -> Result<Self> {
        if buckets.is_empty() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "pour table must have at least one bucket",
            )));
        }
        for b in &buckets {
            if b.lower_g >= b.upper_g {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "pour bucket lower_g must be < upper_g",
                )));
            }
            if !b.angle_offset_deg.is_finite() {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "pour bucket angle must be finite",
                )));
            }
        }
        buckets.sort_by(|a, b| b.upper_g.cmp(&a.upper_g));
        for pair in buckets.windows(2) {
            let (heavier, lighter) = (&pair[0], &pair[1]);
            if lighter.upper_g != heavier.lower_g {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "pour buckets must be contiguous (no gaps or overlap)",
                )));
            }
            if lighter.duration_upper_ms != heavier.duration_lower_ms {
                return Err(eyre::Report::new(BuildError::InvalidConfig(
                    "pour durations must agree at shared bucket edges",
                )));
            }
        }
        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[WeightBucket] {
        &self.buckets
    }

    pub fn parameters(&self, weight_g: i32) -> PourParameters {
        let heaviest = self.buckets[0];
        let lightest = self.buckets[self.buckets.len() - 1];

        if weight_g > heaviest.upper_g {
            return PourParameters {
                angle_offset_deg: heaviest.angle_offset_deg,
                duration_ms: heaviest.duration_upper_ms,
            };
        }
        if weight_g < lightest.lower_g {
            return PourParameters {
                angle_offset_deg: lightest.angle_offset_deg,
                duration_ms: lightest.duration_lower_ms,
            };
        }
        // Contiguous table: some bucket always matches here.
        let bucket = self
            .buckets
            .iter()
            .find(|b| b.contains(weight_g))
            .copied()
            .unwrap_or(lightest);
        let params = PourParameters {
            angle_offset_deg: bucket.angle_offset_deg,
            duration_ms: bucket.duration_at(weight_g),
        };
        tracing::debug!(
            weight_g,
            bucket_lower_g = bucket.lower_g,
            bucket_upper_g = bucket.upper_g,
            angle_offset_deg = params.angle_offset_deg,
            duration_ms = params.duration_ms,
            "pour parameters"
        );
        params
    }
}

impl Default for PourParameterModel {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
        }
    }
}

/// Built-in table for a ~1 kg bottle: fuller bottles start flowing at a
/// shallower tilt and need less time for the same pour.
pub fn default_buckets() -> Vec<WeightBucket> {
    vec![
        WeightBucket {
            lower_g: 850,
            upper_g: 1000,
            angle_offset_deg: 0.0,
            duration_lower_ms: 1800,
            duration_upper_ms: 1500,
        },
        WeightBucket {
            lower_g: 700,
            upper_g: 850,
            angle_offset_deg: 10.0,
            duration_lower_ms: 2200,
            duration_upper_ms: 1800,
        },
        WeightBucket {
            lower_g: 550,
            upper_g: 700,
            angle_offset_deg: 20.0,
            duration_lower_ms: 2700,
            duration_upper_ms: 2200,
        },
        WeightBucket {
            lower_g: 400,
            upper_g: 550,
            angle_offset_deg: 30.0,
            duration_lower_ms: 3300,
            duration_upper_ms: 2700,
        },
    ]
}
