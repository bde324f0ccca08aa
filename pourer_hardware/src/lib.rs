//! Simulated robot cell backends.
//!
//! Everything here implements the `pourer_traits` interfaces in-process so
//! the engine and CLI run end to end without a robot. Noise is generated
//! deterministically; two runs with the same configuration see the same
//! readings.
pub mod error;
pub mod motion;
pub mod perception;
pub mod util;

pub use motion::{SimArm, SimGripper, SimPlanner};
pub use perception::{SimDetector, SimPointCloud, SimScene};

use std::collections::HashMap;

use pourer_traits::{BoxError, Reading, Sensor};
use util::Noise;

use crate::error::HwError;

/// Scale under the bottle: a fixed weight plus bounded pseudo-noise.
pub struct SimScale {
    field: String,
    weight_g: f64,
    noise_g: f64,
    noise: Noise,
    responds: bool,
}

impl SimScale {
    pub fn new(field: impl Into<String>, weight_g: f64, noise_g: f64) -> Self {
        Self {
            field: field.into(),
            weight_g,
            noise_g,
            noise: Noise::new(0xC0FFEE),
            responds: true,
        }
    }

    /// A scale that has stopped reporting: every read times out.
    pub fn unresponsive(mut self) -> Self {
        self.responds = false;
        self
    }
}

impl Sensor for SimScale {
    fn readings(&mut self) -> Result<HashMap<String, Reading>, BoxError> {
        if !self.responds {
            return Err(Box::new(HwError::Timeout));
        }
        let w = self.weight_g + self.noise.next_scaled(self.noise_g);
        tracing::trace!(weight_g = w, "sim scale sample");
        Ok(HashMap::from([
            (self.field.clone(), Reading::Number(w)),
            ("stable".to_string(), Reading::Bool(true)),
            ("unit".to_string(), Reading::Text("g".into())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("weight_g", 800.0, 3.0)]
    #[case("grams", 512.5, 0.0)]
    #[case("weight_g", 0.0, 50.0)]
    fn scale_noise_stays_within_amplitude(
        #[case] field: &str,
        #[case] weight: f64,
        #[case] noise: f64,
    ) {
        let mut scale = SimScale::new(field, weight, noise);
        for _ in 0..200 {
            let r = scale.readings().unwrap();
            match r.get(field) {
                Some(Reading::Number(w)) => assert!((w - weight).abs() <= noise, "w={w}"),
                other => panic!("unexpected reading {other:?}"),
            }
        }
    }

    #[test]
    fn quiet_scale_reads_exact_weight() {
        let mut scale = SimScale::new("grams", 512.5, 0.0);
        let r = scale.readings().unwrap();
        assert_eq!(r.get("grams"), Some(&Reading::Number(512.5)));
        assert_eq!(r.get("stable"), Some(&Reading::Bool(true)));
    }

    #[test]
    fn unresponsive_scale_times_out() {
        let mut scale = SimScale::new("weight_g", 800.0, 0.0).unresponsive();
        let err = scale.readings().unwrap_err();
        assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Timeout)));
    }
}
