//! Repeated sampling of a noisy scalar with one-pass outlier rejection.
use crate::cancel::CancelToken;
use crate::error::{PourError, Result};
use crate::hw_error::map_hw_error;
use pourer_traits::{Clock, Reading, Sensor};
use std::time::Duration;

/// Mean of the samples lying within one population standard deviation of the
/// overall mean.
///
/// - 0 samples -> 0.0
/// - 1 sample  -> that sample (deviation undefined, nothing filtered)
pub fn smooth(samples: &[f64]) -> f64 {
    match samples {
        [] => 0.0,
        [only] => *only,
        _ => {
            let n = samples.len() as f64;
            let mean = samples.iter().sum::<f64>() / n;
            let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            let (sum, count) = samples
                .iter()
                .filter(|x| (*x - mean).abs() <= sd)
                .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
            // At least one sample always sits within one deviation of the mean.
            if count == 0 { mean } else { sum / count as f64 }
        }
    }
}

/// Polls a reader `samples` times with `delay` between polls, then smooths.
#[derive(Debug, Clone)]
pub struct WeightSmoother {
    samples: usize,
    delay: Duration,
}

impl WeightSmoother {
    pub fn new(samples: usize, delay: Duration) -> Self {
        Self { samples, delay }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Collect and smooth. Any reader error is returned as-is; no retry.
    pub fn read<F>(&self, mut read: F, clock: &dyn Clock, cancel: &CancelToken) -> Result<f64>
    where
        F: FnMut() -> Result<f64>,
    {
        let mut values = Vec::with_capacity(self.samples);
        for i in 0..self.samples {
            cancel.check(clock)?;
            values.push(read()?);
            if i + 1 < self.samples {
                cancel.sleep(clock, self.delay)?;
            }
        }
        let v = smooth(&values);
        tracing::debug!(samples = values.len(), smoothed = v, "weight smoothed");
        Ok(v)
    }

    /// Smoothed value of a numeric field of `sensor`.
    pub fn read_field(
        &self,
        sensor: &mut dyn Sensor,
        field: &str,
        clock: &dyn Clock,
        cancel: &CancelToken,
    ) -> Result<f64> {
        self.read(|| read_number(&mut *sensor, field), clock, cancel)
    }
}

/// Pull one numeric field out of a sensor's readings.
///
/// Missing field or non-numeric value is a `SensorRead` error; reader
/// failures are mapped through the hardware error mapper.
pub fn read_number(sensor: &mut dyn Sensor, field: &str) -> Result<f64> {
    let readings = sensor
        .readings()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))?;
    match readings.get(field) {
        Some(Reading::Number(v)) if v.is_finite() => Ok(*v),
        Some(Reading::Number(v)) => Err(eyre::Report::new(PourError::SensorRead(format!(
            "field '{field}' is not finite: {v}"
        )))),
        Some(other) => Err(eyre::Report::new(PourError::SensorRead(format!(
            "field '{field}' has type {}, expected number",
            other.kind()
        )))),
        None => Err(eyre::Report::new(PourError::SensorRead(format!(
            "field '{field}' missing"
        )))),
    }
}
