/// Deterministic xorshift noise so simulated runs are reproducible.
#[derive(Debug, Clone)]
pub struct Noise {
    state: u32,
}

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next value, uniform in `[-1, 1]`.
    pub fn next_unit(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        f64::from(x) / f64::from(u32::MAX) * 2.0 - 1.0
    }

    /// Next value in `[-amplitude, amplitude]`.
    pub fn next_scaled(&mut self, amplitude: f64) -> f64 {
        self.next_unit() * amplitude
    }
}
