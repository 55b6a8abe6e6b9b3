use rand_core::RngCore;

use crate::config::SampleRange;
use crate::sensor::{PowerReading, PowerSensor};

const STEPS: u32 = 10_000;

/// Simulated power meter drawing voltage and current uniformly from their
/// configured ranges in 1/10000 steps.
pub struct MockPowerSensor<R: RngCore> {
    rng: R,
    voltage: SampleRange,
    current: SampleRange,
}

impl<R: RngCore> MockPowerSensor<R> {
    pub fn new(rng: R, voltage: SampleRange, current: SampleRange) -> Self {
        Self { rng, voltage, current }
    }

    fn sample(&mut self, range: SampleRange) -> f32 {
        let step = self.rng.next_u32() % STEPS;
        range.min + step as f32 / STEPS as f32 * (range.max - range.min)
    }
}

impl<R: RngCore> PowerSensor for MockPowerSensor<R> {
    fn read(&mut self) -> PowerReading {
        let voltage = self.sample(self.voltage);
        let current = self.sample(self.current);

        log_debug!("mock sensor: {}V {}A", voltage, current);

        PowerReading::new(voltage, current)
    }
}
