pub mod mock_power;

pub use mock_power::MockPowerSensor;

/// Voltage, current and the power derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerReading {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
}

impl PowerReading {
    /// Reading reported while the switch is off.
    pub const OFF: PowerReading = PowerReading {
        voltage: 0.0,
        current: 0.0,
        power: 0.0,
    };

    /// Power is always derived, never sampled on its own.
    pub fn new(voltage: f32, current: f32) -> Self {
        Self {
            voltage,
            current,
            power: voltage * current,
        }
    }
}

/// Trait to describe a source of power readings.
///
/// The session driver only asks for a reading while the switch is on; the
/// off reading is fixed and never comes from the sensor. Tests inject
/// scripted implementations to get deterministic frames.
pub trait PowerSensor {
    fn read(&mut self) -> PowerReading;
}

impl<T: PowerSensor + ?Sized> PowerSensor for &mut T {
    fn read(&mut self) -> PowerReading {
        (**self).read()
    }
}
