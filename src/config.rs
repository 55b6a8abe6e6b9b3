use embassy_time::Duration;

use crate::codec::MAX_FRAME_CAPACITY;

pub const TX_INTERVAL_SECS: u64 = 60;
pub const VOLTAGE_MIN: f32 = 220.0;
pub const VOLTAGE_MAX: f32 = 240.0;
pub const CURRENT_MIN: f32 = 0.5;
pub const CURRENT_MAX: f32 = 5.0;
pub const DEBOUNCE_WINDOW_MS: u64 = 50;
pub const PRESS_COOLDOWN_MS: u64 = 300;
pub const FPORT: u8 = 1;

/// Counts per unit for each analog channel. 100 means 0.01 per count.
pub const VOLTAGE_COUNTS_PER_UNIT: u16 = 100;
pub const CURRENT_COUNTS_PER_UNIT: u16 = 100;
// 0.01 W would overflow a signed 16-bit record above 327.67 W
pub const POWER_COUNTS_PER_UNIT: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A sampling range has `min > max` or a non-finite bound.
    EmptyRange,
    ZeroInterval,
    ZeroResolution,
    /// `max_frame_len` is above the static buffer or below one full frame.
    FrameCapacity,
}

/// Closed sampling interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRange {
    pub min: f32,
    pub max: f32,
}

impl SampleRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Fixed-point resolution of the three analog records, in counts per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolution {
    pub voltage: u16,
    pub current: u16,
    pub power: u16,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            voltage: VOLTAGE_COUNTS_PER_UNIT,
            current: CURRENT_COUNTS_PER_UNIT,
            power: POWER_COUNTS_PER_UNIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub tx_interval: Duration,
    pub voltage_range: SampleRange,
    pub current_range: SampleRange,
    pub debounce_window: Duration,
    pub press_cooldown: Duration,
    pub max_frame_len: usize,
    pub resolution: Resolution,
    pub fport: u8,
    pub confirmed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tx_interval: Duration::from_secs(TX_INTERVAL_SECS),
            voltage_range: SampleRange::new(VOLTAGE_MIN, VOLTAGE_MAX),
            current_range: SampleRange::new(CURRENT_MIN, CURRENT_MAX),
            debounce_window: Duration::from_millis(DEBOUNCE_WINDOW_MS),
            press_cooldown: Duration::from_millis(PRESS_COOLDOWN_MS),
            max_frame_len: MAX_FRAME_CAPACITY,
            resolution: Resolution::default(),
            fport: FPORT,
            confirmed: false,
        }
    }
}

impl Config {
    pub fn with_tx_interval(mut self, interval: Duration) -> Self {
        self.tx_interval = interval;
        self
    }

    pub fn with_voltage_range(mut self, min: f32, max: f32) -> Self {
        self.voltage_range = SampleRange::new(min, max);
        self
    }

    pub fn with_current_range(mut self, min: f32, max: f32) -> Self {
        self.current_range = SampleRange::new(min, max);
        self
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_press_cooldown(mut self, cooldown: Duration) -> Self {
        self.press_cooldown = cooldown;
        self
    }

    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fport(mut self, fport: u8) -> Self {
        self.fport = fport;
        self
    }

    pub fn with_confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    /// Rejects configurations the driver cannot run with.
    ///
    /// A `max_frame_len` below one full frame is accepted: the encoder then
    /// reports `EncodingOverflow` every cycle, which is how a mis-sized buffer
    /// shows up at runtime. Only values above the static buffer are refused.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.voltage_range.is_valid() || !self.current_range.is_valid() {
            return Err(ConfigError::EmptyRange);
        }

        if self.tx_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let r = &self.resolution;
        if r.voltage == 0 || r.current == 0 || r.power == 0 {
            return Err(ConfigError::ZeroResolution);
        }

        if self.max_frame_len > MAX_FRAME_CAPACITY {
            return Err(ConfigError::FrameCapacity);
        }

        Ok(())
    }

    /// True when a full frame fits the configured capacity.
    #[cfg(test)]
    pub(crate) fn frame_fits(&self) -> bool {
        self.max_frame_len >= crate::codec::FRAME_LEN
    }
}
