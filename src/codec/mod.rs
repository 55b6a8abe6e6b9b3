//! Cayenne LPP telemetry frame.
//!
//! Every uplink carries four records in fixed order:
//!
//! | channel | type               | value                               |
//! |---------|--------------------|-------------------------------------|
//! | 1       | `0x01` digital out | 1 byte, 0 = off, 1 = on             |
//! | 2       | `0x02` analog in   | i16 BE, voltage × counts per unit   |
//! | 3       | `0x02` analog in   | i16 BE, current × counts per unit   |
//! | 4       | `0x02` analog in   | i16 BE, power × counts per unit     |
//!
//! A stock LPP decoder assumes 100 counts per unit on every analog input. With
//! the default power resolution of 10 counts per unit, channel 4 must be scaled
//! by 10 after decoding (460 W is sent as 4600 and decodes as 46.0).

use heapless::Vec;

use crate::actuator::ActuatorState;
use crate::config::Resolution;
use crate::sensor::PowerReading;

/// Static size of the encoder buffer.
pub const MAX_FRAME_CAPACITY: usize = 51;

const DIGITAL_RECORD_LEN: usize = 3;
const ANALOG_RECORD_LEN: usize = 4;

/// Length of one complete frame.
pub const FRAME_LEN: usize = DIGITAL_RECORD_LEN + 3 * ANALOG_RECORD_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    Switch = 1,
    Voltage = 2,
    Current = 3,
    Power = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LppType {
    DigitalOutput = 0x01,
    AnalogInput = 0x02,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Writing `needed` bytes would exceed `capacity`.
    Overflow { needed: usize, capacity: usize },
    ValueOutOfRange { channel: Channel },
}

/// Encoded uplink payload, owned by whoever queues it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryFrame {
    bytes: Vec<u8, MAX_FRAME_CAPACITY>,
}

impl TelemetryFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for TelemetryFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

pub struct LppEncoder {
    buf: Vec<u8, MAX_FRAME_CAPACITY>,
    capacity: usize,
    resolution: Resolution,
}

impl LppEncoder {
    /// `capacity` is clamped to the static buffer size.
    pub fn new(capacity: usize, resolution: Resolution) -> Self {
        Self {
            buf: Vec::new(),
            capacity: capacity.min(MAX_FRAME_CAPACITY),
            resolution,
        }
    }

    /// Builds the complete frame or nothing.
    ///
    /// The buffer is cleared first, and capacity plus value ranges are checked
    /// before the first byte is written.
    pub fn encode(&mut self, state: ActuatorState, reading: &PowerReading) -> Result<TelemetryFrame, EncodeError> {
        self.buf.clear();

        if FRAME_LEN > self.capacity {
            return Err(EncodeError::Overflow {
                needed: FRAME_LEN,
                capacity: self.capacity,
            });
        }

        let voltage = to_counts(reading.voltage, self.resolution.voltage, Channel::Voltage)?;
        let current = to_counts(reading.current, self.resolution.current, Channel::Current)?;
        let power = to_counts(reading.power, self.resolution.power, Channel::Power)?;

        self.add_digital_output(Channel::Switch, state.is_on() as u8)?;
        self.add_analog_input(Channel::Voltage, voltage)?;
        self.add_analog_input(Channel::Current, current)?;
        self.add_analog_input(Channel::Power, power)?;

        Ok(TelemetryFrame { bytes: self.buf.clone() })
    }

    fn add_digital_output(&mut self, channel: Channel, value: u8) -> Result<(), EncodeError> {
        self.push(&[channel as u8, LppType::DigitalOutput as u8, value])
    }

    fn add_analog_input(&mut self, channel: Channel, counts: i16) -> Result<(), EncodeError> {
        let [hi, lo] = counts.to_be_bytes();
        self.push(&[channel as u8, LppType::AnalogInput as u8, hi, lo])
    }

    fn push(&mut self, record: &[u8]) -> Result<(), EncodeError> {
        let needed = self.buf.len() + record.len();
        if needed > self.capacity {
            return Err(EncodeError::Overflow {
                needed,
                capacity: self.capacity,
            });
        }

        self.buf.extend_from_slice(record).map_err(|_| EncodeError::Overflow {
            needed,
            capacity: MAX_FRAME_CAPACITY,
        })
    }
}

/// Stateless encode with a fresh buffer.
pub fn encode(
    state: ActuatorState,
    reading: &PowerReading,
    capacity: usize,
    resolution: Resolution,
) -> Result<TelemetryFrame, EncodeError> {
    LppEncoder::new(capacity, resolution).encode(state, reading)
}

/// Rounds half away from zero; `core` has no `f32::round`.
fn to_counts(value: f32, counts_per_unit: u16, channel: Channel) -> Result<i16, EncodeError> {
    let scaled = value * counts_per_unit as f32;
    let sign = if scaled < 0.0 { -1.0 } else { 1.0 };
    let rounded = scaled + 0.5 * sign;

    if !rounded.is_finite() || rounded >= i16::MAX as f32 + 1.0 || rounded <= i16::MIN as f32 - 1.0 {
        return Err(EncodeError::ValueOutOfRange { channel });
    }

    Ok(rounded as i16)
}
