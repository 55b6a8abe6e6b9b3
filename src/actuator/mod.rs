use embedded_hal_1::digital::OutputPin;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorState {
    #[default]
    Off,
    On,
}

impl ActuatorState {
    pub fn is_on(self) -> bool {
        matches!(self, ActuatorState::On)
    }

    pub fn complement(self) -> Self {
        match self {
            ActuatorState::Off => ActuatorState::On,
            ActuatorState::On => ActuatorState::Off,
        }
    }
}

impl From<bool> for ActuatorState {
    fn from(value: bool) -> Self {
        if value {
            ActuatorState::On
        } else {
            ActuatorState::Off
        }
    }
}

/// Switch state mirrored onto a digital output.
///
/// The pin is driven before the state is committed, so a failed write leaves
/// both untouched and no reader ever sees them disagree.
pub struct Actuator<P: OutputPin> {
    pin: P,
    state: ActuatorState,
}

impl<P: OutputPin> Actuator<P> {
    pub fn new(pin: P, initial: ActuatorState) -> Result<Self, Error> {
        let mut actuator = Self { pin, state: initial };
        actuator.drive(initial)?;

        Ok(actuator)
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    pub fn set(&mut self, state: ActuatorState) -> Result<ActuatorState, Error> {
        self.drive(state)?;
        self.state = state;

        Ok(state)
    }

    pub fn toggle(&mut self) -> Result<ActuatorState, Error> {
        self.set(self.state.complement())
    }

    fn drive(&mut self, state: ActuatorState) -> Result<(), Error> {
        let result = match state {
            ActuatorState::On => self.pin.set_high(),
            ActuatorState::Off => self.pin.set_low(),
        };

        result.map_err(|_| {
            log_error!("actuator: failed to drive output to {:?}", state);
            Error::Actuator
        })
    }

    #[cfg(test)]
    pub(crate) fn pin(&self) -> &P {
        &self.pin
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use core::convert::Infallible;

    use embedded_hal_1::digital::{ErrorKind, ErrorType, OutputPin};

    /// Output pin that remembers its level and how often it was written.
    #[derive(Debug, Default)]
    pub struct MockPin {
        pub high: bool,
        pub writes: usize,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    /// Output pin whose writes always fail.
    #[derive(Debug, Default)]
    pub struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }
}
