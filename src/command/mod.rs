use embedded_hal_1::digital::OutputPin;

use crate::actuator::{Actuator, ActuatorState};
use crate::error::Error;

pub const CMD_LED_OFF: u8 = 0x00;
pub const CMD_LED_ON: u8 = 0x01;
pub const CMD_LED_TOGGLE: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    LedOff,
    LedOn,
    LedToggle,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            CMD_LED_OFF => Ok(Command::LedOff),
            CMD_LED_ON => Ok(Command::LedOn),
            CMD_LED_TOGGLE => Ok(Command::LedToggle),
            other => Err(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        match value {
            Command::LedOff => CMD_LED_OFF,
            Command::LedOn => CMD_LED_ON,
            Command::LedToggle => CMD_LED_TOGGLE,
        }
    }
}

/// Outcome of one downlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    /// Downlink carried no bytes.
    NoCommand,
    /// Opcode outside the known set; state untouched.
    UnrecognizedCommand(u8),
    Applied {
        command: Command,
        previous: ActuatorState,
        current: ActuatorState,
    },
}

/// Applies the first byte of a downlink to the actuator.
///
/// Trailing bytes are ignored. The output is driven before this returns.
pub fn dispatch<P: OutputPin>(bytes: &[u8], actuator: &mut Actuator<P>) -> Result<Transition, Error> {
    let Some(&opcode) = bytes.first() else {
        log_debug!("downlink: empty payload, nothing to do");
        return Ok(Transition::NoCommand);
    };

    if bytes.len() > 1 {
        log_debug!("downlink: ignoring {} trailing bytes", bytes.len() - 1);
    }

    let command = match Command::try_from(opcode) {
        Ok(command) => command,
        Err(opcode) => {
            log_warn!("downlink: unrecognized command {:?}", opcode);
            return Ok(Transition::UnrecognizedCommand(opcode));
        }
    };

    let previous = actuator.state();
    let current = match command {
        Command::LedOff => actuator.set(ActuatorState::Off)?,
        Command::LedOn => actuator.set(ActuatorState::On)?,
        Command::LedToggle => actuator.toggle()?,
    };

    log_info!("downlink: {:?} switched {:?} -> {:?}", command, previous, current);

    Ok(Transition::Applied {
        command,
        previous,
        current,
    })
}
