use crate::codec::EncodeError;
use crate::config::ConfigError;
use crate::session::CredentialsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Frame would not fit the configured buffer capacity.
    EncodingOverflow,
    /// An analog value does not fit a signed 16-bit record at its resolution.
    ValueOutOfRange,
    /// Uplink requested while a transmission is still pending.
    TransmitBusy,
    /// No session could be established; uplinks are refused.
    SessionEstablishment,
    /// Session provider refused to enqueue the uplink.
    UplinkRejected,
    /// Digital output could not be driven.
    Actuator,
    Config(ConfigError),
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        match value {
            EncodeError::Overflow { .. } => Error::EncodingOverflow,
            EncodeError::ValueOutOfRange { .. } => Error::ValueOutOfRange,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Error::Config(value)
    }
}

impl From<CredentialsError> for Error {
    fn from(_value: CredentialsError) -> Self {
        Error::SessionEstablishment
    }
}
