use heapless::Vec;

/// Largest application payload a LoRaWAN downlink can carry.
pub const MAX_DOWNLINK_LEN: usize = 242;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CredentialsError {
    InvalidHex,
    InvalidLength,
    /// Address or a key is still all zeros.
    Placeholder,
}

/// ABP session keys, MSB first.
#[derive(Clone, PartialEq, Eq)]
pub struct AbpCredentials {
    pub dev_addr: u32,
    pub nwk_skey: [u8; 16],
    pub app_skey: [u8; 16],
}

impl core::fmt::Debug for AbpCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AbpCredentials")
            .field("dev_addr", &self.dev_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AbpCredentials {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "AbpCredentials {{ dev_addr: {=u32:#x}, .. }}", self.dev_addr)
    }
}

impl AbpCredentials {
    pub const fn new(dev_addr: u32, nwk_skey: [u8; 16], app_skey: [u8; 16]) -> Self {
        Self {
            dev_addr,
            nwk_skey,
            app_skey,
        }
    }

    /// Parses the hex strings printed by the key generator.
    ///
    /// The address may carry a `0x` prefix; keys may be separated by spaces,
    /// commas or colons, each byte optionally `0x` prefixed.
    pub fn from_hex(dev_addr: &str, nwk_skey: &str, app_skey: &str) -> Result<Self, CredentialsError> {
        let mut addr = [0u8; 4];
        parse_hex(dev_addr, &mut addr)?;

        let mut nwk = [0u8; 16];
        parse_hex(nwk_skey, &mut nwk)?;

        let mut app = [0u8; 16];
        parse_hex(app_skey, &mut app)?;

        Ok(Self::new(u32::from_be_bytes(addr), nwk, app))
    }

    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.dev_addr == 0 || self.nwk_skey == [0; 16] || self.app_skey == [0; 16] {
            return Err(CredentialsError::Placeholder);
        }

        Ok(())
    }
}

fn parse_hex(input: &str, out: &mut [u8]) -> Result<(), CredentialsError> {
    let mut nibbles = 0usize;
    let mut rest = input.trim();

    while !rest.is_empty() {
        rest = rest.trim_start_matches(|c: char| matches!(c, ' ' | ',' | ':' | '{' | '}'));
        rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")).unwrap_or(rest);

        let Some(c) = rest.chars().next() else {
            break;
        };

        let value = c.to_digit(16).ok_or(CredentialsError::InvalidHex)? as u8;
        let index = nibbles / 2;
        if index >= out.len() {
            return Err(CredentialsError::InvalidLength);
        }

        out[index] = (out[index] << 4) | value;
        nibbles += 1;
        rest = &rest[c.len_utf8()..];
    }

    if nibbles != out.len() * 2 {
        return Err(CredentialsError::InvalidLength);
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Downlink {
    pub port: u8,
    pub payload: Vec<u8, MAX_DOWNLINK_LEN>,
}

impl Downlink {
    /// Payloads longer than `MAX_DOWNLINK_LEN` are truncated.
    pub fn new(port: u8, bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_DOWNLINK_LEN);
        let payload = Vec::from_slice(&bytes[..len]).unwrap_or_default();

        Self { port, payload }
    }
}

/// MAC lifecycle notifications; logged, never acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleEvent {
    ScanTimeout,
    BeaconFound,
    BeaconMissed,
    BeaconTracked,
    Joining,
    Joined,
    JoinFailed,
    RejoinFailed,
    JoinTxComplete,
    LostTimeSync,
    Reset,
    RxComplete,
    LinkDead,
    LinkAlive,
    TxStart,
    TxCanceled,
}

/// Events delivered by the session provider to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// One transmit cycle finished, receive windows included.
    TxComplete { downlink: Option<Downlink>, ack: bool },
    Lifecycle(LifecycleEvent),
    /// Anything the provider reports that has no meaning here.
    Other(u8),
}

/// Trait to represent the LoRaWAN MAC underneath the driver.
///
/// Both calls return immediately. Every accepted uplink must later be
/// answered by exactly one `SessionEvent::TxComplete`.
pub trait SessionProvider {
    /// Error type representation, left up to the implementor
    type Error;

    /// One-time ABP activation.
    fn establish_session(&mut self, credentials: &AbpCredentials) -> Result<(), Self::Error>;

    /// Queue an uplink; fire and forget.
    fn submit_uplink(&mut self, fport: u8, payload: &[u8], confirmed: bool) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const NWK: &str = "2B 7E 15 16 28 AE D2 A6 AB F7 15 88 09 CF 4F 3C";
    const APP: &str = "0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF";

    #[test]
    fn parses_generator_formats() {
        let creds = AbpCredentials::from_hex("0x26011234", NWK, APP).unwrap();

        assert_eq!(creds.dev_addr, 0x2601_1234);
        assert_eq!(creds.nwk_skey[0], 0x2B);
        assert_eq!(creds.nwk_skey[15], 0x3C);
        assert_eq!(creds.app_skey[1], 0x11);
        assert_eq!(creds.app_skey[15], 0xFF);
        assert_eq!(creds.validate(), Ok(()));
    }

    #[test]
    fn compact_hex_is_accepted() {
        let creds = AbpCredentials::from_hex("26011234", "2b7e151628aed2a6abf7158809cf4f3c", APP).unwrap();
        assert_eq!(creds.nwk_skey[4], 0x28);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert_eq!(
            AbpCredentials::from_hex("0x2601123G", NWK, APP),
            Err(CredentialsError::InvalidHex)
        );
        assert_eq!(
            AbpCredentials::from_hex("0x260112", NWK, APP),
            Err(CredentialsError::InvalidLength)
        );
        assert_eq!(
            AbpCredentials::from_hex("0x2601123456", NWK, APP),
            Err(CredentialsError::InvalidLength)
        );
    }

    #[test]
    fn placeholder_keys_are_rejected() {
        let creds = AbpCredentials::new(0x2601_1234, [0; 16], [1; 16]);
        assert_eq!(creds.validate(), Err(CredentialsError::Placeholder));

        let creds = AbpCredentials::new(0, [1; 16], [1; 16]);
        assert_eq!(creds.validate(), Err(CredentialsError::Placeholder));
    }

    #[test]
    fn debug_hides_keys() {
        let creds = AbpCredentials::new(0x2601_1234, [0xAB; 16], [0xCD; 16]);
        let text = format!("{:?}", creds);

        assert!(text.contains("dev_addr"));
        assert!(!text.contains("171"));
    }

    #[test]
    fn downlink_is_truncated() {
        let bytes = [0x02u8; MAX_DOWNLINK_LEN + 10];
        let downlink = Downlink::new(1, &bytes);

        assert_eq!(downlink.payload.len(), MAX_DOWNLINK_LEN);
    }
}
