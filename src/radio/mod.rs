use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use heapless::Vec;
use lorawan_device::{AppSKey, DevAddr, JoinMode, NewSKey};
use lorawan_switch::codec::MAX_FRAME_CAPACITY;
use lorawan_switch::{AbpCredentials, SessionEvent, SessionProvider};

pub mod lora_radio;

const REQUEST_QUEUE: usize = 2;
const EVENT_QUEUE: usize = 4;

/// Work handed from the dispatch loop to the radio task.
pub enum RadioRequest {
    Establish(JoinMode),
    Uplink {
        fport: u8,
        payload: Vec<u8, MAX_FRAME_CAPACITY>,
        confirmed: bool,
    },
}

pub static REQUESTS: Channel<CriticalSectionRawMutex, RadioRequest, REQUEST_QUEUE> = Channel::new();
pub static EVENTS: Channel<CriticalSectionRawMutex, SessionEvent, EVENT_QUEUE> = Channel::new();

#[derive(Debug, defmt::Format)]
pub enum RadioLinkError {
    QueueFull,
    PayloadTooLarge,
}

/// Session provider side of the radio task: every call only enqueues.
pub struct RadioLink {
    requests: Sender<'static, CriticalSectionRawMutex, RadioRequest, REQUEST_QUEUE>,
}

impl RadioLink {
    pub fn new() -> Self {
        Self {
            requests: REQUESTS.sender(),
        }
    }
}

impl SessionProvider for RadioLink {
    type Error = RadioLinkError;

    fn establish_session(&mut self, credentials: &AbpCredentials) -> Result<(), Self::Error> {
        let mode = JoinMode::ABP {
            newskey: NewSKey::from(credentials.nwk_skey),
            appskey: AppSKey::from(credentials.app_skey),
            devaddr: DevAddr::from(credentials.dev_addr),
        };

        self.requests
            .try_send(RadioRequest::Establish(mode))
            .map_err(|_| RadioLinkError::QueueFull)
    }

    fn submit_uplink(&mut self, fport: u8, payload: &[u8], confirmed: bool) -> Result<(), Self::Error> {
        let payload = Vec::from_slice(payload).map_err(|_| RadioLinkError::PayloadTooLarge)?;

        self.requests
            .try_send(RadioRequest::Uplink {
                fport,
                payload,
                confirmed,
            })
            .map_err(|_| RadioLinkError::QueueFull)
    }
}
