//! Uplink scheduler and session driver.
//!
//! The driver is a plain state machine fed from one cooperative loop: session
//! events, the uplink deadline and button polls all arrive through `&mut self`
//! calls that never block. Time is always passed in, so tests drive it with
//! synthetic instants.

use embassy_time::Instant;
use embedded_hal_1::digital::OutputPin;

use crate::actuator::{Actuator, ActuatorState};
use crate::codec::{LppEncoder, TelemetryFrame};
use crate::command::{self, Transition};
use crate::config::Config;
use crate::error::Error;
use crate::input::{Debouncer, EdgeEvent};
use crate::sensor::{PowerReading, PowerSensor};
use crate::session::{AbpCredentials, Downlink, SessionEvent, SessionProvider};

/// Boot button idles high through its pull-up.
const BUTTON_IDLE_LEVEL: bool = true;
const BUTTON_ACTIVE_LEVEL: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transmission in flight.
    Idle,
    /// Uplink handed to the provider, waiting for its completion event.
    Pending,
    /// Session could not be established; uplinks are refused.
    Halted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    pub uplinks: u32,
    pub completions: u32,
    pub acks: u32,
    pub downlinks: u32,
    pub busy_rejections: u32,
    pub encode_failures: u32,
    pub submit_failures: u32,
    pub button_presses: u32,
}

pub struct SessionDriver<P, O, S>
where
    P: SessionProvider,
    O: OutputPin,
    S: PowerSensor,
{
    provider: P,
    actuator: Actuator<O>,
    sensor: S,
    encoder: LppEncoder,
    button: Debouncer,
    config: Config,
    phase: Phase,
    next_uplink: Option<Instant>,
    stats: Stats,
}

impl<P, O, S> SessionDriver<P, O, S>
where
    P: SessionProvider,
    O: OutputPin,
    S: PowerSensor,
{
    /// Drives the output low and starts idle with no uplink armed.
    pub fn new(provider: P, output: O, sensor: S, config: Config) -> Result<Self, Error> {
        config.validate()?;

        let actuator = Actuator::new(output, ActuatorState::Off)?;
        let encoder = LppEncoder::new(config.max_frame_len, config.resolution);
        let button = Debouncer::new(
            BUTTON_IDLE_LEVEL,
            BUTTON_ACTIVE_LEVEL,
            config.debounce_window,
            config.press_cooldown,
        );

        Ok(Self {
            provider,
            actuator,
            sensor,
            encoder,
            button,
            config,
            phase: Phase::Idle,
            next_uplink: None,
            stats: Stats::default(),
        })
    }

    /// Establishes the ABP session and sends the first reading right away.
    ///
    /// A failed establishment halts the driver for good.
    pub fn start(&mut self, credentials: &AbpCredentials, now: Instant) -> Result<(), Error> {
        if let Err(e) = credentials.validate() {
            log_error!("session: refusing credentials for {:?}: {:?}", credentials.dev_addr, e);
            self.phase = Phase::Halted;
            return Err(e.into());
        }

        if self.provider.establish_session(credentials).is_err() {
            log_error!("session: failed to establish ABP session, halting uplinks");
            self.phase = Phase::Halted;
            return Err(Error::SessionEstablishment);
        }

        log_info!("session: ABP session established for {:?}", credentials.dev_addr);

        self.request_uplink(now)
    }

    /// Samples, encodes and queues one uplink.
    pub fn request_uplink(&mut self, now: Instant) -> Result<(), Error> {
        match self.phase {
            Phase::Halted => {
                log_warn!("uplink: no session, not sending");
                return Err(Error::SessionEstablishment);
            }
            Phase::Pending => {
                log_warn!("uplink: transmission pending, not sending");
                self.stats.busy_rejections += 1;
                return Err(Error::TransmitBusy);
            }
            Phase::Idle => {}
        }

        let state = self.actuator.state();
        let reading = match state {
            ActuatorState::On => self.sensor.read(),
            ActuatorState::Off => PowerReading::OFF,
        };

        let frame = match self.encoder.encode(state, &reading) {
            Ok(frame) => frame,
            Err(e) => {
                log_error!("uplink: failed to encode frame: {:?}", e);
                self.stats.encode_failures += 1;
                self.arm(now);
                return Err(e.into());
            }
        };

        self.submit(state, &reading, &frame, now)
    }

    fn submit(&mut self, state: ActuatorState, reading: &PowerReading, frame: &TelemetryFrame, now: Instant) -> Result<(), Error> {
        log_info!(
            "uplink: switch {:?} {}V {}A {}W",
            state,
            reading.voltage,
            reading.current,
            reading.power
        );
        log_debug!("uplink: payload {:?}", frame.as_bytes());

        if self
            .provider
            .submit_uplink(self.config.fport, frame.as_bytes(), self.config.confirmed)
            .is_err()
        {
            log_error!("uplink: provider refused the frame");
            self.stats.submit_failures += 1;
            self.arm(now);
            return Err(Error::UplinkRejected);
        }

        self.phase = Phase::Pending;
        self.next_uplink = None;
        self.stats.uplinks += 1;
        log_info!("uplink: packet queued");

        Ok(())
    }

    /// Single entry point for everything the session provider reports.
    pub fn on_session_event(&mut self, event: SessionEvent, now: Instant) {
        match event {
            SessionEvent::TxComplete { downlink, ack } => self.on_tx_complete(downlink, ack, now),
            SessionEvent::Lifecycle(kind) => log_info!("session: {:?}", kind),
            SessionEvent::Other(code) => log_debug!("session: unknown event {}", code),
        }
    }

    fn on_tx_complete(&mut self, downlink: Option<Downlink>, ack: bool, now: Instant) {
        log_info!("session: tx complete, ack {}", ack);

        if self.phase != Phase::Pending {
            log_warn!("session: completion without a pending uplink");
        }

        self.stats.completions += 1;
        if ack {
            self.stats.acks += 1;
        }

        if let Some(downlink) = downlink {
            self.stats.downlinks += 1;
            log_info!(
                "downlink: received {} bytes on port {}",
                downlink.payload.len(),
                downlink.port
            );

            match command::dispatch(&downlink.payload, &mut self.actuator) {
                Ok(Transition::Applied { current, .. }) => log_debug!("downlink: switch now {:?}", current),
                Ok(_) => {}
                Err(e) => log_error!("downlink: failed to apply command: {:?}", e),
            }
        }

        if self.phase != Phase::Halted {
            self.phase = Phase::Idle;
        }
        self.arm(now);
    }

    /// Fires the armed uplink once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Result<(), Error>> {
        match self.next_uplink {
            Some(deadline) if now >= deadline => {
                self.next_uplink = None;
                Some(self.request_uplink(now))
            }
            _ => None,
        }
    }

    /// Feeds one button sample; a confirmed press toggles the switch.
    pub fn poll_input(&mut self, raw_level: bool, now: Instant) -> Option<ActuatorState> {
        match self.button.poll(raw_level, now)? {
            EdgeEvent::Pressed => {
                self.stats.button_presses += 1;
                match self.actuator.toggle() {
                    Ok(state) => {
                        log_info!("button: pressed, switch {:?}", state);
                        Some(state)
                    }
                    Err(e) => {
                        log_error!("button: failed to toggle switch: {:?}", e);
                        None
                    }
                }
            }
        }
    }

    fn arm(&mut self, now: Instant) {
        let deadline = now + self.config.tx_interval;
        log_debug!("uplink: next transmission at {}ms", deadline.as_millis());
        self.next_uplink = Some(deadline);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn next_uplink_at(&self) -> Option<Instant> {
        self.next_uplink
    }

    pub fn actuator_state(&self) -> ActuatorState {
        self.actuator.state()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}
