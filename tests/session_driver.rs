//! End-to-end behaviour of the session driver against a scripted provider.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use embedded_hal_1::digital::{ErrorType, OutputPin};
use lorawan_switch::config::Config;
use lorawan_switch::driver::Phase;
use lorawan_switch::{
    AbpCredentials, ActuatorState, Downlink, Error, LifecycleEvent, PowerReading, PowerSensor, SessionDriver, SessionEvent,
    SessionProvider,
};

/// Shared view of the LED so tests can check it while the driver owns the pin.
#[derive(Clone, Default)]
struct Led(Rc<RefCell<bool>>);

impl ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        *self.0.borrow_mut() = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        *self.0.borrow_mut() = true;
        Ok(())
    }
}

#[derive(Default)]
struct Network {
    frames: Vec<Vec<u8>>,
}

impl SessionProvider for Network {
    type Error = Infallible;

    fn establish_session(&mut self, _credentials: &AbpCredentials) -> Result<(), Self::Error> {
        Ok(())
    }

    fn submit_uplink(&mut self, _fport: u8, payload: &[u8], _confirmed: bool) -> Result<(), Self::Error> {
        self.frames.push(payload.to_vec());
        Ok(())
    }
}

/// Plays back readings in order, repeating the last one.
struct Script(Vec<PowerReading>);

impl PowerSensor for Script {
    fn read(&mut self) -> PowerReading {
        if self.0.len() > 1 {
            self.0.remove(0)
        } else {
            self.0[0]
        }
    }
}

#[derive(Debug, PartialEq)]
struct Decoded {
    switch: u8,
    voltage: f32,
    current: f32,
    power: f32,
}

/// Reads the four records back, checking channel and type bytes.
fn decode(frame: &[u8], config: &Config) -> Decoded {
    assert_eq!(frame.len(), 15);
    assert_eq!(&frame[0..2], &[1, 0x01]);

    let analog = |offset: usize, channel: u8, counts_per_unit: u16| {
        assert_eq!(frame[offset], channel);
        assert_eq!(frame[offset + 1], 0x02);
        i16::from_be_bytes([frame[offset + 2], frame[offset + 3]]) as f32 / counts_per_unit as f32
    };

    Decoded {
        switch: frame[2],
        voltage: analog(3, 2, config.resolution.voltage),
        current: analog(7, 3, config.resolution.current),
        power: analog(11, 4, config.resolution.power),
    }
}

fn credentials() -> AbpCredentials {
    AbpCredentials::from_hex(
        "0x26011234",
        "2B 7E 15 16 28 AE D2 A6 AB F7 15 88 09 CF 4F 3C",
        "00 11 22 33 44 55 66 77 88 99 AA BB CC DD EE FF",
    )
    .expect("valid test keys")
}

fn driver(readings: Vec<PowerReading>) -> (SessionDriver<Network, Led, Script>, Led) {
    let led = Led::default();
    let driver = SessionDriver::new(Network::default(), led.clone(), Script(readings), Config::default())
        .expect("default config is valid");
    (driver, led)
}

fn tx_complete(downlink: Option<&[u8]>) -> SessionEvent {
    SessionEvent::TxComplete {
        downlink: downlink.map(|bytes| Downlink::new(1, bytes)),
        ack: true,
    }
}

#[test]
fn boot_sends_off_frame() {
    let (mut driver, led) = driver(vec![PowerReading::new(230.0, 2.0)]);

    driver.start(&credentials(), Instant::from_secs(0)).unwrap();

    let frames = &driver.provider().frames;
    assert_eq!(frames.len(), 1);
    assert_eq!(
        decode(&frames[0], driver.config()),
        Decoded {
            switch: 0,
            voltage: 0.0,
            current: 0.0,
            power: 0.0
        }
    );
    assert!(!*led.0.borrow());
}

#[test]
fn on_frame_carries_power() {
    let (mut driver, led) = driver(vec![PowerReading::new(230.0, 2.0)]);
    let t0 = Instant::from_secs(0);

    driver.start(&credentials(), t0).unwrap();
    driver.on_session_event(tx_complete(Some(&[0x01])), t0 + Duration::from_secs(2));
    assert!(*led.0.borrow());

    driver.poll(t0 + Duration::from_secs(62)).unwrap().unwrap();

    let decoded = decode(&driver.provider().frames[1], driver.config());
    assert_eq!(decoded.switch, 1);
    assert!((decoded.voltage - 230.0).abs() <= 0.01);
    assert!((decoded.current - 2.0).abs() <= 0.01);
    assert!((decoded.power - 460.0).abs() <= 0.01);
}

#[test]
fn toggle_downlink_turns_on_next_reading() {
    let (mut driver, led) = driver(vec![PowerReading::new(221.5, 0.75)]);
    let t0 = Instant::from_secs(100);

    driver.start(&credentials(), t0).unwrap();
    assert_eq!(driver.actuator_state(), ActuatorState::Off);

    driver.on_session_event(tx_complete(Some(&[0x02])), t0 + Duration::from_secs(3));
    assert_eq!(driver.actuator_state(), ActuatorState::On);
    assert!(*led.0.borrow());
    assert_eq!(driver.phase(), Phase::Idle);

    let deadline = driver.next_uplink_at().unwrap();
    assert_eq!(deadline, t0 + Duration::from_secs(63));
    driver.poll(deadline).unwrap().unwrap();

    let decoded = decode(&driver.provider().frames[1], driver.config());
    assert_eq!(decoded.switch, 1);
    assert!(decoded.voltage > 0.0);
    assert!(decoded.current > 0.0);
    assert!(decoded.power > 0.0);
}

#[test]
fn request_while_pending_is_busy() {
    let (mut driver, _led) = driver(vec![PowerReading::new(230.0, 2.0)]);
    let t0 = Instant::from_secs(0);

    driver.start(&credentials(), t0).unwrap();

    assert_eq!(driver.request_uplink(t0), Err(Error::TransmitBusy));
    assert_eq!(driver.request_uplink(t0 + Duration::from_millis(1)), Err(Error::TransmitBusy));
    assert_eq!(driver.provider().frames.len(), 1);
    assert_eq!(driver.phase(), Phase::Pending);
}

#[test]
fn button_toggle_lands_in_next_frame() {
    let (mut driver, led) = driver(vec![PowerReading::new(235.0, 1.0)]);
    let t0 = Instant::from_secs(0);

    driver.start(&credentials(), t0).unwrap();

    let press = Instant::from_millis(10_000);
    for step in 0..10 {
        driver.poll_input(false, press + Duration::from_millis(step * 10));
    }
    for step in 0..10 {
        driver.poll_input(true, press + Duration::from_millis(500 + step * 10));
    }
    assert_eq!(driver.actuator_state(), ActuatorState::On);
    assert!(*led.0.borrow());

    driver.on_session_event(tx_complete(None), Instant::from_secs(20));
    driver.poll(Instant::from_secs(80)).unwrap().unwrap();

    let decoded = decode(&driver.provider().frames[1], driver.config());
    assert_eq!(decoded.switch, 1);
    assert!((decoded.power - 235.0).abs() <= 0.1);
}

#[test]
fn lifecycle_events_do_not_rearm() {
    let (mut driver, _led) = driver(vec![PowerReading::new(230.0, 2.0)]);
    let t0 = Instant::from_secs(0);

    driver.start(&credentials(), t0).unwrap();
    driver.on_session_event(SessionEvent::Lifecycle(LifecycleEvent::TxStart), t0);
    driver.on_session_event(SessionEvent::Lifecycle(LifecycleEvent::Joined), t0);

    assert_eq!(driver.phase(), Phase::Pending);
    assert_eq!(driver.next_uplink_at(), None);
    assert_eq!(driver.poll(Instant::from_secs(1_000)), None);
}

#[test]
fn steady_cadence_over_many_cycles() {
    let (mut driver, _led) = driver(vec![PowerReading::new(230.0, 2.0)]);
    let mut now = Instant::from_secs(0);

    driver.start(&credentials(), now).unwrap();

    for cycle in 1..=10u64 {
        // air time plus receive windows vary per cycle
        now += Duration::from_millis(1_000 + cycle * 137);
        driver.on_session_event(tx_complete(None), now);

        let deadline = driver.next_uplink_at().unwrap();
        assert_eq!(deadline, now + Duration::from_secs(60));

        now = deadline;
        driver.poll(now).unwrap().unwrap();
    }

    assert_eq!(driver.provider().frames.len(), 11);
    assert_eq!(driver.stats().completions, 10);
    assert_eq!(driver.stats().acks, 10);
}
