#![no_std]
#![no_main]

mod radio;

use assign_resources::assign_resources;
use defmt::{error, info, warn};
use embassy_executor::Spawner;
use embassy_futures::select::{select3, Either3};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals;
use embassy_time::{Duration, Instant, Ticker, Timer};
use lorawan_switch::{AbpCredentials, Config, Error, MockPowerSensor, SessionDriver};
use radio::lora_radio::{self, LoraRadio};
use radio::{RadioLink, EVENTS};
use {defmt_rtt as _, panic_probe as _};

const BUTTON_POLL_INTERVAL_MS: u64 = 10;

// Placeholders refuse to start a session; real keys come from the build
// environment, as printed by the key generator.
const PLACEHOLDER_DEVADDR: &str = "0x00000000";
const PLACEHOLDER_KEY: &str = "00000000000000000000000000000000";

assign_resources! {
    radio: RadioRes {
        cs: PIN_3,
        rst: PIN_15,
        dio1: PIN_20,
        busy: PIN_2,
        clk: PIN_10,
        mosi: PIN_11,
        miso: PIN_12,
        spi1: SPI1,
        dma_ch0: DMA_CH0,
        dma_ch1: DMA_CH1,
    },
    switch: SwitchRes {
        led: PIN_25,
        button: PIN_22,
    }
}

#[embassy_executor::main]
async fn main(s: Spawner) {
    let p = embassy_rp::init(Default::default());
    let r = split_resources! {p};

    info!("Starting LoRaWAN power switch");

    let led = Output::new(r.switch.led, Level::Low);
    let button = Input::new(r.switch.button, Pull::Up);

    let radio = LoraRadio::try_new(r.radio).await.expect("radio module should be connected");
    s.spawn(lora_radio::radio_task(radio)).expect("executor should be initialized");

    let config = Config::default();
    let sensor = MockPowerSensor::new(RoscRng, config.voltage_range, config.current_range);
    let mut driver = SessionDriver::new(RadioLink::new(), led, sensor, config).expect("default configuration should be valid");

    match driver.start(&credentials(), Instant::now()) {
        Ok(()) => info!("LoRaWAN initialized (ABP mode), press the button to toggle the switch"),
        Err(Error::SessionEstablishment) => error!("LoRaWAN not started, uplinks disabled"),
        Err(e) => warn!("LoRaWAN initialized, first uplink skipped: {:?}", e),
    }

    let mut button_ticker = Ticker::every(Duration::from_millis(BUTTON_POLL_INTERVAL_MS));
    loop {
        let deadline = driver.next_uplink_at().unwrap_or(Instant::MAX);

        match select3(EVENTS.receive(), Timer::at(deadline), button_ticker.next()).await {
            Either3::First(event) => driver.on_session_event(event, Instant::now()),
            Either3::Second(()) => {
                if let Some(Err(e)) = driver.poll(Instant::now()) {
                    warn!("uplink skipped: {:?}", e);
                }
            }
            Either3::Third(()) => {
                driver.poll_input(button.is_high(), Instant::now());
            }
        }
    }
}

fn credentials() -> AbpCredentials {
    let dev_addr = option_env!("LORAWAN_DEVADDR").unwrap_or(PLACEHOLDER_DEVADDR);
    let nwk_skey = option_env!("LORAWAN_NWKSKEY").unwrap_or(PLACEHOLDER_KEY);
    let app_skey = option_env!("LORAWAN_APPSKEY").unwrap_or(PLACEHOLDER_KEY);

    AbpCredentials::from_hex(dev_addr, nwk_skey, app_skey).unwrap_or_else(|e| {
        error!("malformed LoRaWAN credentials: {:?}", e);
        AbpCredentials::new(0, [0; 16], [0; 16])
    })
}
