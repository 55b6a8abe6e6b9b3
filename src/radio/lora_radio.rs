use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::SPI1;
use embassy_rp::spi::{self, Config, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use lora_phy::iv::GenericSx126xInterfaceVariant;
use lora_phy::lorawan_radio::LorawanRadio;
use lora_phy::mod_params::RadioError;
use lora_phy::sx126x::{self, Sx1262, Sx126x, TcxoCtrlVoltage};
use lora_phy::LoRa;
use lorawan_device::async_device::{self, EmbassyTimer, JoinResponse, SendResponse};
use lorawan_device::{region, JoinMode};
use lorawan_switch::{Downlink, LifecycleEvent, SessionEvent};

use crate::radio::{RadioRequest, EVENTS, REQUESTS};
use crate::RadioRes;

const RX_WINDOW_LEAD_TIME: u32 = 50;
const RX_WINDOW_BUFFER: u32 = 15;
const MAX_TX_POWER: i32 = 14;
const LORAWAN_REGION: region::Region = region::Region::AS923_1;

type SX1262 = lorawan_device::async_device::Device<
    LorawanRadio<
        Sx126x<
            ExclusiveDevice<Spi<'static, SPI1, spi::Async>, Output<'static>, Delay>,
            GenericSx126xInterfaceVariant<Output<'static>, Input<'static>>,
            Sx1262,
        >,
        Delay,
        MAX_TX_POWER,
    >,
    EmbassyTimer,
    RoscRng,
>;

#[derive(defmt::Format)]
pub enum LoraRadioError {
    NoJoinAccept,
    LoRaWAN(lorawan_device::async_device::Error<lora_phy::lorawan_radio::Error>),
}

pub struct LoraRadio {
    radio: SX1262,
}

impl LoraRadio {
    pub async fn try_new(r: RadioRes) -> Result<Self, RadioError> {
        let nss = Output::new(r.cs, Level::High);
        let reset = Output::new(r.rst, Level::High);
        let dio1 = Input::new(r.dio1, Pull::None);
        let busy = Input::new(r.busy, Pull::None);
        let spi = Spi::new(r.spi1, r.clk, r.mosi, r.miso, r.dma_ch0, r.dma_ch1, Config::default());
        let spi_bus = ExclusiveDevice::new(spi, nss, Delay);
        let sx1262_config = sx126x::Config {
            chip: Sx1262,
            tcxo_ctrl: Some(TcxoCtrlVoltage::Ctrl1V7),
            use_dcdc: true,
            rx_boost: false,
        };

        let iv = GenericSx126xInterfaceVariant::new(reset, dio1, busy, None, None)?;
        let lora = LoRa::new(Sx126x::new(spi_bus, iv, sx1262_config), true, Delay).await?;
        let mut radio: LorawanRadio<_, _, MAX_TX_POWER> = lora.into();
        radio.set_rx_window_lead_time(RX_WINDOW_LEAD_TIME);
        radio.set_rx_window_buffer(RX_WINDOW_BUFFER);
        let region: region::Configuration = region::Configuration::new(LORAWAN_REGION);
        let lora_radio: async_device::Device<_, _, _> = async_device::Device::new(region, radio, EmbassyTimer::new(), RoscRng);

        Ok(Self { radio: lora_radio })
    }

    async fn establish(&mut self, mode: &JoinMode) -> Result<(), LoraRadioError> {
        match self.radio.join(mode).await {
            Ok(JoinResponse::JoinSuccess) => Ok(()),
            Ok(JoinResponse::NoJoinAccept) => Err(LoraRadioError::NoJoinAccept),
            Err(err) => Err(LoraRadioError::LoRaWAN(err)),
        }
    }

    /// Runs one full transmit cycle and reports it as exactly one completion.
    async fn uplink(&mut self, fport: u8, payload: &[u8], confirmed: bool) -> SessionEvent {
        let ack = match self.radio.send(payload, fport, confirmed).await {
            Ok(SendResponse::DownlinkReceived(fcnt_down)) => {
                defmt::info!("radio: received downlink with fcount {=u32}", fcnt_down);
                confirmed
            }
            Ok(SendResponse::RxComplete) => {
                defmt::info!("radio: uplink sent, receive windows closed");
                confirmed
            }
            Ok(SendResponse::NoAck) => {
                defmt::warn!("radio: uplink sent but no ack received");
                false
            }
            Ok(SendResponse::SessionExpired) => {
                defmt::error!("radio: failed to send uplink, session expired");
                false
            }
            Err(err) => {
                defmt::error!("radio: failed to send uplink {:?}", LoraRadioError::LoRaWAN(err));
                false
            }
        };

        let downlink = self
            .radio
            .take_downlink()
            .map(|downlink| Downlink::new(downlink.fport, &downlink.data));

        SessionEvent::TxComplete { downlink, ack }
    }
}

/// Owns the MAC and serves requests one at a time.
#[embassy_executor::task]
pub async fn radio_task(mut radio: LoraRadio) {
    loop {
        match REQUESTS.receive().await {
            RadioRequest::Establish(mode) => match radio.establish(&mode).await {
                Ok(()) => defmt::info!("radio: ABP session active"),
                Err(err) => {
                    defmt::error!("radio: failed to activate session {:?}", err);
                    EVENTS.send(SessionEvent::Lifecycle(LifecycleEvent::JoinFailed)).await;
                }
            },
            RadioRequest::Uplink {
                fport,
                payload,
                confirmed,
            } => {
                EVENTS.send(SessionEvent::Lifecycle(LifecycleEvent::TxStart)).await;
                let event = radio.uplink(fport, &payload, confirmed).await;
                EVENTS.send(event).await;
            }
        }
    }
}
