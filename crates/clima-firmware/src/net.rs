//! Wi-Fi association, the network stack and SNTP time synchronization

use alloc::string::String;

use clima_core::app_state::{AppError, debug_detail, detail};
use clima_core::clock::ntp::{self, NTP_PORT, PACKET_LEN};
use clima_core::config::{ClockConfig, InternetConfig};
use clima_core::sample::Timestamp;
use embassy_executor::Spawner;
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Config as NetConfig, DhcpConfig, Stack, StackResources};
use embassy_time::{Duration, Timer, with_timeout};
use esp_hal::peripherals::WIFI;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};
use static_cell::StaticCell;

use crate::hardware::Rtc;

/// Interval between "still waiting" reports while DHCP is pending
const CONFIG_UP_REPORT: Duration = Duration::from_secs(15);

const NTP_TIMEOUT: Duration = Duration::from_secs(3);
const NTP_ATTEMPTS: usize = 3;

static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

/// Bring up the radio and the DHCP stack and spawn the tasks that drive them.
///
/// Returns as soon as the tasks are running; use [`wait_for_network`] to
/// wait for an address.
pub fn start_network(
    spawner: &Spawner,
    wifi: WIFI<'static>,
    internet: &InternetConfig<'static>,
    seed: u64,
) -> Result<Stack<'static>, AppError> {
    let radio = esp_radio::init().map_err(|e| AppError::Wifi(debug_detail(e)))?;
    let radio = RADIO_CONTROLLER.init(radio);

    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Default::default())
        .map_err(|e| AppError::Wifi(debug_detail(e)))?;

    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        NetConfig::dhcpv4(DhcpConfig::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );

    info!("Spawning Wi-Fi connection task");
    spawner.spawn(
        wifi_task(controller, internet.ssid, internet.password)
            .map_err(|e| AppError::Spawn(debug_detail(e)))?,
    );
    spawner.spawn(net_task(runner).map_err(|e| AppError::Spawn(debug_detail(e)))?);

    Ok(stack)
}

/// Wait until DHCP has configured the stack.
///
/// There is no deadline: `wifi_task` keeps reassociating in the background,
/// and nothing downstream is useful without an address.
pub async fn wait_for_network(stack: Stack<'static>) {
    let mut waited = Duration::from_secs(0);
    while with_timeout(CONFIG_UP_REPORT, stack.wait_config_up())
        .await
        .is_err()
    {
        waited += CONFIG_UP_REPORT;
        warn!("Still waiting for an IPv4 address ({} s)", waited.as_secs());
    }

    if let Some(config) = stack.config_v4() {
        info!("Network up: ip={}", config.address.address());
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

/// Keep the station associated, reconnecting after every drop.
#[embassy_executor::task]
async fn wifi_task(
    mut controller: WifiController<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(String::from(ssid))
                    .with_password(String::from(password)),
            );
            if let Err(e) = controller.set_config(&client_config) {
                warn!("Wi-Fi set_config error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
                continue;
            }

            info!("Starting Wi-Fi STA");
            if let Err(e) = controller.start_async().await {
                warn!("Wi-Fi start error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
                continue;
            }
        }

        info!("Connecting to Wi-Fi SSID=\"{}\"", ssid);
        match controller.connect_async().await {
            Ok(()) => {
                info!("Wi-Fi connected");
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                warn!("Wi-Fi disconnected; will retry");
                Timer::after(Duration::from_secs(5)).await;
            }
            Err(e) => {
                warn!("Wi-Fi connect error: {:?}", e);
                Timer::after(Duration::from_secs(10)).await;
            }
        }
    }
}

/// Fetch the current time over SNTP and write it to the RTC as local time.
pub async fn sync_time(
    stack: Stack<'static>,
    rtc: &mut Rtc,
    clock: &ClockConfig<'_>,
) -> Result<Timestamp, AppError> {
    let mut last_error = AppError::TimeSync(detail("no attempt made"));

    for attempt in 1..=NTP_ATTEMPTS {
        match query_ntp(stack, clock.ntp_server).await {
            Ok(unix_secs) => {
                let now = i64::try_from(unix_secs)
                    .ok()
                    .and_then(|secs| Timestamp::from_unix(secs, clock.utc_offset_secs))
                    .ok_or_else(|| AppError::TimeSync(detail("time out of range")))?;

                rtc.set_datetime(now)
                    .map_err(|e| AppError::Clock(debug_detail(e)))?;
                info!("RTC set to {}", now);
                return Ok(now);
            }
            Err(e) => {
                warn!("NTP attempt {}/{} failed: {}", attempt, NTP_ATTEMPTS, e);
                last_error = e;
            }
        }
        Timer::after(Duration::from_secs(1)).await;
    }

    Err(last_error)
}

/// One SNTP exchange with `server`, returning Unix seconds.
async fn query_ntp(stack: Stack<'static>, server: &str) -> Result<u64, AppError> {
    let addresses = stack
        .dns_query(server, DnsQueryType::A)
        .await
        .map_err(|e| AppError::Network(debug_detail(e)))?;
    let address = addresses
        .first()
        .copied()
        .ok_or_else(|| AppError::Network(detail("NTP server has no address")))?;

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buffer = [0u8; 128];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_buffer = [0u8; 128];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket
        .bind(0)
        .map_err(|e| AppError::Network(debug_detail(e)))?;

    info!("NTP: querying {} ({})", server, address);
    socket
        .send_to(&ntp::request_packet(), (address, NTP_PORT))
        .await
        .map_err(|e| AppError::Network(debug_detail(e)))?;

    let mut packet = [0u8; PACKET_LEN];
    let (len, _) = with_timeout(NTP_TIMEOUT, socket.recv_from(&mut packet))
        .await
        .map_err(|_| AppError::TimeSync(detail("NTP response timed out")))?
        .map_err(|e| AppError::Network(debug_detail(e)))?;

    ntp::parse_response(&packet[..len]).map_err(|e| AppError::TimeSync(debug_detail(e)))
}
