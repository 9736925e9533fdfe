#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::convert::Infallible;

use clima_core::app_state::{AppError, AppRunState, AppState, debug_detail};
use clima_core::config::{Config, InternetConfig};
use clima_core::history::SensorHistory;
use clima_core::sampler::{SampleTrigger, Sampler};
use clima_firmware::hardware::{self, I2cHardware};
use clima_firmware::net;
use clima_firmware::server;
use clima_firmware::wifi_secrets::{WIFI_PASSWORD, WIFI_SSID};
use embassy_executor::Spawner;
use embassy_time::{Duration, Ticker, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::peripherals::Peripherals;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};
use static_cell::StaticCell;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Pending-sample flag set by the ticker and drained by the main loop
static SAMPLE_TRIGGER: SampleTrigger = SampleTrigger::new();

static HISTORY: StaticCell<SensorHistory> = StaticCell::new();

#[embassy_executor::task]
async fn ticker_task(trigger: &'static SampleTrigger, period: Duration) {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        trigger.fire();
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let mut app = AppState::new();
    if let Err(e) = run(spawner, peripherals, &mut app).await {
        app.fail(&e);
    }

    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}

async fn run(
    spawner: Spawner,
    peripherals: Peripherals,
    app: &mut AppState,
) -> Result<Infallible, AppError> {
    let config = Config {
        internet: InternetConfig {
            ssid: WIFI_SSID,
            password: WIFI_PASSWORD,
        },
        ..Config::default()
    };

    let sensor_bus =
        hardware::create_sensor_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11)
            .map_err(|e| AppError::Hardware(debug_detail(e)))?;
    let rtc_bus = hardware::create_rtc_bus(peripherals.I2C1, peripherals.GPIO13, peripherals.GPIO14)
        .map_err(|e| AppError::Hardware(debug_detail(e)))?;
    let I2cHardware { sensor, mut rtc } = hardware::init_i2c_hardware(sensor_bus, rtc_bus);

    // First sample as soon as the loop starts, then one per period
    SAMPLE_TRIGGER.fire();
    spawner.spawn(
        ticker_task(&SAMPLE_TRIGGER, config.sampling.period())
            .map_err(|e| AppError::Spawn(debug_detail(e)))?,
    );

    app.transition(AppRunState::WifiConnecting);
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let stack = net::start_network(&spawner, peripherals.WIFI, &config.internet, seed)?;
    net::wait_for_network(stack).await;
    app.transition(AppRunState::WifiConnected);

    app.transition(AppRunState::TimeSyncing);
    match net::sync_time(stack, &mut rtc, &config.clock).await {
        Ok(_) => app.transition(AppRunState::TimeKnown),
        Err(e) => {
            warn!("Time sync failed, keeping RTC time: {}", e);
            if matches!(rtc.is_valid(), Ok(true)) {
                app.transition(AppRunState::TimeKnown);
            }
        }
    }

    let history = HISTORY.init(SensorHistory::new());
    app.transition(AppRunState::Serving);
    server::run(
        stack,
        config.http.port,
        &SAMPLE_TRIGGER,
        Sampler::new(sensor, rtc),
        history,
    )
    .await
}
