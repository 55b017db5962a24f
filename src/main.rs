use log::*;
use turret::config::Config;

#[cfg(target_os = "espidf")]
#[no_mangle]
pub extern "C" fn __pender() {
    // Wake-ups come from the embassy-time driver; nothing to do here.
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::time::{Duration, Instant};

    use clock::{Clock, MonotonicClock, TickPacer};
    use esp_idf_svc::{
        hal::{
            gpio::{IOPin, PinDriver, Pull},
            ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
            peripherals::Peripherals,
            prelude::*,
            task::watchdog::{TWDTConfig, TWDTDriver},
        },
        log::EspLogger,
    };
    use turret::control::{Hardware, Turret};

    // Required for ESP-IDF patches
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let config = Config::load()?;
    let peripherals = Peripherals::take()?;

    // ======== Detectors: top, bottom, left, right (active-low) ========
    let mut sensor_pins = [
        PinDriver::input(peripherals.pins.gpio16.downgrade())?,
        PinDriver::input(peripherals.pins.gpio17.downgrade())?,
        PinDriver::input(peripherals.pins.gpio25.downgrade())?,
        PinDriver::input(peripherals.pins.gpio26.downgrade())?,
    ];
    for pin in sensor_pins.iter_mut() {
        pin.set_pull(Pull::Up)?;
    }

    // ======== Servos: 50 Hz LEDC ========
    let servo_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new()
            .frequency(50.Hz().into())
            .resolution(Resolution::Bits14),
    )?;
    let pan_pwm = LedcDriver::new(peripherals.ledc.channel0, &servo_timer, peripherals.pins.gpio18)?;
    let tilt_pwm = LedcDriver::new(peripherals.ledc.channel1, &servo_timer, peripherals.pins.gpio19)?;

    let status_led = PinDriver::output(peripherals.pins.gpio2)?;

    // ======== Watchdog ========
    let twdt_config = TWDTConfig {
        duration: Duration::from_secs(config.get_watchdog_timeout_s()),
        panic_on_trigger: true,
        ..Default::default()
    };
    let mut twdt = TWDTDriver::new(peripherals.twdt, &twdt_config)?;
    let mut watchdog = twdt.watch_current_task()?;

    let clock = MonotonicClock::new();
    let pacer = TickPacer::new(config.get_tick_period_ms());
    let hardware = Hardware {
        sensor_pins,
        pan_pwm,
        tilt_pwm,
        status_led,
    };
    let mut turret = Turret::new(hardware, &config, clock.now_ms());
    info!(
        "Turret ready: {} ms tick, state {}",
        pacer.period_ms(),
        turret.state()
    );

    loop {
        let tick_start = Instant::now();
        watchdog.feed()?;
        turret.tick(clock.now_ms());
        pacer.wait(tick_start);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use turret::sim::{self, Scenario};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let duration_ms = Scenario::default().duration_ms();
    info!("No turret hardware on this target, running the bench scene for {} ms", duration_ms);

    let summary = sim::run(&config, duration_ms);
    info!(
        "Finished after {} ticks in {}: pan {:.1}°, tilt {:.0}°, {} transitions",
        summary.ticks,
        summary.final_state,
        summary.pan_deg,
        summary.tilt_deg,
        summary.transitions.len()
    );
    Ok(())
}
