//! Firmware entry point.
//!
//! Boot order: bring up the hardware, honor the power-on recalibration
//! gesture, then load the stored calibration record or run a fresh
//! calibration, and hand off to the dispatch loop.

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use log::info;

    use ladder_remote::calibrate::{
        run_calibration, startup_gesture_held, ActionSource, CalibrationOptions, GESTURE_HOLD_MS,
    };
    use ladder_remote::config::layout;
    use ladder_remote::config::nvs::NvsStore;
    use ladder_remote::config::{ActionTable, StoreError};
    use ladder_remote::dispatch;
    use ladder_remote::hal::EspLadderIo;

    /// Replay levels for the eight slots, volts. Action levels are not
    /// part of the persisted record, so a reboot falls back to these.
    const DEFAULT_ACTION_LEVELS: [f32; 8] = [2.18, 1.86, 1.43, 1.63, 0.66, 1.24, 1.24, 0.89];

    pub fn run() -> Result<(), StoreError> {
        let peripherals = Peripherals::take()?;
        let mut io = EspLadderIo::new(peripherals.pins.gpio25)?;
        let mut store = NvsStore::open()?;

        let actions = ActionTable::new(DEFAULT_ACTION_LEVELS);
        let opts = CalibrationOptions {
            actions: ActionSource::Fixed(actions),
            ..Default::default()
        };

        if startup_gesture_held(&mut io, GESTURE_HOLD_MS) {
            info!("recalibration requested at power-on");
            layout::invalidate(&mut store)?;
        }

        let record = match layout::load(&store, &actions)? {
            Some(record) => {
                info!("calibration record loaded");
                record
            }
            None => {
                info!("no calibration record, calibrating");
                run_calibration(&mut io, &mut store, &opts)?
            }
        };

        dispatch::run(&mut io, &record, opts.release)
    }

    pub fn halt() -> ! {
        loop {
            FreeRtos::delay_ms(1000);
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    if let Err(err) = firmware::run() {
        log::error!("fatal: {}", err);
    }
    firmware::halt();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("ladder-remote targets the ESP32; on the host, run the test suite instead");
}
