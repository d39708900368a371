use std::time::Instant;

use esp_idf_svc::hal::{
    delay::FreeRtos,
    gpio::{Input, InputPin, OutputPin, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    peripheral::Peripheral,
    peripherals::Peripherals,
    units::Hertz,
};
use knee_rom::imu::{Axis, ImuSource, Mpu6050Imu};
use knee_rom::{Config, DisplayDirective, Engine, Event, TickInput, Triggers};

type Error = Box<dyn std::error::Error>;
type Result<T> = std::result::Result<T, Error>;

/// Active-low push button with press edge detection.
struct Button<'d, P: InputPin> {
    pin: PinDriver<'d, P, Input>,
    was_down: bool,
}

impl<'d, P: InputPin + OutputPin> Button<'d, P> {
    fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;

        Ok(Self {
            pin,
            was_down: false,
        })
    }

    fn pressed(&mut self) -> bool {
        let down = self.pin.is_low();
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

fn dispatch(event: &Event) {
    match event {
        Event::Display(DisplayDirective::Angle { led, band }) => {
            log::trace!("led {led} {band:?}")
        }
        Event::Display(directive) => log::info!(
            "display {directive:?} pixel {:?} color {:06X}",
            directive.pixel(),
            directive.rgb()
        ),
        Event::Audio(cue) => {
            let (freq, duration) = cue.tone();
            log::info!("tone {cue:?} {freq}Hz {duration}ms");
        }
        Event::Telemetry(frame) => println!(
            "angle={:.0} rom={:.0} max_flex={:.0}",
            frame.angle, frame.rom, frame.max_flexion
        ),
        Event::Rep(rep) => println!("rep_rom={:.0}", rep.rom),
    }
}

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;

    let scl = peripherals.pins.gpio5;
    let sda = peripherals.pins.gpio4;

    let i2c_config = I2cConfig::default().baudrate(Hertz(400000));
    let i2c_driver = I2cDriver::new(peripherals.i2c0, sda, scl, &i2c_config)?;

    let mut imu = Mpu6050Imu::new(&mut FreeRtos, i2c_driver, Axis::Y)?;
    let mut calibrate_button = Button::new(peripherals.pins.gpio6)?;
    let mut reset_button = Button::new(peripherals.pins.gpio7)?;

    let config = Config::default();
    let period_ms = config.sample_period_ms;
    let mut engine = Engine::new(config)?;
    log::info!("Waiting for calibration, press the calibrate button with the leg extended.");

    let start = Instant::now();
    // presses seen while the IMU read fails are held for the next good sample
    let mut pending = Triggers::default();
    loop {
        pending = pending.merge(Triggers {
            calibrate: calibrate_button.pressed(),
            reset_rom: reset_button.pressed(),
        });

        match imu.read() {
            Ok(sample) => {
                let input = TickInput {
                    sample,
                    now_ms: start.elapsed().as_millis() as u64,
                    triggers: core::mem::take(&mut pending),
                };
                let output = engine.update(input);
                output.events.iter().for_each(dispatch);
            }
            Err(e) => log::warn!("{e}"),
        }

        FreeRtos::delay_ms(period_ms);
    }
}
