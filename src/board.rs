//! nRF52840-DK hardware adapters: PWM servo drive, indicator and status
//! LEDs, and the Button 1 monitor feeding the shared state flag.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::Spawner;
use embassy_nrf::Peri;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::peripherals::{P0_02, P0_11, P0_13, P0_14, PWM0};
use embassy_nrf::pwm::{Prescaler, SimplePwm};
use embassy_time::{Delay, Timer};
use log::info;
use macros::take_resources;

use lbs_servo::dispatch::{ButtonStateProvider, CommandSink};
use lbs_servo::error::DeviceError;
use lbs_servo::sequencer::MotionSequencer;
use lbs_servo::servo::{MAX_PULSE_NS, MIN_PULSE_NS, PWM_PERIOD_NS, REST_PULSE_NS, ServoDrive};

const HEARTBEAT_INTERVAL_MS: u64 = 1000;

/// Single writer: `button_task`. Read by the GATT path via `ButtonMonitor`.
static BUTTON_PRESSED: AtomicBool = AtomicBool::new(false);

#[take_resources]
pub struct BoardResources<'p> {
    pub pwm0: Peri<'p, PWM0>,
    pub p0_02: Peri<'p, P0_02>,
    pub p0_11: Peri<'p, P0_11>,
    pub p0_13: Peri<'p, P0_13>,
    pub p0_14: Peri<'p, P0_14>,
}

/// Servo on PWM0 at 50 Hz with a 1 MHz tick, so one duty count per
/// microsecond of pulse width.
pub struct ServoPwm {
    pwm: SimplePwm<'static, PWM0>,
}

impl ServoPwm {
    /// Brings the output up and parks the horn at the rest position.
    pub fn new(
        pwm0: Peri<'static, PWM0>,
        pin: Peri<'static, P0_02>,
    ) -> Result<Self, DeviceError> {
        let mut pwm = SimplePwm::new_1ch(pwm0, pin);
        pwm.set_prescaler(Prescaler::Div16);
        pwm.set_max_duty((PWM_PERIOD_NS / 1_000) as u16);
        let mut servo = Self { pwm };
        servo.set_pulse_width(REST_PULSE_NS)?;
        Ok(servo)
    }
}

impl ServoDrive for ServoPwm {
    fn set_pulse_width(&mut self, ns: u32) -> Result<(), DeviceError> {
        if !(MIN_PULSE_NS..=MAX_PULSE_NS).contains(&ns) {
            return Err(DeviceError::PulseOutOfRange { ns });
        }
        self.pwm.set_duty(0, (ns / 1_000) as u16);
        Ok(())
    }
}

/// Command handler behind the LED characteristic: runs the servo cycle and
/// mirrors the commanded state on the indicator LED. The LED is updated
/// even when the servo reports an error, matching the acknowledgment the
/// peer already received.
pub struct ServoCommandHandler {
    sequencer: MotionSequencer<ServoPwm, Delay>,
    indicator: Output<'static>,
}

impl ServoCommandHandler {
    pub fn new(servo: ServoPwm, indicator: Output<'static>) -> Self {
        Self {
            sequencer: MotionSequencer::new(servo, Delay),
            indicator,
        }
    }
}

impl CommandSink for ServoCommandHandler {
    async fn on_command(&mut self, active: bool) -> Result<(), DeviceError> {
        let result = if active {
            self.sequencer.activate().await
        } else {
            self.sequencer.deactivate()
        };
        // DK LEDs are active low.
        if active {
            self.indicator.set_low();
        } else {
            self.indicator.set_high();
        }
        info!("indicator led set to {}", active);
        result
    }
}

/// Reads the flag maintained by `button_task`.
pub struct ButtonMonitor;

impl ButtonStateProvider for ButtonMonitor {
    fn is_pressed(&mut self) -> bool {
        BUTTON_PRESSED.load(Ordering::Relaxed)
    }
}

/// Tracks Button 1 (active low) edges into the shared flag. Last write
/// wins; no history is kept.
#[embassy_executor::task]
async fn button_task(mut button: Input<'static>) {
    loop {
        button.wait_for_any_edge().await;
        let pressed = button.is_low();
        if pressed {
            info!("button pressed");
        }
        BUTTON_PRESSED.store(pressed, Ordering::Relaxed);
    }
}

/// 1 Hz heartbeat on the status LED.
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.toggle();
        Timer::after_millis(HEARTBEAT_INTERVAL_MS).await;
    }
}

pub struct Board {
    pub handler: ServoCommandHandler,
    pub button: ButtonMonitor,
}

/// Initializes servo, LEDs and button and spawns the background tasks.
pub fn init(spawner: &Spawner, r: BoardResources<'static>) -> Result<Board, DeviceError> {
    let servo = ServoPwm::new(r.pwm0, r.p0_02)?;
    let status = Output::new(r.p0_13, Level::High, OutputDrive::Standard);
    let indicator = Output::new(r.p0_14, Level::High, OutputDrive::Standard);
    let button = Input::new(r.p0_11, Pull::Up);

    spawner.spawn(button_task(button)).unwrap();
    spawner.spawn(heartbeat_task(status)).unwrap();

    Ok(Board {
        handler: ServoCommandHandler::new(servo, indicator),
        button: ButtonMonitor,
    })
}
