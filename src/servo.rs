use crate::error::DeviceError;

/// Pulse width at 0 degrees.
pub const MIN_PULSE_NS: u32 = 1_000_000;
/// Pulse width at 180 degrees.
pub const MAX_PULSE_NS: u32 = 2_000_000;
/// 50 Hz PWM period.
pub const PWM_PERIOD_NS: u32 = 20_000_000;

/// Resting position, 22.5 degrees.
pub const REST_PULSE_NS: u32 = pulse_for_decidegrees(225);
/// Extended position, 157.5 degrees.
pub const EXTENDED_PULSE_NS: u32 = pulse_for_decidegrees(1575);

/// Linear map from tenths of a degree to pulse width in nanoseconds.
/// Angles past 180 degrees clamp to the end stop.
pub const fn pulse_for_decidegrees(ddeg: u32) -> u32 {
    let ddeg = if ddeg > 1800 { 1800 } else { ddeg };
    MIN_PULSE_NS + ddeg * (MAX_PULSE_NS - MIN_PULSE_NS) / 1800
}

/// Boundary to the PWM hardware. Implementations program the waveform for
/// the requested pulse width; they never sleep.
pub trait ServoDrive {
    fn set_pulse_width(&mut self, ns: u32) -> Result<(), DeviceError>;
}

impl<T: ServoDrive + ?Sized> ServoDrive for &mut T {
    fn set_pulse_width(&mut self, ns: u32) -> Result<(), DeviceError> {
        T::set_pulse_width(self, ns)
    }
}
