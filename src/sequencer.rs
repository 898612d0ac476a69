use embedded_hal_async::delay::DelayNs;
use log::info;

use crate::error::DeviceError;
use crate::servo::{EXTENDED_PULSE_NS, REST_PULSE_NS, ServoDrive};

/// Settling floor after commanding the rest position at the start of a cycle.
pub const REST_SETTLE_MS: u32 = 50;
/// Settling floor after commanding the extended position.
pub const EXTEND_SETTLE_MS: u32 = 750;

/// Drives the fixed open-loop servo cycle rest -> extended -> rest. The
/// waits between stages are mechanical settling floors; issuing the next
/// pulse width early would move the horn before the previous command has
/// finished.
pub struct MotionSequencer<S, D> {
    drive: S,
    delay: D,
}

impl<S: ServoDrive, D: DelayNs> MotionSequencer<S, D> {
    pub fn new(drive: S, delay: D) -> Self {
        Self { drive, delay }
    }

    /// Runs the full cycle. A failed hardware write aborts the remaining
    /// stages immediately; there is no retry and no external cancellation.
    pub async fn activate(&mut self) -> Result<(), DeviceError> {
        info!("starting servo cycle (22.5 -> 157.5 -> 22.5)");
        self.drive.set_pulse_width(REST_PULSE_NS)?;
        self.delay.delay_ms(REST_SETTLE_MS).await;
        self.drive.set_pulse_width(EXTENDED_PULSE_NS)?;
        self.delay.delay_ms(EXTEND_SETTLE_MS).await;
        self.drive.set_pulse_width(REST_PULSE_NS)?;
        info!("servo cycle complete");
        Ok(())
    }

    /// Commands the rest position directly, no intermediate stage. Safe to
    /// repeat; the drive converges on the same pulse width every time.
    pub fn deactivate(&mut self) -> Result<(), DeviceError> {
        self.drive.set_pulse_width(REST_PULSE_NS)
    }

    /// Releases the drive and delay.
    pub fn release(self) -> (S, D) {
        (self.drive, self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingServo {
        pulses: Vec<u32>,
        fail_at: Option<usize>,
    }

    impl ServoDrive for RecordingServo {
        fn set_pulse_width(&mut self, ns: u32) -> Result<(), DeviceError> {
            if self.fail_at == Some(self.pulses.len()) {
                return Err(DeviceError::NotReady);
            }
            self.pulses.push(ns);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        waits_ms: Vec<u32>,
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, _ns: u32) {}

        async fn delay_ms(&mut self, ms: u32) {
            self.waits_ms.push(ms);
        }
    }

    #[test]
    fn activate_issues_rest_extended_rest() {
        let mut seq = MotionSequencer::new(RecordingServo::default(), RecordingDelay::default());
        block_on(seq.activate()).unwrap();

        let (servo, delay) = seq.release();
        assert_eq!(servo.pulses, vec![1_125_000, 1_875_000, 1_125_000]);
        assert_eq!(delay.waits_ms, vec![50, 750]);
        assert!(delay.waits_ms[0] >= REST_SETTLE_MS);
        assert!(delay.waits_ms[1] >= EXTEND_SETTLE_MS);
    }

    #[test]
    fn deactivate_issues_a_single_rest_write() {
        let mut seq = MotionSequencer::new(RecordingServo::default(), RecordingDelay::default());
        seq.deactivate().unwrap();

        let (servo, delay) = seq.release();
        assert_eq!(servo.pulses, vec![1_125_000]);
        assert_eq!(delay.waits_ms, Vec::<u32>::new());
    }

    #[test]
    fn repeated_deactivate_is_idempotent() {
        let mut seq = MotionSequencer::new(RecordingServo::default(), RecordingDelay::default());
        seq.deactivate().unwrap();
        seq.deactivate().unwrap();

        let (servo, _) = seq.release();
        assert_eq!(servo.pulses, vec![1_125_000, 1_125_000]);
    }

    #[test]
    fn hardware_error_aborts_the_rest_of_the_cycle() {
        let servo = RecordingServo {
            fail_at: Some(1),
            ..Default::default()
        };
        let mut seq = MotionSequencer::new(servo, RecordingDelay::default());
        let result = block_on(seq.activate());

        assert_eq!(result, Err(DeviceError::NotReady));
        // Only the first stage made it out; the extended and return writes
        // were never issued.
        let (servo, delay) = seq.release();
        assert_eq!(servo.pulses, vec![1_125_000]);
        assert_eq!(delay.waits_ms, vec![50]);
    }
}
