use log::{error, info};

use crate::command::Command;
use crate::error::{DeviceError, ProtocolError};

/// Backend invoked for every accepted LED-characteristic command. The call
/// is awaited to completion, motion sequence included, before the ATT reply
/// goes out; the attribute server tolerates that bounded latency.
#[allow(async_fn_in_trait)]
pub trait CommandSink {
    async fn on_command(&mut self, active: bool) -> Result<(), DeviceError>;
}

/// Source of the logical button state.
pub trait ButtonStateProvider {
    fn is_pressed(&mut self) -> bool;
}

impl<T: CommandSink + ?Sized> CommandSink for &mut T {
    async fn on_command(&mut self, active: bool) -> Result<(), DeviceError> {
        T::on_command(self, active).await
    }
}

impl<T: ButtonStateProvider + ?Sized> ButtonStateProvider for &mut T {
    fn is_pressed(&mut self) -> bool {
        T::is_pressed(self)
    }
}

/// Handler pair behind the two GATT characteristics, registered once at
/// init and immutable afterwards. A missing handler degrades the operation
/// to a logged no-op instead of failing the transport: malformed payloads
/// are rejected, an unconfigured backend is not a protocol error.
pub struct Dispatch<S, B> {
    sink: Option<S>,
    provider: Option<B>,
    button_state: bool,
}

impl<S: CommandSink, B: ButtonStateProvider> Dispatch<S, B> {
    pub fn new(sink: Option<S>, provider: Option<B>) -> Self {
        if sink.is_none() {
            error!("no command handler registered");
        }
        if provider.is_none() {
            error!("no button state provider registered");
        }
        Self {
            sink,
            provider,
            button_state: false,
        }
    }

    /// LED characteristic write path. Validates the raw ATT payload, then
    /// runs the registered command handler to completion. Returns the
    /// number of bytes consumed. A `DeviceError` from the handler is logged
    /// and the write still acks; the payload itself was valid.
    pub async fn handle_led_write(
        &mut self,
        data: &[u8],
        offset: usize,
    ) -> Result<usize, ProtocolError> {
        if data.len() != 1 {
            error!("led write: incorrect data length {}", data.len());
            return Err(ProtocolError::InvalidLength(data.len()));
        }
        if offset != 0 {
            error!("led write: incorrect data offset {}", offset);
            return Err(ProtocolError::InvalidOffset(offset));
        }
        let cmd = Command::try_from(data[0]).map_err(|_| {
            error!("led write: incorrect value {:#04x}", data[0]);
            ProtocolError::ValueNotAllowed(data[0])
        })?;

        match self.sink.as_mut() {
            Some(sink) => {
                info!("led write: {:?}", cmd);
                if let Err(e) = sink.on_command(cmd.is_active()).await {
                    error!("command handler failed: {}", e);
                }
            }
            None => error!("led write ignored: no command handler registered"),
        }
        Ok(1)
    }

    /// Button characteristic read path. Refreshes the cached state from the
    /// provider and copies it into `buf` with standard attribute-read
    /// truncation, returning the number of bytes written. An unregistered
    /// provider yields an empty (but valid) response.
    pub fn handle_button_read(&mut self, buf: &mut [u8], offset: usize) -> usize {
        let Some(provider) = self.provider.as_mut() else {
            error!("button read: no state provider registered");
            return 0;
        };
        self.button_state = provider.is_pressed();
        info!("button read: {}", self.button_state);

        let value = [self.button_state as u8];
        if offset >= value.len() {
            return 0;
        }
        let n = buf.len().min(value.len() - offset);
        buf[..n].copy_from_slice(&value[offset..offset + n]);
        n
    }

    /// Last state reported to a peer, without consulting the provider.
    pub fn cached_button_state(&self) -> bool {
        self.button_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<bool>,
        fail: bool,
    }

    impl CommandSink for RecordingSink {
        async fn on_command(&mut self, active: bool) -> Result<(), DeviceError> {
            self.calls.push(active);
            if self.fail {
                Err(DeviceError::NotReady)
            } else {
                Ok(())
            }
        }
    }

    struct FixedButton(bool);

    impl ButtonStateProvider for FixedButton {
        fn is_pressed(&mut self) -> bool {
            self.0
        }
    }

    fn dispatch(
        sink: &mut RecordingSink,
        button: FixedButton,
    ) -> Dispatch<&mut RecordingSink, FixedButton> {
        Dispatch::new(Some(sink), Some(button))
    }

    #[test]
    fn rejects_wrong_length_without_invoking_the_sink() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(false));
        for payload in [&[][..], &[0x01, 0x00][..], &[0; 5][..]] {
            assert_eq!(
                block_on(d.handle_led_write(payload, 0)),
                Err(ProtocolError::InvalidLength(payload.len()))
            );
        }
        drop(d);
        assert_eq!(sink.calls, Vec::<bool>::new());
    }

    #[test]
    fn rejects_nonzero_offset_regardless_of_payload() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(false));
        assert_eq!(
            block_on(d.handle_led_write(&[0x01], 1)),
            Err(ProtocolError::InvalidOffset(1))
        );
        drop(d);
        assert_eq!(sink.calls, Vec::<bool>::new());
    }

    #[test]
    fn rejects_bytes_outside_zero_and_one() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(false));
        assert_eq!(
            block_on(d.handle_led_write(&[0x02], 0)),
            Err(ProtocolError::ValueNotAllowed(0x02))
        );
        assert_eq!(
            block_on(d.handle_led_write(&[0xff], 0)),
            Err(ProtocolError::ValueNotAllowed(0xff))
        );
        drop(d);
        assert_eq!(sink.calls, Vec::<bool>::new());
    }

    #[test]
    fn valid_bytes_invoke_the_sink_exactly_once() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(false));
        assert_eq!(block_on(d.handle_led_write(&[0x01], 0)), Ok(1));
        assert_eq!(block_on(d.handle_led_write(&[0x00], 0)), Ok(1));
        drop(d);
        assert_eq!(sink.calls, vec![true, false]);
    }

    #[test]
    fn write_still_acks_without_a_registered_sink() {
        let mut d: Dispatch<RecordingSink, FixedButton> = Dispatch::new(None, None);
        assert_eq!(block_on(d.handle_led_write(&[0x01], 0)), Ok(1));
        // Malformed payloads are still rejected in the degraded state.
        assert_eq!(
            block_on(d.handle_led_write(&[0x02], 0)),
            Err(ProtocolError::ValueNotAllowed(0x02))
        );
    }

    #[test]
    fn device_errors_do_not_fail_the_write() {
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let mut d = dispatch(&mut sink, FixedButton(false));
        assert_eq!(block_on(d.handle_led_write(&[0x01], 0)), Ok(1));
        drop(d);
        assert_eq!(sink.calls, vec![true]);
    }

    #[test]
    fn read_reports_the_provider_state() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(true));
        let mut buf = [0u8; 4];
        assert_eq!(d.handle_button_read(&mut buf, 0), 1);
        assert_eq!(buf[0], 0x01);
        assert!(d.cached_button_state());

        let mut d = Dispatch::new(Some(RecordingSink::default()), Some(FixedButton(false)));
        assert_eq!(d.handle_button_read(&mut buf, 0), 1);
        assert_eq!(buf[0], 0x00);
    }

    #[test]
    fn read_truncates_at_the_value_boundary() {
        let mut sink = RecordingSink::default();
        let mut d = dispatch(&mut sink, FixedButton(true));
        let mut buf = [0u8; 4];
        assert_eq!(d.handle_button_read(&mut buf, 1), 0);
        assert_eq!(d.handle_button_read(&mut [], 0), 0);
    }

    #[test]
    fn read_without_a_provider_is_an_empty_response() {
        let mut d: Dispatch<RecordingSink, FixedButton> = Dispatch::new(None, None);
        let mut buf = [0u8; 1];
        assert_eq!(d.handle_button_read(&mut buf, 0), 0);
    }
}
