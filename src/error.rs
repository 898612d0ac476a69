use thiserror::Error;

/// Malformed ATT operation. Rejected at the transport boundary with the
/// matching ATT error code; no local side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid attribute length: {0}")]
    InvalidLength(usize),
    #[error("invalid attribute offset: {0}")]
    InvalidOffset(usize),
    #[error("value not allowed: {0:#04x}")]
    ValueNotAllowed(u8),
}

/// Hardware-side failure. Aborts the in-flight motion sequence and is
/// logged; it is never reported back over the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("actuator not ready")]
    NotReady,
    #[error("pulse width {ns} ns outside the supported range")]
    PulseOutOfRange { ns: u32 },
}
