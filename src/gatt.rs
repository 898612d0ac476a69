use trouble_host::prelude::*;

#[gatt_server]
pub struct LbsServer {
    pub lbs: LedButtonService,
}

/// Vendor LED/Button service: a readable button byte and a writable command
/// byte that drives the servo cycle.
#[gatt_service(uuid = "00001523-1212-efde-1523-785feabcd123")]
pub struct LedButtonService {
    /// Logical button state, 0x00 released / 0x01 pressed.
    #[characteristic(uuid = "00001525-1212-efde-1523-785feabcd123", read)]
    pub button: u8,
    /// Command byte; only 0x00 and 0x01 are accepted.
    #[characteristic(
        uuid = "00001524-1212-efde-1523-785feabcd123",
        write,
        write_without_response
    )]
    pub led: u8,
}
