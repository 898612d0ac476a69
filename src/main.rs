#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

//! BLE LED/Button service peripheral driving a servo, for the nRF52840-DK.
//! The portable protocol and motion logic lives in the library crate; this
//! binary wires it to the SoftDevice Controller and the board.

#[cfg(target_os = "none")]
mod ble;
#[cfg(target_os = "none")]
mod board;
#[cfg(target_os = "none")]
mod gatt;
#[cfg(target_os = "none")]
mod nrf;

#[cfg(target_os = "none")]
mod firmware {
    use embassy_executor::Spawner;
    use log::{LevelFilter, info};
    use rtt_target::{rprintln, rtt_init_print};

    use crate::board::BoardResources;
    use crate::nrf::BleResources;
    use crate::{ble, board, nrf};

    // --- Panic handler ---
    #[panic_handler]
    fn panic(e: &core::panic::PanicInfo) -> ! {
        rprintln!("PANIC: {}", e);
        loop {}
    }

    // --- RTT Logger ---
    struct RttLogger;
    impl log::Log for RttLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= LevelFilter::Info
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                rprintln!("[{}] {}", record.level(), record.args());
            }
        }
        fn flush(&self) {}
    }
    static LOGGER: RttLogger = RttLogger;

    fn init_logging() {
        rtt_init_print!();
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Info);
    }

    #[embassy_executor::main]
    async fn main(spawner: Spawner) {
        init_logging();

        let p = embassy_nrf::init(Default::default());
        info!("Embassy initialized!");

        // Servo, LEDs, button monitor
        let board_resources = crate::take_board_resources!(p);
        let board = board::init(&spawner, board_resources).unwrap();

        // init BLE controller
        let ble_resources = crate::take_ble_resources!(p);
        let sdc = nrf::init_ble(ble_resources, spawner);

        // Run BLE stack
        ble::run(sdc, board.handler, board.button).await;
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
