use embassy_futures::join::join;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{error, info, warn};
use static_cell::StaticCell;
use trouble_host::gatt::GattConnectionEvent;
use trouble_host::prelude::*;

use lbs_servo::dispatch::{ButtonStateProvider, CommandSink, Dispatch};
use lbs_servo::error::ProtocolError;
use lbs_servo::lifecycle::{Action, LinkEvent, LinkSupervisor};

use crate::gatt::LbsServer;

const ADVERTISE_NAME: &str = "LBS-Servo";

const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 3;

/// 00001523-1212-efde-1523-785feabcd123, little endian.
const SERVICE_UUID_BYTES: [u8; 16] = [
    0x23, 0xd1, 0xbc, 0xea, 0x5f, 0x78, // 785feabcd123
    0x23, 0x15, // 1523
    0xde, 0xef, // efde
    0x12, 0x12, // 1212
    0x23, 0x15, 0x00, 0x00, // 00001523
];

/// Random static address: two most significant bits set.
const PERIPHERAL_ADDR_BYTES: [u8; 6] = [0x2a, 0x5e, 0x19, 0x77, 0x04, 0xc4];

static RESOURCES: StaticCell<
    HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX>,
> = StaticCell::new();

static SERVER: StaticCell<LbsServer<'static>> = StaticCell::new();

/// Deferred advertising-restart work item. Lifecycle transitions signal it;
/// the peripheral loop consumes it at its next scheduling point, never
/// inline in the event context that requested it.
static ADV_RESTART: Signal<CriticalSectionRawMutex, ()> = Signal::new();

fn schedule(action: Option<Action>) {
    if let Some(Action::StartAdvertising) = action {
        ADV_RESTART.signal(());
    }
}

fn att_error(err: ProtocolError) -> AttErrorCode {
    match err {
        ProtocolError::InvalidLength(_) => AttErrorCode::INVALID_ATTRIBUTE_VALUE_LENGTH,
        ProtocolError::InvalidOffset(_) => AttErrorCode::INVALID_OFFSET,
        ProtocolError::ValueNotAllowed(_) => AttErrorCode::VALUE_NOT_ALLOWED,
    }
}

pub async fn run<C, S, B>(controller: C, sink: S, button: B)
where
    C: Controller,
    S: CommandSink,
    B: ButtonStateProvider,
{
    let address = Address::random(PERIPHERAL_ADDR_BYTES);
    info!("Starting BLE stack with address {:?}", address);

    let resources = RESOURCES.init(HostResources::new());
    let stack = trouble_host::new(controller, resources).set_random_address(address);
    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let server: &'static LbsServer = &*SERVER.init(
        LbsServer::new_with_config(GapConfig::Peripheral(PeripheralConfig {
            name: ADVERTISE_NAME,
            appearance: &appearance::power_device::GENERIC_POWER_DEVICE,
        }))
        .unwrap(),
    );

    let mut dispatch = Dispatch::new(Some(sink), Some(button));
    let mut supervisor = LinkSupervisor::new();
    schedule(Some(supervisor.arm()));

    join(runner.run(), async {
        let mut adv_data = [0; 31];
        let mut scan_data = [0; 31];

        // Flags and complete name in the primary packet, the full 128-bit
        // service UUID in the scan response.
        let len_adv = AdStructure::encode_slice(
            &[
                AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                AdStructure::CompleteLocalName(ADVERTISE_NAME.as_bytes()),
            ],
            &mut adv_data,
        )
        .unwrap();

        let len_scan = AdStructure::encode_slice(
            &[AdStructure::ServiceUuids128(&[SERVICE_UUID_BYTES])],
            &mut scan_data,
        )
        .unwrap();

        loop {
            ADV_RESTART.wait().await;

            info!("Advertising...");
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..len_adv],
                        scan_data: &scan_data[..len_scan],
                    },
                )
                .await
            {
                Ok(adv) => adv,
                Err(e) => {
                    // Logged only; nothing re-arms until the next recycle.
                    error!("Advertising failed to start: {:?}", e);
                    continue;
                }
            };
            schedule(supervisor.on_event(LinkEvent::AdvertisingStarted));

            let conn = match advertiser.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Connection attempt failed: {:?}", e);
                    schedule(supervisor.on_event(LinkEvent::CentralConnected { status: 1 }));
                    // The failed slot is released right away.
                    schedule(supervisor.on_event(LinkEvent::Recycled));
                    continue;
                }
            };
            schedule(supervisor.on_event(LinkEvent::CentralConnected { status: 0 }));

            let gatt_conn = match conn.with_attribute_server(server) {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to attach attribute server: {:?}", e);
                    schedule(supervisor.on_event(LinkEvent::Recycled));
                    continue;
                }
            };

            loop {
                match gatt_conn.next().await {
                    GattConnectionEvent::Disconnected { reason } => {
                        info!("Disconnected (reason {:?})", reason);
                        schedule(supervisor.on_event(LinkEvent::Disconnected));
                        break;
                    }
                    GattConnectionEvent::Gatt { event } => match event {
                        GattEvent::Write(event) if event.handle() == server.lbs.led.handle => {
                            // The handler blocks through the whole motion
                            // sequence; the reply goes out only afterwards.
                            let reply = match dispatch.handle_led_write(event.data(), 0).await {
                                Ok(_) => event.accept(),
                                Err(e) => event.reject(att_error(e)),
                            };
                            match reply {
                                Ok(reply) => reply.send().await,
                                Err(e) => warn!("Error sending response: {:?}", e),
                            }
                        }
                        GattEvent::Read(event) if event.handle() == server.lbs.button.handle => {
                            let mut value = [0u8; 1];
                            if dispatch.handle_button_read(&mut value, 0) > 0 {
                                if let Err(e) = server.lbs.button.set(server, &value[0]) {
                                    warn!("Failed to refresh button value: {:?}", e);
                                }
                            }
                            match event.accept() {
                                Ok(reply) => reply.send().await,
                                Err(e) => warn!("Error sending response: {:?}", e),
                            }
                        }
                        event => match event.accept() {
                            Ok(reply) => reply.send().await,
                            Err(e) => warn!("Error sending response: {:?}", e),
                        },
                    },
                    _ => {}
                }
            }

            // Dropping the connection releases the slot back to the pool;
            // that recycle is what re-arms advertising.
            drop(gatt_conn);
            schedule(supervisor.on_event(LinkEvent::Recycled));
        }
    })
    .await;
}
