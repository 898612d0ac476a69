use log::{error, info};

/// Link-layer lifecycle as seen from the application: single peripheral
/// role, one central at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Advertising,
    Connected,
    Disconnecting,
}

/// Connection events reported by the BLE stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// The advertiser is on the air.
    AdvertisingStarted,
    /// An inbound connection attempt finished; status 0 is success.
    CentralConnected { status: u8 },
    /// The central went away. The connection slot is not reusable yet.
    Disconnected,
    /// The connection slot has been released and may be reused.
    Recycled,
}

/// Work requested by a transition. Executed by the BLE loop at its next
/// scheduling point, never inside the event context that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartAdvertising,
}

/// Tracks the advertise/connect/recycle cycle and decides when advertising
/// must be re-armed. Re-arming is triggered by the recycle notification,
/// not by the disconnect itself, and a failed connection attempt schedules
/// nothing on its own.
#[derive(Debug, Default)]
pub struct LinkSupervisor {
    state: LinkState,
}

impl LinkSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Initial arm at boot.
    pub fn arm(&mut self) -> Action {
        Action::StartAdvertising
    }

    pub fn on_event(&mut self, event: LinkEvent) -> Option<Action> {
        match event {
            LinkEvent::AdvertisingStarted => {
                info!("advertising started");
                self.state = LinkState::Advertising;
                None
            }
            LinkEvent::CentralConnected { status: 0 } => {
                info!("connected");
                self.state = LinkState::Connected;
                None
            }
            LinkEvent::CentralConnected { status } => {
                // No retry is scheduled here; the slot's eventual recycle is
                // what re-arms advertising.
                error!("connection failed (status {status})");
                self.state = LinkState::Idle;
                None
            }
            LinkEvent::Disconnected => {
                info!("disconnected");
                self.state = LinkState::Disconnecting;
                None
            }
            LinkEvent::Recycled => {
                info!("connection recycled, disconnect complete");
                self.state = LinkState::Idle;
                Some(Action::StartAdvertising)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn successful_connect_reaches_connected() {
        let mut sup = LinkSupervisor::new();
        assert_eq!(sup.arm(), Action::StartAdvertising);
        assert_eq!(sup.on_event(LinkEvent::AdvertisingStarted), None);
        assert_eq!(sup.state(), LinkState::Advertising);
        assert_eq!(sup.on_event(LinkEvent::CentralConnected { status: 0 }), None);
        assert_eq!(sup.state(), LinkState::Connected);
    }

    #[test]
    fn failed_connect_goes_idle_with_no_restart() {
        let mut sup = LinkSupervisor::new();
        sup.on_event(LinkEvent::AdvertisingStarted);
        assert_eq!(sup.on_event(LinkEvent::CentralConnected { status: 62 }), None);
        assert_eq!(sup.state(), LinkState::Idle);
    }

    #[test]
    fn recycle_rearms_advertising_from_any_state() {
        for walk in [
            vec![],
            vec![LinkEvent::AdvertisingStarted],
            vec![
                LinkEvent::AdvertisingStarted,
                LinkEvent::CentralConnected { status: 0 },
            ],
            vec![
                LinkEvent::AdvertisingStarted,
                LinkEvent::CentralConnected { status: 0 },
                LinkEvent::Disconnected,
            ],
        ] {
            let mut sup = LinkSupervisor::new();
            for ev in walk {
                sup.on_event(ev);
            }
            assert_eq!(
                sup.on_event(LinkEvent::Recycled),
                Some(Action::StartAdvertising)
            );
            assert_eq!(sup.state(), LinkState::Idle);
        }
    }

    #[test]
    fn disconnect_alone_does_not_rearm() {
        let mut sup = LinkSupervisor::new();
        sup.on_event(LinkEvent::AdvertisingStarted);
        sup.on_event(LinkEvent::CentralConnected { status: 0 });
        assert_eq!(sup.on_event(LinkEvent::Disconnected), None);
        assert_eq!(sup.state(), LinkState::Disconnecting);
    }
}
