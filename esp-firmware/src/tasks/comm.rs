// Communication Task - Session-Zustand und Benachrichtigungen
//
// Zwei Tasks teilen sich die Aufgabe:
// - session_task: Attach/Detach/Setpoint-Writes vom WebSocket verarbeiten
// - relay_task: Messwerte + Sollwert-Bestätigungen an den Client weiterleiten

use defmt::{debug, info, warn};

use esp_core::{
    Advertiser, Notification, NotificationRelay, NotificationSink, RelayOutcome,
    SessionController, SessionOutcome, SinkError,
};

use crate::{AdvertiseSignal, Outbox, SharedChannels};

/// Advertising über mDNS: löst einen Announce-Burst im Responder aus
pub struct MdnsAdvertiser {
    signal: &'static AdvertiseSignal,
}

impl MdnsAdvertiser {
    pub fn new(signal: &'static AdvertiseSignal) -> Self {
        Self { signal }
    }
}

impl Advertiser for MdnsAdvertiser {
    fn start_advertising(&mut self) {
        self.signal.signal(());
    }
}

/// Reicht Benachrichtigungen an den WebSocket-Handler weiter
///
/// Der Handler besitzt den Socket, daher nur ein kurzer Ausgangspuffer.
/// Ist er voll (Client liest nicht), wird verworfen statt gewartet.
pub struct WsNotifier {
    outbox: &'static Outbox,
}

impl WsNotifier {
    pub fn new(outbox: &'static Outbox) -> Self {
        Self { outbox }
    }
}

impl NotificationSink for WsNotifier {
    async fn notify(&mut self, notification: Notification) -> Result<(), SinkError> {
        if self.outbox.offer(notification) {
            Ok(())
        } else {
            Err(SinkError::Busy)
        }
    }
}

/// Session Task
///
/// Verarbeitet Events vom WebSocket-Handler und startet nach jedem
/// Disconnect das Advertising neu.
#[embassy_executor::task]
pub async fn session_task(shared: &'static SharedChannels) {
    info!("Session: Task starting");

    let advertiser = MdnsAdvertiser::new(&shared.advertise);
    let mut session = SessionController::new(&shared.connection, &shared.setpoints, advertiser);

    session
        .run(&shared.session_events, |outcome| match *outcome {
            SessionOutcome::Attached { session } => {
                info!("Session: Client attached (session {})", session);
            }
            SessionOutcome::Detached { was_attached } => {
                if was_attached {
                    info!("Session: Client detached, advertising restarted");
                } else {
                    debug!("Session: Detach without client, advertising restarted");
                }
            }
            SessionOutcome::SetpointQueued(value) => {
                info!("Session: Setpoint {} queued", value);
            }
            SessionOutcome::SetpointDropped(value) => {
                warn!(
                    "Session: Setpoint queue full, {} dropped ({} total)",
                    value,
                    shared.setpoints.dropped()
                );
            }
        })
        .await
}

/// Relay Task
///
/// Wartet auf Messwerte und Sollwert-Bestätigungen und reicht sie an den
/// verbundenen Client weiter. Ohne Client wird verworfen.
#[embassy_executor::task]
pub async fn relay_task(shared: &'static SharedChannels) {
    info!("Relay: Task starting");

    let sink = WsNotifier::new(&shared.outbox);
    let mut relay = NotificationRelay::new(
        &shared.connection,
        &shared.readings,
        &shared.setpoint_echo,
        sink,
    );

    relay
        .run(|outcome| match *outcome {
            RelayOutcome::Delivered {
                notification,
                greeting,
            } => {
                if let Some(setpoint) = greeting {
                    debug!("Relay: Greeted new client with setpoint {}", setpoint);
                }
                debug!("Relay: Sent {}", notification);
            }
            RelayOutcome::Discarded(notification) => {
                debug!("Relay: No client, discarded {}", notification);
            }
            RelayOutcome::SinkFailed(notification, e) => {
                warn!(
                    "Relay: Send failed ({}), {} dropped ({} total)",
                    e,
                    notification,
                    shared.outbox.dropped()
                );
            }
        })
        .await
}
