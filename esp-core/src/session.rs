//! Communication Task: Session-Zustand und Benachrichtigungs-Relay
//!
//! Zwei unabhängige Hälften:
//! - `SessionController` verarbeitet Events vom Transport (Attach/Detach/Write)
//! - `NotificationRelay` wartet auf Messwerte und leitet sie an den Client weiter
//!
//! Zustandsmaschine (ConnectionState):
//! `Disconnected --attach--> Connected --detach--> Disconnected`,
//! jedes `detach` startet das Advertising neu.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::queue::{ConnectionState, ReadingQueue, SessionEvents, SetpointEcho, SetpointQueue};
use crate::traits::{Advertiser, NotificationSink, SinkError};
use crate::types::{Notification, SessionEvent};

/// Ergebnis eines verarbeiteten Session-Events
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    Attached { session: u32 },
    /// `was_attached == false`: Detach ohne vorheriges Attach
    Detached { was_attached: bool },
    SetpointQueued(f32),
    /// Setpoint-Queue voll, Client muss erneut schreiben
    SetpointDropped(f32),
}

/// Verarbeitet Session-Events vom Transport
pub struct SessionController<'a, M: RawMutex, A> {
    state: &'a ConnectionState,
    setpoints: &'a SetpointQueue<M>,
    advertiser: A,
}

impl<'a, M: RawMutex, A: Advertiser> SessionController<'a, M, A> {
    pub fn new(state: &'a ConnectionState, setpoints: &'a SetpointQueue<M>, advertiser: A) -> Self {
        Self {
            state,
            setpoints,
            advertiser,
        }
    }

    pub fn advertiser(&self) -> &A {
        &self.advertiser
    }

    /// Verarbeitet ein Event (blockiert nie)
    pub fn handle(&mut self, event: SessionEvent) -> SessionOutcome {
        match event {
            SessionEvent::Attached => SessionOutcome::Attached {
                session: self.state.attach(),
            },
            SessionEvent::Detached => {
                let was_attached = self.state.detach();
                // Immer neu advertisen, auch bei doppeltem Detach
                self.advertiser.start_advertising();
                SessionOutcome::Detached { was_attached }
            }
            SessionEvent::SetpointWritten(value) => {
                if self.setpoints.offer(value) {
                    SessionOutcome::SetpointQueued(value)
                } else {
                    SessionOutcome::SetpointDropped(value)
                }
            }
        }
    }

    /// Endlosschleife über den Event-Channel
    pub async fn run<R: FnMut(&SessionOutcome)>(
        &mut self,
        events: &SessionEvents<M>,
        mut report: R,
    ) -> ! {
        loop {
            let event = events.receive().await;
            let outcome = self.handle(event);
            report(&outcome);
        }
    }
}

/// Ergebnis einer weitergeleiteten (oder verworfenen) Benachrichtigung
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayOutcome {
    Delivered {
        notification: Notification,
        /// Sollwert der einem neuen Client vorab gesendet wurde
        greeting: Option<f32>,
    },
    /// Kein Client verbunden
    Discarded(Notification),
    SinkFailed(Notification, SinkError),
}

/// Leitet Messwerte und Sollwert-Bestätigungen an den Client weiter
///
/// Einziger Wartepunkt ist `step()`: blockiert bis ein Messwert oder eine
/// Sollwert-Bestätigung vorliegt.
pub struct NotificationRelay<'a, M: RawMutex, K> {
    state: &'a ConnectionState,
    readings: &'a ReadingQueue<M>,
    setpoint_echo: &'a SetpointEcho<M>,
    sink: K,
    last_setpoint: Option<f32>,
    greeted_session: u32,
}

impl<'a, M: RawMutex, K: NotificationSink> NotificationRelay<'a, M, K> {
    pub fn new(
        state: &'a ConnectionState,
        readings: &'a ReadingQueue<M>,
        setpoint_echo: &'a SetpointEcho<M>,
        sink: K,
    ) -> Self {
        Self {
            state,
            readings,
            setpoint_echo,
            sink,
            last_setpoint: None,
            greeted_session: 0,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Zuletzt bestätigter Sollwert (lesbarer Sollwert für neue Clients)
    pub fn last_setpoint(&self) -> Option<f32> {
        self.last_setpoint
    }

    /// Wartet auf das nächste Element und leitet es weiter
    pub async fn step(&mut self) -> RelayOutcome {
        let next = select(self.readings.receive(), self.setpoint_echo.wait()).await;
        let notification = match next {
            Either::First(celsius) => Notification::Reading(celsius),
            Either::Second(setpoint) => {
                self.last_setpoint = Some(setpoint);
                Notification::SetpointEcho(setpoint)
            }
        };
        self.forward(notification).await
    }

    /// Sendet `notification` falls ein Client verbunden ist
    pub async fn forward(&mut self, notification: Notification) -> RelayOutcome {
        if !self.state.is_attached() {
            return RelayOutcome::Discarded(notification);
        }

        // Neuer Client: zuerst den aktuellen Sollwert senden.
        // Die Session gilt erst als begrüßt, wenn ein Sollwert tatsächlich
        // beim Client angekommen ist.
        let mut greeting = None;
        let session = self.state.session();
        if session != self.greeted_session {
            if let (Notification::Reading(_), Some(setpoint)) = (notification, self.last_setpoint)
            {
                if let Err(e) = self.sink.notify(Notification::SetpointEcho(setpoint)).await {
                    return RelayOutcome::SinkFailed(notification, e);
                }
                self.greeted_session = session;
                greeting = Some(setpoint);
            }
        }

        match self.sink.notify(notification).await {
            Ok(()) => {
                if let Notification::SetpointEcho(_) = notification {
                    self.greeted_session = session;
                }
                RelayOutcome::Delivered {
                    notification,
                    greeting,
                }
            }
            Err(e) => RelayOutcome::SinkFailed(notification, e),
        }
    }

    /// Endlosschleife; `report` bekommt jedes Ergebnis (Logging)
    pub async fn run<R: FnMut(&RelayOutcome)>(&mut self, mut report: R) -> ! {
        loop {
            let outcome = self.step().await;
            report(&outcome);
        }
    }
}
