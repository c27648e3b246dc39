//! Message-Passing zwischen den Tasks
//!
//! - `LossyChannel`: begrenzte FIFO-Queue, Senden blockiert nie
//! - `ConnectionState`: atomares "Client verbunden"-Flag

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_sync::signal::Signal;

use crate::types::SessionEvent;

/// Kapazität der Setpoint-Queue (Communication → Control)
pub const SETPOINT_QUEUE_CAPACITY: usize = 2;

/// Kapazität der Reading-Queue (Control → Communication)
pub const READING_QUEUE_CAPACITY: usize = 5;

/// Kapazität des Session-Event-Channels (Transport → Session)
pub const SESSION_EVENT_CAPACITY: usize = 4;

pub type SetpointQueue<M> = LossyChannel<M, f32, SETPOINT_QUEUE_CAPACITY>;

pub type ReadingQueue<M> = LossyChannel<M, f32, READING_QUEUE_CAPACITY>;

/// Letzter bestätigter Sollwert (neuer Wert überschreibt alten)
pub type SetpointEcho<M> = Signal<M, f32>;

/// Session-Events dürfen nicht verloren gehen (sonst bleibt der Zustand
/// hängen), daher normaler Channel statt `LossyChannel`
pub type SessionEvents<M> = Channel<M, SessionEvent, SESSION_EVENT_CAPACITY>;

/// Begrenzter Channel mit Drop-Newest-Policy
///
/// `offer()` versucht einzureihen und meldet per `bool` ob es geklappt hat.
/// Bei voller Queue wird der neue Wert verworfen und gezählt - der Sender
/// wartet nie. Nur `receive()` blockiert (auf der Empfängerseite).
pub struct LossyChannel<M: RawMutex, T, const N: usize> {
    channel: Channel<M, T, N>,
    dropped: AtomicU32,
}

impl<M: RawMutex, T, const N: usize> LossyChannel<M, T, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Nicht-blockierendes Einreihen
    ///
    /// Gibt `false` zurück wenn die Queue voll war und `value` verworfen wurde.
    pub fn offer(&self, value: T) -> bool {
        match self.channel.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Nicht-blockierendes Entnehmen (höchstens ein Element)
    pub fn poll(&self) -> Option<T> {
        self.channel.try_receive().ok()
    }

    /// Wartet bis ein Element verfügbar ist
    pub async fn receive(&self) -> T {
        self.channel.receive().await
    }

    /// Anzahl bisher verworfener Elemente
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<M: RawMutex, T, const N: usize> Default for LossyChannel<M, T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// "Client verbunden"-Flag
///
/// Wird von den Session-Events geschrieben und vom Relay vor jeder
/// Benachrichtigung gelesen. Ein um einen Zyklus veralteter Wert ist
/// zulässig (verpasste Benachrichtigung ist nicht sicherheitskritisch).
///
/// Zusätzlich wird jede Verbindung durchnummeriert, damit das Relay einen
/// neuen Client auch dann erkennt wenn Trennen und Verbinden zwischen zwei
/// Messwerten passieren.
pub struct ConnectionState {
    attached: AtomicBool,
    session: AtomicU32,
}

impl ConnectionState {
    /// Startzustand: Disconnected
    pub const fn new() -> Self {
        Self {
            attached: AtomicBool::new(false),
            session: AtomicU32::new(0),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Nummer der letzten Verbindung (0 = noch nie verbunden)
    pub fn session(&self) -> u32 {
        self.session.load(Ordering::Acquire)
    }

    /// Disconnected → Connected, gibt die neue Session-Nummer zurück
    pub fn attach(&self) -> u32 {
        let session = self.session.fetch_add(1, Ordering::AcqRel).wrapping_add(1);
        self.attached.store(true, Ordering::Release);
        session
    }

    /// Connected → Disconnected, gibt `true` zurück wenn vorher verbunden
    pub fn detach(&self) -> bool {
        self.attached.swap(false, Ordering::AcqRel)
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_offer_drops_newest_when_full() {
        let queue: LossyChannel<NoopRawMutex, u32, 2> = LossyChannel::new();
        assert!(queue.offer(1));
        assert!(queue.offer(2));
        assert!(!queue.offer(3));
        assert_eq!(queue.dropped(), 1);

        // FIFO, der verworfene Wert taucht nicht auf
        assert_eq!(queue.poll(), Some(1));
        assert_eq!(queue.poll(), Some(2));
        assert_eq!(queue.poll(), None);
    }

    #[test]
    fn test_offer_after_drain_succeeds_again() {
        let queue: LossyChannel<NoopRawMutex, u32, 1> = LossyChannel::new();
        assert!(queue.offer(1));
        assert!(!queue.offer(2));
        assert_eq!(queue.poll(), Some(1));
        assert!(queue.offer(3));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn test_receive_returns_queued_value() {
        let queue: LossyChannel<NoopRawMutex, f32, 5> = LossyChannel::new();
        queue.offer(21.5);
        let value = embassy_futures::block_on(queue.receive());
        assert_eq!(value, 21.5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_connection_state_starts_disconnected() {
        let state = ConnectionState::new();
        assert!(!state.is_attached());
        assert_eq!(state.session(), 0);

        assert_eq!(state.attach(), 1);
        assert!(state.is_attached());
        assert!(state.detach());
        assert!(!state.is_attached());

        // Doppeltes Trennen ist harmlos
        assert!(!state.detach());
        assert_eq!(state.attach(), 2);
    }
}
