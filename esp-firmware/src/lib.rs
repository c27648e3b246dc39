// Library-Root: Wiederverwendbare Logik und Module
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;
pub mod web;

// Re-exports von esp-core
pub use esp_core::{FanDuty, Notification, SessionEvent, TemperatureSample};

use core::sync::atomic::{AtomicBool, Ordering};

// Embassy Channel-Typen
// CriticalSectionRawMutex statt NoopRawMutex: der Control Task läuft auf
// dem Interrupt-Executor (höhere Priorität), alle anderen im Thread-Modus
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use esp_core::LossyChannel;

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Statt:  esp_core::SetpointQueue<CriticalSectionRawMutex>
// Nutze:  SetpointQueue

/// Setpoint-Queue (Communication → Control), Kapazität 2
pub type SetpointQueue = esp_core::SetpointQueue<CriticalSectionRawMutex>;

/// Reading-Queue (Control → Communication), Kapazität 5
pub type ReadingQueue = esp_core::ReadingQueue<CriticalSectionRawMutex>;

/// Bestätigter Sollwert (Control → Relay)
pub type SetpointEcho = esp_core::SetpointEcho<CriticalSectionRawMutex>;

/// Session-Events (HTTP/WebSocket → Session Task)
pub type SessionEvents = esp_core::SessionEvents<CriticalSectionRawMutex>;

/// Kapazität des Ausgangspuffers zum WebSocket
pub const OUTBOX_CAPACITY: usize = 4;

/// Ausgangspuffer (Relay Task → WebSocket-Handler)
pub type Outbox = LossyChannel<CriticalSectionRawMutex, Notification, OUTBOX_CAPACITY>;

/// Startet einen neuen mDNS-Announce-Burst (Advertising)
pub type AdvertiseSignal = Signal<CriticalSectionRawMutex, ()>;

/// Genau ein WebSocket-Client gleichzeitig
///
/// `try_claim()` schlägt fehl solange ein anderer Client verbunden ist,
/// der HTTP-Task antwortet dann mit 503.
pub struct ClientSlot {
    taken: AtomicBool,
}

impl ClientSlot {
    pub const fn new() -> Self {
        Self {
            taken: AtomicBool::new(false),
        }
    }

    pub fn try_claim(&self) -> bool {
        self.taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.taken.store(false, Ordering::Release);
    }
}

impl Default for ClientSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Alle Kanäle zwischen den Tasks, einmalig in main() per StaticCell angelegt
pub struct SharedChannels {
    pub setpoints: SetpointQueue,
    pub readings: ReadingQueue,
    pub setpoint_echo: SetpointEcho,
    pub session_events: SessionEvents,
    pub outbox: Outbox,
    pub advertise: AdvertiseSignal,
    pub connection: esp_core::ConnectionState,
    pub client_slot: ClientSlot,
}

impl SharedChannels {
    pub const fn new() -> Self {
        Self {
            setpoints: SetpointQueue::new(),
            readings: ReadingQueue::new(),
            setpoint_echo: SetpointEcho::new(),
            session_events: SessionEvents::new(),
            outbox: Outbox::new(),
            advertise: AdvertiseSignal::new(),
            connection: esp_core::ConnectionState::new(),
            client_slot: ClientSlot::new(),
        }
    }
}

impl Default for SharedChannels {
    fn default() -> Self {
        Self::new()
    }
}
