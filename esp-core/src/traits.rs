//! Hardware Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen zu den externen Kollaborateuren
//! (Sensor, Lüfter, Zeitbasis, Funk-Transport) ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** Ds18b20Sensor, LedcFan, EmbassyClock, MdnsAdvertiser, WsNotifier (esp-firmware)
//! - **Testing:** Mocks in esp-tests

use crate::types::{FanDuty, Notification, TemperatureSample};

/// Fehler-Typ für Lüfter-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FanError {
    WriteFailed,
}

/// Fehler-Typ für ausgehende Benachrichtigungen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SinkError {
    /// Kein Empfänger mehr vorhanden
    Closed,
    /// Ausgangspuffer des Transports voll, Nachricht verworfen
    Busy,
}

/// Trait für den Temperatursensor
///
/// Löst eine Wandlung aus und liefert das Ergebnis. Die Latenz ist
/// begrenzt (DS18B20: max. 750 ms bei 12 Bit).
#[allow(async_fn_in_trait)]
pub trait TemperatureSensor {
    async fn request_reading(&mut self) -> TemperatureSample;
}

/// Trait für den Lüfter-Treiber (PWM)
pub trait FanDriver {
    /// Setzt den Duty-Wert (0-255)
    ///
    /// # Fehlerbehandlung
    /// Gibt `FanError::WriteFailed` zurück wenn das Peripheral den Wert ablehnt
    fn set_duty(&mut self, duty: FanDuty) -> Result<(), FanError>;
}

/// Zeitbasis für den Regelzyklus
///
/// Alle Zeiten in Millisekunden seit Systemstart. In Tests durch eine
/// virtuelle Uhr ersetzt.
#[allow(async_fn_in_trait)]
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// Schläft bis zum absoluten Zeitpunkt `deadline_ms`
    async fn sleep_until(&mut self, deadline_ms: u64);
}

/// Macht das Gerät für neue Clients auffindbar
pub trait Advertiser {
    fn start_advertising(&mut self);
}

/// Ausgang für Benachrichtigungen an den verbundenen Client
#[allow(async_fn_in_trait)]
pub trait NotificationSink {
    async fn notify(&mut self, notification: Notification) -> Result<(), SinkError>;
}
