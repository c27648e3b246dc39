//! Core Types für die Lüfterregelung
//!
//! Datenstrukturen ohne Hardware-Dependencies

/// Standard-Sollwert in °C (gilt bis der Client einen neuen schreibt)
pub const DEFAULT_SETPOINT: f32 = 25.0;

/// Messwert eines Regelzyklus
///
/// Wird pro Zyklus einmal erzeugt und als Kopie in die Reading-Queue gelegt.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemperatureSample {
    /// Gültige Temperatur in °C
    Celsius(f32),
    /// Sensor antwortet nicht (kein Presence-Puls, CRC-Fehler, ...)
    Disconnected,
}

impl TemperatureSample {
    /// Liefert die Temperatur, falls der Sensor verbunden ist
    pub fn celsius(self) -> Option<f32> {
        match self {
            Self::Celsius(value) => Some(value),
            Self::Disconnected => None,
        }
    }
}

/// Stellwert für den Lüfter (8-Bit PWM, 0 = aus, 255 = Vollgas)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FanDuty(pub u8);

impl FanDuty {
    pub const OFF: Self = Self(0);
    pub const MAX: Self = Self(u8::MAX);

    pub fn raw(self) -> u8 {
        self.0
    }
}

/// Session-Events vom Transport an den Communication Task
///
/// Ersetzt die Callback-Methoden des Funk-Stacks durch ein einziges
/// Event-Enum, das über einen Channel zugestellt wird.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// Client hat sich verbunden
    Attached,
    /// Client hat die Verbindung getrennt
    Detached,
    /// Client hat einen (bereits geparsten) Sollwert geschrieben
    SetpointWritten(f32),
}

/// Ausgehende Benachrichtigung an den verbundenen Client
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Notification {
    /// Aktueller Messwert
    Reading(f32),
    /// Bestätigung eines geänderten Sollwerts
    SetpointEcho(f32),
}

impl Notification {
    pub fn value(self) -> f32 {
        match self {
            Self::Reading(value) | Self::SetpointEcho(value) => value,
        }
    }
}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for TemperatureSample {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            TemperatureSample::Celsius(value) => defmt::write!(fmt, "{=f32}°C", value),
            TemperatureSample::Disconnected => defmt::write!(fmt, "Disconnected"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FanDuty {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=u8}/255", self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SessionEvent {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SessionEvent::Attached => defmt::write!(fmt, "Attached"),
            SessionEvent::Detached => defmt::write!(fmt, "Detached"),
            SessionEvent::SetpointWritten(value) => {
                defmt::write!(fmt, "SetpointWritten({=f32})", value)
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Notification {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Notification::Reading(value) => defmt::write!(fmt, "Reading({=f32})", value),
            Notification::SetpointEcho(value) => defmt::write!(fmt, "SetpointEcho({=f32})", value),
        }
    }
}
