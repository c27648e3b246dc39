//! Control Task: Messen → Regeln → Stellen
//!
//! Die Schleife läuft auf festem Raster und hängt nie vom Communication
//! Task ab. Einzige Wartepunkte: Sensor-Wandlung und Zyklus-Schlaf.

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::logic::{ControlParams, compute_duty};
use crate::queue::{ReadingQueue, SetpointEcho, SetpointQueue};
use crate::schedule::FixedRateSchedule;
use crate::traits::{Clock, FanDriver, FanError, TemperatureSensor};
use crate::types::{DEFAULT_SETPOINT, FanDuty, TemperatureSample};

/// Zeitparameter des Regelzyklus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleTiming {
    /// Periode des Rasters, muss >= Wandlungszeit des Sensors sein
    pub period_ms: u64,
    /// Wartezeit nach "Sensor getrennt" bis zum nächsten Versuch
    pub recovery_ms: u64,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            recovery_ms: 1000,
        }
    }
}

/// Channels die der Control Task mit dem Communication Task teilt
pub struct ControlChannels<'a, M: RawMutex> {
    /// Eingehende Sollwerte (Communication → Control)
    pub setpoints: &'a SetpointQueue<M>,
    /// Ausgehende Messwerte (Control → Communication)
    pub readings: &'a ReadingQueue<M>,
    /// Bestätigung geänderter Sollwerte
    pub setpoint_echo: &'a SetpointEcho<M>,
}

/// Was in einem Zyklus passiert ist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    /// Neuer Sollwert, falls in diesem Zyklus einer übernommen wurde
    pub new_setpoint: Option<f32>,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    /// Messwert gültig, Lüfter gestellt
    Actuated {
        sample: f32,
        duty: FanDuty,
        fan_fault: Option<FanError>,
        /// `false` wenn die Reading-Queue voll war
        forwarded: bool,
    },
    /// Sensor getrennt: kein Stellbefehl, letzter Wert bleibt aktiv
    SensorUnavailable { held: FanDuty },
}

/// Regelschleife mit eigenem Sollwert
///
/// Der Sollwert gehört exklusiv dieser Schleife; andere Tasks ändern ihn
/// nur über die Setpoint-Queue.
pub struct ControlLoop<'a, M: RawMutex, S, F, C> {
    sensor: S,
    fan: F,
    clock: C,
    params: ControlParams,
    timing: CycleTiming,
    schedule: FixedRateSchedule,
    setpoint: f32,
    last_duty: FanDuty,
    channels: ControlChannels<'a, M>,
}

impl<'a, M, S, F, C> ControlLoop<'a, M, S, F, C>
where
    M: RawMutex,
    S: TemperatureSensor,
    F: FanDriver,
    C: Clock,
{
    pub fn new(
        sensor: S,
        fan: F,
        clock: C,
        params: ControlParams,
        timing: CycleTiming,
        channels: ControlChannels<'a, M>,
    ) -> Self {
        let schedule = FixedRateSchedule::new(clock.now_ms(), timing.period_ms);
        Self {
            sensor,
            fan,
            clock,
            params,
            timing,
            schedule,
            setpoint: DEFAULT_SETPOINT,
            last_duty: FanDuty::OFF,
            channels,
        }
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    /// Zuletzt erfolgreich gestellter Duty-Wert
    pub fn last_duty(&self) -> FanDuty {
        self.last_duty
    }

    pub fn fan(&self) -> &F {
        &self.fan
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Veröffentlicht den aktuellen Sollwert (z.B. beim Start)
    pub fn announce_setpoint(&self) {
        self.channels.setpoint_echo.signal(self.setpoint);
    }

    /// Ein Zyklus ohne Schlaf
    pub async fn cycle(&mut self) -> CycleOutcome {
        // 1. Höchstens einen neuen Sollwert übernehmen (non-blocking)
        let new_setpoint = self.channels.setpoints.poll();
        if let Some(setpoint) = new_setpoint {
            self.setpoint = setpoint;
            self.channels.setpoint_echo.signal(setpoint);
        }

        // 2. Sensor lesen
        let sample = match self.sensor.request_reading().await {
            TemperatureSample::Celsius(value) => value,
            TemperatureSample::Disconnected => {
                return CycleOutcome {
                    new_setpoint,
                    action: ControlAction::SensorUnavailable {
                        held: self.last_duty,
                    },
                };
            }
        };

        // 3./4. Stellwert berechnen und ausgeben
        let duty = compute_duty(sample, self.setpoint, &self.params);
        let fan_fault = self.fan.set_duty(duty).err();
        if fan_fault.is_none() {
            self.last_duty = duty;
        }

        // 5. Messwert weiterreichen, volle Queue verwirft ihn
        let forwarded = self.channels.readings.offer(sample);

        CycleOutcome {
            new_setpoint,
            action: ControlAction::Actuated {
                sample,
                duty,
                fan_fault,
                forwarded,
            },
        }
    }

    /// Schläft bis zum nächsten Zyklus
    ///
    /// Nach "Sensor getrennt" wird eine volle Recovery-Zeit gewartet und das
    /// Raster danach neu aufgesetzt.
    pub async fn wait_next(&mut self, outcome: &CycleOutcome) {
        let now = self.clock.now_ms();
        match outcome.action {
            ControlAction::SensorUnavailable { .. } => {
                let retry_at = now + self.timing.recovery_ms;
                self.clock.sleep_until(retry_at).await;
                self.schedule.realign(retry_at);
            }
            ControlAction::Actuated { .. } => {
                let deadline = self.schedule.advance(now);
                self.clock.sleep_until(deadline).await;
            }
        }
    }

    /// Endlosschleife; `report` bekommt jedes Zyklus-Ergebnis (Logging)
    pub async fn run<R: FnMut(&CycleOutcome)>(&mut self, mut report: R) -> ! {
        self.announce_setpoint();
        loop {
            let outcome = self.cycle().await;
            report(&outcome);
            self.wait_next(&outcome).await;
        }
    }
}
