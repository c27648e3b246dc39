// Control Task - Messen, Regeln, Lüfter stellen
//
// Läuft auf dem Interrupt-Executor und unterbricht damit die
// Netzwerk-Tasks. Kommuniziert ausschließlich über die Queues.

use defmt::{error, info, warn};
use esp_hal::gpio::Flex;
use esp_hal::peripherals::{GPIO4, GPIO5, LEDC};

use esp_core::{ControlAction, ControlChannels, ControlLoop, CycleOutcome};

use crate::SharedChannels;
use crate::config::{cycle_timing, control_params};
use crate::hal::{Ds18b20Sensor, EmbassyClock, LedcFan};

/// Control Task
///
/// Richtet Sensor (GPIO4) und Lüfter (GPIO5) ein und läuft danach endlos
/// im festen 1-Sekunden-Raster. Schlägt die LEDC-Konfiguration fehl,
/// endet der Task (ohne Lüfter ist keine Regelung möglich).
#[embassy_executor::task]
pub async fn control_task(
    sensor_pin: GPIO4<'static>,
    fan_pin: GPIO5<'static>,
    ledc: LEDC<'static>,
    shared: &'static SharedChannels,
) {
    info!("Control: Task starting");

    let fan = match LedcFan::new(ledc, fan_pin) {
        Ok(fan) => fan,
        Err(e) => {
            error!("Control: Fan PWM setup failed: {}", defmt::Debug2Format(&e));
            return;
        }
    };
    let sensor = Ds18b20Sensor::new(Flex::new(sensor_pin));

    let params = control_params();
    let timing = cycle_timing();
    info!(
        "Control: kp={}, duty_min={}, duty_max={}, dead_band={}, period={}ms",
        params.kp, params.duty_min, params.duty_max, params.dead_band, timing.period_ms
    );

    let channels = ControlChannels {
        setpoints: &shared.setpoints,
        readings: &shared.readings,
        setpoint_echo: &shared.setpoint_echo,
    };

    let mut control = ControlLoop::new(sensor, fan, EmbassyClock, params, timing, channels);
    control
        .run(|outcome| log_cycle(outcome, shared))
        .await
}

/// Loggt das Ergebnis eines Zyklus
fn log_cycle(outcome: &CycleOutcome, shared: &SharedChannels) {
    if let Some(setpoint) = outcome.new_setpoint {
        info!("Control: Setpoint changed to {}", setpoint);
    }

    match outcome.action {
        ControlAction::Actuated {
            sample,
            duty,
            fan_fault,
            forwarded,
        } => {
            info!("Control: Temp {} C -> duty {}", sample, duty);
            if let Some(fault) = fan_fault {
                warn!("Control: Fan write failed: {}", fault);
            }
            if !forwarded {
                warn!(
                    "Control: Reading queue full, sample dropped ({} total)",
                    shared.readings.dropped()
                );
            }
        }
        ControlAction::SensorUnavailable { held } => {
            warn!("Control: Sensor disconnected, holding duty {}", held);
        }
    }
}
