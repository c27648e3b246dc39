//! Pure Business Logic Functions
//!
//! Regelgesetz, Payload-Parsing und Formatierung - ohne Hardware-Dependencies (testbar!)

use core::fmt::Write;

use heapless::String;

use crate::types::FanDuty;

/// Parameter des P-Reglers
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlParams {
    /// Proportional-Verstärkung (Duty pro °C Regelabweichung)
    pub kp: f32,
    /// Anlauf-Minimum: darunter läuft der Lüfter nicht zuverlässig an
    pub duty_min: u8,
    /// Obergrenze (8-Bit Auflösung)
    pub duty_max: u8,
    /// Regelabweichung bis zu der der Lüfter aus bleibt (0.0 = kein Totband)
    ///
    /// Negative Werte wirken wie 0.0: am oder unter dem Sollwert bleibt der
    /// Lüfter immer aus.
    pub dead_band: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            kp: 50.0,
            duty_min: 60,
            duty_max: u8::MAX,
            dead_band: 0.0,
        }
    }
}

/// Berechnet den Lüfter-Stellwert aus Messwert und Sollwert
///
/// Reiner P-Regler mit Anlauf-Minimum, kein I- oder D-Anteil.
///
/// # Beispiele
///
/// ```
/// # use esp_core::{ControlParams, FanDuty, compute_duty};
/// let params = ControlParams::default();
/// assert_eq!(compute_duty(28.0, 25.0, &params), FanDuty(150));
/// assert_eq!(compute_duty(24.0, 25.0, &params), FanDuty::OFF);
/// ```
pub fn compute_duty(sample: f32, setpoint: f32, params: &ControlParams) -> FanDuty {
    let error = sample - setpoint;
    // NaN-Messwerte schalten ebenfalls aus
    if error.is_nan() || error <= params.dead_band.max(0.0) {
        return FanDuty::OFF;
    }

    let duty_calc = error * params.kp;
    let duty = duty_calc
        .max(f32::from(params.duty_min))
        .min(f32::from(params.duty_max));
    FanDuty(duty as u8)
}

/// Zulässiger Bereich für vom Client geschriebene Sollwerte
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetpointLimits {
    pub min: f32,
    pub max: f32,
}

impl Default for SetpointLimits {
    /// Messbereich des DS18B20
    fn default() -> Self {
        Self {
            min: -55.0,
            max: 125.0,
        }
    }
}

/// Fehler beim Parsen eines Sollwert-Payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    Empty,
    NotUtf8,
    NotANumber,
    OutOfRange,
}

/// Parst einen vom Client geschriebenen Sollwert ("22.5")
///
/// Führende/abschließende Leerzeichen und NUL-Bytes werden ignoriert.
/// `nan`/`inf` und Werte außerhalb von `limits` werden abgelehnt.
pub fn parse_setpoint(payload: &[u8], limits: &SetpointLimits) -> Result<f32, PayloadError> {
    let text = core::str::from_utf8(payload).map_err(|_| PayloadError::NotUtf8)?;
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.is_empty() {
        return Err(PayloadError::Empty);
    }

    let value: f32 = text.parse().map_err(|_| PayloadError::NotANumber)?;
    if !value.is_finite() {
        return Err(PayloadError::NotANumber);
    }
    if value < limits.min || value > limits.max {
        return Err(PayloadError::OutOfRange);
    }
    Ok(value)
}

/// Textdarstellung mit zwei Nachkommastellen
pub type DecimalText = String<16>;

/// Formatiert einen Wert mit zwei Nachkommastellen ("22.50")
pub fn format_two_decimals(value: f32) -> DecimalText {
    let mut text = DecimalText::new();
    // 16 Zeichen reichen für jeden Wert im Sensorbereich
    if write!(text, "{:.2}", value).is_err() {
        text.clear();
        let _ = text.push_str("ERR");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_off_at_setpoint() {
        let params = ControlParams::default();
        assert_eq!(compute_duty(25.0, 25.0, &params), FanDuty::OFF);
    }

    #[test]
    fn test_duty_floor_applies_to_small_overshoot() {
        let params = ControlParams::default();
        assert_eq!(compute_duty(25.01, 25.0, &params), FanDuty(60));
    }

    #[test]
    fn test_duty_exact_floor_boundary() {
        // 1.2 * 50 = 60 → genau duty_min
        let params = ControlParams::default();
        assert_eq!(compute_duty(1.2, 0.0, &params), FanDuty(60));
    }

    #[test]
    fn test_duty_saturates() {
        let params = ControlParams::default();
        assert_eq!(compute_duty(40.0, 25.0, &params), FanDuty::MAX);
    }

    #[test]
    fn test_dead_band_keeps_fan_off() {
        let params = ControlParams {
            dead_band: 0.5,
            ..ControlParams::default()
        };
        assert_eq!(compute_duty(25.4, 25.0, &params), FanDuty::OFF);
        assert_eq!(compute_duty(25.6, 25.0, &params), FanDuty(60));
    }

    #[test]
    fn test_negative_dead_band_keeps_fan_off_at_or_below_setpoint() {
        let params = ControlParams {
            dead_band: -1.0,
            ..ControlParams::default()
        };
        assert_eq!(compute_duty(24.5, 25.0, &params), FanDuty::OFF);
        assert_eq!(compute_duty(25.0, 25.0, &params), FanDuty::OFF);
        assert_eq!(compute_duty(26.0, 25.0, &params), FanDuty(60));
    }

    #[test]
    fn test_nan_sample_turns_fan_off() {
        let params = ControlParams::default();
        assert_eq!(compute_duty(f32::NAN, 25.0, &params), FanDuty::OFF);
    }

    #[test]
    fn test_parse_setpoint_accepts_decimal() {
        let limits = SetpointLimits::default();
        assert_eq!(parse_setpoint(b"22.5", &limits), Ok(22.5));
        assert_eq!(parse_setpoint(b" 30 \0", &limits), Ok(30.0));
        assert_eq!(parse_setpoint(b"-4.25", &limits), Ok(-4.25));
    }

    #[test]
    fn test_parse_setpoint_rejects_garbage() {
        let limits = SetpointLimits::default();
        assert_eq!(parse_setpoint(b"", &limits), Err(PayloadError::Empty));
        assert_eq!(parse_setpoint(b"  ", &limits), Err(PayloadError::Empty));
        assert_eq!(parse_setpoint(b"warm", &limits), Err(PayloadError::NotANumber));
        assert_eq!(parse_setpoint(b"22.5abc", &limits), Err(PayloadError::NotANumber));
        assert_eq!(parse_setpoint(b"nan", &limits), Err(PayloadError::NotANumber));
        assert_eq!(parse_setpoint(b"inf", &limits), Err(PayloadError::NotANumber));
        assert_eq!(parse_setpoint(&[0xff, 0xfe], &limits), Err(PayloadError::NotUtf8));
    }

    #[test]
    fn test_parse_setpoint_limits() {
        let limits = SetpointLimits::default();
        assert_eq!(parse_setpoint(b"126", &limits), Err(PayloadError::OutOfRange));
        assert_eq!(parse_setpoint(b"-56", &limits), Err(PayloadError::OutOfRange));
        assert_eq!(parse_setpoint(b"125", &limits), Ok(125.0));
    }

    #[test]
    fn test_format_two_decimals() {
        assert_eq!(format_two_decimals(22.5).as_str(), "22.50");
        assert_eq!(format_two_decimals(26.0).as_str(), "26.00");
        assert_eq!(format_two_decimals(-3.1).as_str(), "-3.10");
        assert_eq!(format_two_decimals(23.456).as_str(), "23.46");
    }
}
