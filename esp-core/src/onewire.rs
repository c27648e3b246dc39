//! DS18B20 Protokoll-Logik ohne Bus-Zugriff
//!
//! Der Firmware-Treiber liest die 9 Scratchpad-Bytes vom Bus, die
//! Auswertung (CRC, Rohwert → °C, Power-On-Erkennung) passiert hier.

use crate::types::TemperatureSample;

/// ROM-Kommando: alle Geräte am Bus ansprechen (nur ein Sensor angeschlossen)
pub const CMD_SKIP_ROM: u8 = 0xCC;

/// Funktions-Kommando: Temperaturwandlung starten
pub const CMD_CONVERT_T: u8 = 0x44;

/// Funktions-Kommando: Scratchpad lesen (9 Bytes inkl. CRC)
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;

pub const SCRATCHPAD_LEN: usize = 9;

/// Rohwert nach Power-On-Reset (85.0 °C)
const POWER_ON_RAW: i16 = 0x0550;

/// Reserviertes Byte 6 direkt nach Power-On, vor der ersten Wandlung
const POWER_ON_RESERVED: u8 = 0x0C;

/// Dallas/Maxim CRC-8 (Polynom x^8 + x^5 + x^4 + 1, LSB first)
///
/// Über alle 9 Scratchpad-Bytes gerechnet ergibt ein gültiger Block 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Wertet ein gelesenes Scratchpad aus
///
/// `Disconnected` bei CRC-Fehler, bei einem hängenden Bus (alle Bytes 0xFF
/// oder alle 0x00, die CRC wäre sonst zufällig gültig) und beim Power-On-Wert.
pub fn decode_scratchpad(scratchpad: &[u8; SCRATCHPAD_LEN]) -> TemperatureSample {
    let stuck = scratchpad.iter().all(|&b| b == 0xFF) || scratchpad.iter().all(|&b| b == 0x00);
    if stuck || crc8(scratchpad) != 0 {
        return TemperatureSample::Disconnected;
    }

    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    if raw == POWER_ON_RAW && scratchpad[6] == POWER_ON_RESERVED {
        return TemperatureSample::Disconnected;
    }

    // 12 Bit: 1/16 °C pro LSB
    TemperatureSample::Celsius(f32::from(raw) / 16.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratchpad(raw: i16, reserved: u8) -> [u8; SCRATCHPAD_LEN] {
        let [lo, hi] = raw.to_le_bytes();
        let mut pad = [lo, hi, 0x4B, 0x46, 0x7F, 0xFF, reserved, 0x10, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    #[test]
    fn test_crc8_check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn test_decode_datasheet_values() {
        assert_eq!(
            decode_scratchpad(&scratchpad(0x0191, 0x0F)),
            TemperatureSample::Celsius(25.0625)
        );
        assert_eq!(
            decode_scratchpad(&scratchpad(0xFF5Eu16 as i16, 0x02)),
            TemperatureSample::Celsius(-10.125)
        );
        assert_eq!(
            decode_scratchpad(&scratchpad(0x0000, 0x10)),
            TemperatureSample::Celsius(0.0)
        );
    }

    #[test]
    fn test_corrupted_crc_is_disconnected() {
        let mut pad = scratchpad(0x0191, 0x0F);
        pad[0] ^= 0x01;
        assert_eq!(decode_scratchpad(&pad), TemperatureSample::Disconnected);
    }

    #[test]
    fn test_stuck_bus_is_disconnected() {
        assert_eq!(
            decode_scratchpad(&[0xFF; SCRATCHPAD_LEN]),
            TemperatureSample::Disconnected
        );
        assert_eq!(
            decode_scratchpad(&[0x00; SCRATCHPAD_LEN]),
            TemperatureSample::Disconnected
        );
    }

    #[test]
    fn test_power_on_value_is_disconnected() {
        assert_eq!(
            decode_scratchpad(&scratchpad(POWER_ON_RAW, POWER_ON_RESERVED)),
            TemperatureSample::Disconnected
        );
        // Echte 85 °C nach einer Wandlung bleiben gültig
        assert_eq!(
            decode_scratchpad(&scratchpad(POWER_ON_RAW, 0x10)),
            TemperatureSample::Celsius(85.0)
        );
    }
}
