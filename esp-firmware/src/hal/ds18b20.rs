// DS18B20 Temperatursensor über 1-Wire (Bit-Banging)
//
// Ein einzelner Sensor am Bus, daher Skip ROM statt ROM-Suche.
// Die Zeitschlitze sind kurz (µs) und werden mit Delay + Critical Section
// erzeugt, die 750 ms Wandlungszeit wird async abgewartet.

use defmt::debug;
use embassy_time::{Duration, Timer};
use esp_hal::delay::Delay;
use esp_hal::gpio::{DriveMode, Flex, OutputConfig, Pull};

use esp_core::onewire::{CMD_CONVERT_T, CMD_READ_SCRATCHPAD, CMD_SKIP_ROM};
use esp_core::{SCRATCHPAD_LEN, TemperatureSample, TemperatureSensor, decode_scratchpad};

use crate::config::SENSOR_CONVERSION_MS;

/// Fehler auf dem 1-Wire Bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum SensorBusError {
    /// Kein Presence-Puls nach Reset (Sensor fehlt oder Leitung offen)
    NoPresence,
    /// Leitung bleibt nach Reset low (Kurzschluss nach GND)
    BusStuckLow,
}

// Standard-Speed Timing in µs (Datenblatt DS18B20, Tabelle "1-Wire Timing")
const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const SLOT_START_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;
const READ_SAMPLE_US: u32 = 9;
const READ_RELEASE_US: u32 = 55;

/// DS18B20 an einem Open-Drain GPIO (externer 4.7 kΩ Pull-Up)
pub struct Ds18b20Sensor<'d> {
    pin: Flex<'d>,
    delay: Delay,
}

impl<'d> Ds18b20Sensor<'d> {
    pub fn new(mut pin: Flex<'d>) -> Self {
        pin.apply_output_config(
            &OutputConfig::default()
                .with_drive_mode(DriveMode::OpenDrain)
                .with_pull(Pull::None),
        );
        pin.set_input_enable(true);
        pin.set_output_enable(true);
        pin.set_high();

        Self {
            pin,
            delay: Delay::new(),
        }
    }

    /// Reset-Puls senden und auf Presence-Puls prüfen
    fn reset(&mut self) -> Result<(), SensorBusError> {
        let presence = critical_section::with(|_| {
            self.pin.set_low();
            self.delay.delay_micros(RESET_LOW_US);
            self.pin.set_high();
            self.delay.delay_micros(PRESENCE_SAMPLE_US);
            let presence = self.pin.is_low();
            self.delay.delay_micros(RESET_RECOVERY_US);
            presence
        });

        if !presence {
            return Err(SensorBusError::NoPresence);
        }
        if self.pin.is_low() {
            return Err(SensorBusError::BusStuckLow);
        }
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) {
        critical_section::with(|_| {
            self.pin.set_low();
            if bit {
                self.delay.delay_micros(SLOT_START_US);
                self.pin.set_high();
                self.delay.delay_micros(WRITE_ONE_RELEASE_US);
            } else {
                self.delay.delay_micros(WRITE_ZERO_LOW_US);
                self.pin.set_high();
                self.delay.delay_micros(WRITE_ZERO_RELEASE_US);
            }
        });
    }

    fn read_bit(&mut self) -> bool {
        critical_section::with(|_| {
            self.pin.set_low();
            self.delay.delay_micros(SLOT_START_US);
            self.pin.set_high();
            self.delay.delay_micros(READ_SAMPLE_US);
            let bit = self.pin.is_high();
            self.delay.delay_micros(READ_RELEASE_US);
            bit
        })
    }

    /// LSB first
    fn write_byte(&mut self, byte: u8) {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0);
        }
    }

    fn read_byte(&mut self) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit() {
                byte |= 1 << i;
            }
        }
        byte
    }

    fn start_conversion(&mut self) -> Result<(), SensorBusError> {
        self.reset()?;
        self.write_byte(CMD_SKIP_ROM);
        self.write_byte(CMD_CONVERT_T);
        Ok(())
    }

    fn read_scratchpad(&mut self) -> Result<[u8; SCRATCHPAD_LEN], SensorBusError> {
        self.reset()?;
        self.write_byte(CMD_SKIP_ROM);
        self.write_byte(CMD_READ_SCRATCHPAD);

        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        for byte in scratchpad.iter_mut() {
            *byte = self.read_byte();
        }
        Ok(scratchpad)
    }
}

impl TemperatureSensor for Ds18b20Sensor<'_> {
    async fn request_reading(&mut self) -> TemperatureSample {
        if let Err(e) = self.start_conversion() {
            debug!("Sensor: Convert T failed: {}", e);
            return TemperatureSample::Disconnected;
        }

        Timer::after(Duration::from_millis(SENSOR_CONVERSION_MS)).await;

        match self.read_scratchpad() {
            Ok(scratchpad) => {
                let sample = decode_scratchpad(&scratchpad);
                if sample == TemperatureSample::Disconnected {
                    debug!("Sensor: Scratchpad rejected: {:02x}", scratchpad);
                }
                sample
            }
            Err(e) => {
                debug!("Sensor: Read Scratchpad failed: {}", e);
                TemperatureSample::Disconnected
            }
        }
    }
}
