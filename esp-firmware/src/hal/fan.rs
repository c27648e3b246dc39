// Lüfter-Treiber über LEDC PWM (Low-Speed Timer 0 / Kanal 0)

use esp_hal::gpio::DriveMode;
use esp_hal::gpio::interconnect::PeripheralOutput;
use esp_hal::ledc::{
    LSGlobalClkSource, Ledc, LowSpeed,
    channel::{self as ledc_channel, ChannelHW as _, ChannelIFace as _},
    timer::{self as ledc_timer, TimerIFace as _},
};
use esp_hal::peripherals::LEDC;
use esp_hal::time::Rate;
use static_cell::StaticCell;

use esp_core::{FanDriver, FanDuty, FanError};

use crate::config::FAN_PWM_FREQUENCY_KHZ;

// Der Kanal hält eine Referenz auf den Timer, daher 'static
static FAN_TIMER: StaticCell<ledc_timer::Timer<'static, LowSpeed>> = StaticCell::new();

/// Fehler beim Einrichten des LEDC
#[derive(Debug)]
pub enum FanInitError {
    Timer(ledc_timer::Error),
    Channel(ledc_channel::Error),
}

/// PWM-Lüfter, Duty 0-255 wird direkt ins 8-Bit Duty-Register geschrieben
pub struct LedcFan {
    channel: ledc_channel::Channel<'static, LowSpeed>,
}

impl LedcFan {
    /// Konfiguriert Timer + Kanal und startet mit Duty 0 (Lüfter aus)
    ///
    /// Darf nur einmal aufgerufen werden (statischer Timer).
    pub fn new(
        ledc_peripheral: LEDC<'static>,
        pin: impl PeripheralOutput<'static>,
    ) -> Result<Self, FanInitError> {
        let mut ledc = Ledc::new(ledc_peripheral);
        ledc.set_global_slow_clock(LSGlobalClkSource::APBClk);

        let mut timer = ledc.timer::<LowSpeed>(ledc_timer::Number::Timer0);
        timer
            .configure(ledc_timer::config::Config {
                duty: ledc_timer::config::Duty::Duty8Bit,
                clock_source: ledc_timer::LSClockSource::APBClk,
                frequency: Rate::from_khz(FAN_PWM_FREQUENCY_KHZ),
            })
            .map_err(FanInitError::Timer)?;
        let timer = FAN_TIMER.init(timer);

        let mut channel = ledc.channel::<LowSpeed>(ledc_channel::Number::Channel0, pin);
        channel
            .configure(ledc_channel::config::Config {
                timer: &*timer,
                duty_pct: 0,
                drive_mode: DriveMode::PushPull,
            })
            .map_err(FanInitError::Channel)?;

        Ok(Self { channel })
    }
}

impl FanDriver for LedcFan {
    fn set_duty(&mut self, duty: FanDuty) -> Result<(), FanError> {
        // Timer läuft mit 8 Bit, FanDuty deckt genau den Registerbereich ab
        self.channel.set_duty_hw(u32::from(duty.raw()));
        Ok(())
    }
}
