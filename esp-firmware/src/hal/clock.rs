// Zeitbasis für den Regelzyklus über embassy-time

use embassy_time::{Instant, Timer};

use esp_core::Clock;

/// Millisekunden seit Boot, Schlafen bis zu absoluten Zeitpunkten
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn sleep_until(&mut self, deadline_ms: u64) {
        Timer::at(Instant::from_millis(deadline_ms)).await;
    }
}
