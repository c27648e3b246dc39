//! Fester Zeitplan für den Regelzyklus
//!
//! Weckzeiten liegen auf einem absoluten Raster T, T+P, T+2P, ...
//! Die Dauer der Sensor-Wandlung verschiebt das Raster nicht.

/// Absolutes Zeitraster mit fester Periode (Millisekunden)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRateSchedule {
    period_ms: u64,
    next_ms: u64,
}

impl FixedRateSchedule {
    /// Erstellt das Raster, erster Tick eine Periode nach `start_ms`
    pub fn new(start_ms: u64, period_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_ms: start_ms + period_ms,
        }
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Nächste geplante Weckzeit
    pub fn deadline(&self) -> u64 {
        self.next_ms
    }

    /// Liefert die aktuelle Weckzeit und schaltet das Raster weiter
    ///
    /// Liegt `now_ms` bereits hinter der Weckzeit (Überlauf), werden die
    /// verpassten Ticks übersprungen statt nachgeholt.
    pub fn advance(&mut self, now_ms: u64) -> u64 {
        if now_ms >= self.next_ms {
            let missed = (now_ms - self.next_ms) / self.period_ms + 1;
            self.next_ms += missed * self.period_ms;
        }
        let deadline = self.next_ms;
        self.next_ms += self.period_ms;
        deadline
    }

    /// Setzt das Raster neu auf, erster Tick eine Periode nach `start_ms`
    pub fn realign(&mut self, start_ms: u64) {
        self.next_ms = start_ms + self.period_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadlines_are_absolute() {
        let mut schedule = FixedRateSchedule::new(0, 1000);
        // Arbeit dauert unterschiedlich lang, Raster bleibt fest
        assert_eq!(schedule.advance(750), 1000);
        assert_eq!(schedule.advance(1800), 2000);
        assert_eq!(schedule.advance(2010), 3000);
    }

    #[test]
    fn test_overrun_skips_missed_ticks() {
        let mut schedule = FixedRateSchedule::new(0, 1000);
        assert_eq!(schedule.advance(3500), 4000);
        assert_eq!(schedule.advance(4100), 5000);
    }

    #[test]
    fn test_deadline_hit_exactly_moves_on() {
        let mut schedule = FixedRateSchedule::new(0, 1000);
        assert_eq!(schedule.advance(1000), 2000);
    }

    #[test]
    fn test_realign() {
        let mut schedule = FixedRateSchedule::new(0, 1000);
        schedule.realign(4321);
        assert_eq!(schedule.deadline(), 5321);
        assert_eq!(schedule.advance(4500), 5321);
    }
}
