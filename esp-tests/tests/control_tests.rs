//! Integration Tests für den Control Task
//!
//! Diese Tests laufen auf dem Host (x86_64) und nutzen Mock-Sensor,
//! Mock-Lüfter und eine virtuelle Uhr.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use esp_core::{
    Clock, ControlAction, ControlChannels, ControlLoop, ControlParams, CycleTiming, FanDriver,
    FanDuty, FanError, ReadingQueue, SetpointEcho, SetpointQueue, TemperatureSample,
    TemperatureSensor, format_two_decimals,
};

// ============================================================================
// Mocks
// ============================================================================

/// Gemeinsame virtuelle Zeit für Sensor und Uhr
type SharedTime = Rc<Cell<u64>>;

/// Sensor mit fester Messreihe; leere Reihe → Disconnected
pub struct MockSensor {
    script: VecDeque<TemperatureSample>,
    time: SharedTime,
    latency_ms: u64,
}

impl MockSensor {
    pub fn new(time: SharedTime, samples: &[TemperatureSample]) -> Self {
        Self {
            script: samples.iter().copied().collect(),
            time,
            latency_ms: 0,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }
}

impl TemperatureSensor for MockSensor {
    async fn request_reading(&mut self) -> TemperatureSample {
        self.time.set(self.time.get() + self.latency_ms);
        self.script
            .pop_front()
            .unwrap_or(TemperatureSample::Disconnected)
    }
}

#[derive(Default)]
pub struct MockFan {
    pub writes: Vec<FanDuty>,
    pub fail_next_write: bool,
}

impl FanDriver for MockFan {
    fn set_duty(&mut self, duty: FanDuty) -> Result<(), FanError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(FanError::WriteFailed);
        }
        self.writes.push(duty);
        Ok(())
    }
}

/// Virtuelle Uhr: `sleep_until` springt sofort zur Weckzeit
pub struct VirtualClock {
    time: SharedTime,
    pub wakeups: Vec<u64>,
}

impl VirtualClock {
    pub fn new(time: SharedTime) -> Self {
        Self {
            time,
            wakeups: Vec::new(),
        }
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.time.get()
    }

    async fn sleep_until(&mut self, deadline_ms: u64) {
        self.wakeups.push(deadline_ms);
        if deadline_ms > self.time.get() {
            self.time.set(deadline_ms);
        }
    }
}

/// Queues und Signal für einen Testlauf
struct Channels {
    setpoints: SetpointQueue<NoopRawMutex>,
    readings: ReadingQueue<NoopRawMutex>,
    echo: SetpointEcho<NoopRawMutex>,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            setpoints: SetpointQueue::new(),
            readings: ReadingQueue::new(),
            echo: SetpointEcho::new(),
        }
    }
}

impl Channels {
    fn control(&self) -> ControlChannels<'_, NoopRawMutex> {
        ControlChannels {
            setpoints: &self.setpoints,
            readings: &self.readings,
            setpoint_echo: &self.echo,
        }
    }

    fn drain_readings(&self) -> Vec<f32> {
        std::iter::from_fn(|| self.readings.poll()).collect()
    }
}

fn celsius(values: &[f32]) -> Vec<TemperatureSample> {
    values.iter().map(|&v| TemperatureSample::Celsius(v)).collect()
}

fn control_loop<'a>(
    channels: &'a Channels,
    samples: &[TemperatureSample],
) -> ControlLoop<'a, NoopRawMutex, MockSensor, MockFan, VirtualClock> {
    let time = SharedTime::default();
    ControlLoop::new(
        MockSensor::new(time.clone(), samples),
        MockFan::default(),
        VirtualClock::new(time),
        ControlParams::default(),
        CycleTiming::default(),
        channels.control(),
    )
}

fn duty_of(action: ControlAction) -> FanDuty {
    match action {
        ControlAction::Actuated { duty, .. } => duty,
        ControlAction::SensorUnavailable { .. } => panic!("Expected Actuated"),
    }
}

// ============================================================================
// Tests: Regelgesetz im Zyklus
// ============================================================================

#[test]
fn test_reference_examples() {
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&[26.0, 28.0, 30.0, 40.0]));

    let duties: Vec<FanDuty> = (0..4)
        .map(|_| duty_of(block_on(control.cycle()).action))
        .collect();

    assert_eq!(
        duties,
        vec![FanDuty(60), FanDuty(150), FanDuty(250), FanDuty(255)]
    );
    assert_eq!(control.fan().writes, duties);
    assert_eq!(channels.drain_readings(), vec![26.0, 28.0, 30.0, 40.0]);
}

#[test]
fn test_at_or_below_setpoint_turns_fan_off() {
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&[30.0, 25.0, 12.5]));

    assert_eq!(duty_of(block_on(control.cycle()).action), FanDuty(250));
    assert_eq!(duty_of(block_on(control.cycle()).action), FanDuty::OFF);
    assert_eq!(duty_of(block_on(control.cycle()).action), FanDuty::OFF);
}

#[test]
fn test_duty_monotonic_in_sample() {
    let samples: Vec<f32> = (0..150).map(|i| 24.0 + i as f32 * 0.1).collect();
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&samples));

    let mut previous = FanDuty::OFF;
    for _ in &samples {
        let duty = duty_of(block_on(control.cycle()).action);
        assert!(duty >= previous);
        previous = duty;
        // Reading-Queue leeren damit sie nicht voll läuft
        channels.drain_readings();
    }
    assert_eq!(previous, FanDuty::MAX);
}

// ============================================================================
// Tests: Sollwert-Übernahme
// ============================================================================

#[test]
fn test_setpoint_applied_before_control_in_same_cycle() {
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&[23.0]));

    assert!(channels.setpoints.offer(22.5));
    let outcome = block_on(control.cycle());

    assert_eq!(outcome.new_setpoint, Some(22.5));
    // 0.5 * 50 = 25 → Anlauf-Minimum
    assert_eq!(duty_of(outcome.action), FanDuty(60));
    assert_eq!(control.setpoint(), 22.5);

    let echo = channels.echo.try_take().expect("setpoint echo");
    assert_eq!(format_two_decimals(echo).as_str(), "22.50");
}

#[test]
fn test_only_one_setpoint_drained_per_cycle() {
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&[30.0, 30.0]));

    channels.setpoints.offer(20.0);
    channels.setpoints.offer(29.0);

    let first = block_on(control.cycle());
    assert_eq!(first.new_setpoint, Some(20.0));
    assert_eq!(duty_of(first.action), FanDuty::MAX);

    let second = block_on(control.cycle());
    assert_eq!(second.new_setpoint, Some(29.0));
    assert_eq!(duty_of(second.action), FanDuty(60));
}

#[test]
fn test_repeated_setpoint_is_idempotent() {
    let samples = celsius(&[26.0, 27.0, 28.0]);

    let once = Channels::default();
    let mut control_once = control_loop(&once, &samples);
    once.setpoints.offer(24.0);
    for _ in 0..3 {
        block_on(control_once.cycle());
    }

    let twice = Channels::default();
    let mut control_twice = control_loop(&twice, &samples);
    twice.setpoints.offer(24.0);
    twice.setpoints.offer(24.0);
    for _ in 0..3 {
        block_on(control_twice.cycle());
    }

    assert_eq!(control_once.fan().writes, control_twice.fan().writes);
    assert_eq!(control_once.setpoint(), control_twice.setpoint());
}

#[test]
fn test_announce_setpoint_publishes_default() {
    let channels = Channels::default();
    let control = control_loop(&channels, &[]);

    control.announce_setpoint();
    assert_eq!(channels.echo.try_take(), Some(25.0));
}

// ============================================================================
// Tests: Sensor getrennt
// ============================================================================

#[test]
fn test_disconnected_sensor_holds_last_duty() {
    let samples = [
        TemperatureSample::Celsius(28.0),
        TemperatureSample::Disconnected,
        TemperatureSample::Disconnected,
        TemperatureSample::Disconnected,
        TemperatureSample::Celsius(26.0),
    ];
    let channels = Channels::default();
    let mut control = control_loop(&channels, &samples);

    assert_eq!(duty_of(block_on(control.cycle()).action), FanDuty(150));

    for _ in 0..3 {
        let outcome = block_on(control.cycle());
        assert_eq!(
            outcome.action,
            ControlAction::SensorUnavailable {
                held: FanDuty(150)
            }
        );
        assert_eq!(control.last_duty(), FanDuty(150));
    }

    // Kein Stellbefehl während der Störung
    assert_eq!(control.fan().writes, vec![FanDuty(150)]);
    // Getrennte Zyklen erzeugen keine Messwerte
    assert_eq!(channels.drain_readings(), vec![28.0]);

    assert_eq!(duty_of(block_on(control.cycle()).action), FanDuty(60));
}

#[test]
fn test_disconnected_sensor_waits_recovery_interval() {
    let time = SharedTime::default();
    let channels = Channels::default();
    let samples = [TemperatureSample::Disconnected, TemperatureSample::Celsius(20.0)];
    let mut control = ControlLoop::new(
        MockSensor::new(time.clone(), &samples).with_latency(100),
        MockFan::default(),
        VirtualClock::new(time.clone()),
        ControlParams::default(),
        CycleTiming {
            period_ms: 1000,
            recovery_ms: 1500,
        },
        channels.control(),
    );

    let outcome = block_on(control.cycle());
    block_on(control.wait_next(&outcome));
    // Recovery ab "jetzt" (100 ms Wandlung), nicht vom Raster
    assert_eq!(control.clock().wakeups, vec![1600]);

    let outcome = block_on(control.cycle());
    block_on(control.wait_next(&outcome));
    // Raster neu ab Recovery-Zeitpunkt
    assert_eq!(control.clock().wakeups, vec![1600, 2600]);
}

// ============================================================================
// Tests: Zeitplan
// ============================================================================

#[test]
fn test_wakeups_follow_absolute_schedule() {
    let time = SharedTime::default();
    let channels = Channels::default();
    let mut control = ControlLoop::new(
        MockSensor::new(time.clone(), &celsius(&[20.0, 20.0, 20.0, 20.0])).with_latency(750),
        MockFan::default(),
        VirtualClock::new(time.clone()),
        ControlParams::default(),
        CycleTiming::default(),
        channels.control(),
    );

    for _ in 0..4 {
        let outcome = block_on(control.cycle());
        block_on(control.wait_next(&outcome));
    }

    // 750 ms Wandlung pro Zyklus verschieben das Raster nicht
    assert_eq!(control.clock().wakeups, vec![1000, 2000, 3000, 4000]);
    assert_eq!(time.get(), 4000);
}

// ============================================================================
// Tests: Queue-Verhalten
// ============================================================================

#[test]
fn test_full_reading_queue_never_stalls_control() {
    let samples: Vec<f32> = (0..7).map(|i| 26.0 + i as f32).collect();
    let channels = Channels::default();
    let mut control = control_loop(&channels, &celsius(&samples));

    let mut forwarded = Vec::new();
    for _ in 0..7 {
        match block_on(control.cycle()).action {
            ControlAction::Actuated {
                forwarded: ok, ..
            } => forwarded.push(ok),
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(forwarded, vec![true, true, true, true, true, false, false]);
    assert_eq!(channels.readings.dropped(), 2);
    // Regelung lief trotzdem jeden Zyklus
    assert_eq!(control.fan().writes.len(), 7);
    // Die ältesten fünf Werte bleiben erhalten
    assert_eq!(channels.drain_readings(), vec![26.0, 27.0, 28.0, 29.0, 30.0]);
}

#[test]
fn test_fan_fault_keeps_previous_duty() {
    let channels = Channels::default();
    let time = SharedTime::default();
    let mut fan = MockFan::default();
    fan.fail_next_write = true;
    let mut control = ControlLoop::new(
        MockSensor::new(time.clone(), &celsius(&[40.0, 28.0])),
        fan,
        VirtualClock::new(time),
        ControlParams::default(),
        CycleTiming::default(),
        channels.control(),
    );

    let outcome = block_on(control.cycle());
    match outcome.action {
        ControlAction::Actuated {
            duty,
            fan_fault,
            forwarded,
            ..
        } => {
            assert_eq!(duty, FanDuty::MAX);
            assert_eq!(fan_fault, Some(FanError::WriteFailed));
            // Messwert wird trotzdem weitergereicht
            assert!(forwarded);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(control.last_duty(), FanDuty::OFF);

    block_on(control.cycle());
    assert_eq!(control.last_duty(), FanDuty(150));
    assert_eq!(control.fan().writes, vec![FanDuty(150)]);
}
