//! ESP Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits, das Regelgesetz, die Queues zwischen den Tasks
//! und die beiden Task-Schleifen (Control + Communication).

#![no_std]

pub mod control;
pub mod logic;
pub mod onewire;
pub mod queue;
pub mod schedule;
pub mod session;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use control::{ControlAction, ControlChannels, ControlLoop, CycleOutcome, CycleTiming};
pub use logic::{
    ControlParams, DecimalText, PayloadError, SetpointLimits, compute_duty, format_two_decimals,
    parse_setpoint,
};
pub use onewire::{SCRATCHPAD_LEN, crc8, decode_scratchpad};
pub use queue::{
    ConnectionState, LossyChannel, READING_QUEUE_CAPACITY, ReadingQueue,
    SESSION_EVENT_CAPACITY, SETPOINT_QUEUE_CAPACITY, SessionEvents, SetpointEcho, SetpointQueue,
};
pub use schedule::FixedRateSchedule;
pub use session::{NotificationRelay, RelayOutcome, SessionController, SessionOutcome};
pub use traits::{
    Advertiser, Clock, FanDriver, FanError, NotificationSink, SinkError, TemperatureSensor,
};
pub use types::{DEFAULT_SETPOINT, FanDuty, Notification, SessionEvent, TemperatureSample};
