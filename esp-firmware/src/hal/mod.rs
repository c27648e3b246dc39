// Hardware Abstraction Layer (HAL) Module
//
// Implementiert die Traits aus esp-core für die echte Hardware.
// Die Regel- und Session-Logik selbst bleibt hardwarefrei.

pub mod clock;
pub mod ds18b20;
pub mod fan;

pub use clock::EmbassyClock;
pub use ds18b20::{Ds18b20Sensor, SensorBusError};
pub use fan::{FanInitError, LedcFan};
