// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen

use esp_core::{ControlParams, CycleTiming, SetpointLimits};

// ============================================================================
// Sensor Konfiguration (DS18B20 an 1-Wire)
// ============================================================================
//
// Datenleitung an GPIO4 (4.7 kΩ Pull-Up nach 3V3). Der Pin steckt im Typ
// von `control_task` (GPIO4<'static>), Umverdrahten heißt dort ändern.

/// Wandlungszeit bei 12 Bit Auflösung in Millisekunden
pub const SENSOR_CONVERSION_MS: u64 = 750;

// ============================================================================
// Lüfter Konfiguration (LEDC PWM)
// ============================================================================
//
// Lüfter-MOSFET an GPIO5, ebenfalls über den Typ in `control_task` festgelegt.

/// PWM-Frequenz in kHz (5 kHz ist Standard für einfache DC-Lüfter)
pub const FAN_PWM_FREQUENCY_KHZ: u32 = 5;

// ============================================================================
// Regler Konfiguration
// ============================================================================

/// Proportional-Verstärkung (Duty pro °C über Sollwert)
pub const CONTROL_KP: f32 = 50.0;

/// Anlauf-Minimum: unter diesem Duty dreht der Lüfter nicht zuverlässig an
pub const CONTROL_DUTY_MIN: u8 = 60;

/// Maximaler Duty (8 Bit Auflösung)
pub const CONTROL_DUTY_MAX: u8 = 255;

/// Totband über dem Sollwert in °C (0.0 = Lüfter startet bei jeder Überschreitung)
pub const CONTROL_DEAD_BAND: f32 = 0.0;

/// Zyklus-Periode in Millisekunden, muss >= SENSOR_CONVERSION_MS sein
pub const CONTROL_PERIOD_MS: u64 = 1000;

/// Wartezeit nach "Sensor getrennt" bis zum nächsten Versuch
pub const SENSOR_RECOVERY_MS: u64 = 1000;

const _: () = assert!(CONTROL_PERIOD_MS >= SENSOR_CONVERSION_MS);

/// Sollwertgrenzen für Client-Writes (Messbereich des DS18B20)
pub const SETPOINT_MIN: f32 = -55.0;
pub const SETPOINT_MAX: f32 = 125.0;

pub fn control_params() -> ControlParams {
    ControlParams {
        kp: CONTROL_KP,
        duty_min: CONTROL_DUTY_MIN,
        duty_max: CONTROL_DUTY_MAX,
        dead_band: CONTROL_DEAD_BAND,
    }
}

pub fn cycle_timing() -> CycleTiming {
    CycleTiming {
        period_ms: CONTROL_PERIOD_MS,
        recovery_ms: SENSOR_RECOVERY_MS,
    }
}

pub fn setpoint_limits() -> SetpointLimits {
    SetpointLimits {
        min: SETPOINT_MIN,
        max: SETPOINT_MAX,
    }
}

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
/// Setze diese in .env file (siehe .env.example)
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Wartezeit nach WiFi-Fehler vor erneutem Versuch
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Heap-Größe für WiFi (Bytes)
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

// ============================================================================
// mDNS-Konfiguration (Auffindbarkeit)
// ============================================================================

/// mDNS Hostname (ohne .local suffix), überschreibbar per MDNS_HOSTNAME
pub const MDNS_HOSTNAME: &str = match option_env!("MDNS_HOSTNAME") {
    Some(hostname) => hostname,
    None => "luefter",
};

/// mDNS TTL (Time To Live) in Sekunden
pub const MDNS_TTL_SECS: u32 = 120;

/// mDNS Reconnect Delay in Sekunden
pub const MDNS_RECONNECT_DELAY_SECS: u64 = 5;

/// mDNS Port (RFC 6762)
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 Multicast-Adresse (224.0.0.251)
pub const MDNS_MULTICAST_ADDR: [u8; 4] = [224, 0, 0, 251];

/// UDP Buffer-Größen für mDNS (TX, RX in Bytes)
pub const MDNS_UDP_BUFFER_SIZE: usize = 512;

/// mDNS Receive/Send Buffer-Größen in Bytes (Standard MTU)
pub const MDNS_PACKET_BUFFER_SIZE: usize = 1500;

// ============================================================================
// HTTP Server Konfiguration
// ============================================================================

/// Anzahl paralleler HTTP-Server-Tasks
/// Einer hält die WebSocket-Session, die anderen liefern HTML bzw. 503
pub const HTTP_TASK_POOL_SIZE: usize = 2;

/// HTTP Buffer-Größe in Bytes
pub const HTTP_BUFFER_SIZE: usize = 1024;

/// TCP RX/TX Buffer-Größen in Bytes
pub const TCP_RX_BUFFER_SIZE: usize = 1024;
pub const TCP_TX_BUFFER_SIZE: usize = 1024;

/// WebSocket Message Buffer-Größe in Bytes
pub const WEBSOCKET_BUFFER_SIZE: usize = 256;

/// JSON Buffer für {"type":"reading","value":"-12.34","timestamp_ms":...}
pub const JSON_NOTIFY_BUFFER_SIZE: usize = 96;

/// JSON Buffer für {"type":"error","message":"..."}
pub const JSON_ERROR_BUFFER_SIZE: usize = 96;
