// WebSocket-Protokoll-Definitionen
// Definiert die JSON-Nachrichten für Client ↔ Server Kommunikation

use serde::{Deserialize, Serialize};

/// Client → Server Nachrichten
///
/// `value` bleibt ein String, geparst wird er wie ein roher Payload
/// (`esp_core::parse_setpoint`), z.B. `{"type":"set_setpoint","value":"22.5"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WsClientMessage<'a> {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    #[serde(default, borrow)]
    pub value: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SetSetpoint,
}

/// Server → Client Nachrichten
/// Werte als Text mit zwei Nachkommastellen ("26.00")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum WsServerMessage<'a> {
    #[serde(rename = "reading")]
    Reading { value: &'a str, timestamp_ms: u64 },
    #[serde(rename = "setpoint")]
    Setpoint { value: &'a str },
    #[serde(rename = "error")]
    Error { message: &'static str },
}
