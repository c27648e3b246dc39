// HTTP Server Task - Serviert HTML und WebSocket
use core::future::pending;
use defmt::{info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_time::{Duration, Instant};
use picoserve::{io::embedded_io_async, response::IntoResponse, response::ws, routing::get};

use esp_core::{Notification, SessionEvent, format_two_decimals, parse_setpoint};

use crate::SharedChannels;
use crate::config::*;
use crate::web::{
    INDEX_HTML,
    protocol::{MessageType, WsClientMessage, WsServerMessage},
};

/// Response-Enum für WebSocket-Endpoint
/// Ermöglicht Rückgabe von entweder WebSocket-Upgrade oder HTTP-Fehler
enum WebSocketResponse {
    Upgrade(
        ws::UpgradedWebSocket<ws::UnspecifiedProtocol, ws::CallbackNotUsingState<WebSocketHandler>>,
    ),
    ServiceUnavailable,
}

impl IntoResponse for WebSocketResponse {
    async fn write_to<
        R: embedded_io_async::Read,
        W: picoserve::response::ResponseWriter<Error = R::Error>,
    >(
        self,
        connection: picoserve::response::Connection<'_, R>,
        response_writer: W,
    ) -> Result<picoserve::ResponseSent, W::Error> {
        match self {
            WebSocketResponse::Upgrade(ws) => ws.write_to(connection, response_writer).await,
            WebSocketResponse::ServiceUnavailable => {
                picoserve::response::Response::new(
                    picoserve::response::StatusCode::new(503),
                    "Service Unavailable: another client is already connected",
                )
                .with_header("Retry-After", "5")
                .write_to(connection, response_writer)
                .await
            }
        }
    }
}

/// HTTP Server Task - läuft parallel zu anderen Tasks
///
/// Einziger Zugang für Clients: Bedienseite und WebSocket auf Port 80.
///
/// # Funktionsweise
///
/// 1. **GET /**
///    - Liefert die eingebettete `index.html` (Anzeige + Sollwert-Eingabe)
///
/// 2. **GET /ws (Upgrade)**
///    - Belegt den `ClientSlot`; gelingt das, übernimmt `WebSocketHandler` die Verbindung
///    - Ist der Slot belegt: HTTP 503 mit `Retry-After: 5`, die laufende Session bleibt unberührt
///
/// 3. **Session-Events**
///    - Nach dem Upgrade `Attached`, beim Ende (Close, Fehler, Abbruch) `Detached`
///    - Geschriebene Sollwerte gehen als `SetpointWritten` an den Session Task
///
/// 4. **Timeouts**
///    - Lesen/Schreiben 1 s, auf den ersten Request wird bis zu 5 s gewartet
///
/// **Task Pool:** `HTTP_TASK_POOL_SIZE` Instanzen, damit die Seite auch dann
/// lädt (bzw. ein zweiter Client sein 503 bekommt), wenn eine Instanz die
/// WebSocket-Session hält.
///
/// # Parameter
/// - `task_id`: ID dieser Server-Instanz (0..HTTP_TASK_POOL_SIZE), nur für Logs und picoserve
/// - `stack`: embassy-net Stack für TCP
/// - `shared`: Kanäle zu Session Task und Relay, dazu Client-Slot
#[embassy_executor::task(pool_size = HTTP_TASK_POOL_SIZE)]
pub async fn http_server_task(
    task_id: usize,
    stack: &'static Stack<'static>,
    shared: &'static SharedChannels,
) {
    info!("HTTP: Server task {} starting on port 80...", task_id);

    let app = picoserve::Router::new().route("/", get(serve_html)).route(
        "/ws",
        get(
            move |upgrade: picoserve::response::WebSocketUpgrade| async move {
                info!("HTTP: WebSocket upgrade requested");

                if shared.client_slot.try_claim() {
                    let handler = WebSocketHandler {
                        shared,
                        guard: SessionGuard::new(shared),
                    };
                    WebSocketResponse::Upgrade(upgrade.on_upgrade(handler))
                } else {
                    info!("HTTP: Client already connected, sending HTTP 503");
                    WebSocketResponse::ServiceUnavailable
                }
            },
        ),
    );

    // Server-Konfiguration
    let config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(1)),
        persistent_start_read_request: Some(Duration::from_secs(5)),
    })
    .keep_connection_alive();

    let mut http_buffer = [0u8; HTTP_BUFFER_SIZE];
    let mut rx_buffer = [0u8; TCP_RX_BUFFER_SIZE];
    let mut tx_buffer = [0u8; TCP_TX_BUFFER_SIZE];

    let server = picoserve::Server::new(&app, &config, &mut http_buffer);

    let _ = server
        .listen_and_serve(task_id, *stack, 80, &mut rx_buffer, &mut tx_buffer)
        .await;

    info!("HTTP: Server task {} ended", task_id);
}

/// Serviert die HTML-Hauptseite
async fn serve_html() -> impl IntoResponse {
    picoserve::response::Response::new(picoserve::response::StatusCode::OK, INDEX_HTML)
        .with_header("Content-Type", "text/html; charset=utf-8")
}

/// Hält den Client-Slot und meldet das Ende der Session
///
/// Wird der Handler abgebrochen (Verbindung weg, Future gedroppt), gibt
/// `Drop` den Slot trotzdem frei und meldet `Detached`.
struct SessionGuard {
    shared: &'static SharedChannels,
    attached: bool,
}

impl SessionGuard {
    fn new(shared: &'static SharedChannels) -> Self {
        Self {
            shared,
            attached: false,
        }
    }

    async fn attach(&mut self) {
        self.shared.session_events.send(SessionEvent::Attached).await;
        self.attached = true;
    }

    async fn detach(&mut self) {
        if self.attached {
            self.shared.session_events.send(SessionEvent::Detached).await;
            self.attached = false;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.attached
            && self
                .shared
                .session_events
                .try_send(SessionEvent::Detached)
                .is_err()
        {
            warn!("HTTP: Session event queue full, Detached lost");
        }
        self.shared.client_slot.release();
    }
}

/// WebSocket-Handler State
///
/// Besitzt den `SessionGuard`, lebt also genau so lange wie die Session.
struct WebSocketHandler {
    shared: &'static SharedChannels,
    guard: SessionGuard,
}

impl ws::WebSocketCallback for WebSocketHandler {
    /// Bedient die Session bis zum Close oder Verbindungsfehler
    ///
    /// # Ablauf
    /// 1. Liegengebliebene Nachrichten in der Outbox verwerfen, dann `Attached` melden
    /// 2. `select` auf eingehende Frames und die Outbox des Relay Tasks
    /// 3. `{"type":"set_setpoint","value":"22.5"}` wird geparst und geprüft,
    ///    ungültige Werte werden nur geloggt, kaputtes JSON bekommt eine Fehlermeldung
    /// 4. Messwerte und Sollwerte gehen als JSON-Text-Frames raus
    /// 5. Am Ende `Detached` melden, bei Abbruch übernimmt das `SessionGuard::drop`
    async fn run<R: embedded_io_async::Read, W: embedded_io_async::Write<Error = R::Error>>(
        self,
        mut rx: ws::SocketRx<R>,
        mut tx: ws::SocketTx<W>,
    ) -> Result<(), W::Error> {
        let Self { shared, mut guard } = self;
        info!("HTTP: WebSocket connection established");

        // Reste einer früheren Session verwerfen
        while shared.outbox.poll().is_some() {}
        guard.attach().await;

        let mut buffer = [0u8; WEBSOCKET_BUFFER_SIZE];
        let limits = setpoint_limits();

        let close_reason = loop {
            // Gleichzeitig auf WebSocket-Messages vom Browser und
            // ausgehende Benachrichtigungen vom Relay warten
            match select(
                rx.next_message(&mut buffer, pending()),
                shared.outbox.receive(),
            )
            .await
            {
                Either::First(ws_result) => {
                    let ws_result = match ws_result {
                        Ok(result) => result.ignore_never_b(),
                        Err(e) => {
                            guard.detach().await;
                            return Err(e);
                        }
                    };

                    match ws_result {
                        Ok(ws::Message::Text(data)) => {
                            match serde_json_core::from_slice::<WsClientMessage>(data.as_bytes()) {
                                Ok((msg, _)) => match msg.msg_type {
                                    MessageType::SetSetpoint => {
                                        let payload = msg.value.unwrap_or("");
                                        match parse_setpoint(payload.as_bytes(), &limits) {
                                            Ok(value) => {
                                                shared
                                                    .session_events
                                                    .send(SessionEvent::SetpointWritten(value))
                                                    .await;
                                            }
                                            Err(e) => {
                                                info!("HTTP: Setpoint payload ignored: {}", e);
                                            }
                                        }
                                    }
                                },
                                Err(_) => {
                                    info!("HTTP: JSON parse error");
                                    let error = WsServerMessage::Error {
                                        message: "JSON parse error",
                                    };
                                    let mut json_buffer = [0u8; JSON_ERROR_BUFFER_SIZE];
                                    if let Ok(n) =
                                        serde_json_core::to_slice(&error, &mut json_buffer)
                                    {
                                        if let Ok(json_str) =
                                            core::str::from_utf8(&json_buffer[..n])
                                        {
                                            let _ = tx.send_text(json_str).await;
                                        }
                                    }
                                }
                            }
                        }
                        Ok(ws::Message::Binary(data)) => {
                            info!(
                                "HTTP: Received binary message: {} bytes (ignored)",
                                data.len()
                            );
                        }
                        Ok(ws::Message::Ping(data)) => {
                            if let Err(e) = tx.send_pong(data).await {
                                guard.detach().await;
                                return Err(e);
                            }
                        }
                        Ok(ws::Message::Pong(_)) => {}
                        Ok(ws::Message::Close(_reason)) => {
                            info!("HTTP: WebSocket close received");
                            break None;
                        }
                        Err(error) => {
                            info!("HTTP: WebSocket error");
                            break Some((error.code(), "WebSocket Error"));
                        }
                    }
                }
                Either::Second(notification) => {
                    if let Err(e) = send_notification(&mut tx, notification).await {
                        guard.detach().await;
                        return Err(e);
                    }
                }
            }
        };

        info!("HTTP: WebSocket connection closed");
        guard.detach().await;
        tx.close(close_reason).await
    }
}

/// Sendet einen Messwert oder Sollwert als JSON-Text-Frame
async fn send_notification<W: embedded_io_async::Write>(
    tx: &mut ws::SocketTx<W>,
    notification: Notification,
) -> Result<(), W::Error> {
    let text = format_two_decimals(notification.value());
    let message = match notification {
        Notification::Reading(_) => WsServerMessage::Reading {
            value: text.as_str(),
            timestamp_ms: Instant::now().as_millis(),
        },
        Notification::SetpointEcho(_) => WsServerMessage::Setpoint {
            value: text.as_str(),
        },
    };

    let mut json_buffer = [0u8; JSON_NOTIFY_BUFFER_SIZE];
    match serde_json_core::to_slice(&message, &mut json_buffer) {
        Ok(n) => {
            if let Ok(json_str) = core::str::from_utf8(&json_buffer[..n]) {
                tx.send_text(json_str).await?;
            }
        }
        Err(_) => warn!("HTTP: JSON buffer too small for {}", notification),
    }

    Ok(())
}
