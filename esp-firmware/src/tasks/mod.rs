// Task-Modul: Enthält alle Embassy Tasks
//
// Control Task auf dem Interrupt-Executor, alles andere im Thread-Modus.
// Kommunikation nur über die Kanäle in `SharedChannels`.

pub mod comm;
pub mod control;
pub mod http;
pub mod mdns;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use comm::{relay_task, session_task};
pub use control::control_task;
pub use http::http_server_task;
pub use mdns::mdns_responder_task;
pub use wifi::{connection_task, dhcp_task, net_task};
