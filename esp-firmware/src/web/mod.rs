// Web-Modul: JSON-Protokoll des WebSockets und die eingebettete Bedienseite

pub mod protocol;

/// Bedienseite, zur Compile-Zeit ins Binary eingebettet
pub const INDEX_HTML: &str = include_str!("index.html");
