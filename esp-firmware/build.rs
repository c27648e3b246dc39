// Build-Script: Wird vor dem Kompilieren ausgeführt
// Konfiguriert den Linker für ESP32-C6 Embedded Rust

fn main() {
    // Lade .env file für WiFi-Credentials
    // Fehler ignorieren wenn .env nicht existiert (dann müssen ENV vars gesetzt sein)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("⚠️  .env file nicht gefunden: {}", e);
        eprintln!("   Setze WIFI_SSID und WIFI_PASSWORD als Environment-Variablen");
    }

    // Gebe WiFi-Credentials an Rust-Compiler weiter
    // Die Werte werden zur Compile-Zeit in den Code eingebacken
    if let Ok(ssid) = std::env::var("WIFI_SSID") {
        println!("cargo:rustc-env=WIFI_SSID={}", ssid);
    }
    if let Ok(password) = std::env::var("WIFI_PASSWORD") {
        println!("cargo:rustc-env=WIFI_PASSWORD={}", password);
    }

    // Optionaler mDNS-Hostname (Standard: "luefter")
    if let Ok(hostname) = std::env::var("MDNS_HOSTNAME") {
        println!("cargo:rustc-env=MDNS_HOSTNAME={}", hostname);
    }
    println!("cargo:rerun-if-env-changed=MDNS_HOSTNAME");
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");

    // Registriere hilfsbereiten Error-Handler für Linker-Fehler
    linker_be_nice();

    // Füge Linker-Skripte hinzu:

    // 1. defmt.x - defmt Logging-Support
    //    Definiert Symbole für defmt's binäres Log-Format
    println!("cargo:rustc-link-arg=-Tdefmt.x");

    // 2. linkall.x - ESP32 Memory-Layout
    //    WICHTIG: Muss als LETZTES kommen (sonst Probleme mit flip-link)
    //    Definiert Flash/RAM-Layout und Startup-Code
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}

// Error-Handler: Zeigt hilfreiche Tipps bei Linker-Fehlern
// Der Linker ruft dieses Build-Script erneut auf ("--error-handling-script")
// mit Fehler-Typ und Symbol-Name als Argumenten
fn linker_be_nice() {
    let args: Vec<String> = std::env::args().collect();

    if let [_, kind, what, ..] = args.as_slice() {
        if kind != "undefined-symbol" {
            std::process::exit(1);
        }
        if let Some(hint) = undefined_symbol_hint(what) {
            eprintln!();
            eprintln!("💡 {}", hint);
            eprintln!();
        }
        std::process::exit(0);
    }

    let exe = std::env::current_exe().expect("build script path");
    println!(
        "cargo:rustc-link-arg=--error-handling-script={}",
        exe.display()
    );
}

/// Tipp passend zum fehlenden Symbol
fn undefined_symbol_hint(symbol: &str) -> Option<&'static str> {
    const HEAP_SYMBOLS: &[&str] = &[
        "free",
        "malloc",
        "calloc",
        "get_free_internal_heap_size",
        "malloc_internal",
        "realloc_internal",
        "calloc_internal",
        "free_internal",
    ];

    if symbol.starts_with("_defmt_") {
        Some("`defmt` not found - is `defmt.x` passed as linker script and `esp-println` linked?")
    } else if symbol == "_stack_start" {
        Some("Is the linker script `linkall.x` missing?")
    } else if symbol.starts_with("esp_rtos_") {
        Some("`esp-radio` has no scheduler - call `esp_rtos::start` before initializing the radio.")
    } else if HEAP_SYMBOLS.contains(&symbol) {
        Some("Heap symbols missing - is `esp-alloc` a dependency and its allocator initialized?")
    } else {
        None
    }
}
