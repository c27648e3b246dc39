// mDNS Responder Task - Auffindbarkeit unter <hostname>.local
//
// Beantwortet A-Record Queries (RFC 6762) und sendet auf Anforderung
// unaufgeforderte Announcements. Ein Announce-Burst ist das "Advertising"
// der Session-Logik: beim Boot und nach jedem Client-Disconnect.
//
// Library: edge-mdns (no_std) über edge-nal-embassy auf embassy-net

use defmt::{Debug2Format, error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};

use core::net::{Ipv4Addr, SocketAddr};

use edge_mdns::{HostAnswersMdnsHandler, buf::VecBufAccess, domain::base::Ttl, host::Host, io};
use edge_nal::{MulticastV4, UdpBind, UdpSplit};
use edge_nal_embassy::{Udp, UdpBuffers};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_hal::rng::Rng;

use crate::AdvertiseSignal;
use crate::config::{
    MDNS_HOSTNAME, MDNS_MULTICAST_ADDR, MDNS_PACKET_BUFFER_SIZE, MDNS_PORT,
    MDNS_RECONNECT_DELAY_SECS, MDNS_TTL_SECS, MDNS_UDP_BUFFER_SIZE,
};

type MdnsUdpBuffers = UdpBuffers<1, MDNS_UDP_BUFFER_SIZE, MDNS_UDP_BUFFER_SIZE>;

/// Zufallszahlen für mDNS Query-IDs aus dem Hardware-RNG
fn mdns_rng(buf: &mut [u8]) {
    let rng = Rng::new();
    for chunk in buf.chunks_mut(4) {
        let bytes = rng.random().to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

/// mDNS Responder Task
///
/// Macht den Regler unter `<MDNS_HOSTNAME>.local` im lokalen Netz
/// auffindbar, solange kein Client verbunden ist auch aktiv per Announce.
///
/// # Funktionsweise
///
/// 1. **Netzwerk abwarten**
///    - Link up (siehe `connection_task`) und DHCP-Adresse (siehe `dhcp_task`)
///    - Nach jedem Neustart erneut, die Adresse kann sich geändert haben
///
/// 2. **UDP-Socket**
///    - Bindet `0.0.0.0:MDNS_PORT` (5353)
///    - Tritt der Multicast-Gruppe `MDNS_MULTICAST_ADDR` (224.0.0.251) bei
///    - Die UDP-Buffer werden einmalig angelegt und bei jedem Neustart wiederverwendet
///
/// 3. **Responder**
///    - Beantwortet A-Record Queries mit der aktuellen DHCP-Adresse
///    - TTL der Antworten: `MDNS_TTL_SECS`
///
/// 4. **Advertising**
///    - Jeder `signal(())` auf `advertise` startet eine Runde unaufgeforderter Announcements
///    - Der Responder signalisiert selbst beim Start, der Session Task nach jedem Disconnect
///
/// 5. **Fehler**
///    - Jeder Fehler beendet `run_mdns_responder`, Neustart nach `MDNS_RECONNECT_DELAY_SECS`
///    - Die Regelung läuft davon unberührt weiter
///
/// # Netzwerk-Erreichbarkeit
///
/// - **Hostname:** `luefter.local` (Standard, überschreibbar beim Build)
/// - **IP-Adresse:** vom DHCP zugewiesene IPv4-Adresse
///
/// ```bash
/// MDNS_HOSTNAME=werkstatt cargo build --release   # -> werkstatt.local
/// avahi-resolve -n luefter.local
/// ```
///
/// # Konfiguration
///
/// In `src/config.rs`:
/// - `MDNS_HOSTNAME` - Hostname ohne .local, per Umgebungsvariable überschreibbar
/// - `MDNS_TTL_SECS` - Cache-Dauer der Antworten
/// - `MDNS_PORT` / `MDNS_MULTICAST_ADDR` - Standardwerte aus RFC 6762
/// - `MDNS_RECONNECT_DELAY_SECS` - Pause vor dem Neustart
/// - `MDNS_UDP_BUFFER_SIZE` / `MDNS_PACKET_BUFFER_SIZE` - Puffergrößen
///
/// # Parameter
/// - `stack`: embassy-net Stack (geteilt mit HTTP und DHCP)
/// - `advertise`: Broadcast-Signal für Announce-Runden, `SharedChannels::advertise`
#[embassy_executor::task]
pub async fn mdns_responder_task(
    stack: &'static Stack<'static>,
    advertise: &'static AdvertiseSignal,
) {
    info!("mDNS: Task started, waiting for network...");

    // Einmalig für alle Neustarts des Responders
    static UDP_BUFFERS: static_cell::StaticCell<MdnsUdpBuffers> = static_cell::StaticCell::new();
    let udp_buffers = &*UDP_BUFFERS.init(UdpBuffers::new());

    loop {
        wait_for_network(stack).await;
        info!("mDNS: Network ready");

        match run_mdns_responder(stack, udp_buffers, advertise).await {
            Ok(()) => warn!("mDNS: Responder stopped normally"),
            Err(e) => error!("mDNS: Error: {}", e),
        }
        info!("mDNS: Reconnecting in {}s...", MDNS_RECONNECT_DELAY_SECS);
        Timer::after(Duration::from_secs(MDNS_RECONNECT_DELAY_SECS)).await;
    }
}

/// Wartet bis Link up ist und DHCP eine Adresse geliefert hat
async fn wait_for_network(stack: &'static Stack<'static>) {
    loop {
        if stack.is_link_up() && stack.config_v4().is_some() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Ein Lauf des Responders auf der aktuellen Adresse
///
/// Kehrt nur bei einem Fehler zurück, der normale Betrieb endet nie.
///
/// # Returns
/// - `Err(MdnsError::NoAddress)`: DHCP-Adresse inzwischen verloren
/// - `Err(MdnsError::SocketBindFailed)` / `Err(MdnsError::MulticastJoinFailed)`: Socket-Setup
/// - `Err(MdnsError::ResponderFailed)`: UDP-Fehler im laufenden Betrieb
async fn run_mdns_responder(
    stack: &'static Stack<'static>,
    udp_buffers: &'static MdnsUdpBuffers,
    advertise: &'static AdvertiseSignal,
) -> Result<(), MdnsError> {
    let our_ip = stack
        .config_v4()
        .ok_or(MdnsError::NoAddress)?
        .address
        .address();
    info!("mDNS: Using IP {}", Debug2Format(&our_ip));

    let udp_stack = Udp::new(*stack, udp_buffers);

    let mut socket = udp_stack
        .bind(SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), MDNS_PORT))
        .await
        .map_err(|_| MdnsError::SocketBindFailed)?;

    socket
        .join_v4(Ipv4Addr::from(MDNS_MULTICAST_ADDR), Ipv4Addr::UNSPECIFIED)
        .await
        .map_err(|_| MdnsError::MulticastJoinFailed)?;

    let (recv, send) = socket.split();

    let host = Host {
        hostname: MDNS_HOSTNAME,
        ipv4: our_ip.into(),
        // kein proto-ipv6 in smoltcp
        ipv6: [0u8; 16].into(),
        ttl: Ttl::from_secs(MDNS_TTL_SECS),
    };

    let recv_buf = VecBufAccess::<CriticalSectionRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();
    let send_buf = VecBufAccess::<CriticalSectionRawMutex, MDNS_PACKET_BUFFER_SIZE>::new();

    // Nach (Re-)Start sofort ankündigen
    advertise.signal(());

    let mdns = io::Mdns::new(
        Some(our_ip),
        None,
        recv,
        send,
        recv_buf,
        send_buf,
        mdns_rng,
        advertise,
    );

    info!(
        "mDNS: Responder running, advertising '{}.local'",
        MDNS_HOSTNAME
    );

    mdns.run(HostAnswersMdnsHandler::new(&host))
        .await
        .map_err(|_| MdnsError::ResponderFailed)?;

    Ok(())
}

/// mDNS Fehler-Typen, jeder führt zu einem Neustart des Responders
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
enum MdnsError {
    /// DHCP-Adresse zwischen Prüfung und Start verloren
    NoAddress,
    SocketBindFailed,
    MulticastJoinFailed,
    /// Netzwerk weg oder UDP-Fehler während des Betriebs
    ResponderFailed,
}
