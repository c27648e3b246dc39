// WiFi Tasks - Station-Modus, Netzwerk-Stack und DHCP-Überwachung
use defmt::{Debug2Format, error, info, warn};
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};

use crate::config::{WIFI_PASSWORD, WIFI_RETRY_DELAY_SECS, WIFI_SSID};

/// WiFi Connection Task
///
/// Startet den Controller im Station-Modus, verbindet mit `WIFI_SSID` und
/// verbindet nach jedem `StaDisconnected` neu. Die Regelung läuft davon
/// unabhängig weiter.
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    info!("WiFi: Starting connection task");

    let retry_delay = Duration::from_secs(WIFI_RETRY_DELAY_SECS);

    loop {
        if matches!(controller.is_started(), Ok(false)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );

            if let Err(e) = controller.set_config(&client_config) {
                error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
                Timer::after(retry_delay).await;
                continue;
            }

            if let Err(e) = controller.start_async().await {
                error!("WiFi: Failed to start: {}", Debug2Format(&e));
                Timer::after(retry_delay).await;
                continue;
            }

            info!("WiFi: Station started");
        }

        info!("WiFi: Connecting to '{}'...", WIFI_SSID);
        if let Err(e) = controller.connect_async().await {
            error!(
                "WiFi: Connection failed: {}, retry in {}s",
                Debug2Format(&e),
                WIFI_RETRY_DELAY_SECS
            );
            Timer::after(retry_delay).await;
            continue;
        }
        info!("WiFi: Connected");

        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("WiFi: Disconnected from AP, reconnecting...");

        Timer::after(Duration::from_secs(2)).await;
    }
}

/// Network Task: treibt den embassy-net Stack (Pakete, TCP/IP)
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// DHCP Monitor Task
///
/// Loggt jede neu erhaltene Adresse, auch nach einem Reconnect.
#[embassy_executor::task]
pub async fn dhcp_task(stack: &'static Stack<'static>) {
    loop {
        stack.wait_config_up().await;

        if let Some(config) = stack.config_v4() {
            info!("WiFi: Got IP address");
            info!("  IP:      {}", Debug2Format(&config.address.address()));
            info!("  Gateway: {}", Debug2Format(&config.gateway));
            info!(
                "  Open http://{}/ or http://{}.local/",
                Debug2Format(&config.address.address()),
                crate::config::MDNS_HOSTNAME
            );
        }

        stack.wait_config_down().await;
        warn!("WiFi: IP configuration lost");
    }
}
