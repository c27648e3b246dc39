// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Stack, StackResources};
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::interrupt::Priority;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_rtos::embassy::InterruptExecutor;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use esp_luefter_regelung::SharedChannels;
use esp_luefter_regelung::config::{EXTRA_HEAP_SIZE, HTTP_TASK_POOL_SIZE, WIFI_HEAP_SIZE};
use esp_luefter_regelung::tasks::{
    connection_task, control_task, dhcp_task, http_server_task, mdns_responder_task, net_task,
    relay_task, session_task,
};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, startet den Control Task auf einem eigenen
/// Interrupt-Executor (höhere Priorität) und alle Netzwerk-Tasks im
/// Thread-Modus. Danach schläft main().
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt 0)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // Kanäle zwischen den Tasks
    static SHARED: static_cell::StaticCell<SharedChannels> = static_cell::StaticCell::new();
    let shared = &*SHARED.init(SharedChannels::new());

    // Control Task zuerst: regelt auch ohne WiFi
    // Eigener Executor auf Software Interrupt 2, unterbricht die Netzwerk-Tasks
    static CONTROL_EXECUTOR: static_cell::StaticCell<InterruptExecutor<2>> =
        static_cell::StaticCell::new();
    let control_executor =
        CONTROL_EXECUTOR.init(InterruptExecutor::new(sw_interrupt.software_interrupt2));
    let control_spawner = control_executor.start(Priority::Priority3);
    control_spawner
        .spawn(control_task(
            peripherals.GPIO4,
            peripherals.GPIO5,
            peripherals.LEDC,
            shared,
        ))
        .expect("Failed to spawn control task");

    // Communication: Session-Zustand + Relay
    spawner
        .spawn(session_task(shared))
        .expect("Failed to spawn session task");
    spawner
        .spawn(relay_task(shared))
        .expect("Failed to spawn relay task");

    // WiFi Hardware initialisieren
    static RADIO_INIT: static_cell::StaticCell<esp_radio::Controller> =
        static_cell::StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // Sockets: HTTP-Listener (HTTP_TASK_POOL_SIZE) + mDNS (1) + DHCP/DNS
    static RESOURCES: static_cell::StaticCell<StackResources<6>> = static_cell::StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Stack muss 'static sein für Tasks
    static STACK: static_cell::StaticCell<Stack<'static>> = static_cell::StaticCell::new();
    let stack = &*STACK.init(stack);

    // Spawn WiFi Tasks
    spawner.spawn(connection_task(wifi_controller)).unwrap();
    spawner.spawn(net_task(runner)).unwrap();
    spawner.spawn(dhcp_task(stack)).unwrap();

    // Spawn HTTP Server Tasks (einer hält die WebSocket-Session)
    for task_id in 0..HTTP_TASK_POOL_SIZE {
        spawner
            .spawn(http_server_task(task_id, stack, shared))
            .unwrap();
    }

    // Spawn mDNS Responder (luefter.local), kündigt sich beim Start selbst an
    spawner
        .spawn(mdns_responder_task(stack, &shared.advertise))
        .unwrap();

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
