//! Lumen emulator entry point.
//!
//! Wires together all infrastructure services and starts the Tokio async
//! runtime.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_settings()        -- TOML file or defaults
//!  └─ build_device_state()   -- identity + restored snapshot
//!  └─ start services
//!       ├─ udp_service       (blocking socket thread)
//!       ├─ tcp_service       (accept thread + per-connection threads)
//!       └─ dispatch loop     (dedicated thread, owns DeviceState)
//!  └─ event pump             (Tokio task: logs + snapshot persistence)
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lumen_core::domain::device::CollectionSnapshot;
use lumen_core::{DeviceIdentity, DeviceSnapshot, DeviceState, LightDriver};
use lumen_emulator::application::dispatch::{
    run_dispatch_loop, DispatchEvent, Dispatcher, ResponseTransport, ServiceAdvert,
};
use lumen_emulator::infrastructure::light::SimulatedLight;
use lumen_emulator::infrastructure::network::{
    tcp_service::start_tcp_service, udp_service::start_udp_service, LanTransport,
};
use lumen_emulator::infrastructure::storage::settings::{
    load_settings, parse_mac, save_settings, EmulatorSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut settings = load_settings().context("failed to load settings")?;

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.emulator.log_level.clone())),
        )
        .init();

    info!("Lumen emulator starting");

    // ── Device state ───────────────────────────────────────────────────────────
    let light = Arc::new(SimulatedLight::new());
    let state = build_device_state(&mut settings, Arc::clone(&light) as Arc<dyn LightDriver>)
        .context("failed to build device state")?;
    info!(
        "emulating \"{}\" as {}",
        state.label(),
        settings.device.mac
    );

    // Shutdown flag shared across all background services.
    let running = Arc::new(AtomicBool::new(true));

    // ── Transports ─────────────────────────────────────────────────────────────
    let bind_addr: std::net::SocketAddr =
        format!("{}:{}", settings.network.bind_address, settings.network.port)
            .parse()
            .context("invalid bind address in settings")?;

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(64);

    let udp_socket = start_udp_service(bind_addr, Arc::clone(&running), inbound_tx.clone())
        .context("failed to start udp service")?;

    let tcp_connections = if settings.network.tcp_enabled {
        let connections = start_tcp_service(
            bind_addr,
            Arc::clone(&running),
            inbound_tx.clone(),
            settings.network.max_packet_len,
        )
        .context("failed to start tcp service")?;
        Some(connections)
    } else {
        None
    };
    drop(inbound_tx); // the services hold the remaining senders

    // ── Dispatcher ─────────────────────────────────────────────────────────────
    let transport: Arc<dyn ResponseTransport> =
        Arc::new(LanTransport::new(udp_socket, tcp_connections));
    let (dispatcher, events_rx) = Dispatcher::new(
        state,
        transport,
        ServiceAdvert {
            port: settings.network.port,
            tcp_enabled: settings.network.tcp_enabled,
        },
        settings.network.max_packet_len,
    )
    .context("handler table verification failed")?;

    std::thread::Builder::new()
        .name("lumen-dispatch".to_string())
        .spawn(move || run_dispatch_loop(dispatcher, inbound_rx))
        .context("failed to spawn dispatch thread")?;

    // ── Dispatch event pump ────────────────────────────────────────────────────
    tokio::spawn(pump_events(events_rx, settings));

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("Lumen emulator ready on {bind_addr}.  Press Ctrl-C to exit.");

    loop {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }
    }

    info!("Lumen emulator stopped");
    Ok(())
}

/// Consumes dispatch events: logs the traffic and writes changed snapshots
/// back to the settings file.
async fn pump_events(
    mut events: tokio::sync::mpsc::Receiver<DispatchEvent>,
    mut settings: EmulatorSettings,
) {
    while let Some(event) = events.recv().await {
        match event {
            DispatchEvent::Handled {
                kind,
                peer,
                responses,
                snapshot,
            } => {
                debug!("{} from {peer:?}: {responses} response(s)", kind.name());
                if let Some(snapshot) = snapshot {
                    info!("persisting device snapshot (label \"{}\")", snapshot.label);
                    settings.state = Some(snapshot);
                    if let Err(e) = save_settings(&settings) {
                        warn!("failed to persist settings: {e}");
                    }
                }
            }
            DispatchEvent::Ignored { peer, code, reason } => {
                debug!("ignored packet from {peer:?} (code {code:?}): {reason:?}");
            }
        }
    }
}

/// Builds the device state from settings: identity from the configured MAC
/// and version triple, persisted fields from the saved snapshot.
///
/// On a factory-fresh install there is no snapshot yet; the device mints
/// location/group ids and persists them immediately so they survive the
/// first restart.
fn build_device_state(
    settings: &mut EmulatorSettings,
    driver: Arc<dyn LightDriver>,
) -> anyhow::Result<DeviceState> {
    let serial = parse_mac(&settings.device.mac).context("bad MAC in settings")?;
    let mut identity = DeviceIdentity::from_serial(serial);
    identity.vendor = settings.device.vendor;
    identity.product = settings.device.product;
    identity.version = settings.device.version;

    let mut state = DeviceState::new(identity, driver);

    match &settings.state {
        Some(snapshot) => state.restore(snapshot),
        None => {
            let now = now_nanos();
            state.restore(&DeviceSnapshot {
                label: settings.device.label.clone(),
                location: CollectionSnapshot {
                    id: Uuid::new_v4(),
                    label: "My Home".to_string(),
                    updated_at: now,
                },
                group: CollectionSnapshot {
                    id: Uuid::new_v4(),
                    label: "My Room".to_string(),
                    updated_at: now,
                },
            });
            settings.state = Some(state.snapshot());
            if let Err(e) = save_settings(settings) {
                // Not fatal: the device still runs, it just re-mints ids
                // next start.
                error!("failed to persist freshly minted identity: {e}");
            }
        }
    }

    Ok(state)
}

/// Current time as nanoseconds since the Unix epoch, the unit collection
/// timestamps use on the wire.
fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
