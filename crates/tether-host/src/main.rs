mod cli;

use std::io::Write;
use std::sync::Arc;

use tether_common::{TetherError, WindowDescriptor};
use tether_config::{TetherConfig, CONFIG_SCHEMA_VERSION};
use tether_ipc::{
    Bridge, ChannelTransport, Command, Event, HostGlobals, LoopbackHost, NotificationCmd,
    NotificationOptions, WindowOptions, WINDOW_CREATED_EVENT,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn load_config(args: &cli::Args) -> (TetherConfig, Option<String>) {
    let result = match &args.config {
        Some(path) => tether_config::load_from_path(path),
        None => tether_config::load_config(),
    };
    match result {
        Ok(config) => (config, None),
        Err(e) => (TetherConfig::default(), Some(e.to_string())),
    }
}

/// `RUST_LOG` wins, then `--log-level`, then the config file.
fn init_logging(args: &cli::Args, config: &TetherConfig) {
    let directive = args
        .log_level
        .as_deref()
        .unwrap_or(config.logging.filter.as_str());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("tether=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Write the effective config, tagged with its schema version, to stdout.
fn print_config(config: &TetherConfig) -> tether_common::Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "# schema v{CONFIG_SCHEMA_VERSION}")?;
    writeln!(out, "{}", tether_config::config_to_json(config))?;
    out.flush()?;
    Ok(())
}

fn host_globals(args: &cli::Args) -> tether_common::Result<HostGlobals> {
    if let Some(raw) = &args.globals {
        return HostGlobals::from_json(raw).map_err(|e| TetherError::Globals(e.to_string()));
    }
    let windows = args.windows.iter().map(WindowDescriptor::new).collect();
    Ok(HostGlobals::new(
        WindowDescriptor::new(args.current.clone()),
        windows,
    ))
}

async fn run(bridge: &Bridge, host: &LoopbackHost) -> tether_common::Result<()> {
    let windows = bridge.windows();
    let current = windows.get_current();
    tracing::info!(
        current = current.label(),
        windows = windows.get_all().len(),
        "bridge connected"
    );

    let (pings_tx, mut pings) = mpsc::unbounded_channel();
    let ping = current
        .listen("ping", move |event: Event| {
            tracing::info!(id = %event.id, payload = %event.payload, "ping received");
            let _ = pings_tx.send(event);
        })
        .await?;

    let created = bridge
        .listen(WINDOW_CREATED_EVENT, |event: Event| {
            tracing::info!(payload = %event.payload, "host announced a window");
        })
        .await?;

    windows
        .app_window()
        .emit("ping", Some(r#"{"from":"tether"}"#.into()))
        .await?;
    if let Some(event) = pings.recv().await {
        tracing::info!(event = %event.event, "round trip complete");
    }

    current
        .set_title(format!("Tether v{}", env!("CARGO_PKG_VERSION")))
        .await?;
    let size = current.inner_size().await?;
    let scale = current.scale_factor().await?;
    tracing::info!(width = size.width, height = size.height, scale, "current window");

    let inspector = windows
        .create(
            WindowOptions::new("inspector")
                .with_title("Inspector")
                .with_size(480.0, 320.0),
        )
        .await;
    match inspector {
        Ok(handle) => {
            handle.set_always_on_top(true).await?;
            tracing::info!(label = handle.label(), "inspector ready");
        }
        Err(e) => tracing::warn!(error = %e, "could not create inspector window"),
    }

    let permission: String = bridge
        .invoke(Command::Notification(
            NotificationCmd::RequestNotificationPermission,
        ))
        .await?;
    tracing::info!(permission = %permission, "notification permission");
    bridge
        .invoke_raw(Command::Notification(NotificationCmd::Notification {
            options: NotificationOptions {
                title: "Tether".into(),
                body: Some("Bridge demo finished".into()),
                icon: None,
            },
        }))
        .await?;

    ping.unlisten().await?;
    created.unlisten().await?;

    tracing::info!(
        windows = ?host.window_labels(),
        routes = host.routes().len(),
        notifications = host.notifications().len(),
        pending = bridge.registry().len(),
        "host state"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = cli::parse();
    let (config, config_error) = load_config(&args);
    if args.print_config {
        if let Some(e) = config_error {
            eprintln!("config load failed, showing defaults: {e}");
        }
        if let Err(e) = print_config(&config) {
            eprintln!("{e}");
            std::process::exit(1);
        }
        return;
    }
    init_logging(&args, &config);

    tracing::info!(
        schema = CONFIG_SCHEMA_VERSION,
        "Tether v{} starting...",
        env!("CARGO_PKG_VERSION")
    );
    if let Some(e) = config_error {
        tracing::warn!("Config load failed, using defaults: {e}");
    }

    let globals = match host_globals(&args) {
        Ok(globals) => globals,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    let (transport, to_host) = ChannelTransport::new();
    let (host, to_bridge) = LoopbackHost::new(&globals);
    let bridge = Bridge::with_config(Arc::new(transport), globals, &config.bridge);
    let host_task = host.clone().spawn(to_host);
    let inbound_task = bridge.spawn_inbound(to_bridge);

    let outcome = run(&bridge, &host).await;
    bridge.shutdown();
    // The inbound pump holds a bridge clone; once it and `bridge` are gone
    // the transport closes and the host loop ends.
    inbound_task.abort();
    let _ = inbound_task.await;
    drop(bridge);
    let _ = host_task.await;

    match outcome {
        Ok(()) => tracing::info!("Shutdown complete"),
        Err(e) => {
            tracing::error!("Demo failed: {e}");
            std::process::exit(1);
        }
    }
}
