mod demo;

use anyhow::Context;
use crossbeam_channel::{bounded, unbounded};
use matrixd_config::{DeliveryMode, MatrixdConfig};
use matrixd_core::{ControllerOptions, DeliveryPolicy, MatrixController};
use matrixd_sink::BusOptions;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => MatrixdConfig::load(path.clone())
            .with_context(|| format!("loading config from {path}"))?,
        None => MatrixdConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();

    let hardware = matrixd_sink::detect(&BusOptions {
        bus_path: config.bus_path.clone(),
        address: config.device_address,
        self_test: config.self_test,
    });
    info!(hardware = %hardware.status(), "MATRIXD: starting");

    let options = ControllerOptions {
        queue_capacity: config.queue_capacity,
        heartbeat: Duration::from_millis(config.heartbeat_ms),
        delivery: match config.delivery {
            DeliveryMode::Blocking => DeliveryPolicy::Blocking,
            DeliveryMode::DropWhenFull => DeliveryPolicy::DropWhenFull,
        },
    };
    let (controller, control) =
        MatrixController::spawn(hardware, options).context("starting matrix controller")?;

    let (interrupt_tx, interrupt_rx) = unbounded();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .context("installing signal handler")?;

    // Dropping `quit_tx` wakes every helper thread at once.
    let (quit_tx, quit_rx) = bounded::<()>(0);
    let helpers = match &config.demo {
        Some(demo) => demo::start(&controller, demo, &quit_rx).context("starting demo")?,
        None => Vec::new(),
    };

    let _ = interrupt_rx.recv();
    info!("MATRIXD: interrupted, shutting down");

    drop(quit_tx);
    controller.shutdown();
    demo::join(helpers);
    if control.join().is_err() {
        anyhow::bail!("matrix control loop panicked");
    }

    let status = controller.status();
    info!(
        frames = status.frames_accepted,
        write_failures = status.write_failures,
        "MATRIXD: stopped"
    );
    Ok(())
}
