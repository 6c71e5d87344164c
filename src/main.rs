use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ascii_chat_server_core::compositor::GridCompositor;
use ascii_chat_server_core::config::Config;
use ascii_chat_server_core::kernel::BlockAsciiKernel;
use ascii_chat_server_core::listener;
use ascii_chat_server_core::registry::ClientRegistry;
use ascii_chat_server_core::shutdown::ShutdownState;
use ascii_chat_server_core::stats::spawn_stats_task;

const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::parse());

    let file_appender = rolling::daily("logs", "ascii-chat-server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(fmt::time::OffsetTime::local_rfc_3339().unwrap())
                .with_ansi(false),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(config.tracing_level().to_string().to_lowercase().parse()?),
        )
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        error!("panic occurred: {}", panic_info);
    }));

    info!(?config, "starting ascii-chat-server");

    let shutdown = Arc::new(ShutdownState::new());
    let registry = Arc::new(ClientRegistry::new(config.max_clients));
    let compositor = Arc::new(GridCompositor::new(Arc::new(BlockAsciiKernel)));

    let stats_handle = spawn_stats_task(registry.clone(), shutdown.clone(), STATS_INTERVAL);

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt signal, shutting down");
            signal_shutdown.trigger();
        }
    });

    let result = listener::run(config, registry.clone(), compositor, shutdown.clone()).await;

    shutdown.trigger();
    let _ = stats_handle.await;

    // Clients that are still connected at this point get one tick to notice
    // the flag before the process exits (spec §5: workers must observe the
    // flag within one tick, not be force-joined on the way out).
    while !registry.is_empty() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    result.context("listener exited with an error")
}
