//! StreamDock plugin entry point.
//!
//! Launched by the host as
//! `dock-ticker -port <p> -pluginUUID <uuid> -registerEvent <event> -info <json>`.

use std::process::ExitCode;
use std::sync::Arc;

use dock_ticker::config::EngineConfig;
use dock_ticker::error::DockError;
use dock_ticker::host::{streamdock, ChannelHost, LaunchArgs};
use dock_ticker::session::engine::Engine;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // The host owns stdout; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), DockError> {
    let args = LaunchArgs::parse(std::env::args().skip(1))?;
    if let Some(info) = &args.info {
        tracing::debug!(info = %info, "Host info");
    }
    let config = EngineConfig::from_env()?;
    let connect_timeout = config.connect_timeout;

    let (host, commands) = ChannelHost::channel();
    let engine = Engine::builder().config(config).build(Arc::new(host))?;
    let connection = streamdock::connect(&args, commands, engine.handle(), connect_timeout).await?;

    engine.run().await;
    connection.closed().await;
    Ok(())
}
