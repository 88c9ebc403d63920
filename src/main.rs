use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod handler;
mod http;
mod logger;
mod pgn;
mod routing;
mod server;

/// Config file used when none is given on the command line (extension optional)
const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    // Size the Tokio runtime from `server.workers`, default is one thread per core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(config::AppState::new(cfg));

    if state.config.storage.create_dir {
        state.store.ensure_dir().await?;
    } else if !state.store.dir().is_dir() {
        logger::log_warning(&format!(
            "Storage directory {} does not exist, listing will fail until it is created",
            state.store.dir().display()
        ));
    }

    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &state.config);

    let signals = Arc::new(server::SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    // Connections are served with spawn_local, which needs a LocalSet
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            state,
            Arc::new(AtomicUsize::new(0)),
            signals,
        ))
        .await;

    Ok(())
}
