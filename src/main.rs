use std::process::ExitCode;
use std::sync::Arc;

use frontgate::config::{AppState, Config};
use frontgate::error::StartupError;
use frontgate::{logger, server};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("frontgate: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), StartupError> {
    let cfg = Config::load()?;
    logger::init(&cfg.logging)?;

    // Thread count follows `server.workers`, defaulting to one per CPU core
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), StartupError> {
    let addr = cfg.get_socket_addr()?;
    let state = Arc::new(AppState::new(cfg)?);

    let listener = server::create_reusable_listener(addr)
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::debug!(%addr, workers = ?state.config.server.workers, "listener bound");
    logger::log_server_start(&state.config);

    server::start_server_loop(listener, state, server::shutdown_signal()).await;
    Ok(())
}
