use crate::cli::args::ServeArgs;
use crate::exit_codes::SUCCESS;
use seogap_core::AppConfig;
use seogap_server::{serve, shutdown_signal, AppState};

pub async fn run(args: ServeArgs, mut cfg: AppConfig) -> anyhow::Result<i32> {
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    if args.debug_endpoints {
        cfg.server.debug_endpoints = true;
    }
    let state = AppState::from_config(&cfg)?;
    serve(state, shutdown_signal()).await?;
    Ok(SUCCESS)
}
