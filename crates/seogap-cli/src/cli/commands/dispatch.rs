use super::super::args::*;
use crate::exit_codes::SUCCESS;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let cfg = super::load_config(cli.config.as_deref(), cli.db.as_ref())?;
    match cli.cmd {
        Command::Serve(args) => super::serve::run(args, cfg).await,
        Command::Analyze(args) => super::analyze::run(args, cfg).await,
        Command::Watch(args) => super::watch::run(args).await,
        Command::Report(args) => super::report::run(args, &cfg),
        Command::Reports(args) => match args.cmd {
            ReportsSub::Clear { yes } => super::reports::clear(&cfg, yes),
            ReportsSub::Inspect { run_ids } => super::reports::inspect(&cfg, &run_ids),
        },
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}
