use crate::cli::args::AnalyzeArgs;
use crate::exit_codes::{RUN_FAILED, SUCCESS};
use anyhow::Context;
use seogap_core::analysis::validation::{validate_request, ValidRequest};
use seogap_core::model::NewReport;
use seogap_core::report::{inspect, to_markdown};
use seogap_core::{run_id, AppConfig, Pipeline, ReportRecord, RunStatus};
use seogap_server::build_pipeline;
use tracing::info;

/// Create a run for `valid` and drive it to a terminal state in-process.
pub async fn analyze_with(
    pipeline: &Pipeline,
    valid: ValidRequest,
) -> anyhow::Result<ReportRecord> {
    let id = run_id::generate();
    pipeline.store().create(&NewReport {
        run_id: id.clone(),
        user_id: valid.user_id,
        user_url: valid.url.clone(),
        target_keyword: valid.target_keyword.clone(),
        payment_payer: None,
    })?;
    info!(run_id = %id, url = %valid.url, keyword = %valid.target_keyword, "analysis started");

    pipeline.run(&id).await?;
    pipeline
        .store()
        .get(&id)?
        .with_context(|| format!("run {id} vanished from the store"))
}

pub async fn run(args: AnalyzeArgs, cfg: AppConfig) -> anyhow::Result<i32> {
    let valid = validate_request(&args.url, &args.user, &args.keyword)?;
    let pipeline = build_pipeline(&cfg)?;
    let record = analyze_with(&pipeline, valid).await?;

    if args.markdown && record.status == RunStatus::Completed {
        print!("{}", to_markdown(&record));
    } else {
        println!("{}", inspect(&record));
    }

    Ok(match record.status {
        RunStatus::Completed => SUCCESS,
        _ => RUN_FAILED,
    })
}
