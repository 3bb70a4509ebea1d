use crate::cli::args::{ReportArgs, ReportFormat};
use crate::exit_codes::{RUN_FAILED, SUCCESS};
use anyhow::Context;
use seogap_core::report::to_markdown;
use seogap_core::{AppConfig, ReportRecord, ReportStore};

pub fn render(record: &ReportRecord, format: ReportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Markdown => to_markdown(record),
        ReportFormat::Json => {
            let mut s = serde_json::to_string_pretty(record)?;
            s.push('\n');
            s
        }
    })
}

pub fn write_report(store: &ReportStore, args: &ReportArgs) -> anyhow::Result<i32> {
    let Some(record) = store.get(&args.run_id)? else {
        eprintln!("Report {} not found", args.run_id);
        return Ok(RUN_FAILED);
    };
    let out = render(&record, args.format)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, out)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{out}"),
    }
    Ok(SUCCESS)
}

pub fn run(args: ReportArgs, cfg: &AppConfig) -> anyhow::Result<i32> {
    let store = super::open_store(cfg)?;
    write_report(&store, &args)
}
