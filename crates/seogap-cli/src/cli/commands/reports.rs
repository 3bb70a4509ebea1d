use crate::exit_codes::{RUN_FAILED, SUCCESS};
use seogap_core::report::inspect as inspect_record;
use seogap_core::{AppConfig, ReportStore};
use tracing::info;

pub fn clear(cfg: &AppConfig, yes: bool) -> anyhow::Result<i32> {
    let store = super::open_store(cfg)?;
    let count = store.count()?;
    if count == 0 {
        println!("No reports stored in {}.", cfg.store.path);
        return Ok(SUCCESS);
    }
    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Delete all {count} reports from {}?",
                cfg.store.path
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(SUCCESS);
        }
    }
    let deleted = clear_store(&store)?;
    println!("Deleted {deleted} reports.");
    Ok(SUCCESS)
}

pub fn clear_store(store: &ReportStore) -> anyhow::Result<usize> {
    let deleted = store.clear()?;
    info!(deleted, "report store cleared");
    Ok(deleted)
}

/// Summaries for each id, separated by blank lines. Unknown ids are listed
/// and make the command exit non-zero.
pub fn inspect_many(store: &ReportStore, run_ids: &[String]) -> anyhow::Result<(String, bool)> {
    let mut sections = Vec::with_capacity(run_ids.len());
    let mut all_found = true;
    for id in run_ids {
        match store.get(id)? {
            Some(record) => sections.push(inspect_record(&record)),
            None => {
                all_found = false;
                sections.push(format!("Run: {id}\n  not found"));
            }
        }
    }
    Ok((sections.join("\n\n"), all_found))
}

pub fn inspect(cfg: &AppConfig, run_ids: &[String]) -> anyhow::Result<i32> {
    let store = super::open_store(cfg)?;
    let (out, all_found) = inspect_many(&store, run_ids)?;
    println!("{out}");
    Ok(if all_found { SUCCESS } else { RUN_FAILED })
}
