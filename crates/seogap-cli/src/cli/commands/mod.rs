pub mod analyze;
pub mod dispatch;
pub mod report;
pub mod reports;
pub mod serve;
pub mod watch;

pub use dispatch::dispatch;

use seogap_core::{AppConfig, ReportStore};
use std::path::{Path, PathBuf};

/// Config file + environment, with `--db` applied last.
pub fn load_config(path: Option<&Path>, db: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let mut cfg = AppConfig::load(path)?;
    if let Some(db) = db {
        cfg.store.path = db.display().to_string();
    }
    Ok(cfg)
}

pub fn open_store(cfg: &AppConfig) -> anyhow::Result<ReportStore> {
    use anyhow::Context;
    ReportStore::open(Path::new(&cfg.store.path))
        .with_context(|| format!("failed to open report store {}", cfg.store.path))
}
