//! SQLite schema for the report store.
//!
//! Tables:
//! - `reports`: one row per run; payload columns hold JSON text and are NULL
//!   until the producing stage checkpoints them

/// DDL for the report store.
///
/// Schema version: 1
pub const REPORT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS reports (
    run_id              TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL,
    user_url            TEXT NOT NULL,
    target_keyword      TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'analyzing'
                        CHECK (status IN ('analyzing', 'completed', 'failed')),
    finished_at         TEXT,
    failure_reason      TEXT,
    payment_payer       TEXT,
    payment_tx_hash     TEXT,

    user_site_data      TEXT,
    discovered_keywords TEXT,
    google_ranking      TEXT,
    competitor_data     TEXT,
    patterns            TEXT,
    gaps                TEXT,
    recommendations     TEXT,
    score               TEXT,
    report_data         TEXT
);

CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status);
"#;
