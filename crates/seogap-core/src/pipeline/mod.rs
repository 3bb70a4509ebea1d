//! Run orchestration: stage sequencing, checkpointing, resume and the
//! failure boundary.

pub mod report;
pub mod stages;
pub mod status;

use crate::analysis::{compute_score, detect_ranking};
use crate::config::{HeadlineKind, PipelineConfig};
use crate::errors::sanitize_message;
use crate::model::{Checkpoint, Headline, ReportRecord, RunStatus};
use crate::prompts::{self, OverviewHeadline};
use crate::providers::{LlmClient, PageExtractor, SearchProvider};
use crate::storage::{ReportStore, StoreError};
use report::ReportInputs;
use stages::Stage;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub use status::{progress, CompletedSteps, RunProgress};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run {0} not found")]
    NotFound(String),

    #[error("workflow stage {stage} failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs the analysis for stored records.
///
/// Cheap to clone; each run executes on its own task.
#[derive(Clone)]
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn PageExtractor>,
    store: ReportStore,
    config: PipelineConfig,
    structured_output: bool,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchProvider>,
        extractor: Arc<dyn PageExtractor>,
        store: ReportStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            search,
            extractor,
            store,
            config,
            structured_output: false,
        }
    }

    /// Request schema-constrained JSON from the LLM.
    pub fn with_structured_output(mut self, on: bool) -> Self {
        self.structured_output = on;
        self
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `run_id` in the background.
    pub fn spawn(&self, run_id: String) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run(&run_id).await {
                error!(run_id = %run_id, error = %e, "run aborted");
            }
        })
    }

    /// Restart every run left `analyzing` (e.g. by a crash).
    pub fn resume_all(&self) -> Result<Vec<String>, PipelineError> {
        let ids = self.store.list_in_progress()?;
        for id in &ids {
            info!(run_id = %id, "resuming interrupted run");
            self.spawn(id.clone());
        }
        Ok(ids)
    }

    /// Execute (or resume) a run to a terminal state.
    ///
    /// Stage failures end the run as `failed` and are reported through the
    /// returned status; `Err` is reserved for store failures at the boundary.
    pub async fn run(&self, run_id: &str) -> Result<RunStatus, PipelineError> {
        let record = self
            .store
            .get(run_id)?
            .ok_or_else(|| PipelineError::NotFound(run_id.to_string()))?;
        if record.status.is_terminal() {
            debug!(run_id, status = %record.status, "run already finished");
            return Ok(record.status);
        }

        let span = info_span!("run", run_id = %run_id);
        let started = Instant::now();
        match self.execute(record).instrument(span).await {
            Ok(()) => {
                self.store.complete(run_id)?;
                info!(
                    run_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "run completed"
                );
                Ok(RunStatus::Completed)
            }
            Err(e) => {
                error!(run_id, error = %e, "run failed");
                let reason = sanitize_message(&e.to_string());
                match self.store.fail(run_id, reason) {
                    Ok(()) => Ok(RunStatus::Failed),
                    Err(StoreError::NotAnalyzing { status, .. }) => {
                        warn!(run_id, %status, "run finished elsewhere before failure was recorded");
                        Ok(status)
                    }
                    Err(store_err) => Err(store_err.into()),
                }
            }
        }
    }

    /// Run one stage unless its output is already checkpointed, then persist it.
    async fn step<T, F, Fut>(
        &self,
        run_id: &str,
        stage: Stage,
        existing: Option<T>,
        checkpoint: fn(T) -> Checkpoint,
        work: F,
    ) -> Result<T, PipelineError>
    where
        T: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(value) = existing {
            debug!(stage = %stage, "stage already checkpointed; skipping");
            return Ok(value);
        }
        let started = Instant::now();
        info!(stage = %stage, "stage started");
        let value = work().await.map_err(|e| PipelineError::Stage {
            stage,
            message: format!("{e:#}"),
        })?;
        self.store.checkpoint(run_id, &checkpoint(value.clone()))?;
        info!(
            stage = %stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage completed"
        );
        Ok(value)
    }

    async fn execute(&self, record: ReportRecord) -> Result<(), PipelineError> {
        let ReportRecord {
            run_id,
            user_url,
            target_keyword,
            user_site_data,
            discovered_keywords,
            google_ranking,
            competitor_data,
            patterns,
            gaps,
            recommendations,
            score,
            report_data,
            ..
        } = record;
        let run_id = run_id.as_str();
        let structured = self.structured_output;
        let llm = self.llm.as_ref();
        let search = self.search.as_ref();
        let extractor = self.extractor.as_ref();

        let site = self
            .step(run_id, Stage::FetchSite, user_site_data, Checkpoint::UserSiteData, || {
                stages::fetch_site(extractor, &user_url)
            })
            .await?;

        let keywords = self
            .step(
                run_id,
                Stage::DiscoverKeywords,
                discovered_keywords,
                Checkpoint::DiscoveredKeywords,
                || stages::discover_keywords(llm, &site, structured),
            )
            .await?;

        let ranking = self
            .step(run_id, Stage::DetectRanking, google_ranking, Checkpoint::GoogleRanking, || async {
                let ranking =
                    detect_ranking(search, &target_keyword, &user_url, self.config.ranking_pages).await;
                Ok::<_, anyhow::Error>(ranking)
            })
            .await?;

        let competitors = self
            .step(
                run_id,
                Stage::FetchCompetitors,
                competitor_data,
                Checkpoint::CompetitorData,
                || async {
                    let candidates = stages::find_competitors(
                        self.config.competitor_source,
                        llm,
                        search,
                        &target_keyword,
                        &site,
                        &user_url,
                        self.config.max_competitors,
                        structured,
                    )
                    .await?;
                    let pages =
                        stages::fetch_competitors(extractor, &target_keyword, &candidates).await;
                    Ok::<_, anyhow::Error>(pages)
                },
            )
            .await?;

        let patterns = self
            .step(run_id, Stage::AnalyzePatterns, patterns, Checkpoint::Patterns, || {
                stages::analyze_patterns(llm, &competitors, structured)
            })
            .await?;

        let gaps = self
            .step(run_id, Stage::IdentifyGaps, gaps, Checkpoint::Gaps, || {
                stages::identify_gaps(llm, &site, &patterns, structured)
            })
            .await?;

        let recommendations = self
            .step(
                run_id,
                Stage::Recommendations,
                recommendations,
                Checkpoint::Recommendations,
                || stages::generate_recommendations(llm, &site, &gaps, Some(&keywords), &target_keyword),
            )
            .await?;

        let headline = match self.config.headline {
            HeadlineKind::Ranking => Headline::Ranking {
                google_ranking: ranking.rank,
                google_ranking_url: ranking.found_url.clone(),
            },
            HeadlineKind::Score => {
                let score = self
                    .step(run_id, Stage::Score, score, Checkpoint::Score, || async {
                        Ok::<_, anyhow::Error>(compute_score(&site, &patterns, &gaps))
                    })
                    .await?;
                Headline::Score { score }
            }
        };

        self.step(
            run_id,
            Stage::AssembleReport,
            report_data.map(Box::new),
            Checkpoint::ReportData,
            || async {
                let inputs = ReportInputs {
                    user_url: &user_url,
                    target_keyword: &target_keyword,
                    site: &site,
                    keywords: Some(&keywords),
                    competitors: &competitors,
                    patterns: &patterns,
                    gaps: &gaps,
                    recommendations: &recommendations,
                    headline: headline.clone(),
                };
                let overview_headline = match &headline {
                    Headline::Ranking { .. } => OverviewHeadline::Ranking(&ranking),
                    Headline::Score { score } => OverviewHeadline::Score(*score),
                };
                let overview = self
                    .llm
                    .complete(&prompts::executive_overview(
                        &site,
                        &user_url,
                        &target_keyword,
                        &patterns,
                        &gaps,
                        overview_headline,
                    ))
                    .await
                    .map(|r| r.text)
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "executive summary request failed; using generated overview");
                        String::new()
                    });
                Ok::<_, anyhow::Error>(Box::new(report::assemble(&inputs, overview)))
            },
        )
        .await?;

        Ok(())
    }
}
