use crate::cli::args::WatchArgs;
use crate::exit_codes::{RUN_FAILED, SUCCESS};
use anyhow::{bail, Context};
use seogap_core::RunStatus;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: RunStatus,
    pub progress: u8,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

async fn fetch_status(
    client: &reqwest::Client,
    url: &str,
    run_id: &str,
) -> anyhow::Result<StatusView> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;
    match resp.status() {
        s if s.is_success() => Ok(resp.json().await.context("malformed status response")?),
        reqwest::StatusCode::NOT_FOUND => bail!("run {run_id} not found"),
        reqwest::StatusCode::BAD_REQUEST => bail!("invalid run id {run_id}"),
        s => bail!("status request failed ({s})"),
    }
}

/// Poll the status route every `interval` until the run is terminal.
/// `on_change` sees each distinct (status, progress) pair once.
pub async fn poll(
    server: &str,
    run_id: &str,
    interval: Duration,
    mut on_change: impl FnMut(&StatusView),
) -> anyhow::Result<StatusView> {
    let client = reqwest::Client::new();
    let url = format!(
        "{}/api/report/{}/status",
        server.trim_end_matches('/'),
        run_id
    );
    let mut last: Option<StatusView> = None;
    loop {
        let view = fetch_status(&client, &url, run_id).await?;
        debug!(run_id, status = %view.status, progress = view.progress, "polled");
        if last.as_ref() != Some(&view) {
            on_change(&view);
        }
        if view.status.is_terminal() {
            return Ok(view);
        }
        last = Some(view);
        tokio::time::sleep(interval).await;
    }
}

pub async fn run(args: WatchArgs) -> anyhow::Result<i32> {
    let done = poll(&args.server, &args.run_id, POLL_INTERVAL, |v| {
        println!("[{:>3}%] {}", v.progress, v.status);
    })
    .await?;

    match done.status {
        RunStatus::Completed => {
            println!("Run {} completed.", args.run_id);
            Ok(SUCCESS)
        }
        _ => {
            println!(
                "Run {} failed: {}",
                args.run_id,
                done.failure_reason.as_deref().unwrap_or("no reason recorded")
            );
            Ok(RUN_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STATUS_PATH: &str = "/api/report/seo_1700000000000_abcdefghi/status";

    fn status(status: &str, progress: u8) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "status": status,
            "progress": progress,
            "completedSteps": {}
        }))
    }

    #[tokio::test]
    async fn polls_until_terminal_and_reports_changes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STATUS_PATH))
            .respond_with(status("analyzing", 15))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(STATUS_PATH))
            .respond_with(status("completed", 100))
            .mount(&server)
            .await;

        let mut seen = Vec::new();
        let done = poll(
            &server.uri(),
            "seo_1700000000000_abcdefghi",
            Duration::from_millis(5),
            |v| seen.push(v.progress),
        )
        .await
        .unwrap();

        assert_eq!(done.status, RunStatus::Completed);
        assert_eq!(seen, vec![15, 100]);
    }

    #[tokio::test]
    async fn missing_run_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Report not found"})))
            .mount(&server)
            .await;

        let err = poll(
            &server.uri(),
            "seo_1700000000000_abcdefghi",
            Duration::from_millis(5),
            |_| {},
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
