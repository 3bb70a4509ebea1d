use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "seogap",
    version,
    about = "SEO gap analysis: compare a page against the competitors that outrank it"
)]
pub struct Cli {
    /// YAML config file (environment variables override it)
    #[arg(long, global = true, env = "SEOGAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report database (overrides store.path)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Run one analysis locally, without payment
    Analyze(AnalyzeArgs),
    /// Poll a run on a server until it finishes
    Watch(WatchArgs),
    /// Render a stored report
    Report(ReportArgs),
    /// Operator commands over the report store
    Reports(ReportsArgs),
    Version,
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Enable debug inspection routes and report PATCH
    #[arg(long)]
    pub debug_endpoints: bool,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub url: String,

    #[arg(long)]
    pub keyword: String,

    #[arg(long, default_value = "cli")]
    pub user: String,

    /// Print the finished report as markdown instead of the summary
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    pub run_id: String,

    /// Base URL of the seogap API
    #[arg(long, env = "SEOGAP_SERVER", default_value = "http://localhost:3000")]
    pub server: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Parser, Debug)]
pub struct ReportArgs {
    pub run_id: String,

    #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
    pub format: ReportFormat,

    /// Write to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ReportsArgs {
    #[command(subcommand)]
    pub cmd: ReportsSub,
}

#[derive(Subcommand, Debug)]
pub enum ReportsSub {
    /// Delete every stored report
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Diagnostic summary of stored runs
    Inspect {
        #[arg(required = true)]
        run_ids: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_with_format_and_output() {
        let cli = Cli::try_parse_from([
            "seogap",
            "--db",
            "r.db",
            "report",
            "seo_1_abcdefghi",
            "--format",
            "json",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("r.db")));
        match cli.cmd {
            Command::Report(args) => {
                assert_eq!(args.format, ReportFormat::Json);
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn inspect_needs_at_least_one_run() {
        assert!(Cli::try_parse_from(["seogap", "reports", "inspect"]).is_err());
        let cli =
            Cli::try_parse_from(["seogap", "reports", "inspect", "seo_1_a", "seo_2_b"]).unwrap();
        match cli.cmd {
            Command::Reports(ReportsArgs {
                cmd: ReportsSub::Inspect { run_ids },
            }) => assert_eq!(run_ids.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn analyze_requires_url_and_keyword() {
        assert!(Cli::try_parse_from(["seogap", "analyze", "--url", "acme.com"]).is_err());
        let cli = Cli::try_parse_from([
            "seogap",
            "analyze",
            "--url",
            "acme.com",
            "--keyword",
            "kanban",
        ])
        .unwrap();
        match cli.cmd {
            Command::Analyze(args) => assert_eq!(args.user, "cli"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
