use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use review_lint_engine::config::{load_config, load_config_from};
use review_lint_engine::report::{check_outputs, Conclusion};
use review_lint_engine::{BindingContext, Engine};

/// Run the configured linters on the files touched by a unified diff and
/// print one check-run update per tool category as JSON.
#[derive(Parser, Debug)]
#[command(name = "lint-diff", version, about, long_about = None)]
struct Cli {
    /// Checked-out repository the diff applies to
    #[arg(long, default_value = ".")]
    repo: PathBuf,
    /// File holding the diff; read from stdin when absent
    #[arg(long)]
    diff: Option<PathBuf>,
    /// Value of $CI_CHECK_TYPE in command templates
    #[arg(long, default_value = "lint")]
    check_type: String,
    /// Value of $CI_CHECK_REF in command templates
    #[arg(long, default_value = "")]
    check_ref: String,
    /// JSON config file (overrides LINT_ENGINE_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,
    /// Exit with status 1 unless every category concluded successfully
    #[arg(long)]
    exit_code: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_diff(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading diff from {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("reading diff from stdin")?;
            Ok(buffer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let repo = std::fs::canonicalize(&cli.repo)
        .with_context(|| format!("repository {} is not accessible", cli.repo.display()))?;
    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let threshold = config.fail_threshold;
    let diff_text = read_diff(cli.diff.as_ref())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling running tools");
            on_signal.cancel();
        }
    });

    let ctx = BindingContext::new(repo, cli.check_type, cli.check_ref);
    let report = Engine::new(config)
        .run(&diff_text, &ctx, &cancel)
        .await
        .context("lint run failed")?;

    let outputs = check_outputs(&report, threshold);
    println!("{}", serde_json::to_string_pretty(&outputs)?);

    if cli.exit_code && outputs.iter().any(|o| o.conclusion != Conclusion::Success) {
        std::process::exit(1);
    }
    Ok(())
}
