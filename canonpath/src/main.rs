use canonpath::config::AppConfig;
use canonpath::metrics::{registry, service::MetricsSvc};
use canonpath::path::decision::RedirectPolicy;
use canonpath::report::{Format, Reporter};
use canonpath::server::front::FrontSvc;
use canonpath::telemetry;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const DEFAULT_CONFIG: &str = "canonpath.yaml";

#[derive(Debug, Parser)]
#[command(name = "canonpath", version, about = "Canonicalize HTTP request paths for routing")]
struct Args {
    /// Path to config yaml (relative paths inside config are resolved based on this file's directory)
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean the given paths, or one path per stdin line when none are given
    Clean {
        paths: Vec<String>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Exit with status 1 if any input was not already canonical
        #[arg(long)]
        check: bool,

        /// Print Prometheus metrics to stderr when done
        #[arg(long)]
        metrics: bool,
    },

    /// Run the redirecting HTTP front and the metrics endpoint
    Serve,
}

/// The default config file is optional; a named one is not.
fn load_config(p: &Path) -> anyhow::Result<AppConfig> {
    if p == Path::new(DEFAULT_CONFIG) && !p.exists() {
        return Ok(AppConfig::default());
    }
    AppConfig::load(p).with_context(|| format!("load config {}", p.display()))
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let cfg = load_config(&args.config)?;

    telemetry::init_tracing("canonpath", cfg.log_dir.as_deref())?;

    match args.command {
        Command::Clean {
            paths,
            format,
            check,
            metrics,
        } => {
            let stdout = io::stdout().lock();
            let mut reporter = Reporter::new(io::BufWriter::new(stdout), format);

            if paths.is_empty() {
                let stdin = io::stdin();
                if stdin.is_terminal() {
                    tracing::info!("reading paths from stdin, one per line");
                }
                reporter.clean_lines(stdin.lock())?;
            } else {
                reporter.clean_all(paths.iter().map(String::as_str))?;
            }

            let summary = reporter.finish()?;
            tracing::debug!(total = summary.total, rewritten = summary.rewritten, "clean done");

            if metrics {
                eprint!("{}", registry::gather_as_text());
            }

            if check && summary.rewritten > 0 {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            serve(cfg)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    rt.block_on(async move {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let policy = RedirectPolicy::from_config(&cfg.redirect);
        tracing::info!(?policy, "redirect policy");

        let mut front =
            tokio::spawn(FrontSvc::new(cfg.listen_addr(), policy).run(shutdown_rx.clone()));
        let mut metrics = tokio::spawn(MetricsSvc::new(cfg.metrics_addr()).run(shutdown_rx));

        // services only return early on failure
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("wait for ctrl-c")?,
            res = &mut front => {
                let _ = shutdown_tx.send(true);
                res.context("front task")??;
                anyhow::bail!("front service stopped");
            }
            res = &mut metrics => {
                let _ = shutdown_tx.send(true);
                res.context("metrics task")??;
                anyhow::bail!("metrics service stopped");
            }
        }

        tracing::info!("shutting down");
        let _ = shutdown_tx.send(true);

        front.await.context("front task")??;
        metrics.await.context("metrics task")??;
        Ok::<(), anyhow::Error>(())
    })
}
