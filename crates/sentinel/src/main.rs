use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sentinel::report::{count_errors, render_text};
use sentinel::Engine;
use sentinel_core::config::CliOverrides;
use sentinel_core::SentinelConfig;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Live policy checks for TypeScript projects.", long_about = None)]
struct Cli {
    /// Project root to analyze.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the project and push violations to connected consoles.
    Watch {
        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Do not analyze the whole tree before watching.
        #[arg(long)]
        skip_initial_scan: bool,
    },
    /// Analyze the whole project once and print the findings.
    Check {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sentinel: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut overrides = CliOverrides {
        verbose: cli.verbose.then_some(true),
        ..CliOverrides::default()
    };
    if let Command::Watch {
        port, debounce_ms, ..
    } = &cli.command
    {
        overrides.channel_port = *port;
        overrides.debounce_ms = *debounce_ms;
    }
    let config = SentinelConfig::load(&cli.root, Some(&overrides))
        .with_context(|| format!("loading configuration under {}", cli.root.display()))?;
    sentinel_core::tracing::init_tracing(config.effective_verbose());

    let engine = Engine::new(&cli.root, config).context("building engine")?;

    match cli.command {
        Command::Check { format } => {
            let reports = engine.analyze_tree();
            match format {
                Format::Text => print!("{}", render_text(&reports, engine.root())),
                Format::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            }
            Ok(if count_errors(&reports) > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Watch {
            skip_initial_scan, ..
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(watch(Arc::new(engine), skip_initial_scan))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn watch(engine: Arc<Engine>, skip_initial_scan: bool) -> Result<()> {
    let addr = engine.start().await.context("starting sentinel")?;
    println!("sentinel watching {} on ws://{addr}/ws", engine.root().display());

    if !skip_initial_scan {
        let scan = Arc::clone(&engine);
        let reports = tokio::task::spawn_blocking(move || scan.analyze_tree())
            .await
            .context("initial scan")?;
        let stats = engine.stats();
        tracing::info!(
            files = reports.len(),
            violations = stats.violations,
            "initial scan complete"
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    engine.shutdown().await;
    Ok(())
}
