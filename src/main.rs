//! Floodboard CLI - dashboard and headless commands

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use floodboard::config::{BoardConfig, SERVER_ENV};
use floodboard::error::{BoardError, FixSuggestion};
use floodboard::export::download_geojson;
use floodboard::report::{ReportSource, PREVIEW_LINES};
use floodboard::runner::{RunController, RunOutcome};
use floodboard::stream::drive_run;
use floodboard::Backend;

#[derive(Parser)]
#[command(name = "floodboard")]
#[command(about = "Floodboard - dashboard for the drainage flood simulation")]
#[command(version)]
struct Cli {
    /// Simulation server address
    #[arg(long, global = true, env = SERVER_ENV)]
    server: Option<String>,

    /// Config file (defaults to ./floodboard.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file (the dashboard discards logs otherwise)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the terminal dashboard (default)
    Dashboard,

    /// Run one simulation and stream its log
    Simulate {
        /// Storm intensity (defaults to the configured value)
        #[arg(short, long)]
        intensity: Option<u32>,
    },

    /// Print the latest design report
    Report,

    /// Download the proposed drainage network as GeoJSON
    Export {
        /// Destination file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print cache-busted map addresses
    Maps,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Commands::Dashboard));

    if let Err(e) = init_tracing(cli.log_file.as_deref(), interactive) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn init_tracing(log_file: Option<&std::path::Path>, interactive: bool) -> Result<(), BoardError> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        // Logging to stderr would scribble over the alternate screen
        None if interactive => builder.with_writer(std::io::sink).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), BoardError> {
    let config = BoardConfig::load(cli.config.as_deref())?
        .with_env()
        .with_server(cli.server);
    let backend = Backend::new(config)?;

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => floodboard::tui::run(backend)
            .await
            .map_err(|e| BoardError::Dashboard {
                reason: format!("{e:#}"),
            }),
        Commands::Simulate { intensity } => simulate(&backend, intensity).await,
        Commands::Report => {
            let doc = backend.report.load().await?;
            println!("{}", doc.content);
            Ok(())
        }
        Commands::Export { out } => {
            let dest = out.unwrap_or_else(|| backend.config.geojson_file.clone());
            let bytes = download_geojson(&backend.client, &backend.geojson_url()?, &dest).await?;
            println!(
                "{} Saved {} ({} bytes)",
                "✓".green(),
                dest.display().to_string().cyan(),
                bytes
            );
            Ok(())
        }
        Commands::Maps => {
            let mut coordinator = backend.coordinator()?;
            coordinator.bust_maps();
            for map in coordinator.maps() {
                println!("{:<8} {}", map.name.cyan().bold(), map.url);
            }
            Ok(())
        }
    }
}

async fn simulate(backend: &Backend, intensity: Option<u32>) -> Result<(), BoardError> {
    let intensity = intensity.unwrap_or(backend.config.intensity);
    let mut controller = RunController::new();
    let request = controller.start(intensity)?;

    println!(
        "{} Simulating with intensity {} on {}",
        "→".cyan(),
        intensity.to_string().cyan().bold(),
        backend.config.server.cyan()
    );

    let outcome = drive_run(
        &mut controller,
        backend.simulation.as_ref(),
        request,
        backend.config.stream_idle_timeout(),
        |event| println!("  {} {}", "›".yellow(), event.message),
    )
    .await;

    match outcome {
        RunOutcome::Succeeded { run_id } => {
            println!("{} Simulation completed", "✓".green());

            let mut coordinator = backend.coordinator()?;
            if let Some(plan) = coordinator.on_run_complete(run_id, false) {
                for map in coordinator.maps() {
                    println!("  {} {:<6} {}", "▣".cyan(), map.name, map.url);
                }
                let refreshed = plan.execute(backend.report.as_ref()).await;
                match refreshed.preview {
                    Ok(doc) => {
                        println!("{}", "Report preview:".cyan().bold());
                        for line in doc.preview(PREVIEW_LINES) {
                            println!("  {}", line);
                        }
                    }
                    Err(e) => eprintln!("  {} report unavailable: {}", "!".yellow(), e),
                }
            }
            Ok(())
        }
        RunOutcome::Failed { error, .. } => Err(BoardError::Stream(error)),
    }
}
