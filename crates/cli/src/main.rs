//! spoilr: headless screenshot, upload and report generator.
//!
//! Configuration is read from `spoilr.toml` (working directory first, then the
//! user config dir) with `SPOILR_` environment overrides.

mod observer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, TextEncoder};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spoilr_core::{
    config::default_config_path, load_or_default, save_config, validate_config, Config,
    FfmpegMedia, PipelineProcessor, ProcessingState, RunConfig, SanitizedConfig, UploaderSet,
};

use observer::LogObserver;

#[derive(Parser)]
#[command(name = "spoilr", version, about = "Batch video screenshots, uploads and reports")]
struct Cli {
    /// Config file (defaults to ./spoilr.toml or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process video files and print the report
    Run {
        /// Files or directories to process
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Template preset to use (id or name) instead of the current one
        #[arg(long)]
        preset: Option<String>,
        /// Write the report to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print metrics in Prometheus text format after the run
        #[arg(long)]
        metrics: bool,
    },
    /// Template preset operations
    Presets {
        #[command(subcommand)]
        sub: PresetCommands,
    },
    /// Show the effective configuration with secrets redacted
    Config,
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List presets, marking the current one
    List,
    /// Print a preset's template text
    Show {
        /// Preset id or name (defaults to the current preset)
        preset: Option<String>,
    },
    /// Make a preset current
    Use {
        /// Preset id or name
        preset: String,
    },
    /// Save a new preset from a template file
    Add {
        /// Preset name
        name: String,
        /// File containing the template text
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a preset
    Delete {
        /// Preset id or name
        preset: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    info!("Loading configuration from {:?}", config_path);
    let mut config = load_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    match cli.command {
        Commands::Run {
            paths,
            preset,
            output,
            metrics,
        } => {
            if let Some(preset) = preset {
                let id = preset_id(&config, &preset)?;
                config.templates.set_current_preset(&id)?;
            }
            validate_config(&config).context("Configuration validation failed")?;
            process(&config, &paths, output.as_deref()).await?;
            if metrics {
                print!("{}", encode_metrics()?);
            }
        }
        Commands::Presets { sub } => presets(&mut config, &config_path, sub)?,
        Commands::Config => {
            let sanitized = SanitizedConfig::from(&config);
            let out = serde_json::to_string_pretty(&sanitized).context("Serialize config")?;
            println!("{}", out);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json_layer = json.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

/// Runs one processing run over `paths` and writes the report.
async fn process(config: &Config, paths: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let processor = PipelineProcessor::new(
        &config.settings,
        FfmpegMedia::new(config.tools.clone()),
        UploaderSet::http(),
        Arc::new(LogObserver::default()),
    );

    let summary = processor.add_files(paths).await?;
    if summary.added == 0 {
        bail!("No video files found in the given paths");
    }

    let run_config = RunConfig::from_config(config);
    let template = run_config.template.clone();
    processor.start(run_config).await?;

    tokio::select! {
        _ = processor.wait() => {}
        _ = shutdown_signal() => {
            warn!("Interrupted, cancelling run");
            processor.cancel().await;
            processor.wait().await;
        }
    }

    let snapshot = processor.registry().snapshot().await;
    for item in &snapshot.items {
        match item.state {
            ProcessingState::Error => warn!(
                file = %item.file_name,
                error = item.error.as_deref().unwrap_or_default(),
                "Item failed"
            ),
            ProcessingState::Completed if !item.warnings.is_empty() => {
                for warning in &item.warnings {
                    warn!(file = %item.file_name, "{}", warning);
                }
            }
            _ => {}
        }
    }

    let report = processor.render_report(&template).await;
    match output {
        Some(path) => {
            tokio::fs::write(path, &report)
                .await
                .with_context(|| format!("Failed to write report to {:?}", path))?;
            info!("Report written to {:?}", path);
        }
        None => println!("{}", report),
    }

    Ok(())
}

fn preset_id(config: &Config, id_or_name: &str) -> Result<String> {
    config
        .templates
        .find(id_or_name)
        .map(|p| p.id.clone())
        .with_context(|| format!("Unknown preset: {}", id_or_name))
}

fn presets(config: &mut Config, config_path: &Path, command: PresetCommands) -> Result<()> {
    match command {
        PresetCommands::List => {
            for preset in &config.templates.presets {
                let marker = if preset.id == config.templates.current_preset_id {
                    "*"
                } else {
                    " "
                };
                println!("{} {}  {}", marker, preset.id, preset.name);
            }
            return Ok(());
        }
        PresetCommands::Show { preset } => {
            let text = match preset {
                Some(preset) => {
                    let id = preset_id(config, &preset)?;
                    config
                        .templates
                        .find(&id)
                        .map(|p| p.template.clone())
                        .unwrap_or_default()
                }
                None => config.templates.current_template(),
            };
            println!("{}", text);
            return Ok(());
        }
        PresetCommands::Use { preset } => {
            let id = preset_id(config, &preset)?;
            config.templates.set_current_preset(&id)?;
            info!("Current preset is now {}", id);
        }
        PresetCommands::Add { name, file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read template from {:?}", file))?;
            let preset = config.templates.save_preset(&name, text)?;
            info!("Saved preset {} ({})", preset.name, preset.id);
        }
        PresetCommands::Delete { preset } => {
            let id = preset_id(config, &preset)?;
            config.templates.delete_preset(&id)?;
            info!("Deleted preset {}", id);
        }
    }

    save_config(config_path, config)
        .with_context(|| format!("Failed to save config to {:?}", config_path))
}

/// Core metrics in Prometheus text format.
fn encode_metrics() -> Result<String> {
    let registry = prometheus::Registry::new();
    for metric in spoilr_core::metrics::all_metrics() {
        registry.register(metric)?;
    }

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
