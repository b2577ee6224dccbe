/// Soul Loudness - measure and normalize track loudness
use clap::{Parser, Subcommand};
use soul_loudness::{GainCalculator, LoudnessMeasurement, NormalizationTarget};
use soul_loudness_cli::{CliConfig, MeasureReport, Session};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-loudness")]
#[command(about = "Measure integrated loudness and normalization gain", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SOUL_LOUDNESS_CONFIG")]
    config: Option<PathBuf>,

    /// Target loudness (preset name or LUFS), overrides the config file
    #[arg(short, long, global = true, allow_hyphen_values = true)]
    target: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure one or more files or URLs
    Measure {
        /// Sources to measure
        #[arg(required = true)]
        sources: Vec<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Compute the gain for a known measurement
    Gain {
        /// Integrated loudness in LUFS
        #[arg(long, allow_hyphen_values = true)]
        lufs: f64,

        /// Sample peak (linear, 0.0-1.0)
        #[arg(long, default_value_t = 1.0)]
        peak: f64,
    },
    /// Write a normalized 32-bit float WAV copy of a source
    Apply {
        /// Source file or URL
        source: String,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Fade in from unity with the configured ramp instead of applying
        /// the gain from the first sample
        #[arg(long)]
        ramp: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul_loudness_cli=info,soul_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(target) = cli.target {
        config.normalizer.target = target;
    }
    config.validate()?;

    match cli.command {
        Commands::Measure { sources, json } => {
            measure(&config, &sources, json).await?;
        }
        Commands::Gain { lufs, peak } => {
            gain(&config, lufs, peak)?;
        }
        Commands::Apply {
            source,
            output,
            ramp,
        } => {
            if !ramp {
                config.settings.ramp_ms = 0;
            }
            apply(&config, &source, output).await?;
        }
    }

    Ok(())
}

async fn measure(config: &CliConfig, sources: &[String], json: bool) -> anyhow::Result<()> {
    let session = Session::new(config)?;
    tracing::info!(
        sources = sources.len(),
        target_lufs = session.target_lufs(),
        "Measuring loudness"
    );

    let reports = session.measure_all(sources).await;
    session.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", format_report(report));
        }
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} sources could not be measured", reports.len());
    }
    Ok(())
}

fn gain(config: &CliConfig, lufs: f64, peak: f64) -> anyhow::Result<()> {
    let target: NormalizationTarget = config.target()?;
    let measurement = LoudnessMeasurement::new(lufs, peak);
    let calculator: GainCalculator = config.settings.calculator();

    match calculator.gain_db(Some(&measurement), target.lufs()) {
        Some(gain_db) => println!(
            "{measurement} -> {:+.2} dB (x{:.4}) toward {:.1} LUFS",
            gain_db,
            soul_loudness::db_to_linear(gain_db),
            target.lufs()
        ),
        None => println!("{measurement} -> unity (no usable gain)"),
    }
    Ok(())
}

async fn apply(config: &CliConfig, source: &str, output: PathBuf) -> anyhow::Result<()> {
    let session = Session::new(config)?;
    let report = session.render(source, &output).await?;
    session.close();

    println!(
        "{} -> {} ({:+.2} dB, {} frames)",
        report.source, report.output, report.gain_db, report.frames
    );
    Ok(())
}

fn format_report(report: &MeasureReport) -> String {
    if let Some(error) = &report.error {
        return format!("{}: error: {error}", report.source);
    }

    let lufs = report
        .lufs
        .map_or_else(|| "silent".to_string(), |lufs| format!("{lufs:.1} LUFS"));
    format!(
        "{}: {lufs}, peak {:.1} dBFS, gain {:+.2} dB",
        report.source,
        report.peak_dbfs.unwrap_or(f64::NEG_INFINITY),
        report.gain_db.unwrap_or(0.0)
    )
}
