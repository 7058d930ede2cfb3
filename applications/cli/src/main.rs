/// Crest - offline loudness analysis and mastering
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use crest_cli::{input, pipeline, resolve_settings, SettingsOverrides};
use crest_core::{BitDepth, DitherMode, TargetPreset};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crest", long_about = None)]
#[command(about = "Loudness analysis and mastering for WAV files")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure loudness, loudness range and peaks
    Analyze {
        /// Input WAV file
        input: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Normalize, limit and write a new WAV file
    Master {
        /// Input WAV file
        input: PathBuf,
        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
        /// Target integrated loudness in LUFS
        #[arg(long, allow_hyphen_values = true)]
        target_lufs: Option<f64>,
        /// Named target: streaming, apple-music, broadcast
        #[arg(long, value_parser = parse_preset)]
        preset: Option<TargetPreset>,
        /// True-peak ceiling in dBTP
        #[arg(long, allow_hyphen_values = true)]
        ceiling: Option<f64>,
        /// Output bit depth (16 or 24)
        #[arg(long, value_parser = parse_bit_depth)]
        bit_depth: Option<BitDepth>,
        /// Dither: none, tpdf, noise-shaped
        #[arg(long, value_parser = parse_dither)]
        dither: Option<DitherMode>,
        /// Settings file (defaults to ./crest.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_preset(s: &str) -> Result<TargetPreset, String> {
    TargetPreset::from_str(s).ok_or_else(|| format!("unknown preset '{}'", s))
}

fn parse_bit_depth(s: &str) -> Result<BitDepth, String> {
    let bits: u16 = s
        .parse()
        .map_err(|_| format!("'{}' is not a bit depth", s))?;
    BitDepth::try_from(bits).map_err(|e| e.to_string())
}

fn parse_dither(s: &str) -> Result<DitherMode, String> {
    DitherMode::from_str(s).ok_or_else(|| format!("unknown dither mode '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "crest=debug,crest_cli=debug,crest_loudness=debug,crest_pcm=debug"
    } else {
        "crest=info,crest_cli=info,crest_loudness=info,crest_pcm=info"
    };
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(fmt_layer)
        .init();

    match cli.command {
        Commands::Analyze { input, json } => analyze(input, json).await,
        Commands::Master {
            input,
            output,
            target_lufs,
            preset,
            ceiling,
            bit_depth,
            dither,
            config,
            json,
        } => {
            let overrides = SettingsOverrides {
                preset,
                target_lufs,
                ceiling_dbtp: ceiling,
                bit_depth,
                dither,
            };
            master(input, output, config, &overrides, json).await
        }
    }
}

async fn analyze(path: PathBuf, json: bool) -> anyhow::Result<()> {
    let report = tokio::task::spawn_blocking(move || {
        let buffer = input::read_wav(&path)?;
        pipeline::analyze(&buffer)
    })
    .await
    .context("analysis task failed")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
        println!(
            "Duration: {:.2} s, {} Hz, {} channel(s)",
            report.duration_seconds, report.sample_rate, report.channels
        );
    }
    Ok(())
}

async fn master(
    input_path: PathBuf,
    output_path: PathBuf,
    config_path: Option<PathBuf>,
    overrides: &SettingsOverrides,
    json: bool,
) -> anyhow::Result<()> {
    let settings = resolve_settings(config_path.as_deref(), overrides)
        .context("invalid mastering settings")?;
    tracing::info!(
        target_lufs = settings.target_lufs,
        ceiling_dbtp = settings.ceiling_dbtp,
        bit_depth = settings.bit_depth.bits(),
        dither = settings.dither.as_str(),
        "Mastering {}",
        input_path.display()
    );

    let blocking_settings = settings.clone();
    let track = tokio::task::spawn_blocking(move || {
        let buffer = input::read_wav(&input_path)?;
        pipeline::master(buffer, &blocking_settings)
    })
    .await
    .context("mastering task failed")??;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let bytes = pipeline::encode(
        &track,
        &settings,
        |fraction| {
            eprint!("\rEncoding {:>3.0}%", fraction * 100.0);
            let _ = std::io::stderr().flush();
        },
        || cancelled.load(Ordering::SeqCst),
    )
    .await;
    eprintln!();

    let bytes = match bytes {
        Ok(bytes) => bytes,
        Err(err) if err.is_cancelled() => {
            bail!("cancelled, {} was not written", output_path.display())
        }
        Err(err) => return Err(err.into()),
    };

    input::write_file(&output_path, &bytes)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&track.summary())?);
    } else {
        println!("Source: {}", track.source);
        println!("Result: {}", track.result);
        if let Some(reason) = track.normalization.skipped_reason {
            println!("Normalization skipped: {}", reason.as_str());
        } else {
            println!(
                "Gain: {:+.2} dB{}",
                track.normalization.applied_gain_db,
                if track.normalization.limited {
                    format!(
                        ", limited by up to {:.2} dB",
                        -track.normalization.max_reduction_db
                    )
                } else {
                    String::new()
                }
            );
        }
        println!("Wrote {} ({} bytes)", output_path.display(), bytes.len());
    }
    Ok(())
}
