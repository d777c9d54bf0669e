use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sound_events::commands::{self, DetectOptions};

#[derive(Parser, Debug)]
#[command(
    name = "sound-events",
    about = "Detect claps and whistles in WAV recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect events in one or more files
    Detect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// JSON detector configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory for per-file JSON results
        #[arg(long)]
        output: Option<PathBuf>,
        /// Append stage progress to this JSONL file
        #[arg(long)]
        trace: Option<PathBuf>,
        /// Print the gate breakdown of every detection
        #[arg(long)]
        explain: bool,
    },
    /// Compare detections of two files
    Compare {
        first: PathBuf,
        second: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Dump per-frame features as JSON lines
    Features {
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect {
            files,
            config,
            output,
            trace,
            explain,
        } => run_detect(DetectOptions {
            files,
            config,
            output_dir: output,
            trace,
            explain,
        }),
        Commands::Compare {
            first,
            second,
            config,
        } => {
            let config = commands::load_config(config.as_deref())?;
            let comparison = commands::compare_files(&config, &first, &second)
                .with_context(|| format!("comparing {} and {}", first.display(), second.display()))?;
            println!("{comparison}");
            Ok(ExitCode::from(0))
        }
        Commands::Features {
            file,
            config,
            output,
        } => run_features(&file, config, output),
    }
}

fn run_detect(options: DetectOptions) -> Result<ExitCode> {
    let reports = commands::detect_files(&options).context("running detection")?;

    for report in &reports {
        match &report.result {
            Ok(result) => {
                println!("{}", result.summary());
                for decision in &report.decisions {
                    println!("  [{:.3}s] {}", decision.time_secs, decision.reasoning);
                }
            }
            Err(err) => eprintln!("Failed: {}: {}", report.file, err),
        }
        if let Some(err) = &report.save_error {
            eprintln!("Failed to save results: {}: {}", report.file, err);
        }
    }

    let failures = reports.iter().filter(|r| !r.is_success()).count();
    if failures == reports.len() {
        Ok(ExitCode::from(1))
    } else if failures > 0 {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_features(
    file: &std::path::Path,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let config = commands::load_config(config.as_deref())?;
    let frames = commands::extract_frame_features(&config, file)
        .with_context(|| format!("extracting features from {}", file.display()))?;

    let mut lines = String::new();
    for frame in &frames {
        lines.push_str(&serde_json::to_string(frame)?);
        lines.push('\n');
    }

    match output {
        Some(path) => {
            fs::write(&path, lines).with_context(|| format!("writing {}", path.display()))?
        }
        None => std::io::stdout().write_all(lines.as_bytes())?,
    }

    Ok(ExitCode::from(0))
}
