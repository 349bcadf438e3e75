use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use gridbeat_core::{
    chart, derive_barlines, AppConfig, Chart, GridBeatError, GridModel, InputFrame, NoteBoard,
    NoteKind, ParsedChart, Session, SimulatedAudio,
};
use tracing_subscriber::EnvFilter;

/// Extra simulated time past the last note before a run is declared stuck.
const RUN_GRACE_MS: f64 = 10_000.0;

fn main() -> gridbeat_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { chart, config } => run_inspect(&chart, config.as_deref()),
        Commands::Autoplay { chart, config, fps } => run_autoplay(&chart, config.as_deref(), fps),
        Commands::Export {
            chart,
            output,
            config,
        } => run_export(&chart, &output, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> gridbeat_core::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn load_chart(path: &Path, config: &AppConfig) -> gridbeat_core::Result<(GridModel, ParsedChart)> {
    let grid = GridModel::from_config(config)?;
    let parsed = chart::load(path, &grid)?;
    Ok((grid, parsed))
}

/// A chart that cannot be read plays as an empty one.
fn autoplay_chart(path: &Path, config: &AppConfig) -> gridbeat_core::Result<Chart> {
    let grid = GridModel::from_config(config)?;
    Ok(chart::load_or_empty(path, &grid))
}

fn run_inspect(path: &Path, config: Option<&Path>) -> gridbeat_core::Result<()> {
    let config = load_config(config)?;
    let (_, parsed) = load_chart(path, &config)?;
    let chart = &parsed.chart;

    let skipped: Vec<String> = parsed.skipped.iter().map(ToString::to_string).collect();
    let summary = serde_json::json!({
        "notes": {
            "total": chart.notes().len(),
            "tap": chart.count_of(NoteKind::Tap),
            "drag": chart.count_of(NoteKind::Drag),
            "block": chart.count_of(NoteKind::Block),
        },
        "last_note_ms": chart.last_note_time(),
        "bpm_events": chart.bpm_events().collect::<Vec<_>>(),
        "barlines": derive_barlines(chart),
        "skipped": skipped,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_autoplay(path: &Path, config: Option<&Path>, fps: u32) -> gridbeat_core::Result<()> {
    if fps == 0 {
        return Err(GridBeatError::config("fps must be at least 1"));
    }
    let config = load_config(config)?;
    let chart = autoplay_chart(path, &config)?;
    let frame_ms = 1000.0 / f64::from(fps);
    let deadline_ms = chart.last_note_time().unwrap_or(0.0) + RUN_GRACE_MS;
    tracing::info!(?path, fps, "running autoplay");

    let audio = SimulatedAudio::new();
    let mut session = Session::new(config, chart, NoteBoard::new(), audio.clone())?;
    session.set_autoplay(true);
    session.start()?;

    loop {
        audio.advance(frame_ms)?;
        let report = session.tick(frame_ms, InputFrame::default())?;
        if report.finished() {
            break;
        }
        if report.now_ms > deadline_ms {
            session.end()?;
            return Err(GridBeatError::msg(format!(
                "session still running at {:.0}ms, giving up",
                report.now_ms
            )));
        }
    }

    let result = session.result();
    tracing::info!(
        accuracy = result.accuracy,
        rank = %result.rank,
        shakes = session.presenter().shakes(),
        "autoplay finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_export(path: &Path, output: &Path, config: Option<&Path>) -> gridbeat_core::Result<()> {
    let config = load_config(config)?;
    let (grid, parsed) = load_chart(path, &config)?;
    if !parsed.skipped.is_empty() {
        tracing::warn!(
            skipped = parsed.skipped.len(),
            "malformed lines are dropped from the export"
        );
    }
    std::fs::write(output, parsed.chart.to_text(&grid))?;
    tracing::info!(?output, notes = parsed.chart.notes().len(), "chart exported");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid rhythm game timing and judgment core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a chart and print a summary of its contents.
    Inspect {
        /// Path to the chart file.
        chart: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Play a chart headlessly with the autoplay agent and print the result.
    Autoplay {
        /// Path to the chart file.
        chart: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Simulated frames per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Re-emit a chart in normalised form.
    Export {
        /// Path to the chart file.
        chart: PathBuf,
        /// Destination for the normalised chart.
        output: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
