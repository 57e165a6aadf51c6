use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use engine::TimeMachine;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use roguetris::config::ConfigStore;
use roguetris::game::{FrameClock, Game};
use roguetris::phase::GamePhase;
use roguetris::playtest::Autopilot;
use roguetris::pool_store::FileStore;
use roguetris::shapes::PieceKind;
use roguetris::signals::Signal;
use roguetris::Session;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "roguetris-sim")]
#[command(about = "Headless roguelike falling-block simulator")]
struct Cli {
    /// Config file (defaults to ROGUETRIS_CONFIG_PATH or ~/.config/roguetris/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the persisted permanent pool.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Also write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play one run with the autopilot and print a JSON summary.
    Run {
        #[arg(long, default_value_t = 1)]
        seed: u64,
        #[arg(long, default_value_t = 20_000)]
        frames: u64,
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
        /// Frames between autopilot decisions.
        #[arg(long, default_value_t = 8)]
        think_frames: u64,
        /// Write the summary here instead of stdout.
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Save the full state history for replay tooling.
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Inspect or edit the permanent pool.
    Pool {
        #[command(subcommand)]
        action: PoolAction,
    },
}

#[derive(Debug, Subcommand)]
enum PoolAction {
    Show,
    Reset {
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    Remove {
        kind: String,
    },
}

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    frames: u64,
    phase: GamePhase,
    score: u64,
    lines: u32,
    level: u32,
    obstacle_rows: u64,
    upgrades_taken: u64,
    permanent_pool: Vec<PieceKind>,
    current_pool: Vec<PieceKind>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_file.as_ref())?;

    let config_store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env(),
    };
    let config = config_store.load();
    let store = match &cli.data_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::from_env(),
    };
    log::debug!(
        "config {} data {}",
        config_store.path().display(),
        store.dir().display()
    );

    match cli.command {
        Commands::Run {
            seed,
            frames,
            frame_ms,
            think_frames,
            summary,
            record,
        } => {
            let session = Session::open(config, store, seed);
            cmd_run(session, seed, frames, frame_ms, think_frames, summary, record)
        }
        Commands::Pool { action } => {
            let seed = match action {
                PoolAction::Reset { seed } => seed,
                _ => 0,
            };
            let session = Session::open(config, store, seed);
            cmd_pool(session, action)
        }
    }
}

fn init_logging(level: &str, file: Option<&PathBuf>) -> Result<()> {
    let level = LevelFilter::from_str(level)
        .with_context(|| format!("invalid log level '{level}'"))?;
    let pattern = "{d(%H:%M:%S)} {l} {t} {m}{n}";

    // Stdout is reserved for the JSON summary.
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();
    let mut builder =
        Config::builder().appender(Appender::builder().build("console", Box::new(console)));
    let mut root = Root::builder().appender("console");

    if let Some(path) = file {
        let logfile = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(pattern)))
            .build(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        builder = builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root = root.appender("logfile");
    }

    let config = builder
        .build(root.build(level))
        .context("build log config")?;
    log4rs::init_config(config).context("init logging")?;
    Ok(())
}

fn cmd_run(
    mut session: Session<FileStore>,
    seed: u64,
    frames: u64,
    frame_ms: u64,
    think_frames: u64,
    summary: Option<PathBuf>,
    record: Option<PathBuf>,
) -> Result<()> {
    if frame_ms == 0 {
        bail!("--frame-ms must be positive");
    }
    let pilot = Autopilot;
    let mut clock = FrameClock::new();
    let mut history: Option<TimeMachine<Game>> = None;
    let mut obstacle_rows = 0u64;
    let mut upgrades_taken = 0u64;

    session.apply(roguetris::Command::Start);
    if record.is_some() {
        history = Some(TimeMachine::new(session.game().clone()));
    }

    let mut frame = 0;
    while frame < frames {
        if frame % think_frames.max(1) == 0 {
            for command in pilot.plan(session.game()) {
                session.apply(command);
            }
        }
        session.advance_frame(&mut clock, Duration::from_millis(frame * frame_ms));

        for signal in session.drain_signals() {
            match &signal {
                Signal::ObstacleWarning { message, .. } => log::info!("{message}"),
                Signal::ObstacleInjected { columns, level } => {
                    obstacle_rows += 1;
                    log::debug!("obstacle row at {columns:?} (level {level})");
                }
                Signal::LinesCleared { count, points, .. } => {
                    log::debug!("cleared {count} for {points}");
                }
                Signal::UpgradeApplied(id) => {
                    upgrades_taken += 1;
                    log::info!("upgrade {id:?}");
                }
                Signal::LevelUp { level } => log::info!("reached level {level}"),
                _ => log::trace!("{signal:?}"),
            }
        }
        if let Some(h) = history.as_mut() {
            h.record(session.game().clone());
        }
        frame += 1;
        if session.game().phase() == GamePhase::GameOver {
            break;
        }
    }

    let game = session.game();
    let result = RunSummary {
        seed,
        frames: frame,
        phase: game.phase(),
        score: game.scoreboard().score,
        lines: game.scoreboard().lines,
        level: game.scoreboard().level,
        obstacle_rows,
        upgrades_taken,
        permanent_pool: game.progression().permanent_pool().to_vec(),
        current_pool: game.progression().current_pool().to_vec(),
    };
    let json = serde_json::to_string_pretty(&result).context("encode summary")?;
    match summary {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("write summary {}", path.display()))?,
        None => println!("{json}"),
    }

    if let (Some(path), Some(h)) = (record, history) {
        h.save_json_file(&path)
            .with_context(|| format!("write recording {}", path.display()))?;
        log::info!("recorded {} frames to {}", h.len(), path.display());
    }
    Ok(())
}

fn cmd_pool(mut session: Session<FileStore>, action: PoolAction) -> Result<()> {
    match action {
        PoolAction::Show => {}
        PoolAction::Reset { .. } => {
            session.reset_permanent_pool();
        }
        PoolAction::Remove { kind } => {
            let Some(kind) = PieceKind::from_name(&kind) else {
                bail!("unknown piece kind '{kind}'");
            };
            if !session.remove_permanent_piece(kind) {
                bail!("cannot remove {kind}: not in the pool or the pool is at its minimum size");
            }
        }
    }
    let pool = session.game().progression().permanent_pool().to_vec();
    println!(
        "{}",
        serde_json::to_string(&pool).context("encode pool")?
    );
    Ok(())
}
