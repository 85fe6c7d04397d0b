//! HopShell console
//!
//! Plays a session on the local terminal, one stdin line per engine call.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossterm::cursor::MoveTo;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, tty::IsTty};
use engine::config::Config;
use engine::console::SessionEngine;
use protocol::{OutputLine, RenderSnapshot, Severity};
use tracing_subscriber::EnvFilter;

/// HopShell - a simulated terminal with SSH hopping between fake devices.
#[derive(Parser, Debug)]
#[command(name = "hopshell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// World file to play (overrides the configuration)
    #[arg(short, long, value_name = "FILE")]
    pub world: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Start with engine debug output enabled
    #[arg(long)]
    pub debug: bool,

    /// Print each snapshot as a JSON line instead of rendering it
    #[arg(long)]
    pub json: bool,

    /// Write logs to daily files in this directory instead of stderr
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let env_overrides = config.apply_env_overrides();
    if let Some(world) = &cli.world {
        config.engine.world_file = world.clone();
    }
    if cli.debug {
        config.engine.debug = true;
    }
    config.validate()?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.engine.log_level.to_lowercase()
    };
    let _guard = init_tracing(&level, cli.log_dir.as_ref())?;

    for (key, value) in &env_overrides {
        tracing::info!("Overriding {} from environment: {}", key, value);
    }

    tracing::info!("HopShell starting with world {:?}", config.engine.world_file);

    let mut engine = SessionEngine::from_config(&config)?;
    engine.initialize()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let color = !cli.json && stdout.is_tty();

    // The first call shows the boot banner without consuming input.
    let snapshot = engine.execute("");
    present(&mut stdout, &snapshot, cli.json, color)?;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        let snapshot = engine.execute(&line);
        present(&mut stdout, &snapshot, cli.json, color)?;
    }

    tracing::info!("Input closed, session ended");
    Ok(())
}

/// Set up logging to stderr, or to `log_dir` when given.
fn init_tracing(
    level: &str,
    log_dir: Option<&PathBuf>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "hopshell.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn present(
    out: &mut impl Write,
    snapshot: &RenderSnapshot,
    json: bool,
    color: bool,
) -> anyhow::Result<()> {
    if json {
        writeln!(out, "{}", snapshot.to_json()?)?;
        out.flush()?;
        return Ok(());
    }

    if snapshot.clear_screen && color {
        execute!(out, Clear(ClearType::All), MoveTo(0, 0))?;
    }
    for line in &snapshot.boot_lines {
        writeln!(out, "{line}")?;
    }
    for line in &snapshot.output {
        write_line(out, line, color)?;
    }
    write!(out, "{}", snapshot.prompt)?;
    out.flush()?;
    Ok(())
}

fn write_line(out: &mut impl Write, line: &OutputLine, color: bool) -> io::Result<()> {
    if !color {
        return writeln!(out, "{}", line.text);
    }
    let text = line.text.as_str();
    match line.severity {
        Severity::Info => writeln!(out, "{text}"),
        Severity::Success => writeln!(out, "{}", text.green()),
        Severity::Warning => writeln!(out, "{}", text.yellow()),
        Severity::Error => writeln!(out, "{}", text.red()),
        Severity::Debug => writeln!(out, "{}", text.dark_grey()),
    }
}
