mod commands;
mod shell;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use slotkeep_core::{Archive, ArchiveConfig, CoreError};
use tracing::Level;

use crate::commands::{ArchiveCommand, execute};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// TOML file naming the directories and templates
    #[arg(long, env = "SLOTKEEP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Directory holding the game's own save files [default: www/save]
    #[arg(long, value_name = "DIR")]
    game_save_dir: Option<PathBuf>,
    /// Directory holding the archive [default: www/save_manager]
    #[arg(long, value_name = "DIR")]
    working_dir: Option<PathBuf>,
    /// Game save file name, e.g. `file{slot}.rpgsave`
    #[arg(long, value_name = "TEMPLATE")]
    game_save_template: Option<String>,
    /// Archived save file name, e.g. `{id}_{memo}.save.sm`
    #[arg(long, value_name = "TEMPLATE")]
    payload_template: Option<String>,
    /// Slot marker file name, e.g. `slot_{slot}-id_{id}.mapping.sm`
    #[arg(long, value_name = "TEMPLATE")]
    marker_template: Option<String>,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    #[command(flatten)]
    Archive(ArchiveCommand),
    /// Interactive prompt (the default when no command is given)
    Shell,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e.message);
        process::exit(1);
    });
    let mut archive = Archive::open(config).unwrap_or_else(|e| {
        eprintln!("Error opening archive: {}", e.message);
        process::exit(1);
    });

    match cli.command {
        Some(CliCommand::Archive(command)) => match execute(&mut archive, &command) {
            Ok(message) => println!("{message}"),
            Err(e) => {
                eprintln!("Error: {}", e.message);
                process::exit(1);
            }
        },
        Some(CliCommand::Shell) | None => {
            let stdin = io::stdin();
            shell::run(&mut archive, stdin.lock(), io::stdout()).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                process::exit(1);
            });
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<ArchiveConfig, CoreError> {
    let mut config = match &cli.config {
        Some(path) => ArchiveConfig::load(path)?,
        None => ArchiveConfig::default(),
    };

    if let Some(dir) = &cli.game_save_dir {
        config.game_save_dir = dir.clone();
    }
    if let Some(dir) = &cli.working_dir {
        config.working_dir = dir.clone();
    }
    if let Some(template) = &cli.game_save_template {
        config.game_save_template = template.clone();
    }
    if let Some(template) = &cli.payload_template {
        config.payload_template = template.clone();
    }
    if let Some(template) = &cli.marker_template {
        config.marker_template = template.clone();
    }
    Ok(config)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
