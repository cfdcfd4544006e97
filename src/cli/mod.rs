pub mod output;
pub mod show;
pub mod shutdown;
pub mod watch;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use show::{process_show_command, ShowCommand};
use tracing::level_filters::LevelFilter;
use watch::{process_watch_command, WatchCommand};

use crate::utils::{
    dir::{create_application_default_path, default_data_path},
    logging::{enable_logging, CLI_PREFIX, WATCH_PREFIX},
};

#[derive(Parser, Debug)]
#[command(name = "Flows", version, long_about = None)]
#[command(about = "Day timeline of application usage", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging to the console")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Print the timeline and ranked list of one day")]
    Show {
        #[command(flatten)]
        command: ShowCommand,
    },
    #[command(about = "Keep a live dashboard of a day, navigable from stdin")]
    Watch {
        #[command(flatten)]
        command: WatchCommand,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let prefix = match args.commands {
        Commands::Show { .. } => CLI_PREFIX,
        Commands::Watch { .. } => WATCH_PREFIX,
    };
    enable_logging(
        prefix,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Show { command } => process_show_command(command).await,
        Commands::Watch { command } => process_watch_command(command).await,
    }
}

/// Directory holding the tracker's day logs, unless overridden on the command line.
fn data_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    dir.map_or_else(default_data_path, Ok)
}
