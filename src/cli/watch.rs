use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    dashboard::{command_channel, config::DashboardConfig, Command, Dashboard},
    source::{log_file::LogFileSource, refresh_channel, RefreshSender},
    timeline::window::Direction,
    utils::clock::DefaultClock,
};

use super::{data_dir, output::TextPresenter, shutdown::detect_shutdown};

const INPUT_HELP: &str = "n: next day, p: previous day, r: refresh, t <app>: expand/collapse, \
h <app>: highlight, u <app>: unhighlight, m <0..1>: pointer, l: pointer leaves, q: quit";

#[derive(Debug, Parser)]
pub struct WatchCommand {
    #[arg(
        long,
        help = "Directory with the tracker logs. By default $HOME/Documents/Flows"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 60,
        help = "Seconds between refreshes of the current day"
    )]
    refresh_secs: u64,
    #[arg(long, help = "Disable colors")]
    plain: bool,
}

#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Quit,
}

pub async fn process_watch_command(
    WatchCommand {
        dir,
        refresh_secs,
        plain,
    }: WatchCommand,
) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let (commands, command_receiver) = command_channel();
    let (refresh_sender, refresh_receiver) = refresh_channel();

    let presenter = TextPresenter::stdout(!plain).with_measurements(commands.clone());
    let dashboard = Dashboard::new(
        Arc::new(LogFileSource::new(data_dir(dir)?)),
        presenter,
        Arc::new(DefaultClock),
        DashboardConfig::default(),
        command_receiver,
        refresh_receiver,
        shutdown_token.clone(),
    );

    println!("{INPUT_HELP}");
    let (_, dashboard_result, input_result, _) = tokio::join!(
        detect_shutdown(shutdown_token.clone()),
        dashboard.run(),
        forward_input(commands, shutdown_token.clone()),
        refresh_periodically(
            refresh_sender,
            Duration::from_secs(refresh_secs.max(1)),
            shutdown_token.clone()
        ),
    );

    if let Err(e) = input_result {
        error!("Reading input failed {e:?}");
    }
    dashboard_result
}

/// Translates stdin lines into dashboard commands until `q`, end of input or shutdown.
async fn forward_input(
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let result = loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break Ok(()),
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => match parse_input(&line) {
                Some(Input::Command(command)) => {
                    if commands.send(command).await.is_err() {
                        break Ok(());
                    }
                }
                Some(Input::Quit) => break Ok(()),
                None => println!("{INPUT_HELP}"),
            },
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.into()),
        }
    };
    shutdown.cancel();
    result
}

/// Stands in for the tracker's push notification: asks for the current day again every period.
async fn refresh_periodically(
    refresh: RefreshSender,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = interval.tick() => {
                if !refresh.notify() {
                    info!("Dashboard stopped listening for refreshes");
                    return;
                }
            }
        }
    }
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (verb, argument) = match line.split_once(' ') {
        Some((verb, argument)) => (verb, argument.trim()),
        None => (line, ""),
    };
    let command = match (verb, argument) {
        ("n", "") => Command::Navigate(Direction::Forward),
        ("p", "") => Command::Navigate(Direction::Back),
        ("r", "") => Command::Refresh,
        ("l", "") => Command::PointerLeft,
        ("q", "") => return Some(Input::Quit),
        ("t", app) if !app.is_empty() => Command::Toggle(app.into()),
        ("h", app) if !app.is_empty() => Command::HoverEnter(app.into()),
        ("u", app) if !app.is_empty() => Command::HoverLeave(app.into()),
        ("m", fraction) => Command::PointerMoved(fraction.parse().ok()?),
        _ => return None,
    };
    Some(Input::Command(command))
}
