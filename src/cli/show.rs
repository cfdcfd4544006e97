use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser};

use crate::{
    dashboard::{
        config::PALETTE,
        layout::{build_layout, LayoutInputs},
        presenter::Presenter,
    },
    interaction::disclosure::ExpandableCardState,
    source::{log_file::LogFileSource, UsageDataSource},
    timeline::window::DayWindow,
    usage::aggregator::aggregate,
};

use super::{data_dir, output::TextPresenter, Args, DateStyle};

#[derive(Debug, Parser)]
pub struct ShowCommand {
    #[arg(
        long,
        short,
        help = "Day to show. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
    #[arg(
        long,
        help = "Directory with the tracker logs. By default $HOME/Documents/Flows"
    )]
    dir: Option<PathBuf>,
    #[arg(short, long, help = "Expand the intervals of an application. Can be repeated")]
    expand: Vec<String>,
    #[arg(long, help = "Print the layout as json")]
    json: bool,
    #[arg(long, help = "Disable colors")]
    plain: bool,
}

/// Prints a single day, the same way the live dashboard would draw it.
pub async fn process_show_command(
    ShowCommand {
        date,
        date_style,
        dir,
        expand,
        json,
        plain,
    }: ShowCommand,
) -> Result<()> {
    let window = DayWindow::containing(&parse_day(date, date_style, Local::now())?);
    let source = LogFileSource::new(data_dir(dir)?);
    let view = aggregate(source.fetch(window.start_ts(), window.end_ts()).await?);

    let mut cards = ExpandableCardState::new();
    for identity in expand {
        cards.toggle(&identity.into());
    }

    let layout = build_layout(LayoutInputs {
        window,
        date_label: window.date_label(),
        view: &view,
        cards: &cards,
        hover: None,
        pointer: None,
        palette_len: PALETTE.len(),
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
    } else {
        TextPresenter::stdout(!plain).render(&layout);
    }
    Ok(())
}

fn parse_day(
    date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Local>,
) -> Result<DateTime<Local>> {
    match date.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(v.with_timezone(&Local)),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
        None => Ok(now),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Local, TimeZone};

    use super::parse_day;
    use crate::cli::DateStyle;

    #[test]
    fn parses_day_expressions() {
        let now = Local.with_ymd_and_hms(2025, 3, 16, 12, 0, 0).unwrap();

        let today = parse_day(None, DateStyle::Uk, now).unwrap();
        assert_eq!(today, now);

        let yesterday = parse_day(Some("yesterday".into()), DateStyle::Uk, now).unwrap();
        assert_eq!(yesterday.day(), 15);

        let uk = parse_day(Some("04/03/2025".into()), DateStyle::Uk, now).unwrap();
        assert_eq!((uk.day(), uk.month()), (4, 3));
        let us = parse_day(Some("04/03/2025".into()), DateStyle::Us, now).unwrap();
        assert_eq!((us.day(), us.month()), (3, 4));

        assert!(parse_day(Some("not a date".into()), DateStyle::Uk, now).is_err());
    }
}
