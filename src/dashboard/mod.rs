//! The dashboard owns every piece of interaction state and runs the single event loop that
//! mutates it. Fetch results, debounce timers, refresh notifications and presenter commands all
//! arrive as messages, so each state transition is one step on one logical thread.

pub mod config;
pub mod layout;
pub mod presenter;

use std::sync::Arc;

use anyhow::Result;
use config::DashboardConfig;
use layout::{build_layout, LayoutInputs, LayoutModel};
use presenter::Presenter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::{
    interaction::{
        disclosure::ExpandableCardState,
        hover::{HoverExpiry, HoverSelectionState},
    },
    source::{RefreshReceiver, UsageDataSource},
    timeline::window::{DayWindowController, Direction, FetchCompletion},
    usage::aggregator::{aggregate, AggregatedView},
    utils::clock::Clock,
};

const COMMAND_BUFFER: usize = 32;

/// Input from the presenter side.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Navigate(Direction),
    Refresh,
    Toggle(Arc<str>),
    HeightsMeasured(Vec<(Arc<str>, f64)>),
    /// Pointer over the chart, as a fraction of its height.
    PointerMoved(f64),
    PointerLeft,
    HoverEnter(Arc<str>),
    HoverLeave(Arc<str>),
}

pub struct Dashboard<P: Presenter> {
    windows: DayWindowController,
    view: AggregatedView,
    cards: ExpandableCardState,
    hover: HoverSelectionState,
    pointer: Option<f64>,
    presenter: P,
    config: DashboardConfig,
    commands: mpsc::Receiver<Command>,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
    expiries: mpsc::UnboundedReceiver<HoverExpiry>,
    refresh: RefreshReceiver,
    shutdown: CancellationToken,
}

/// Channel the presenter side uses to drive a [Dashboard].
pub fn command_channel() -> (mpsc::Sender<Command>, mpsc::Receiver<Command>) {
    mpsc::channel(COMMAND_BUFFER)
}

impl<P: Presenter> Dashboard<P> {
    /// Creates a dashboard showing the current local day.
    pub fn new(
        source: Arc<dyn UsageDataSource>,
        presenter: P,
        clock: Arc<dyn Clock>,
        config: DashboardConfig,
        commands: mpsc::Receiver<Command>,
        refresh: RefreshReceiver,
        shutdown: CancellationToken,
    ) -> Self {
        let (completion_sender, completions) = mpsc::unbounded_channel();
        let (expiry_sender, expiries) = mpsc::unbounded_channel();

        let windows = DayWindowController::initial(clock.as_ref(), source, completion_sender);
        let hover = HoverSelectionState::new(config.hover_release_delay, clock, expiry_sender);

        Self {
            windows,
            view: AggregatedView::default(),
            cards: ExpandableCardState::new(),
            hover,
            pointer: None,
            presenter,
            config,
            commands,
            completions,
            expiries,
            refresh,
            shutdown,
        }
    }

    pub fn view(&self) -> &AggregatedView {
        &self.view
    }

    pub fn layout(&self) -> LayoutModel {
        let window = self.windows.window();
        build_layout(LayoutInputs {
            window,
            date_label: window.date_label(),
            view: &self.view,
            cards: &self.cards,
            hover: Some(&self.hover),
            pointer: self.pointer,
            palette_len: self.config.palette_len,
        })
    }

    /// Executes the dashboard event loop until shutdown or until every command sender is gone.
    pub async fn run(mut self) -> Result<()> {
        self.windows.refresh_trigger();
        self.render();

        let mut refresh_open = true;
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Dashboard shutting down");
                    return Ok(());
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        info!("Command channel closed");
                        return Ok(());
                    }
                },
                Some(completion) = self.completions.recv() => self.handle_completion(completion),
                Some(expiry) = self.expiries.recv() => self.handle_expiry(expiry),
                notification = self.refresh.recv(), if refresh_open => match notification {
                    Some(()) => {
                        debug!("Refresh notification received");
                        self.windows.refresh_trigger();
                    }
                    None => {
                        debug!("Refresh channel closed");
                        refresh_open = false;
                    }
                },
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!("Handling {command:?}");
        match command {
            Command::Navigate(direction) => {
                self.windows.advance(direction);
                // The label moves now; the previous day's data stays until the fetch resolves.
                self.render();
            }
            Command::Refresh => {
                self.windows.refresh_trigger();
            }
            Command::Toggle(identity) => {
                let request = self.cards.toggle(&identity);
                self.render();
                self.presenter.request_measurement(&request);
            }
            Command::HeightsMeasured(heights) => {
                self.cards.apply_measurements(heights);
                self.render();
            }
            Command::PointerMoved(fraction) => {
                self.pointer = Some(if fraction.is_nan() {
                    0.
                } else {
                    fraction.clamp(0., 1.)
                });
                self.render();
            }
            Command::PointerLeft => {
                self.pointer = None;
                self.render();
            }
            Command::HoverEnter(identity) => {
                self.hover.enter(&identity);
                self.render();
            }
            Command::HoverLeave(identity) => {
                self.hover.leave(&identity);
            }
        }
    }

    #[instrument(skip(self, completion), fields(seq = completion.seq))]
    fn handle_completion(&mut self, completion: FetchCompletion) {
        if !self.windows.is_current(&completion) {
            debug!(
                "Discarding stale fetch {}, newest is {}",
                completion.seq,
                self.windows.latest_seq()
            );
            return;
        }

        match completion.result {
            Ok(feed) => {
                self.view = aggregate(feed);
                info!("Showing {} applications", self.view.len());
                self.render();
                // Detail content of open cards may have changed with the data.
                let request = self.cards.measurement_request();
                if !request.is_empty() {
                    self.presenter.request_measurement(&request);
                }
            }
            Err(e) => {
                error!("Failed to fetch usage, keeping previous data {e:?}");
            }
        }
    }

    fn handle_expiry(&mut self, expiry: HoverExpiry) {
        if self.hover.expire(&expiry) {
            self.render();
        }
    }

    fn render(&mut self) {
        let layout = self.layout();
        self.presenter.render(&layout);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{Local, TimeZone, Utc};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        interaction::{disclosure::EXPANDED_OPACITY, hover::Emphasis},
        source::{refresh_channel, MockUsageDataSource, RefreshSender, UsageDataSource},
        timeline::window::{DayWindow, Direction, DAY_MS},
        usage::{RawAppUsage, UsageFeed, UsageInterval},
        utils::{
            clock::{Clock, FixedClock},
            logging::TEST_LOGGING,
        },
    };

    use super::{
        command_channel, config::DashboardConfig, layout::LayoutModel, presenter::Presenter,
        Command, Dashboard,
    };

    #[derive(Clone, Default)]
    struct RecordingPresenter {
        frames: Arc<Mutex<Vec<LayoutModel>>>,
        requests: Arc<Mutex<Vec<Vec<Arc<str>>>>>,
    }

    impl RecordingPresenter {
        fn last_frame(&self) -> LayoutModel {
            self.frames
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("At least one frame")
        }

        fn frame_count(&self) -> usize {
            self.frames.lock().unwrap().len()
        }
    }

    impl Presenter for RecordingPresenter {
        fn render(&mut self, layout: &LayoutModel) {
            self.frames.lock().unwrap().push(layout.clone());
        }

        fn request_measurement(&mut self, identities: &[Arc<str>]) {
            self.requests.lock().unwrap().push(identities.to_vec());
        }
    }

    /// Names its single application after the day it was asked for, relative to the first day,
    /// and answers after a per-day delay.
    struct DelayedSource {
        first_day: i64,
        delays: HashMap<i64, Duration>,
    }

    #[async_trait]
    impl UsageDataSource for DelayedSource {
        async fn fetch(&self, start_ts: i64, _end_ts: i64) -> Result<UsageFeed> {
            let day = (start_ts - self.first_day) / DAY_MS;
            if let Some(delay) = self.delays.get(&day) {
                tokio::time::sleep(*delay).await;
            }
            Ok(UsageFeed::Raw(vec![RawAppUsage::new(
                format!("day {day}"),
                "",
                [UsageInterval::new(start_ts + 1_000, start_ts + 61_000)],
            )]))
        }
    }

    fn test_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap()))
    }

    fn first_window() -> DayWindow {
        DayWindow::containing(&test_clock().time().with_timezone(&Local))
    }

    fn create(
        source: Arc<dyn UsageDataSource>,
    ) -> (
        Dashboard<RecordingPresenter>,
        mpsc::Sender<Command>,
        RefreshSender,
        RecordingPresenter,
    ) {
        let presenter = RecordingPresenter::default();
        let (refresh_sender, refresh_receiver) = refresh_channel();
        let (commands, command_receiver) = command_channel();
        let dashboard = Dashboard::new(
            source,
            presenter.clone(),
            test_clock(),
            DashboardConfig::default(),
            command_receiver,
            refresh_receiver,
            CancellationToken::new(),
        );
        (dashboard, commands, refresh_sender, presenter)
    }

    fn two_apps() -> UsageFeed {
        let start = first_window().start_ts() + 9 * 3_600_000;
        UsageFeed::Raw(vec![
            RawAppUsage::new(
                "Mail",
                "/Applications/Mail.app",
                [UsageInterval::new(start, start + 1_000)],
            ),
            RawAppUsage::new(
                "Safari",
                "/Applications/Safari.app",
                [UsageInterval::new(start + 1_000, start + 6_000)],
            ),
        ])
    }

    async fn apply_next_completion(dashboard: &mut Dashboard<RecordingPresenter>) {
        let completion = dashboard
            .completions
            .recv()
            .await
            .expect("Fetch should complete");
        dashboard.handle_completion(completion);
    }

    fn entry_names(layout: &LayoutModel) -> Vec<String> {
        layout.entries.iter().map(|v| v.identity.to_string()).collect()
    }

    #[tokio::test]
    async fn navigation_moves_label_before_data() -> Result<()> {
        *TEST_LOGGING;
        let first_day = first_window();
        let source = DelayedSource {
            first_day: first_day.start_ts(),
            delays: HashMap::new(),
        };
        let (mut dashboard, _commands, _refresh, presenter) = create(Arc::new(source));

        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;
        assert_eq!(entry_names(&presenter.last_frame()), vec!["day 0"]);

        dashboard.handle_command(Command::Navigate(Direction::Forward));
        let frame = presenter.last_frame();
        assert_eq!(frame.window, first_day.shifted(1));
        assert_eq!(frame.date_label, first_day.shifted(1).date_label());
        assert_eq!(entry_names(&frame), vec!["day 0"]);

        apply_next_completion(&mut dashboard).await;
        assert_eq!(entry_names(&presenter.last_frame()), vec!["day 1"]);

        dashboard.handle_command(Command::Navigate(Direction::Back));
        apply_next_completion(&mut dashboard).await;
        assert_eq!(presenter.last_frame().window, first_day);
        assert_eq!(entry_names(&presenter.last_frame()), vec!["day 0"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_fetch_does_not_overwrite_newer_one() -> Result<()> {
        *TEST_LOGGING;
        let first_day = first_window();
        let source = DelayedSource {
            first_day: first_day.start_ts(),
            delays: HashMap::from([(1, Duration::from_millis(500))]),
        };
        let (mut dashboard, _commands, _refresh, presenter) = create(Arc::new(source));

        dashboard.handle_command(Command::Navigate(Direction::Forward));
        dashboard.handle_command(Command::Navigate(Direction::Forward));

        apply_next_completion(&mut dashboard).await;
        assert_eq!(entry_names(&presenter.last_frame()), vec!["day 2"]);
        let frames = presenter.frame_count();

        apply_next_completion(&mut dashboard).await;
        assert_eq!(presenter.frame_count(), frames);
        assert_eq!(entry_names(&dashboard.layout()), vec!["day 2"]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_fetch_keeps_last_view() -> Result<()> {
        *TEST_LOGGING;
        let mut source = MockUsageDataSource::new();
        let mut calls = 0;
        source.expect_fetch().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(two_apps())
            } else {
                Err(anyhow!("tracker unavailable"))
            }
        });
        let (mut dashboard, _commands, _refresh, presenter) = create(Arc::new(source));

        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;
        assert_eq!(entry_names(&presenter.last_frame()), vec!["Safari", "Mail"]);

        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;
        assert_eq!(entry_names(&dashboard.layout()), vec!["Safari", "Mail"]);
        assert_eq!(dashboard.view().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn toggle_runs_measurement_exchange() -> Result<()> {
        *TEST_LOGGING;
        let mut source = MockUsageDataSource::new();
        source.expect_fetch().returning(|_, _| Ok(two_apps()));
        let (mut dashboard, _commands, _refresh, presenter) = create(Arc::new(source));
        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;

        dashboard.handle_command(Command::Toggle("Mail".into()));
        let frame = presenter.last_frame();
        let mail = frame.entries.iter().find(|v| &*v.identity == "Mail").unwrap();
        assert!(mail.expanded);
        assert_eq!(mail.animation.height_px, 0.);
        assert_eq!(
            presenter.requests.lock().unwrap().last().cloned(),
            Some(vec![Arc::<str>::from("Mail")])
        );

        dashboard.handle_command(Command::HeightsMeasured(vec![("Mail".into(), 84.)]));
        let frame = presenter.last_frame();
        let mail = frame.entries.iter().find(|v| &*v.identity == "Mail").unwrap();
        assert_eq!(mail.animation.height_px, 84.);
        assert_eq!(mail.animation.opacity, EXPANDED_OPACITY);
        let safari = frame.entries.iter().find(|v| &*v.identity == "Safari").unwrap();
        assert!(!safari.expanded);

        // Card state outlives a refetch.
        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;
        assert!(presenter
            .last_frame()
            .entries
            .iter()
            .any(|v| &*v.identity == "Mail" && v.expanded));
        assert_eq!(presenter.requests.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn hover_highlight_survives_quick_reentry() -> Result<()> {
        *TEST_LOGGING;
        let mut source = MockUsageDataSource::new();
        source.expect_fetch().returning(|_, _| Ok(two_apps()));
        let (mut dashboard, _commands, _refresh, presenter) = create(Arc::new(source));
        dashboard.handle_command(Command::Refresh);
        apply_next_completion(&mut dashboard).await;

        assert_eq!(presenter.last_frame().segments.len(), 2);
        dashboard.handle_command(Command::HoverEnter("Mail".into()));
        let frame = presenter.last_frame();
        let reduced = frame
            .segments
            .iter()
            .filter(|v| v.emphasis == Emphasis::Reduced)
            .map(|v| v.identity.to_string())
            .collect::<Vec<_>>();
        assert_eq!(reduced, vec!["Safari"]);

        dashboard.handle_command(Command::HoverLeave("Mail".into()));
        tokio::time::sleep(Duration::from_millis(40)).await;
        dashboard.handle_command(Command::HoverEnter("Mail".into()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        while let Ok(expiry) = dashboard.expiries.try_recv() {
            dashboard.handle_expiry(expiry);
        }
        assert!(presenter
            .last_frame()
            .entries
            .iter()
            .any(|v| &*v.identity == "Mail" && v.highlighted));

        dashboard.handle_command(Command::HoverLeave("Mail".into()));
        let expiry = dashboard.expiries.recv().await.expect("Removal should fire");
        dashboard.handle_expiry(expiry);
        assert!(presenter
            .last_frame()
            .segments
            .iter()
            .all(|v| v.emphasis == Emphasis::Full));
        Ok(())
    }

    #[tokio::test]
    async fn pointer_moves_hover_line() -> Result<()> {
        *TEST_LOGGING;
        let (mut dashboard, _commands, _refresh, presenter) =
            create(Arc::new(MockUsageDataSource::new()));

        dashboard.handle_command(Command::PointerMoved(0.5));
        let line = presenter.last_frame().hover_line.expect("Hover line");
        assert_eq!(line.label, "11:59");

        dashboard.handle_command(Command::PointerMoved(3.));
        assert_eq!(presenter.last_frame().hover_line.unwrap().fraction, 1.);

        dashboard.handle_command(Command::PointerLeft);
        assert!(presenter.last_frame().hover_line.is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn event_loop_refetches_on_notification() -> Result<()> {
        *TEST_LOGGING;
        let mut source = MockUsageDataSource::new();
        source.expect_fetch().times(3).returning(|_, _| Ok(two_apps()));
        let (dashboard, commands, refresh, presenter) = create(Arc::new(source));
        let shutdown = dashboard.shutdown.clone();

        let (result, _) = tokio::join!(dashboard.run(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(refresh.notify());
            tokio::time::sleep(Duration::from_millis(10)).await;
            commands
                .send(Command::Toggle("Safari".into()))
                .await
                .expect("Dashboard is running");
            commands
                .send(Command::Refresh)
                .await
                .expect("Dashboard is running");
            tokio::time::sleep(Duration::from_millis(10)).await;
            shutdown.cancel();
        });
        result?;

        let frame = presenter.last_frame();
        assert_eq!(entry_names(&frame), vec!["Safari", "Mail"]);
        assert!(frame.entries[0].expanded);
        Ok(())
    }
}
