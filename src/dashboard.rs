//! Refresh scheduling.
//!
//! The status/uptime cadence and the history cadence are plain intervals that
//! know nothing about each other. Every tick spawns a fetch task; a finished
//! task sends a complete widget replacement back to the loop, which owns the
//! model and redraws. Overlapping fetches are allowed and whichever finishes
//! last wins.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::StatusApi;
use crate::config::Settings;
use crate::error::FetchError;
use crate::models::{CheckRecord, CurrentStatus, UptimeSummary, Widget};
use crate::render::{dashboard_view, render_console};
use crate::snapshot::write_snapshot;
use crate::timeline::{LatencySummary, Timeline, latency_summary};

const UPDATE_BUFFER: usize = 16;
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Everything the history widget shows, computed once per fetch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HistoryReport {
    pub(crate) timeline: Timeline,
    pub(crate) latency: Option<LatencySummary>,
}

impl HistoryReport {
    pub(crate) fn build<Tz: TimeZone>(records: &[CheckRecord], now: &DateTime<Tz>) -> Self {
        Self {
            timeline: Timeline::from_records(records, now),
            latency: latency_summary(records, now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refresh {
    Status,
    Uptime,
    History,
}

#[derive(Debug)]
pub(crate) enum Update {
    Status(Widget<CurrentStatus>),
    Uptime(Widget<UptimeSummary>),
    History(Widget<HistoryReport>),
}

pub(crate) struct DashboardModel {
    pub(crate) target: String,
    pub(crate) clock: DateTime<Local>,
    pub(crate) status: Widget<CurrentStatus>,
    pub(crate) uptime: Widget<UptimeSummary>,
    pub(crate) history: Widget<HistoryReport>,
}

impl DashboardModel {
    pub(crate) fn new(target: String, clock: DateTime<Local>) -> Self {
        Self {
            target,
            clock,
            status: Widget::Loading,
            uptime: Widget::Loading,
            history: Widget::Loading,
        }
    }

    pub(crate) fn apply(&mut self, update: Update) {
        match update {
            Update::Status(status) => self.status = status,
            Update::Uptime(uptime) => self.uptime = uptime,
            Update::History(history) => self.history = history,
        }
    }
}

pub(crate) struct RenderOptions {
    pub(crate) verbose: bool,
    pub(crate) snapshot_path: Option<String>,
}

fn settle<T>(widget: &str, result: Result<T, FetchError>) -> Widget<T> {
    match result {
        Ok(value) => Widget::Ready(value),
        Err(e) => {
            warn!(widget, "refresh failed: {}", e);
            Widget::Unavailable
        }
    }
}

/// Fetch one widget's data. Never fails: errors become [`Widget::Unavailable`].
pub(crate) async fn refresh(api: &StatusApi, kind: Refresh) -> Update {
    match kind {
        Refresh::Status => Update::Status(settle("status", api.current().await)),
        Refresh::Uptime => Update::Uptime(settle("uptime", api.uptime().await)),
        Refresh::History => {
            let report = api.history().await.map(|records| {
                debug!(records = records.len(), "history fetched");
                HistoryReport::build(&records, &Local::now())
            });
            Update::History(settle("history", report))
        }
    }
}

fn spawn_refresh(api: Arc<StatusApi>, kind: Refresh, tx: mpsc::Sender<Update>) {
    tokio::spawn(async move {
        let update = refresh(&api, kind).await;
        if tx.send(update).await.is_err() {
            debug!(?kind, "dashboard closed, dropping update");
        }
    });
}

async fn present(model: &DashboardModel, options: &RenderOptions, clear: bool) {
    let view = dashboard_view(model);
    let mut stdout = std::io::stdout().lock();
    let drawn = if clear {
        write!(stdout, "{}{}", CLEAR_SCREEN, render_console(&view, options.verbose))
    } else {
        write!(stdout, "{}", render_console(&view, options.verbose))
    };
    if let Err(e) = drawn.and_then(|_| stdout.flush()) {
        warn!("failed to draw dashboard: {}", e);
    }
    drop(stdout);

    if let Some(path) = &options.snapshot_path {
        if let Err(e) = write_snapshot(path.clone(), &view).await {
            warn!("failed to write snapshot to {}: {}", path, e);
        }
    }
}

/// Fetch all three widgets concurrently, draw once and return.
pub(crate) async fn run_once(api: &StatusApi, options: &RenderOptions) -> Result<()> {
    let (status, uptime, history) = futures::future::join3(
        refresh(api, Refresh::Status),
        refresh(api, Refresh::Uptime),
        refresh(api, Refresh::History),
    )
    .await;

    let mut model = DashboardModel::new(api.origin(), Local::now());
    for update in [status, uptime, history] {
        model.apply(update);
    }
    present(&model, options, false).await;
    Ok(())
}

/// How often each refresh runs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cadence {
    pub(crate) status: Duration,
    pub(crate) history: Duration,
}

impl From<&Settings> for Cadence {
    fn from(settings: &Settings) -> Self {
        Self {
            status: settings.status_interval,
            history: settings.history_interval,
        }
    }
}

pub(crate) async fn run(settings: &Settings, api: StatusApi, options: RenderOptions) -> Result<()> {
    let api = Arc::new(api);
    let model = DashboardModel::new(api.origin(), Local::now());
    info!(
        "Watching {} (status every {}, history every {})",
        model.target,
        humantime::format_duration(settings.status_interval),
        humantime::format_duration(settings.history_interval)
    );

    drive(
        Cadence::from(settings),
        model,
        &options,
        |kind, tx| spawn_refresh(api.clone(), kind, tx),
        tokio::signal::ctrl_c(),
    )
    .await?;
    info!("Interrupted, stopping dashboard");
    Ok(())
}

/// Tick both cadences, hand every due refresh to `spawn` and apply the
/// updates it sends back until `shutdown` resolves.
async fn drive<F, S>(
    cadence: Cadence,
    mut model: DashboardModel,
    options: &RenderOptions,
    mut spawn: F,
    shutdown: S,
) -> Result<DashboardModel>
where
    F: FnMut(Refresh, mpsc::Sender<Update>),
    S: Future<Output = std::io::Result<()>>,
{
    let (tx, mut rx) = mpsc::channel::<Update>(UPDATE_BUFFER);

    let mut status_tick = time::interval(cadence.status);
    status_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut history_tick = time::interval(cadence.history);
    history_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                spawn(Refresh::Status, tx.clone());
                spawn(Refresh::Uptime, tx.clone());
                model.clock = Local::now();
                present(&model, options, true).await;
            }
            _ = history_tick.tick() => {
                spawn(Refresh::History, tx.clone());
            }
            Some(update) = rx.recv() => {
                model.apply(update);
                present(&model, options, true).await;
            }
            res = &mut shutdown => {
                res?;
                break;
            }
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::serve;
    use crate::timeline::{DayClass, WINDOW_DAYS};
    use chrono::{Duration as ChronoDuration, FixedOffset, Utc};
    use reqwest::Client;

    fn api(base_url: &str) -> StatusApi {
        StatusApi::new(Client::new(), base_url).unwrap()
    }

    #[test]
    fn test_history_report() {
        let now = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 10, 8, 0, 0)
            .unwrap();
        let records = vec![CheckRecord {
            timestamp: (now - ChronoDuration::hours(1)).with_timezone(&Utc),
            is_up: true,
            status_code: Some(200),
            response_time_ms: Some(42.0),
        }];

        let report = HistoryReport::build(&records, &now);
        assert_eq!(report.timeline.days().len(), WINDOW_DAYS);
        assert_eq!(report.timeline.days()[WINDOW_DAYS - 1].class, DayClass::Operational);
        assert_eq!(report.latency.unwrap().samples, 1);
    }

    #[test]
    fn test_updates_replace_only_their_widget() {
        let mut model = DashboardModel::new("http://localhost".to_string(), Local::now());
        model.apply(Update::Uptime(Widget::Ready(UptimeSummary::default())));
        model.apply(Update::Status(Widget::Unavailable));

        assert_eq!(model.status, Widget::Unavailable);
        assert_eq!(model.uptime, Widget::Ready(UptimeSummary::default()));
        assert_eq!(model.history, Widget::Loading);

        model.apply(Update::Uptime(Widget::Unavailable));
        assert_eq!(model.uptime, Widget::Unavailable);
    }

    #[tokio::test]
    async fn test_refresh_history() {
        let base = serve(
            "200 OK",
            r#"[{"timestamp":"2000-01-01T00:00:00Z","is_up":false}]"#,
        )
        .await;

        let Update::History(Widget::Ready(report)) = refresh(&api(&base), Refresh::History).await
        else {
            panic!("expected a history report");
        };
        assert_eq!(report.timeline.days().len(), WINDOW_DAYS);
        assert!(report.timeline.days().iter().all(|d| d.class == DayClass::NoData));
        assert_eq!(report.latency, None);
    }

    #[tokio::test]
    async fn test_refresh_failure_marks_widget_unavailable() {
        let base = serve("503 Service Unavailable", "down for maintenance").await;
        let api = api(&base);

        assert!(matches!(
            refresh(&api, Refresh::Status).await,
            Update::Status(Widget::Unavailable)
        ));
        assert!(matches!(
            refresh(&api, Refresh::Uptime).await,
            Update::Uptime(Widget::Unavailable)
        ));
        assert!(matches!(
            refresh(&api, Refresh::History).await,
            Update::History(Widget::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_run_once_writes_snapshot() {
        let base = serve("200 OK", "[]").await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let options = RenderOptions {
            verbose: false,
            snapshot_path: Some(path.to_string_lossy().into_owned()),
        };

        // "[]" is a valid history but neither a current status nor an uptime summary.
        run_once(&api(&base), &options).await.unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(snapshot["status"]["badge_class"], "unknown");
        assert_eq!(snapshot["uptime"]["uptime_24h"], "Error");
        let cells = snapshot["history"]["cells"].as_array().unwrap();
        assert_eq!(cells.len(), WINDOW_DAYS);
        assert!(cells.iter().all(|c| c["class"] == "nodata"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadences_tick_independently() {
        let cadence = Cadence {
            status: Duration::from_secs(60),
            history: Duration::from_secs(300),
        };
        let model = DashboardModel::new("http://localhost".to_string(), Local::now());
        let options = RenderOptions {
            verbose: false,
            snapshot_path: None,
        };
        let mut spawned = Vec::new();

        let model = drive(
            cadence,
            model,
            &options,
            |kind, tx| {
                spawned.push(kind);
                if kind == Refresh::History {
                    let _ = tx.try_send(Update::History(Widget::Unavailable));
                }
            },
            async {
                time::sleep(Duration::from_secs(650)).await;
                Ok(())
            },
        )
        .await
        .unwrap();

        // Status ticks at 0, 60, ..., 600; history at 0, 300, 600.
        let count = |kind| spawned.iter().filter(|k| **k == kind).count();
        assert_eq!(count(Refresh::Status), 11);
        assert_eq!(count(Refresh::Uptime), 11);
        assert_eq!(count(Refresh::History), 3);
        assert_eq!(model.history, Widget::Unavailable);
        assert_eq!(model.status, Widget::Loading);
    }
}
