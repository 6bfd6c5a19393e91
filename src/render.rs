//! Rendering surface.
//!
//! The dashboard model is first turned into a plain view (strings and timeline
//! cells) which is both what the snapshot file contains and what the console
//! renderer draws. Nothing in here performs I/O.

use chrono::{DateTime, Local, NaiveDate, Utc};
use colored::*;
use serde::Serialize;

use crate::dashboard::{DashboardModel, HistoryReport};
use crate::models::{CurrentStatus, UptimeSummary, Widget};
use crate::timeline::{LatencySummary, Timeline, WINDOW_DAYS};

const LOWER_BLOCKS: [&str; 9] = [" ", "▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];
const FULL_BLOCK: &str = "█";
const UPTIME_PLACEHOLDER: &str = "--%";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct TimelineCell {
    pub(crate) day: NaiveDate,
    pub(crate) class: &'static str,
    pub(crate) tooltip: String,
    /// Clamped outage share for partial days, drawn from the bottom up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fill_ratio: Option<f64>,
}

pub(crate) fn timeline_cells(timeline: &Timeline) -> Vec<TimelineCell> {
    timeline
        .days()
        .iter()
        .map(|day| TimelineCell {
            day: day.day,
            class: day.class.style_class(),
            tooltip: format!("{} - {}", day.day.format("%Y-%m-%d"), day.explanation()),
            fill_ratio: day.display_ratio(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StatusView {
    pub(crate) badge_class: &'static str,
    pub(crate) badge: String,
    pub(crate) status: String,
    pub(crate) response_time: String,
    pub(crate) last_checked: String,
    pub(crate) last_checked_at: Option<String>,
}

pub(crate) fn status_view(widget: &Widget<CurrentStatus>, now: DateTime<Utc>) -> StatusView {
    match widget {
        Widget::Loading => StatusView {
            badge_class: "loading",
            badge: "Loading...".to_string(),
            status: "--".to_string(),
            response_time: "-- ms".to_string(),
            last_checked: "never".to_string(),
            last_checked_at: None,
        },
        Widget::Unavailable => StatusView {
            badge_class: "unknown",
            badge: "Status Unknown".to_string(),
            status: "Error Fetching".to_string(),
            response_time: "-- ms".to_string(),
            last_checked: "never".to_string(),
            last_checked_at: None,
        },
        Widget::Ready(current) => {
            let (badge_class, badge) = if current.is_up {
                ("operational", "Operational".to_string())
            } else if current.status_code > 0 {
                ("outage", format!("Outage ({})", current.status_code))
            } else {
                ("outage", "Outage".to_string())
            };
            let status = if current.is_up {
                "Operational".to_string()
            } else if current.status_code >= 400 {
                format!("Error ({})", current.status_code)
            } else {
                "Down".to_string()
            };
            StatusView {
                badge_class,
                badge,
                status,
                response_time: format!("{} ms", current.response_time_ms),
                last_checked: time_ago(now, current.timestamp),
                last_checked_at: Some(
                    current
                        .timestamp
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ),
            }
        }
    }
}

/// Coarse relative time. A unit is only used once it counts more than one,
/// so 90 seconds is still reported in seconds.
pub(crate) fn time_ago(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let units = [
        (31_536_000, "years"),
        (2_592_000, "months"),
        (86_400, "days"),
        (3_600, "hours"),
        (60, "minutes"),
    ];
    for (size, name) in units {
        let count = seconds / size;
        if count > 1 {
            return format!("{} {} ago", count, name);
        }
    }
    if seconds < 10 {
        return "just now".to_string();
    }
    format!("{} seconds ago", seconds)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UptimeView {
    pub(crate) uptime_24h: String,
    pub(crate) uptime_7d: String,
    pub(crate) uptime_30d: String,
}

pub(crate) fn uptime_view(widget: &Widget<UptimeSummary>) -> UptimeView {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| UPTIME_PLACEHOLDER.to_string());
    match widget {
        Widget::Ready(summary) => UptimeView {
            uptime_24h: text(&summary.uptime_24h),
            uptime_7d: text(&summary.uptime_7d),
            uptime_30d: text(&summary.uptime_30d),
        },
        Widget::Loading => UptimeView {
            uptime_24h: UPTIME_PLACEHOLDER.to_string(),
            uptime_7d: UPTIME_PLACEHOLDER.to_string(),
            uptime_30d: UPTIME_PLACEHOLDER.to_string(),
        },
        Widget::Unavailable => UptimeView {
            uptime_24h: "Error".to_string(),
            uptime_7d: "Error".to_string(),
            uptime_30d: "Error".to_string(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct HistoryView {
    /// Replaces the timeline while it can't be drawn.
    pub(crate) message: Option<String>,
    pub(crate) cells: Vec<TimelineCell>,
    pub(crate) latency: Option<LatencySummary>,
}

pub(crate) fn history_view(widget: &Widget<HistoryReport>) -> HistoryView {
    let placeholder = |message: &str| HistoryView {
        message: Some(message.to_string()),
        cells: Vec::new(),
        latency: None,
    };
    match widget {
        Widget::Loading => placeholder("Loading history..."),
        Widget::Unavailable => placeholder("Error loading history."),
        Widget::Ready(report) => HistoryView {
            message: None,
            cells: timeline_cells(&report.timeline),
            latency: report.latency.clone(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DashboardView {
    pub(crate) target: String,
    pub(crate) clock: String,
    pub(crate) status: StatusView,
    pub(crate) uptime: UptimeView,
    pub(crate) history: HistoryView,
}

pub(crate) fn dashboard_view(model: &DashboardModel) -> DashboardView {
    DashboardView {
        target: model.target.clone(),
        clock: model.clock.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        status: status_view(&model.status, model.clock.with_timezone(&Utc)),
        uptime: uptime_view(&model.uptime),
        history: history_view(&model.history),
    }
}

fn draw_cell(cell: &TimelineCell) -> ColoredString {
    match (cell.class, cell.fill_ratio) {
        ("operational", _) => FULL_BLOCK.green(),
        ("outage", _) => FULL_BLOCK.red(),
        ("partial", Some(ratio)) => {
            let level = ((ratio * 8.0).round() as usize).clamp(1, 7);
            LOWER_BLOCKS[level].red().on_green()
        }
        _ => FULL_BLOCK.bright_black(),
    }
}

fn draw_badge(status: &StatusView) -> ColoredString {
    let badge = format!("● {}", status.badge);
    match status.badge_class {
        "operational" => badge.green().bold(),
        "outage" => badge.red().bold(),
        "unknown" => badge.yellow().bold(),
        _ => badge.dimmed(),
    }
}

pub(crate) fn render_console(view: &DashboardView, verbose: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} {}    {}\n",
        "uptimeline".bold(),
        view.target,
        view.clock.dimmed()
    ));
    out.push_str(&format!("{}\n", draw_badge(&view.status)));
    out.push_str(&format!(
        "  Status: {}   Response: {}   Last checked: {}",
        view.status.status, view.status.response_time, view.status.last_checked
    ));
    if let Some(at) = &view.status.last_checked_at {
        out.push_str(&format!(" ({})", at));
    }
    out.push('\n');
    out.push_str(&format!(
        "  Uptime  24h: {}   7d: {}   30d: {}\n\n",
        view.uptime.uptime_24h, view.uptime.uptime_7d, view.uptime.uptime_30d
    ));

    out.push_str(&format!("  {}-day history\n", WINDOW_DAYS));
    if let Some(message) = &view.history.message {
        out.push_str(&format!("  {}\n", message));
        return out;
    }

    out.push_str("  ");
    for cell in &view.history.cells {
        out.push_str(&draw_cell(cell).to_string());
    }
    out.push('\n');
    let oldest = format!("{} days ago", WINDOW_DAYS);
    out.push_str(&format!(
        "  {:<width$}Today\n",
        oldest,
        width = WINDOW_DAYS.saturating_sub("Today".len())
    ));
    out.push_str(&format!(
        "  {} operational  {} partial  {} outage  {} no data\n",
        FULL_BLOCK.green(),
        LOWER_BLOCKS[4].red().on_green(),
        FULL_BLOCK.red(),
        FULL_BLOCK.bright_black()
    ));
    if let Some(latency) = &view.history.latency {
        out.push_str(&format!(
            "  Response time: mean {:.1} ms, median {:.1} ms ({} checks)\n",
            latency.mean_ms, latency.median_ms, latency.samples
        ));
    }

    if verbose {
        for cell in view.history.cells.iter().filter(|c| c.class != "nodata") {
            out.push_str(&format!("  {}\n", cell.tooltip));
        }
    }

    out
}
