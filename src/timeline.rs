//! Daily availability timeline.
//!
//! Raw checks are bucketed by local calendar day, folded into up/down counts
//! and classified for every day of a fixed trailing window, oldest first.
//! Nothing here keeps state between refreshes: every call rebuilds from the
//! batch it is given.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use statistical::{mean, median};

use crate::models::CheckRecord;

/// Number of days shown on the timeline, today included.
pub(crate) const WINDOW_DAYS: usize = 90;

const MIN_DISPLAY_RATIO: f64 = 0.10;
const MAX_DISPLAY_RATIO: f64 = 0.90;

/// Calendar date in the viewer's time zone.
pub(crate) type DayKey = NaiveDate;

pub(crate) fn day_key<Tz: TimeZone>(timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> DayKey {
    timestamp.with_timezone(&now.timezone()).date_naive()
}

/// Whole calendar days from the record's day to today. Negative for records
/// that are ahead of the local clock.
pub(crate) fn day_offset<Tz: TimeZone>(timestamp: &DateTime<Utc>, now: &DateTime<Tz>) -> i64 {
    (now.date_naive() - day_key(timestamp, now)).num_days()
}

fn in_window(offset: i64) -> bool {
    (0..WINDOW_DAYS as i64).contains(&offset)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DayBucket {
    pub(crate) day: DayKey,
    pub(crate) up_count: u32,
    pub(crate) down_count: u32,
}

impl DayBucket {
    fn new(day: DayKey) -> Self {
        Self {
            day,
            up_count: 0,
            down_count: 0,
        }
    }

    fn record(&mut self, is_up: bool) {
        if is_up {
            self.up_count += 1;
        } else {
            self.down_count += 1;
        }
    }

    pub(crate) fn total_count(&self) -> u32 {
        self.up_count + self.down_count
    }
}

/// Fold a batch of checks into per-day buckets. Days without checks are left
/// out of the map; records outside the window are skipped.
pub(crate) fn aggregate<Tz: TimeZone>(
    records: &[CheckRecord],
    now: &DateTime<Tz>,
) -> HashMap<DayKey, DayBucket> {
    let mut buckets: HashMap<DayKey, DayBucket> = HashMap::new();
    for record in records {
        if !in_window(day_offset(&record.timestamp, now)) {
            continue;
        }
        let day = day_key(&record.timestamp, now);
        buckets
            .entry(day)
            .or_insert_with(|| DayBucket::new(day))
            .record(record.is_up);
    }
    buckets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DayClass {
    NoData,
    Operational,
    Outage,
    PartialOutage,
}

impl DayClass {
    /// Style class understood by renderers.
    pub(crate) fn style_class(self) -> &'static str {
        match self {
            DayClass::NoData => "nodata",
            DayClass::Operational => "operational",
            DayClass::Outage => "outage",
            DayClass::PartialOutage => "partial",
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            DayClass::NoData => "No data",
            DayClass::Operational => "Operational",
            DayClass::Outage => "Outage",
            DayClass::PartialOutage => "Partial Outage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DayClassification {
    pub(crate) day: DayKey,
    pub(crate) class: DayClass,
    /// Share of failed checks. Only meaningful for partial outages.
    pub(crate) outage_ratio: f64,
    pub(crate) up_count: u32,
    pub(crate) down_count: u32,
}

impl DayClassification {
    fn no_data(day: DayKey) -> Self {
        Self {
            day,
            class: DayClass::NoData,
            outage_ratio: 0.0,
            up_count: 0,
            down_count: 0,
        }
    }

    /// Ratio used to split a partial-outage cell between the two colors.
    /// Clamped so neither color ever disappears.
    pub(crate) fn display_ratio(&self) -> Option<f64> {
        match self.class {
            DayClass::PartialOutage => {
                Some(self.outage_ratio.clamp(MIN_DISPLAY_RATIO, MAX_DISPLAY_RATIO))
            }
            _ => None,
        }
    }

    /// Human-readable summary of the day, reporting the unclamped ratio.
    pub(crate) fn explanation(&self) -> String {
        let summary = match self.class {
            DayClass::NoData => return DayClass::NoData.label().to_string(),
            DayClass::Operational => DayClass::Operational.label().to_string(),
            DayClass::Outage => format!("Outage ({} checks)", self.down_count),
            DayClass::PartialOutage => format!(
                "Partial Outage ({:.1}% downtime)",
                self.outage_ratio * 100.0
            ),
        };
        format!(
            "{} ({} up, {} down)",
            summary, self.up_count, self.down_count
        )
    }
}

/// Classify one day. A single failed check is enough to keep a day from
/// being reported as operational.
pub(crate) fn classify(day: DayKey, bucket: Option<&DayBucket>) -> DayClassification {
    let Some(bucket) = bucket.filter(|b| b.total_count() > 0) else {
        return DayClassification::no_data(day);
    };
    debug_assert_eq!(bucket.day, day);

    let class = match (bucket.up_count, bucket.down_count) {
        (_, 0) => DayClass::Operational,
        (0, _) => DayClass::Outage,
        _ => DayClass::PartialOutage,
    };

    DayClassification {
        day,
        class,
        outage_ratio: f64::from(bucket.down_count) / f64::from(bucket.total_count()),
        up_count: bucket.up_count,
        down_count: bucket.down_count,
    }
}

/// Exactly [`WINDOW_DAYS`] classified days ending today.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Timeline {
    days: Vec<DayClassification>,
}

impl Timeline {
    pub(crate) fn from_records<Tz: TimeZone>(records: &[CheckRecord], now: &DateTime<Tz>) -> Self {
        build_timeline(now, &aggregate(records, now))
    }

    pub(crate) fn days(&self) -> &[DayClassification] {
        &self.days
    }
}

pub(crate) fn build_timeline<Tz: TimeZone>(
    now: &DateTime<Tz>,
    buckets: &HashMap<DayKey, DayBucket>,
) -> Timeline {
    let today = now.date_naive();
    let days = (0..WINDOW_DAYS as i64)
        .rev()
        .map(|i| {
            let day = today - ChronoDuration::days(i);
            classify(day, buckets.get(&day))
        })
        .collect();
    Timeline { days }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LatencySummary {
    pub(crate) mean_ms: f64,
    pub(crate) median_ms: f64,
    pub(crate) samples: usize,
}

/// Response-time summary over successful in-window checks that carry a
/// latency. `None` when there is nothing to summarize.
pub(crate) fn latency_summary<Tz: TimeZone>(
    records: &[CheckRecord],
    now: &DateTime<Tz>,
) -> Option<LatencySummary> {
    let samples: Vec<f64> = records
        .iter()
        .filter(|r| r.is_up && in_window(day_offset(&r.timestamp, now)))
        .filter_map(|r| r.response_time_ms)
        .filter(|ms| ms.is_finite())
        .collect();
    if samples.is_empty() {
        return None;
    }
    Some(LatencySummary {
        mean_ms: mean(&samples),
        median_ms: median(&samples),
        samples: samples.len(),
    })
}
