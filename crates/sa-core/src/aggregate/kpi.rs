//! KPI time-series.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use sa_common::{ArtifactRow, MetricPoint, ResolutionStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Time bucket width. Buckets are UTC-aligned; weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Day,
    Week,
}

impl Bucket {
    fn days(self) -> u64 {
        match self {
            Bucket::Day => 1,
            Bucket::Week => 7,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Day => write!(f, "day"),
            Bucket::Week => write!(f, "week"),
        }
    }
}

/// Value computed per bucket.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum KpiMetric {
    /// Number of calls.
    #[default]
    CallVolume,
    /// Mean call duration.
    AvgDurationSeconds,
    /// Fraction of calls that ended `Resolved`.
    ResolutionRate,
    /// Mean rating over rated calls. A bucket with no rated call reads 0,
    /// the same zero-fill used for buckets with no calls.
    AvgRating,
}

#[derive(Default)]
struct Acc {
    calls: u64,
    duration_sum: u64,
    resolved: u64,
    rating_sum: f64,
    rated: u64,
}

impl Acc {
    fn add(&mut self, row: &ArtifactRow) {
        self.calls += 1;
        self.duration_sum = self.duration_sum.saturating_add(row.call.duration_seconds);
        if row.call.resolution_status == ResolutionStatus::Resolved {
            self.resolved += 1;
        }
        if let Some(rating) = row.call.rating {
            self.rating_sum += rating;
            self.rated += 1;
        }
    }

    fn value(&self, metric: KpiMetric) -> f64 {
        let ratio = |num: f64, den: u64| if den == 0 { 0.0 } else { num / den as f64 };
        match metric {
            KpiMetric::CallVolume => self.calls as f64,
            KpiMetric::AvgDurationSeconds => ratio(self.duration_sum as f64, self.calls),
            KpiMetric::ResolutionRate => ratio(self.resolved as f64, self.calls),
            KpiMetric::AvgRating => ratio(self.rating_sum, self.rated),
        }
    }
}

/// First day of the bucket containing `ts`.
pub fn bucket_start(ts: DateTime<Utc>, bucket: Bucket) -> NaiveDate {
    let date = ts.date_naive();
    match bucket {
        Bucket::Day => date,
        Bucket::Week => {
            let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
            date.checked_sub_days(back).unwrap_or(date)
        }
    }
}

/// Contiguous series from the first to the last occupied bucket.
///
/// Empty buckets in between are emitted with value 0, as are buckets where
/// the metric has no input (no rated call for `AvgRating`). `delta` is the change
/// from the preceding bucket and `None` on the first point. No rows yields
/// an empty series.
pub fn kpi_series(rows: &[ArtifactRow], bucket: Bucket, metric: KpiMetric) -> Vec<MetricPoint> {
    let mut buckets: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for row in rows {
        buckets
            .entry(bucket_start(row.call.started_at, bucket))
            .or_default()
            .add(row);
    }
    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let empty = Acc::default();
    let step = Days::new(bucket.days());
    let mut series = Vec::new();
    let mut previous: Option<f64> = None;
    let mut cursor = Some(first);
    while let Some(date) = cursor.filter(|d| *d <= last) {
        let value = buckets.get(&date).unwrap_or(&empty).value(metric);
        series.push(MetricPoint {
            timestamp: Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            value,
            delta: previous.map(|p| value - p),
        });
        previous = Some(value);
        cursor = date.checked_add_days(step);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use sa_common::{AgentId, CallId, CallRecord};

    fn row(day: u32, hour: u32, status: ResolutionStatus, rating: Option<f64>) -> ArtifactRow {
        ArtifactRow::join(
            CallRecord {
                id: CallId(format!("c-{day}-{hour}")),
                agent_id: AgentId::from("A-101"),
                customer_region: "NA".to_string(),
                issue_type: "Billing".to_string(),
                duration_seconds: 60 * u64::from(hour),
                resolution_status: status,
                started_at: Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0).unwrap(),
                rating,
            },
            None,
        )
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn gap_days_are_zero_filled() {
        use ResolutionStatus::Resolved;
        let rows = vec![
            row(24, 9, Resolved, None),
            row(26, 10, Resolved, None),
            row(26, 11, Resolved, None),
        ];
        let series = kpi_series(&rows, Bucket::Day, KpiMetric::CallVolume);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].timestamp, day(24));
        assert_eq!((series[0].value, series[0].delta), (1.0, None));
        assert_eq!(series[1].timestamp, day(25));
        assert_eq!((series[1].value, series[1].delta), (0.0, Some(-1.0)));
        assert_eq!((series[2].value, series[2].delta), (2.0, Some(2.0)));
    }

    #[test]
    fn timestamps_strictly_increase() {
        use ResolutionStatus::Pending;
        let rows = vec![
            row(28, 1, Pending, None),
            row(3, 1, Pending, None),
            row(17, 1, Pending, None),
        ];
        let series = kpi_series(&rows, Bucket::Day, KpiMetric::CallVolume);
        assert_eq!(series.len(), 26);
        assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn weeks_start_on_monday() {
        // 2025-11-24 is a Monday, 2025-11-30 a Sunday.
        let sunday = Utc.with_ymd_and_hms(2025, 11, 30, 23, 59, 59).unwrap();
        assert_eq!(
            bucket_start(sunday, Bucket::Week),
            NaiveDate::from_ymd_opt(2025, 11, 24).unwrap()
        );

        use ResolutionStatus::Resolved;
        let rows = vec![
            row(24, 9, Resolved, None),
            row(30, 9, Resolved, None),
            row(3, 9, Resolved, None),
        ];
        let series = kpi_series(&rows, Bucket::Week, KpiMetric::CallVolume);
        assert_eq!(series.len(), 4);
        assert_eq!(series[0].timestamp, day(3));
        assert_eq!(series[3].timestamp, day(24));
        assert_eq!(series[3].value, 2.0);
        assert_eq!(series[1].value, 0.0);
    }

    #[test]
    fn metrics_per_bucket() {
        use ResolutionStatus::*;
        let rows = vec![
            row(24, 1, Resolved, Some(4.0)),
            row(24, 3, Escalated, None),
            row(24, 5, Resolved, Some(2.0)),
            row(24, 7, Abandoned, None),
        ];
        let value = |m| kpi_series(&rows, Bucket::Day, m)[0].value;
        assert_eq!(value(KpiMetric::AvgDurationSeconds), 240.0);
        assert_eq!(value(KpiMetric::ResolutionRate), 0.5);
        assert_eq!(value(KpiMetric::AvgRating), 3.0);
    }

    #[test]
    fn no_rows_no_points() {
        assert!(kpi_series(&[], Bucket::Week, KpiMetric::AvgRating).is_empty());
    }

    #[test]
    fn unrated_bucket_reads_zero_for_avg_rating() {
        let rows = vec![
            row(24, 9, ResolutionStatus::Resolved, Some(4.0)),
            row(25, 9, ResolutionStatus::Resolved, None),
        ];
        let series = kpi_series(&rows, Bucket::Day, KpiMetric::AvgRating);
        let points: Vec<(f64, Option<f64>)> = series.iter().map(|p| (p.value, p.delta)).collect();
        assert_eq!(points, vec![(4.0, None), (0.0, Some(-4.0))]);
    }
}
