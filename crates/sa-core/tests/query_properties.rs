//! Property-based tests for filtering, pagination, and KPI series invariants.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use sa_common::{AgentId, ArtifactRow, CallId, CallRecord, ResolutionStatus, ARTIFACT_SCHEMA_VERSION};
use sa_core::aggregate::{kpi_series, Bucket, KpiMetric};
use sa_core::{CallFilters, Snapshot};
use sa_manifest::{fingerprint_rows, ManifestRecord};

const REGIONS: [&str; 3] = ["NA", "EMEA", "APAC"];
const ISSUES: [&str; 3] = ["Billing", "Login", "Outage"];

fn status_strategy() -> impl Strategy<Value = ResolutionStatus> {
    prop_oneof![
        Just(ResolutionStatus::Resolved),
        Just(ResolutionStatus::Escalated),
        Just(ResolutionStatus::Pending),
        Just(ResolutionStatus::Abandoned),
    ]
}

fn row_strategy() -> impl Strategy<Value = (usize, usize, ResolutionStatus, u64, u32, Option<u8>)> {
    (
        0..REGIONS.len(),
        0..ISSUES.len(),
        status_strategy(),
        0u64..3600,
        0u32..60 * 24 * 40,
        proptest::option::of(0u8..=5),
    )
}

fn rows_strategy() -> impl Strategy<Value = Vec<ArtifactRow>> {
    prop::collection::vec(row_strategy(), 0..120).prop_map(|specs| {
        let base = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (region, issue, status, duration, minutes, rating))| {
                ArtifactRow::join(
                    CallRecord {
                        id: CallId(format!("call-{i:04}")),
                        agent_id: AgentId(format!("A-{}", 100 + i % 7)),
                        customer_region: REGIONS[region].to_string(),
                        issue_type: ISSUES[issue].to_string(),
                        duration_seconds: duration,
                        resolution_status: status,
                        started_at: base + Duration::minutes(i64::from(minutes)),
                        rating: rating.map(f64::from),
                    },
                    None,
                )
            })
            .collect()
    })
}

fn filters_strategy() -> impl Strategy<Value = CallFilters> {
    (
        proptest::option::of(prop_oneof![Just("NA"), Just("EMEA"), Just("APAC"), Just("LATAM")]),
        proptest::option::of(prop_oneof![Just("Billing"), Just("Login"), Just("Outage")]),
        proptest::option::of(status_strategy()),
    )
        .prop_map(|(region, issue, status)| CallFilters {
            region: region.map(str::to_string),
            issue_type: issue.map(str::to_string),
            status,
        })
}

fn snapshot(rows: Vec<ArtifactRow>) -> Snapshot {
    let hash = fingerprint_rows(ARTIFACT_SCHEMA_VERSION, &rows).unwrap();
    let manifest = ManifestRecord {
        path: "artifacts/calls.parquet".to_string(),
        hash,
        row_count: rows.len() as u64,
        generated_at: "2025-11-27T00:00:00Z".to_string(),
        notes: String::new(),
    };
    Snapshot::from_rows(manifest, rows)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// totalMatched equals a brute-force count of the conjunction.
    #[test]
    fn total_matched_equals_brute_force(rows in rows_strategy(), filters in filters_strategy()) {
        let expected = rows.iter().filter(|r| filters.matches(&r.call)).count();
        let snap = snapshot(rows);
        let page = snap.query(&filters, 1, 50, 200);
        prop_assert_eq!(page.total_matched, expected);
    }

    /// Walking every page yields exactly the matching rows, in artifact order.
    #[test]
    fn pages_concatenate_to_filtered_rows(
        rows in rows_strategy(),
        filters in filters_strategy(),
        per_page in 1u32..30,
    ) {
        let expected: Vec<CallRecord> = rows
            .iter()
            .filter(|r| filters.matches(&r.call))
            .map(|r| r.call.clone())
            .collect();
        let snap = snapshot(rows);
        let first = snap.query(&filters, 1, per_page, 200);

        let mut collected = Vec::new();
        for page in 1..=first.total_pages.max(1) {
            collected.extend(snap.query(&filters, page, per_page, 200).rows);
        }
        prop_assert_eq!(collected, expected);
    }

    /// Pages past the last are empty and report the same total as page 1.
    #[test]
    fn page_past_end_is_empty(
        rows in rows_strategy(),
        filters in filters_strategy(),
        per_page in 1u32..=200,
        beyond in 1u32..50,
    ) {
        let snap = snapshot(rows);
        let first = snap.query(&filters, 1, per_page, 200);
        let past = snap.query(&filters, first.total_pages + beyond, per_page, 200);
        prop_assert!(past.rows.is_empty());
        prop_assert_eq!(past.total_matched, first.total_matched);
    }

    /// Identical queries against the same snapshot serialize identically.
    #[test]
    fn query_is_deterministic(
        rows in rows_strategy(),
        filters in filters_strategy(),
        page in 0u32..5,
        per_page in 0u32..300,
    ) {
        let snap = snapshot(rows);
        let a = serde_json::to_vec(&snap.query(&filters, page, per_page, 200)).unwrap();
        let b = serde_json::to_vec(&snap.query(&filters, page, per_page, 200)).unwrap();
        prop_assert_eq!(a, b);
    }

    /// Day series are contiguous and call volume sums to the row count.
    #[test]
    fn kpi_series_is_contiguous(rows in rows_strategy(), weekly in any::<bool>()) {
        let bucket = if weekly { Bucket::Week } else { Bucket::Day };
        let step = if weekly { Duration::days(7) } else { Duration::days(1) };
        let series = kpi_series(&rows, bucket, KpiMetric::CallVolume);

        prop_assert_eq!(series.is_empty(), rows.is_empty());
        for pair in series.windows(2) {
            prop_assert_eq!(pair[1].timestamp - pair[0].timestamp, step);
            prop_assert_eq!(pair[1].delta, Some(pair[1].value - pair[0].value));
        }
        if let Some(first) = series.first() {
            prop_assert_eq!(first.delta, None);
        }
        let total: f64 = series.iter().map(|p| p.value).sum();
        prop_assert_eq!(total as usize, rows.len());
    }

    /// Changing any single row's duration changes the fingerprint.
    #[test]
    fn fingerprint_tracks_content(rows in rows_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!rows.is_empty());
        let before = fingerprint_rows(ARTIFACT_SCHEMA_VERSION, &rows).unwrap();
        prop_assert_eq!(&before, &fingerprint_rows(ARTIFACT_SCHEMA_VERSION, &rows).unwrap());

        let mut changed = rows;
        let i = pick.index(changed.len());
        changed[i].call.duration_seconds += 1;
        let after = fingerprint_rows(ARTIFACT_SCHEMA_VERSION, &changed).unwrap();
        prop_assert_ne!(before, after);
    }
}
