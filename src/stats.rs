use crate::dates::{date_key, day_label};
use crate::models::{
    AggregationResult, DailyPoint, OverallSplit, RankingEntry, ShipmentRecord, Totals,
    ViewerContext, ViewerRole,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const RANKING_SIZE: usize = 3;

/// Derives every dashboard number for `viewer` from `records`.
///
/// Pure: nothing is cached between calls and the input is never mutated.
/// `records` is expected to already be narrowed by the caller's date and
/// driver query.
pub fn aggregate(records: &[ShipmentRecord], viewer: &ViewerContext) -> AggregationResult {
    let visible = visible_records(records, viewer);
    let totals = summarize(&visible);
    let daily_series = daily_series(&visible);

    // Ranking always covers the whole driver population, not just what the
    // viewer can see.
    let ranking = viewer.is_admin().then(|| rank_drivers(records));

    debug!(
        input = records.len(),
        visible = visible.len(),
        days = totals.working_day_count,
        "aggregated shipments"
    );

    AggregationResult {
        visible_records: visible.into_iter().cloned().collect(),
        overall_split: overall_split(&totals),
        totals,
        daily_series,
        ranking,
    }
}

/// Admins see everything; personal viewers see only records filed under
/// their display name. Unknown roles and nameless personal viewers see nothing.
pub fn visible_records<'a>(
    records: &'a [ShipmentRecord],
    viewer: &ViewerContext,
) -> Vec<&'a ShipmentRecord> {
    match viewer.role {
        ViewerRole::Admin => records.iter().collect(),
        ViewerRole::Personal => match viewer.display_name.as_deref() {
            Some(name) if !name.is_empty() => records
                .iter()
                .filter(|record| record.driver_name == name)
                .collect(),
            _ => Vec::new(),
        },
        ViewerRole::Unrecognized => Vec::new(),
    }
}

pub fn summarize(visible: &[&ShipmentRecord]) -> Totals {
    let mut days = HashSet::new();
    let mut totals = Totals::default();

    for record in visible {
        days.insert(date_key(&record.delivery_date));
        totals.total_store_count = totals.total_store_count.saturating_add(record.store_count);
        totals.total_delivered = totals.total_delivered.saturating_add(record.delivered_count);
        totals.total_failed = totals.total_failed.saturating_add(record.failed_count);
    }

    totals.working_day_count = days.len();
    totals
}

pub fn overall_split(totals: &Totals) -> OverallSplit {
    OverallSplit {
        delivered: totals.total_delivered,
        failed: totals.total_failed,
    }
}

/// One bucket per display label, in the order labels are first seen.
/// Different dates that share a label land in the same bucket.
pub fn daily_series(visible: &[&ShipmentRecord]) -> Vec<DailyPoint> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut series: Vec<DailyPoint> = Vec::new();

    for record in visible {
        let label = day_label(&record.delivery_date);
        let slot = match index.get(&label) {
            Some(&slot) => slot,
            None => {
                index.insert(label.clone(), series.len());
                series.push(DailyPoint {
                    label,
                    delivered: 0,
                    failed: 0,
                });
                series.len() - 1
            }
        };

        let point = &mut series[slot];
        point.delivered = point.delivered.saturating_add(record.delivered_count);
        point.failed = point.failed.saturating_add(record.failed_count);
    }

    series
}

#[derive(Debug, Default)]
struct DriverTally<'a> {
    name: &'a str,
    store: u64,
    delivered: u64,
}

/// Top drivers by delivered percentage. Drivers with equal scores keep the
/// order in which they first appear in `records`.
pub fn rank_drivers(records: &[ShipmentRecord]) -> Vec<RankingEntry> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut tallies: Vec<DriverTally> = Vec::new();

    for record in records {
        let name = record.driver_name.as_str();
        let slot = *index.entry(name).or_insert_with(|| {
            tallies.push(DriverTally {
                name,
                ..DriverTally::default()
            });
            tallies.len() - 1
        });

        let tally = &mut tallies[slot];
        tally.store = tally.store.saturating_add(record.store_count);
        tally.delivered = tally.delivered.saturating_add(record.delivered_count);
    }

    let mut ranking: Vec<RankingEntry> = tallies.into_iter().map(ranking_entry).collect();
    // `sort_by` is stable.
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking.truncate(RANKING_SIZE);
    ranking
}

fn ranking_entry(tally: DriverTally<'_>) -> RankingEntry {
    let (delivered_pct, failed_pct) = percentages(tally.store, tally.delivered);
    RankingEntry {
        driver_name: tally.name.to_string(),
        total_store: tally.store,
        total_delivered: tally.delivered,
        delivered_pct: format_pct(delivered_pct),
        failed_pct: format_pct(failed_pct),
        score: delivered_pct,
    }
}

/// Delivered and failed percentages of `store`. Both are 0 when no stores
/// were targeted.
pub fn percentages(store: u64, delivered: u64) -> (f64, f64) {
    if store == 0 {
        return (0.0, 0.0);
    }
    let delivered_pct = delivered as f64 / store as f64 * 100.0;
    (delivered_pct, 100.0 - delivered_pct)
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.1}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: &str, store: u64, delivered: u64) -> ShipmentRecord {
        ShipmentRecord {
            submit_id: format!("{name}-{date}-{store}-{delivered}"),
            driver_name: name.to_string(),
            delivery_date: date.to_string(),
            store_count: store,
            delivered_count: delivered,
            failed_count: store - delivered,
            ..ShipmentRecord::default()
        }
    }

    fn sample() -> Vec<ShipmentRecord> {
        vec![
            record("A", "2025-01-02", 10, 8),
            record("B", "2025-01-01", 4, 4),
            record("A", "2025-01-02", 5, 5),
            record("C", "2025-01-03", 6, 3),
        ]
    }

    #[test]
    fn admin_sees_every_record_in_order() {
        let records = sample();
        let visible = visible_records(&records, &ViewerContext::admin());
        assert_eq!(visible.len(), records.len());
        for (seen, original) in visible.iter().zip(&records) {
            assert!(std::ptr::eq(*seen, original));
        }
    }

    #[test]
    fn personal_viewer_sees_only_own_records() {
        let records = sample();
        let visible = visible_records(&records, &ViewerContext::personal("A"));
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|record| record.driver_name == "A"));
    }

    #[test]
    fn nameless_or_unknown_viewers_see_nothing() {
        let records = sample();
        let nameless = ViewerContext {
            role: ViewerRole::Personal,
            display_name: None,
        };
        let empty_name = ViewerContext::personal("");
        let unknown = ViewerContext {
            role: ViewerRole::Unrecognized,
            display_name: Some("A".to_string()),
        };

        assert!(visible_records(&records, &nameless).is_empty());
        assert!(visible_records(&records, &empty_name).is_empty());
        assert!(visible_records(&records, &unknown).is_empty());
    }

    #[test]
    fn totals_count_distinct_days_and_sum_counts() {
        let records = sample();
        let visible: Vec<&ShipmentRecord> = records.iter().collect();
        let totals = summarize(&visible);

        assert_eq!(totals.working_day_count, 3);
        assert_eq!(totals.total_store_count, 25);
        assert_eq!(totals.total_delivered, 20);
        assert_eq!(totals.total_failed, 5);
    }

    #[test]
    fn working_days_compare_canonical_dates() {
        let records = vec![
            record("A", "2025-01-02", 1, 1),
            record("A", "2025-01-02T09:00:00Z", 1, 1),
        ];
        let visible: Vec<&ShipmentRecord> = records.iter().collect();
        assert_eq!(summarize(&visible).working_day_count, 1);
    }

    #[test]
    fn failed_count_is_exact_difference() {
        for store in 0..50u64 {
            for delivered in 0..=store {
                let r = record("A", "2025-01-02", store, delivered);
                assert_eq!(r.failed_count + r.delivered_count, r.store_count);
            }
        }
    }

    #[test]
    fn daily_series_keeps_first_seen_label_order() {
        let records = vec![
            record("A", "2025-01-02", 3, 2),
            record("A", "2025-01-01", 4, 4),
            record("B", "2025-01-02", 5, 1),
        ];
        let visible: Vec<&ShipmentRecord> = records.iter().collect();
        let series = daily_series(&visible);

        let labels: Vec<&str> = series.iter().map(|point| point.label.as_str()).collect();
        assert_eq!(labels, vec!["02 Jan", "01 Jan"]);
        assert_eq!(series[0].delivered, 3);
        assert_eq!(series[0].failed, 5);
        assert_eq!(series[1].delivered, 4);
        assert_eq!(series[1].failed, 0);
    }

    #[test]
    fn daily_series_merges_dates_sharing_a_label() {
        let records = vec![
            record("A", "2024-01-02", 2, 2),
            record("A", "2025-01-02", 3, 1),
        ];
        let visible: Vec<&ShipmentRecord> = records.iter().collect();
        let series = daily_series(&visible);

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].delivered, 3);
        assert_eq!(series[0].failed, 2);
    }

    #[test]
    fn ranking_scenario_matches_expected_percentages() {
        let records = vec![record("A", "2025-01-02", 10, 8), record("A", "2025-01-03", 5, 5)];
        let ranking = rank_drivers(&records);

        assert_eq!(ranking.len(), 1);
        let entry = &ranking[0];
        assert_eq!(entry.driver_name, "A");
        assert_eq!(entry.total_store, 15);
        assert_eq!(entry.total_delivered, 13);
        assert_eq!(entry.delivered_pct, "86.7%");
        assert_eq!(entry.failed_pct, "13.3%");
        assert!((entry.score - 86.666_666).abs() < 1e-3);
    }

    #[test]
    fn ranking_is_bounded_sorted_and_stable_on_ties() {
        let records = vec![
            record("D", "2025-01-01", 10, 5),
            record("E", "2025-01-01", 10, 9),
            record("F", "2025-01-01", 4, 2),
            record("G", "2025-01-01", 10, 10),
            record("H", "2025-01-01", 2, 1),
        ];
        let ranking = rank_drivers(&records);

        let names: Vec<&str> = ranking.iter().map(|e| e.driver_name.as_str()).collect();
        assert_eq!(names, vec!["G", "E", "D"]);
        assert!(ranking.windows(2).all(|pair| pair[0].score >= pair[1].score));

        let tied = vec![
            record("X", "2025-01-01", 2, 1),
            record("Y", "2025-01-01", 4, 2),
            record("Z", "2025-01-01", 6, 3),
            record("W", "2025-01-01", 8, 4),
        ];
        let names: Vec<String> = rank_drivers(&tied).into_iter().map(|e| e.driver_name).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn percentages_sum_to_hundred_or_are_both_zero() {
        for store in 1..40u64 {
            for delivered in 0..=store {
                let (delivered_pct, failed_pct) = percentages(store, delivered);
                assert!((delivered_pct + failed_pct - 100.0).abs() < 1e-9);
            }
        }
        assert_eq!(percentages(0, 0), (0.0, 0.0));

        let ranking = rank_drivers(&[record("Z", "2025-01-01", 0, 0)]);
        assert_eq!(ranking[0].delivered_pct, "0.0%");
        assert_eq!(ranking[0].failed_pct, "0.0%");
        assert_eq!(ranking[0].score, 0.0);
    }

    #[test]
    fn personal_viewer_gets_no_ranking() {
        let records = sample();
        let result = aggregate(&records, &ViewerContext::personal("A"));
        assert!(result.ranking.is_none());
        assert_eq!(result.totals.total_store_count, 15);
    }

    #[test]
    fn admin_ranking_ignores_visibility() {
        let records = sample();
        let result = aggregate(&records, &ViewerContext::admin());
        let ranking = result.ranking.expect("admin ranking");
        assert_eq!(ranking, rank_drivers(&records));
        assert_eq!(ranking.len(), 3);
    }

    #[test]
    fn ranking_covers_drivers_hidden_from_personal_viewer() {
        let records = sample();
        let own = visible_records(&records, &ViewerContext::personal("A"));
        assert!(own.iter().all(|record| record.driver_name == "A"));

        let ranking = rank_drivers(&records);
        let names: Vec<&str> = ranking.iter().map(|e| e.driver_name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);

        let own_only: Vec<ShipmentRecord> = own.into_iter().cloned().collect();
        assert_eq!(rank_drivers(&own_only).len(), 1);
        assert_ne!(rank_drivers(&own_only), ranking);
    }

    #[test]
    fn empty_input_yields_zeroed_result() {
        for viewer in [ViewerContext::admin(), ViewerContext::personal("A")] {
            let result = aggregate(&[], &viewer);
            assert_eq!(result.totals, Totals::default());
            assert!(result.visible_records.is_empty());
            assert!(result.daily_series.is_empty());
            assert_eq!(result.overall_split, OverallSplit::default());
            assert!(result.ranking.unwrap_or_default().is_empty());
        }
    }

    #[test]
    fn aggregate_is_idempotent() {
        let records = sample();
        let viewer = ViewerContext::admin();
        assert_eq!(aggregate(&records, &viewer), aggregate(&records, &viewer));
    }

    #[test]
    fn overall_split_mirrors_totals() {
        let records = sample();
        let result = aggregate(&records, &ViewerContext::admin());
        assert_eq!(result.overall_split.delivered, result.totals.total_delivered);
        assert_eq!(result.overall_split.failed, result.totals.total_failed);
    }
}
