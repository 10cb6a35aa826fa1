//! Per-sheet and per-group metrics over normalized records.
//!
//! Group rates are the unweighted mean of the member sheets' rates: a sheet with 3 records weighs
//! as much as one with 3000. Sheets without records have no defined rate and stay out of those
//! means. Counts are summed.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::types::{CanonicalField, CanonicalStatus, NormalizedRecord, StatusValue};

/// Statuses counted in the effectiveness rate.
pub const EFFECTIVE_STATUSES: [CanonicalStatus; 2] =
    [CanonicalStatus::Aprovado, CanonicalStatus::Quitado];

/// Scores above this are [`Efficiency::High`].
pub const HIGH_EFFICIENCY_ABOVE: f64 = 0.7;

/// Which statuses feed the configurable rates.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsPolicy {
    pub successful: Vec<CanonicalStatus>,
    pub attention: Vec<CanonicalStatus>,
}

impl MetricsPolicy {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            successful: cfg.successful_statuses.clone(),
            attention: cfg.attention_statuses.clone(),
        }
    }
}

impl Default for MetricsPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Classification of an efficiency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Efficiency {
    High,
    Low,
}

impl Efficiency {
    pub fn from_score(score: f64) -> Self {
        if score > HIGH_EFFICIENCY_ABOVE {
            Efficiency::High
        } else {
            Efficiency::Low
        }
    }
}

/// Metrics of a single sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMetrics {
    pub total_records: usize,
    /// Every taxonomy member, zero when unseen.
    pub status_counts: BTreeMap<CanonicalStatus, usize>,
    pub out_of_taxonomy: usize,
    /// Records whose status is absent (no status column, or empty cell without a default).
    pub missing_status: usize,
    pub resolution_rate: f64,
    pub pendency_rate: f64,
    pub attention_rate: f64,
    pub effectiveness_rate: f64,
    /// Records with both DATE and RESOLUTION_DATE parsed.
    pub records_with_both_dates: usize,
    /// Mean of RESOLUTION_DATE - DATE in days; `None` when no record has both.
    pub mean_days_to_resolution: Option<f64>,
    /// Same as `mean_days_to_resolution`, over APROVADO records only.
    pub mean_days_to_approval: Option<f64>,
    /// Weighted blend in `[0, 1]`, see [`efficiency_score`].
    pub efficiency_score: f64,
    pub efficiency: Efficiency,
}

impl SheetMetrics {
    pub fn compute(records: &[NormalizedRecord], policy: &MetricsPolicy) -> Self {
        let mut status_counts = zero_counts();
        let mut out_of_taxonomy = 0;
        let mut missing_status = 0;
        let mut resolution_days = DayMean::default();
        let mut approval_days = DayMean::default();

        for record in records {
            match record.status() {
                Some(StatusValue::Canonical(s)) => *status_counts.entry(s).or_insert(0) += 1,
                Some(StatusValue::OutOfTaxonomy) => out_of_taxonomy += 1,
                None => missing_status += 1,
            }
            if let (Some(opened), Some(resolved)) = (
                record.date(CanonicalField::Date),
                record.date(CanonicalField::ResolutionDate),
            ) {
                let days = (resolved - opened).num_days();
                resolution_days.add(days);
                if record.status() == Some(StatusValue::Canonical(CanonicalStatus::Aprovado)) {
                    approval_days.add(days);
                }
            }
        }

        let total = records.len();
        let sum_of = |set: &[CanonicalStatus]| -> usize {
            set.iter().filter_map(|s| status_counts.get(s)).sum()
        };
        let count_of = |s: CanonicalStatus| status_counts.get(&s).copied().unwrap_or(0);
        let pendency_rate = rate(count_of(CanonicalStatus::Pendente), total);
        let effectiveness_rate = rate(sum_of(&EFFECTIVE_STATUSES), total);
        let priority_share = rate(count_of(CanonicalStatus::Prioridade), total);
        let mean_days_to_resolution = resolution_days.mean();
        let efficiency_score = if total == 0 {
            0.0
        } else {
            efficiency_score(
                effectiveness_rate,
                mean_days_to_resolution,
                pendency_rate,
                priority_share,
            )
        };

        Self {
            total_records: total,
            resolution_rate: rate(sum_of(&policy.successful), total),
            pendency_rate,
            attention_rate: rate(sum_of(&policy.attention), total),
            effectiveness_rate,
            records_with_both_dates: resolution_days.n,
            mean_days_to_resolution,
            mean_days_to_approval: approval_days.mean(),
            efficiency_score,
            efficiency: Efficiency::from_score(efficiency_score),
            status_counts,
            out_of_taxonomy,
            missing_status,
        }
    }

    /// Whether the sheet has any records, i.e. whether its rates are defined.
    pub fn has_records(&self) -> bool {
        self.total_records > 0
    }

    /// Count for a canonical status or the out-of-taxonomy bucket.
    pub fn count(&self, status: StatusValue) -> usize {
        match status {
            StatusValue::Canonical(s) => self.status_counts.get(&s).copied().unwrap_or(0),
            StatusValue::OutOfTaxonomy => self.out_of_taxonomy,
        }
    }

    /// Non-zero counts keyed by label, the out-of-taxonomy bucket included.
    pub fn nonzero_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut out: BTreeMap<&'static str, usize> = self
            .status_counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(s, n)| (s.label(), *n))
            .collect();
        if self.out_of_taxonomy > 0 {
            out.insert(StatusValue::OutOfTaxonomy.label(), self.out_of_taxonomy);
        }
        out
    }
}

/// `0.4 * effectiveness + 0.3 * speed + 0.2 * (1 - pendency) + 0.1 * priority share`, clamped to
/// `[0, 1]`. Speed is `1 / (1 + days / 30)` over the mean days to resolution (negative means count
/// as 0) and is 0 when no record carries both dates.
pub fn efficiency_score(
    effectiveness_rate: f64,
    mean_days_to_resolution: Option<f64>,
    pendency_rate: f64,
    priority_share: f64,
) -> f64 {
    let speed = mean_days_to_resolution.map_or(0.0, |days| 1.0 / (1.0 + days.max(0.0) / 30.0));
    let score = 0.4 * effectiveness_rate
        + 0.3 * speed
        + 0.2 * (1.0 - pendency_rate)
        + 0.1 * priority_share;
    score.clamp(0.0, 1.0)
}

/// Metrics of a group of sheets (one source, or the whole run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetrics {
    pub sheet_count: usize,
    /// Member sheets with at least one record; only these feed the rate means.
    pub sheets_with_records: usize,
    pub total_records: usize,
    pub status_counts: BTreeMap<CanonicalStatus, usize>,
    pub out_of_taxonomy: usize,
    pub missing_status: usize,
    /// Mean of the member sheets' rates.
    pub resolution_rate: f64,
    pub pendency_rate: f64,
    pub attention_rate: f64,
    pub effectiveness_rate: f64,
    pub records_with_both_dates: usize,
    /// Mean of the member sheets' means that are present.
    pub mean_days_to_resolution: Option<f64>,
    pub mean_days_to_approval: Option<f64>,
    pub efficiency_score: f64,
}

impl GroupMetrics {
    pub fn from_sheets<'a>(sheets: impl IntoIterator<Item = &'a SheetMetrics>) -> Self {
        let sheets: Vec<&SheetMetrics> = sheets.into_iter().collect();
        let mut status_counts = zero_counts();
        for sheet in &sheets {
            for (status, n) in &sheet.status_counts {
                *status_counts.entry(*status).or_insert(0) += n;
            }
        }
        let measured: Vec<&SheetMetrics> =
            sheets.iter().copied().filter(|s| s.has_records()).collect();

        Self {
            sheet_count: sheets.len(),
            sheets_with_records: measured.len(),
            total_records: sheets.iter().map(|s| s.total_records).sum(),
            out_of_taxonomy: sheets.iter().map(|s| s.out_of_taxonomy).sum(),
            missing_status: sheets.iter().map(|s| s.missing_status).sum(),
            resolution_rate: mean_of(&measured, |s| s.resolution_rate),
            pendency_rate: mean_of(&measured, |s| s.pendency_rate),
            attention_rate: mean_of(&measured, |s| s.attention_rate),
            effectiveness_rate: mean_of(&measured, |s| s.effectiveness_rate),
            efficiency_score: mean_of(&measured, |s| s.efficiency_score),
            records_with_both_dates: sheets.iter().map(|s| s.records_with_both_dates).sum(),
            mean_days_to_resolution: mean(sheets.iter().filter_map(|s| s.mean_days_to_resolution)),
            mean_days_to_approval: mean(sheets.iter().filter_map(|s| s.mean_days_to_approval)),
            status_counts,
        }
    }
}

/// One line of the sheet ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSheet {
    /// 1-based position, filled in by [`rank_sheets`].
    pub rank: usize,
    pub source: String,
    pub sheet: String,
    pub resolution_rate: f64,
    pub total_records: usize,
    pub efficiency_score: f64,
    pub efficiency: Efficiency,
    /// Share of ranked sheets scoring at or below this one, in percent; ties share the average
    /// rank. Filled in by [`rank_sheets`].
    pub efficiency_percentile: f64,
}

impl RankedSheet {
    pub fn new(source: impl Into<String>, sheet: impl Into<String>, m: &SheetMetrics) -> Self {
        Self {
            rank: 0,
            source: source.into(),
            sheet: sheet.into(),
            resolution_rate: m.resolution_rate,
            total_records: m.total_records,
            efficiency_score: m.efficiency_score,
            efficiency: m.efficiency,
            efficiency_percentile: 0.0,
        }
    }
}

/// Order by resolution rate (desc), then total records (desc), then source and sheet name, and
/// fill in positions and efficiency percentiles.
pub fn rank_sheets(mut entries: Vec<RankedSheet>) -> Vec<RankedSheet> {
    entries.sort_by(|a, b| {
        b.resolution_rate
            .total_cmp(&a.resolution_rate)
            .then_with(|| b.total_records.cmp(&a.total_records))
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.sheet.cmp(&b.sheet))
    });
    let scores: Vec<f64> = entries.iter().map(|e| e.efficiency_score).collect();
    let n = scores.len() as f64;
    for (i, entry) in entries.iter_mut().enumerate() {
        let below = scores.iter().filter(|s| **s < entry.efficiency_score).count();
        let tied = scores.iter().filter(|s| **s == entry.efficiency_score).count();
        let average_rank = below as f64 + (tied as f64 + 1.0) / 2.0;
        entry.rank = i + 1;
        entry.efficiency_percentile = average_rank / n * 100.0;
    }
    entries
}

fn zero_counts() -> BTreeMap<CanonicalStatus, usize> {
    CanonicalStatus::ALL.iter().map(|s| (*s, 0)).collect()
}

fn rate(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64
    }
}

#[derive(Default)]
struct DayMean {
    sum: i64,
    n: usize,
}

impl DayMean {
    fn add(&mut self, days: i64) {
        self.sum += days;
        self.n += 1;
    }

    fn mean(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum as f64 / self.n as f64)
    }
}

/// Mean of `f` over `sheets`, 0 when there are none.
fn mean_of(sheets: &[&SheetMetrics], f: fn(&SheetMetrics) -> f64) -> f64 {
    mean(sheets.iter().map(|s| f(s))).unwrap_or(0.0)
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::FieldValue;

    fn record(status: Option<StatusValue>) -> NormalizedRecord {
        let mut rec = NormalizedRecord::new(2);
        if let Some(s) = status {
            rec.set(CanonicalField::Status, FieldValue::Status(s));
        }
        rec
    }

    fn canonical(s: CanonicalStatus) -> Option<StatusValue> {
        Some(StatusValue::Canonical(s))
    }

    fn dated(opened: (i32, u32, u32), resolved: (i32, u32, u32)) -> NormalizedRecord {
        let mut rec = record(canonical(CanonicalStatus::Quitado));
        set_dates(&mut rec, opened, resolved);
        rec
    }

    fn set_dates(rec: &mut NormalizedRecord, opened: (i32, u32, u32), resolved: (i32, u32, u32)) {
        let d = |(y, m, d): (i32, u32, u32)| {
            FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
        };
        rec.set(CanonicalField::Date, d(opened));
        rec.set(CanonicalField::ResolutionDate, d(resolved));
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    fn reconciles(
        total: usize,
        counts: &BTreeMap<CanonicalStatus, usize>,
        out_of_taxonomy: usize,
        missing: usize,
    ) {
        assert_eq!(total, counts.values().sum::<usize>() + out_of_taxonomy + missing);
    }

    #[test]
    fn counts_include_every_status_and_buckets() {
        let records = vec![
            record(canonical(CanonicalStatus::Aprovado)),
            record(canonical(CanonicalStatus::Aprovado)),
            record(canonical(CanonicalStatus::Pendente)),
            record(Some(StatusValue::OutOfTaxonomy)),
            record(None),
        ];
        let m = SheetMetrics::compute(&records, &MetricsPolicy::default());
        assert_eq!(m.total_records, 5);
        assert_eq!(m.status_counts.len(), CanonicalStatus::ALL.len());
        assert_eq!(m.count(StatusValue::Canonical(CanonicalStatus::Aprovado)), 2);
        assert_eq!(m.count(StatusValue::Canonical(CanonicalStatus::Cancelado)), 0);
        assert_eq!(m.count(StatusValue::OutOfTaxonomy), 1);
        assert_eq!(m.missing_status, 1);
        assert!((m.resolution_rate - 0.4).abs() < 1e-12);
        assert!((m.pendency_rate - 0.2).abs() < 1e-12);
        assert!((m.effectiveness_rate - 0.4).abs() < 1e-12);
        assert_eq!(m.attention_rate, 0.0);
        assert_eq!(m.mean_days_to_resolution, None);
    }

    #[test]
    fn empty_sheet_has_zero_rates() {
        let m = SheetMetrics::compute(&[], &MetricsPolicy::default());
        assert_eq!(m.total_records, 0);
        assert_eq!(m.resolution_rate, 0.0);
        assert_eq!(m.pendency_rate, 0.0);
        assert_eq!(m.mean_days_to_resolution, None);
        assert!(m.nonzero_counts().is_empty());
    }

    #[test]
    fn mean_days_uses_records_with_both_dates_only() {
        let records = vec![
            dated((2024, 1, 1), (2024, 1, 11)),
            dated((2024, 1, 1), (2024, 1, 5)),
            record(canonical(CanonicalStatus::Quitado)),
        ];
        let m = SheetMetrics::compute(&records, &MetricsPolicy::default());
        assert_eq!(m.records_with_both_dates, 2);
        assert_eq!(m.mean_days_to_resolution, Some(7.0));
    }

    #[test]
    fn attention_rate_follows_policy() {
        let records = vec![
            record(canonical(CanonicalStatus::Prioridade)),
            record(canonical(CanonicalStatus::Analise)),
            record(canonical(CanonicalStatus::Cancelado)),
            record(canonical(CanonicalStatus::Cancelado)),
        ];
        let m = SheetMetrics::compute(&records, &MetricsPolicy::default());
        assert!((m.attention_rate - 0.5).abs() < 1e-12);

        let policy = MetricsPolicy {
            successful: vec![CanonicalStatus::Cancelado],
            attention: vec![],
        };
        let m = SheetMetrics::compute(&records, &policy);
        assert!((m.resolution_rate - 0.5).abs() < 1e-12);
        assert_eq!(m.attention_rate, 0.0);
    }

    #[test]
    fn group_rates_are_mean_of_sheet_rates() {
        let policy = MetricsPolicy::default();
        let small = SheetMetrics::compute(&[record(canonical(CanonicalStatus::Aprovado))], &policy);
        let large = SheetMetrics::compute(
            &[
                record(canonical(CanonicalStatus::Pendente)),
                record(canonical(CanonicalStatus::Pendente)),
                record(canonical(CanonicalStatus::Pendente)),
            ],
            &policy,
        );
        let group = GroupMetrics::from_sheets([&small, &large]);
        assert_eq!(group.sheet_count, 2);
        assert_eq!(group.total_records, 4);
        // pooled counts would give 0.25; the per-sheet mean is 0.5.
        assert!((group.resolution_rate - 0.5).abs() < 1e-12);
        assert!((group.pendency_rate - 0.5).abs() < 1e-12);
        assert_eq!(group.status_counts[&CanonicalStatus::Pendente], 3);
    }

    #[test]
    fn group_mean_days_skips_sheets_without_dates() {
        let policy = MetricsPolicy::default();
        let a = SheetMetrics::compute(&[dated((2024, 1, 1), (2024, 1, 3))], &policy);
        let b = SheetMetrics::compute(&[record(None)], &policy);
        let c = SheetMetrics::compute(&[dated((2024, 1, 1), (2024, 1, 7))], &policy);
        let group = GroupMetrics::from_sheets([&a, &b, &c]);
        assert_eq!(group.mean_days_to_resolution, Some(4.0));
    }

    #[test]
    fn empty_group_is_all_zero() {
        let group = GroupMetrics::from_sheets(std::iter::empty());
        assert_eq!(group.sheet_count, 0);
        assert_eq!(group.resolution_rate, 0.0);
        assert_eq!(group.mean_days_to_resolution, None);
    }

    #[test]
    fn ranking_orders_by_rate_then_size_then_name() {
        let empty = SheetMetrics::compute(&[], &MetricsPolicy::default());
        let entry = |source: &str, sheet: &str, rate: f64, total: usize| RankedSheet {
            resolution_rate: rate,
            total_records: total,
            ..RankedSheet::new(source, sheet, &empty)
        };
        let ranked = rank_sheets(vec![
            entry("b", "x", 0.5, 10),
            entry("a", "y", 0.9, 1),
            entry("a", "x", 0.5, 10),
            entry("a", "z", 0.5, 20),
        ]);
        let order: Vec<(&str, &str)> =
            ranked.iter().map(|r| (r.source.as_str(), r.sheet.as_str())).collect();
        assert_eq!(order, vec![("a", "y"), ("a", "z"), ("a", "x"), ("b", "x")]);
        let positions: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn totals_reconcile_with_status_buckets() {
        let policy = MetricsPolicy::default();
        let mixed = SheetMetrics::compute(
            &[
                record(canonical(CanonicalStatus::Aprovado)),
                record(canonical(CanonicalStatus::Prioridade)),
                record(canonical(CanonicalStatus::Pendente)),
                record(Some(StatusValue::OutOfTaxonomy)),
                record(Some(StatusValue::OutOfTaxonomy)),
                record(None),
            ],
            &policy,
        );
        reconciles(
            mixed.total_records,
            &mixed.status_counts,
            mixed.out_of_taxonomy,
            mixed.missing_status,
        );
        assert_eq!(mixed.total_records, 6);

        let other = SheetMetrics::compute(
            &[record(None), dated((2024, 1, 1), (2024, 1, 2))],
            &policy,
        );
        let empty = SheetMetrics::compute(&[], &policy);
        let group = GroupMetrics::from_sheets([&mixed, &other, &empty]);
        reconciles(
            group.total_records,
            &group.status_counts,
            group.out_of_taxonomy,
            group.missing_status,
        );
        assert_eq!(group.total_records, 8);
        assert_eq!(group.missing_status, 2);
    }

    #[test]
    fn sheets_without_records_stay_out_of_rate_means() {
        let policy = MetricsPolicy::default();
        let resolved =
            SheetMetrics::compute(&[record(canonical(CanonicalStatus::Aprovado))], &policy);
        let header_only = SheetMetrics::compute(&[], &policy);
        let group = GroupMetrics::from_sheets([&resolved, &header_only]);

        assert_eq!(group.sheet_count, 2);
        assert_eq!(group.sheets_with_records, 1);
        assert_eq!(group.total_records, 1);
        assert_close(group.resolution_rate, 1.0);
        assert_close(group.effectiveness_rate, 1.0);
        assert_close(group.pendency_rate, 0.0);
        assert_close(group.efficiency_score, resolved.efficiency_score);

        let only_empty = GroupMetrics::from_sheets([&header_only]);
        assert_eq!(only_empty.sheet_count, 1);
        assert_eq!(only_empty.sheets_with_records, 0);
        assert_eq!(only_empty.resolution_rate, 0.0);
    }

    #[test]
    fn efficiency_score_blends_rates_and_speed() {
        // 0.4 * 0.5 + 0.3 * (1 / (1 + 30 / 30)) + 0.2 * (1 - 0.25) + 0.1 * 0.25
        let mut approved = record(canonical(CanonicalStatus::Aprovado));
        set_dates(&mut approved, (2024, 1, 1), (2024, 1, 21));
        let mut paid = record(canonical(CanonicalStatus::Quitado));
        set_dates(&mut paid, (2024, 1, 1), (2024, 2, 10));
        let records = vec![
            approved,
            paid,
            record(canonical(CanonicalStatus::Pendente)),
            record(canonical(CanonicalStatus::Prioridade)),
        ];
        let m = SheetMetrics::compute(&records, &MetricsPolicy::default());
        assert_eq!(m.mean_days_to_resolution, Some(30.0));
        assert_eq!(m.mean_days_to_approval, Some(20.0));
        assert_close(m.efficiency_score, 0.2 + 0.15 + 0.15 + 0.025);
        assert_eq!(m.efficiency, Efficiency::Low);
    }

    #[test]
    fn fast_fully_resolved_sheet_scores_high() {
        let mut approved = record(canonical(CanonicalStatus::Aprovado));
        set_dates(&mut approved, (2024, 3, 1), (2024, 3, 1));
        let m = SheetMetrics::compute(&[approved], &MetricsPolicy::default());
        // 0.4 + 0.3 + 0.2, no priority records.
        assert_close(m.efficiency_score, 0.9);
        assert_eq!(m.efficiency, Efficiency::High);
        assert_eq!(m.mean_days_to_approval, Some(0.0));
    }

    #[test]
    fn efficiency_score_is_clamped_and_handles_missing_dates() {
        assert_close(efficiency_score(1.0, Some(-10.0), 0.0, 1.0), 1.0);
        assert_close(efficiency_score(1.0, None, 0.0, 0.0), 0.6);
        assert_close(efficiency_score(0.0, None, 1.0, 0.0), 0.0);

        let undated = SheetMetrics::compute(
            &[record(canonical(CanonicalStatus::Quitado))],
            &MetricsPolicy::default(),
        );
        assert_eq!(undated.mean_days_to_approval, None);
        assert_close(undated.efficiency_score, 0.6);

        let empty = SheetMetrics::compute(&[], &MetricsPolicy::default());
        assert_eq!(empty.efficiency_score, 0.0);
        assert_eq!(empty.efficiency, Efficiency::Low);
    }

    #[test]
    fn percentile_ranks_scores_with_ties_averaged() {
        let empty = SheetMetrics::compute(&[], &MetricsPolicy::default());
        let entry = |sheet: &str, rate: f64, score: f64| RankedSheet {
            resolution_rate: rate,
            efficiency_score: score,
            ..RankedSheet::new("s", sheet, &empty)
        };
        let ranked = rank_sheets(vec![
            entry("a", 0.9, 0.2),
            entry("b", 0.8, 0.5),
            entry("c", 0.7, 0.5),
            entry("d", 0.6, 0.9),
        ]);
        let percentiles: Vec<f64> = ranked.iter().map(|r| r.efficiency_percentile).collect();
        // ascending ranks: 0.2 -> 1, 0.5 -> (2 + 3) / 2, 0.9 -> 4; out of 4.
        assert_eq!(percentiles, vec![25.0, 62.5, 62.5, 100.0]);
    }
}
