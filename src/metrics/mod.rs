//! Metric aggregation: reduces call records into a period snapshot.
//!
//! Aggregation is expressed as a per-record accumulator with a commutative
//! merge, so record sets can be partitioned into shards, reduced
//! independently, and combined. The shards are fixed-size chunks of the
//! input merged in chunk order, never rayon's runtime work-stealing splits:
//! float sums are only associative up to rounding, and an input-determined
//! reduction tree keeps repeated runs bit-identical. Sorting and top-N
//! selection never happen here.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::{CallRecord, CallStatus, DropOffStage, Period, PerformanceMetrics};
use crate::errors::{EngineError, Result};

/// Records per parallel shard. Fixed so the reduction tree depends only on
/// the input length, not on scheduling.
pub(crate) const SHARD_SIZE: usize = 1024;

/// Partial aggregation state for one shard of records.
#[derive(Debug, Clone, Default)]
pub struct MetricAccumulator {
    total: usize,
    completed: usize,
    dropped: usize,
    escalated: usize,
    failed: usize,
    compliance_violations: usize,
    compliance_flag_types: BTreeSet<String>,
    conversions: usize,
    total_revenue: f64,
    expected_revenue: f64,
    revenue_leakage: f64,
    duration_sum: f64,
    sentiment_sum: f64,
    drop_off_breakdown: BTreeMap<DropOffStage, usize>,
    first_seen: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
}

impl MetricAccumulator {
    pub fn add(&mut self, record: &CallRecord) {
        self.total += 1;
        match record.status {
            CallStatus::Completed => self.completed += 1,
            CallStatus::Dropped => self.dropped += 1,
            CallStatus::Escalated => self.escalated += 1,
            CallStatus::Failed => self.failed += 1,
            CallStatus::ComplianceViolation => {}
        }
        if record.has_compliance_violation() {
            self.compliance_violations += 1;
            self.compliance_flag_types
                .extend(record.compliance_flags.iter().cloned());
        }
        if record.is_conversion() {
            self.conversions += 1;
        }
        self.total_revenue += record.actual_revenue;
        self.expected_revenue += record.conversion_value;
        self.revenue_leakage += record.revenue_gap();
        self.duration_sum += record.duration_seconds as f64;
        self.sentiment_sum += record.sentiment_score;
        if let Some(stage) = record.drop_off_stage {
            *self.drop_off_breakdown.entry(stage).or_insert(0) += 1;
        }
        self.first_seen = Some(match self.first_seen {
            Some(first) => first.min(record.timestamp),
            None => record.timestamp,
        });
        self.last_seen = Some(match self.last_seen {
            Some(last) => last.max(record.timestamp),
            None => record.timestamp,
        });
    }

    /// Commutative combine of two shard accumulators.
    pub fn merge(mut self, other: MetricAccumulator) -> MetricAccumulator {
        self.total += other.total;
        self.completed += other.completed;
        self.dropped += other.dropped;
        self.escalated += other.escalated;
        self.failed += other.failed;
        self.compliance_violations += other.compliance_violations;
        self.compliance_flag_types
            .extend(other.compliance_flag_types);
        self.conversions += other.conversions;
        self.total_revenue += other.total_revenue;
        self.expected_revenue += other.expected_revenue;
        self.revenue_leakage += other.revenue_leakage;
        self.duration_sum += other.duration_sum;
        self.sentiment_sum += other.sentiment_sum;
        for (stage, count) in other.drop_off_breakdown {
            *self.drop_off_breakdown.entry(stage).or_insert(0) += count;
        }
        self.first_seen = match (self.first_seen, other.first_seen) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_seen = match (self.last_seen, other.last_seen) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }

    fn finalize(self, campaign_id: &str, period: Option<Period>) -> PerformanceMetrics {
        let total = self.total as f64;
        let rate = |count: usize| if self.total == 0 { 0.0 } else { count as f64 / total };
        let (start, end) = match period {
            Some(p) => (p.start, p.end),
            None => {
                let now = Utc::now();
                (self.first_seen.unwrap_or(now), self.last_seen.unwrap_or(now))
            }
        };
        let leakage_pct = if self.expected_revenue > 0.0 {
            self.revenue_leakage / self.expected_revenue * 100.0
        } else {
            0.0
        };
        PerformanceMetrics {
            campaign_id: campaign_id.to_string(),
            period_start: start,
            period_end: end,
            total_calls: self.total,
            completed_calls: self.completed,
            dropped_calls: self.dropped,
            escalated_calls: self.escalated,
            failed_calls: self.failed,
            compliance_violations: self.compliance_violations,
            compliance_flag_types: self.compliance_flag_types,
            conversions: self.conversions,
            conversion_rate: rate(self.conversions),
            completion_rate: rate(self.completed),
            escalation_rate: rate(self.escalated),
            drop_off_rate: rate(self.dropped),
            failure_rate: rate(self.failed),
            total_revenue: self.total_revenue,
            expected_revenue: self.expected_revenue,
            revenue_leakage: self.revenue_leakage,
            revenue_leakage_percentage: leakage_pct,
            avg_call_duration: if self.total == 0 { 0.0 } else { self.duration_sum / total },
            avg_sentiment: if self.total == 0 { 0.0 } else { self.sentiment_sum / total },
            drop_off_breakdown: self.drop_off_breakdown,
            insufficient_data: self.total == 0,
        }
    }
}

pub struct MetricAggregator;

impl MetricAggregator {
    /// Reduce records into a metrics snapshot for the period.
    ///
    /// Fails with `InsufficientData` when `records` is empty; callers that
    /// want a usable placeholder instead should fall back to
    /// [`MetricAggregator::empty_snapshot`] and skip issue detection.
    pub fn aggregate(
        campaign_id: &str,
        records: &[CallRecord],
        period: Option<Period>,
    ) -> Result<PerformanceMetrics> {
        if records.is_empty() {
            return Err(EngineError::InsufficientData);
        }
        let merged = records
            .par_chunks(SHARD_SIZE)
            .map(|shard| {
                let mut acc = MetricAccumulator::default();
                shard.iter().for_each(|record| acc.add(record));
                acc
            })
            .collect::<Vec<_>>()
            .into_iter()
            .fold(MetricAccumulator::default(), MetricAccumulator::merge);
        log::debug!(
            "aggregated {} records for campaign {}",
            merged.total,
            campaign_id
        );
        Ok(merged.finalize(campaign_id, period))
    }

    /// Zeroed snapshot with the `insufficient_data` flag set. All rates are
    /// 0.0, never NaN.
    pub fn empty_snapshot(campaign_id: &str, period: Option<Period>) -> PerformanceMetrics {
        MetricAccumulator::default().finalize(campaign_id, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, status: CallStatus, cv: f64, ar: f64) -> CallRecord {
        CallRecord {
            call_id: id.to_string(),
            campaign_id: "camp-1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
            duration_seconds: 200,
            status,
            drop_off_stage: if status == CallStatus::Dropped {
                Some(DropOffStage::Pitch)
            } else {
                None
            },
            escalation_reason: None,
            compliance_flags: BTreeSet::new(),
            conversion_value: cv,
            actual_revenue: ar,
            sentiment_score: 0.2,
            script_version: "v1".to_string(),
            agent_id: None,
        }
    }

    #[test]
    fn empty_input_is_insufficient_data() {
        let err = MetricAggregator::aggregate("camp-1", &[], None).unwrap_err();
        assert_eq!(err, EngineError::InsufficientData);
        let snapshot = MetricAggregator::empty_snapshot("camp-1", None);
        assert!(snapshot.insufficient_data);
        assert_eq!(snapshot.conversion_rate, 0.0);
        assert_eq!(snapshot.revenue_leakage_percentage, 0.0);
    }

    #[test]
    fn five_record_smoke_test() {
        let records = vec![
            record("a", CallStatus::Completed, 500.0, 500.0),
            record("b", CallStatus::Completed, 500.0, 500.0),
            record("c", CallStatus::Completed, 500.0, 500.0),
            record("d", CallStatus::Dropped, 500.0, 0.0),
            record("e", CallStatus::Dropped, 500.0, 0.0),
        ];
        let metrics = MetricAggregator::aggregate("camp-1", &records, None).unwrap();
        assert_eq!(metrics.total_calls, 5);
        assert_eq!(metrics.total_revenue, 1500.0);
        assert_eq!(metrics.revenue_leakage, 1000.0);
        assert!((metrics.revenue_leakage_percentage - 40.0).abs() < 1e-9);
        assert!((metrics.drop_off_rate - 0.40).abs() < 1e-9);
        assert_eq!(metrics.drop_off_breakdown[&DropOffStage::Pitch], 2);
        assert!(!metrics.insufficient_data);
    }

    #[test]
    fn merge_matches_sequential_aggregation() {
        let records: Vec<CallRecord> = (0..40)
            .map(|i| {
                let status = match i % 4 {
                    0 => CallStatus::Completed,
                    1 => CallStatus::Dropped,
                    2 => CallStatus::Escalated,
                    _ => CallStatus::Failed,
                };
                record(&format!("c{i}"), status, 100.0 + i as f64, i as f64)
            })
            .collect();

        let whole = MetricAggregator::aggregate("camp-1", &records, None).unwrap();

        let (left, right) = records.split_at(13);
        let mut a = MetricAccumulator::default();
        left.iter().for_each(|r| a.add(r));
        let mut b = MetricAccumulator::default();
        right.iter().for_each(|r| b.add(r));
        let sharded = a.merge(b).finalize("camp-1", None);

        // Counts recompose exactly; float sums only up to rounding, since
        // a different grouping reorders the additions.
        assert_eq!(whole.total_calls, sharded.total_calls);
        assert_eq!(whole.completed_calls, sharded.completed_calls);
        assert_eq!(whole.dropped_calls, sharded.dropped_calls);
        assert_eq!(whole.escalated_calls, sharded.escalated_calls);
        assert_eq!(whole.failed_calls, sharded.failed_calls);
        assert_eq!(whole.conversions, sharded.conversions);
        assert_eq!(whole.drop_off_breakdown, sharded.drop_off_breakdown);
        assert!((whole.total_revenue - sharded.total_revenue).abs() < 1e-9);
        assert!((whole.revenue_leakage - sharded.revenue_leakage).abs() < 1e-9);
        assert!((whole.avg_sentiment - sharded.avg_sentiment).abs() < 1e-9);
        assert!((whole.avg_call_duration - sharded.avg_call_duration).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_bit_identical_across_runs() {
        // Enough records for several parallel shards; the fixed chunk size
        // keeps the reduction tree independent of scheduling, so repeated
        // runs must agree exactly, float fields included.
        let records: Vec<CallRecord> = (0..SHARD_SIZE * 3 + 17)
            .map(|i| {
                let status = match i % 5 {
                    0 | 1 => CallStatus::Completed,
                    2 => CallStatus::Dropped,
                    3 => CallStatus::Escalated,
                    _ => CallStatus::Failed,
                };
                record(&format!("c{i}"), status, 0.1 + i as f64 * 0.3, i as f64 * 0.1)
            })
            .collect();

        let first = MetricAggregator::aggregate("camp-1", &records, None).unwrap();
        for _ in 0..5 {
            let again = MetricAggregator::aggregate("camp-1", &records, None).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn conversion_requires_completion_and_revenue() {
        let records = vec![
            record("a", CallStatus::Completed, 0.0, 0.0),
            record("b", CallStatus::Escalated, 500.0, 500.0),
        ];
        let metrics = MetricAggregator::aggregate("camp-1", &records, None).unwrap();
        assert_eq!(metrics.conversions, 0);
        assert_eq!(metrics.conversion_rate, 0.0);
    }

    #[test]
    fn breakdown_counts_sum_to_dropped_calls() {
        let records = vec![
            record("a", CallStatus::Dropped, 100.0, 0.0),
            record("b", CallStatus::Dropped, 100.0, 0.0),
            record("c", CallStatus::Completed, 100.0, 100.0),
        ];
        let metrics = MetricAggregator::aggregate("camp-1", &records, None).unwrap();
        let breakdown_total: usize = metrics.drop_off_breakdown.values().sum();
        assert_eq!(breakdown_total, metrics.dropped_calls);
    }
}
