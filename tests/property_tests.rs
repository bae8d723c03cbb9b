//! Invariant checks over randomized record sets.

mod common;

use callscope::engine::CampaignIntelligence;
use callscope::leakage::LeakageCalculator;
use callscope::metrics::MetricAggregator;
use callscope::{AnalysisConfig, CallRecord, CallStatus, DropOffStage};
use common::{base_time, campaign};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn arb_status() -> impl Strategy<Value = CallStatus> {
    prop_oneof![
        Just(CallStatus::Completed),
        Just(CallStatus::Dropped),
        Just(CallStatus::Escalated),
        Just(CallStatus::Failed),
        Just(CallStatus::ComplianceViolation),
    ]
}

fn arb_stage() -> impl Strategy<Value = DropOffStage> {
    prop_oneof![
        Just(DropOffStage::Intro),
        Just(DropOffStage::Qualification),
        Just(DropOffStage::Pitch),
        Just(DropOffStage::ObjectionHandling),
        Just(DropOffStage::Closing),
        Just(DropOffStage::FollowUp),
    ]
}

prop_compose! {
    fn arb_record()(
        status in arb_status(),
        stage in arb_stage(),
        conversion_value in 0.0f64..2_000.0,
        revenue_fraction in 0.0f64..1.0,
        sentiment in -1.0f64..1.0,
        duration in 0u32..7200,
        flagged in proptest::bool::weighted(0.1),
    ) -> CallRecord {
        let actual_revenue = if status == CallStatus::Completed {
            conversion_value * revenue_fraction
        } else {
            0.0
        };
        let mut compliance_flags = BTreeSet::new();
        if flagged {
            compliance_flags.insert("missing_disclosure".to_string());
        }
        CallRecord {
            call_id: String::new(),
            campaign_id: "camp-spring".to_string(),
            timestamp: base_time(),
            duration_seconds: duration,
            status,
            drop_off_stage: if status == CallStatus::Dropped {
                Some(stage)
            } else {
                None
            },
            escalation_reason: if status == CallStatus::Escalated {
                Some("pricing_question".to_string())
            } else {
                None
            },
            compliance_flags,
            conversion_value,
            actual_revenue,
            sentiment_score: sentiment,
            script_version: "v1".to_string(),
            agent_id: None,
        }
    }
}

fn arb_records(max: usize) -> impl Strategy<Value = Vec<CallRecord>> {
    prop::collection::vec(arb_record(), 1..max).prop_map(|mut records| {
        for (i, record) in records.iter_mut().enumerate() {
            record.call_id = format!("call-{i}");
        }
        records
    })
}

proptest! {
    #[test]
    fn rates_stay_within_unit_interval(records in arb_records(200)) {
        let metrics = MetricAggregator::aggregate("camp-spring", &records, None).unwrap();
        for rate in [
            metrics.conversion_rate,
            metrics.completion_rate,
            metrics.escalation_rate,
            metrics.drop_off_rate,
            metrics.failure_rate,
        ] {
            prop_assert!((0.0..=1.0).contains(&rate));
        }
        prop_assert!(metrics.revenue_leakage >= 0.0);
        prop_assert!(metrics.revenue_leakage_percentage >= 0.0);
    }

    #[test]
    fn leakage_partitions_sum_to_total(records in arb_records(200)) {
        let metrics = MetricAggregator::aggregate("camp-spring", &records, None).unwrap();
        let calculator = LeakageCalculator::new(campaign(), AnalysisConfig::default());
        let leakage = calculator.calculate(&records, &metrics);

        let by_source: f64 = leakage.breakdown_by_source.values().sum();
        let by_stage: f64 = leakage.breakdown_by_stage.values().sum();
        prop_assert!((by_source - leakage.total_leakage).abs() < 1e-6);
        prop_assert!((by_stage - leakage.total_leakage).abs() < 1e-6);
        prop_assert!(leakage.recoverable_amount >= 0.0);
        prop_assert!(leakage.recoverable_amount <= leakage.total_leakage + 1e-6);
        prop_assert!(leakage.top_3_reasons.len() <= 3);
    }

    #[test]
    fn sharded_aggregation_matches_sequential(records in arb_records(120), split in 0usize..120) {
        let whole = MetricAggregator::aggregate("camp-spring", &records, None).unwrap();
        let split = split.min(records.len());
        if split == 0 || split == records.len() {
            return Ok(());
        }
        let (left, right) = records.split_at(split);
        let left_m = MetricAggregator::aggregate("camp-spring", left, None);
        let right_m = MetricAggregator::aggregate("camp-spring", right, None);
        prop_assert!(left_m.is_ok() && right_m.is_ok());
        // Shard totals must recompose exactly.
        let l = left_m.unwrap();
        let r = right_m.unwrap();
        prop_assert_eq!(l.total_calls + r.total_calls, whole.total_calls);
        prop_assert!((l.total_revenue + r.total_revenue - whole.total_revenue).abs() < 1e-6);
        prop_assert!((l.revenue_leakage + r.revenue_leakage - whole.revenue_leakage).abs() < 1e-6);
    }

    #[test]
    fn health_components_stay_in_range(records in arb_records(150)) {
        let engine = CampaignIntelligence::new(campaign(), AnalysisConfig::default()).unwrap();
        let report = engine.analyze(&records, None).unwrap();
        prop_assert!(report.health_score.overall_score <= 100);
        for value in report.health_score.components.values() {
            prop_assert!((0.0..=100.0).contains(value));
        }
    }

    #[test]
    fn issue_ordering_is_by_revenue_impact(records in arb_records(150)) {
        let engine = CampaignIntelligence::new(campaign(), AnalysisConfig::default()).unwrap();
        let report = engine.analyze(&records, None).unwrap();
        for pair in report.issues.iter().zip(report.issues.iter().skip(1)) {
            prop_assert!(pair.0.revenue_impact >= pair.1.revenue_impact);
        }
        for (i, rec) in report.recommendations.iter().enumerate() {
            prop_assert_eq!(rec.priority, i + 1);
        }
    }
}
