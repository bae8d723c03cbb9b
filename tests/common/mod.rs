//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;

use callscope::{CallRecord, CallStatus, CampaignConfig, DropOffStage};
use chrono::{DateTime, TimeZone, Utc};

pub fn campaign() -> CampaignConfig {
    CampaignConfig {
        campaign_id: "camp-spring".to_string(),
        campaign_name: "Spring outbound".to_string(),
        start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        target_calls_per_day: 200,
        target_conversion_rate: 0.15,
        target_revenue_per_call: 120.0,
        avg_deal_value: 500.0,
        compliance_rules: vec!["record_consent".to_string()],
        script_versions: vec!["v1".to_string()],
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub struct RecordBuilder {
    record: CallRecord,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: CallRecord {
                call_id: id.to_string(),
                campaign_id: "camp-spring".to_string(),
                timestamp: base_time(),
                duration_seconds: 240,
                status: CallStatus::Completed,
                drop_off_stage: None,
                escalation_reason: None,
                compliance_flags: BTreeSet::new(),
                conversion_value: 0.0,
                actual_revenue: 0.0,
                sentiment_score: 0.0,
                script_version: "v1".to_string(),
                agent_id: None,
            },
        }
    }

    pub fn converted(mut self, value: f64) -> Self {
        self.record.status = CallStatus::Completed;
        self.record.conversion_value = value;
        self.record.actual_revenue = value;
        self
    }

    pub fn dropped(mut self, stage: DropOffStage, lost_value: f64) -> Self {
        self.record.status = CallStatus::Dropped;
        self.record.drop_off_stage = Some(stage);
        self.record.conversion_value = lost_value;
        self.record.actual_revenue = 0.0;
        self
    }

    pub fn escalated(mut self, reason: &str) -> Self {
        self.record.status = CallStatus::Escalated;
        self.record.escalation_reason = Some(reason.to_string());
        self
    }

    pub fn failed(mut self) -> Self {
        self.record.status = CallStatus::Failed;
        self
    }

    pub fn flagged(mut self, flag: &str) -> Self {
        self.record.compliance_flags.insert(flag.to_string());
        self
    }

    pub fn revenue(mut self, actual: f64) -> Self {
        self.record.actual_revenue = actual;
        self
    }

    pub fn value(mut self, conversion_value: f64) -> Self {
        self.record.conversion_value = conversion_value;
        self
    }

    pub fn sentiment(mut self, score: f64) -> Self {
        self.record.sentiment_score = score;
        self
    }

    pub fn build(self) -> CallRecord {
        self.record
    }
}

/// A week of records matching a struggling-but-functional campaign:
/// 12% conversion against a 15% target, modest drop-off, heavy escalation,
/// and uniformly negative sentiment.
pub fn underperforming_week(prefix: &str, deal_value: f64) -> Vec<CallRecord> {
    let mut records = Vec::with_capacity(1400);
    for i in 0..168 {
        records.push(
            RecordBuilder::new(&format!("{prefix}-conv-{i}"))
                .converted(deal_value)
                .sentiment(-0.6)
                .build(),
        );
    }
    for i in 0..924 {
        records.push(
            RecordBuilder::new(&format!("{prefix}-nc-{i}"))
                .sentiment(-0.6)
                .build(),
        );
    }
    for i in 0..42 {
        records.push(
            RecordBuilder::new(&format!("{prefix}-drop-{i}"))
                .dropped(DropOffStage::Pitch, 500.0)
                .sentiment(-0.6)
                .build(),
        );
    }
    for i in 0..196 {
        records.push(
            RecordBuilder::new(&format!("{prefix}-esc-{i}"))
                .escalated("pricing_question")
                .sentiment(-0.6)
                .build(),
        );
    }
    for i in 0..70 {
        records.push(
            RecordBuilder::new(&format!("{prefix}-fail-{i}"))
                .failed()
                .sentiment(-0.6)
                .build(),
        );
    }
    records
}
