//! Campaign intelligence for voice bot calling campaigns.
//!
//! Reduces raw call records into performance metrics, scores campaign
//! health on a 0-100 scale, attributes revenue leakage to causes and
//! funnel stages, detects performance issues, ranks remediation actions,
//! and raises alerts on period-over-period degradation.
//!
//! [`engine::CampaignIntelligence`] is the main entry point; the
//! submodules expose each pipeline stage for direct use.

pub mod alerts;
pub mod cli;
pub mod config;
pub mod core;
pub mod detection;
pub mod engine;
pub mod errors;
pub mod formatting;
pub mod io;
pub mod leakage;
pub mod metrics;
pub mod recommend;
pub mod scoring;

pub use crate::config::AnalysisConfig;
pub use crate::core::{
    ActionableRecommendation, Alert, CallRecord, CallStatus, CampaignConfig, DropOffStage,
    HealthScore, HealthStatus, IntelligenceReport, IssueDrilldown, IssueType, PerformanceIssue,
    PerformanceMetrics, QuickStatus, RevenueLeakage, Severity, Trend,
};
pub use crate::engine::CampaignIntelligence;
pub use crate::errors::{EngineError, Result};
