//! Request-result carriers.
//!
//! Scale and load add-ons (configmaps, secrets, CSRs, stresser) report
//! their request counts and latency percentiles through these types.
//! They are read-only from the configuration's point of view: workers
//! write them back through the shared handle and the document persists
//! them for later comparison runs.

use serde::{Deserialize, Serialize};

use crate::duration::HumanDuration;

/// Summary of one load run against the cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RequestsSummary {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub test_id: String,

    pub success_total: f64,
    pub failure_total: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub latency_histogram: Vec<HistogramBucket>,

    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p50: HumanDuration,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p90: HumanDuration,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p99: HumanDuration,
    #[serde(rename = "latency-p99.9", skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p99_9: HumanDuration,
    #[serde(rename = "latency-p99.99", skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p99_99: HumanDuration,
}

impl RequestsSummary {
    pub fn total(&self) -> f64 {
        self.success_total + self.failure_total
    }

    /// True when no run has been recorded yet; such blocks are omitted
    /// from the persisted document.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One latency bucket; `upper_bound` of `f64::MAX` is the overflow
/// bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct HistogramBucket {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scale: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: u64,
}

/// Delta between the current run's summary and a previous run's,
/// persisted next to the summary for trend tracking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct RequestsCompare {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub test_id: String,
    pub success_total_delta: f64,
    pub failure_total_delta: f64,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p50_delta: HumanDuration,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p90_delta: HumanDuration,
    #[serde(skip_serializing_if = "HumanDuration::is_zero")]
    pub latency_p99_delta: HumanDuration,
}

impl RequestsCompare {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: a stresser run's summary lands in the document with the
    /// dotted percentile names intact.
    #[test]
    fn story_summary_uses_dotted_percentile_names() {
        let summary = RequestsSummary {
            test_id: "run-1".to_string(),
            success_total: 950.0,
            failure_total: 50.0,
            latency_p99_9: "1s 500ms".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(summary.total(), 1000.0);

        let yaml = serde_yaml::to_string(&summary).unwrap();
        assert!(yaml.contains("latency-p99.9:"));

        let back: RequestsSummary = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, summary);
    }
}
