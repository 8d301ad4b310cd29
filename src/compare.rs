//! Baseline vs optimized comparison: per-metric deltas, ROI and the
//! instance-level set differences.

use crate::snapshot::MetricsSnapshot;
use std::collections::HashSet;

/// How a metric's values and deltas are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Counts and token figures, shown as whole numbers.
    Count,
    /// Already a percentage; deltas are percentage points.
    Rate,
    Cost,
}

/// The twelve compared metrics, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKey {
    Total,
    Resolved,
    ResolvedRate,
    Attempted,
    AttemptedRate,
    SuccessRate,
    Errors,
    ErrorRate,
    AvgCost,
    AvgTokens,
    TotalCost,
    TotalTokens,
}

impl MetricKey {
    pub const ALL: [MetricKey; 12] = [
        MetricKey::Total,
        MetricKey::Resolved,
        MetricKey::ResolvedRate,
        MetricKey::Attempted,
        MetricKey::AttemptedRate,
        MetricKey::SuccessRate,
        MetricKey::Errors,
        MetricKey::ErrorRate,
        MetricKey::AvgCost,
        MetricKey::AvgTokens,
        MetricKey::TotalCost,
        MetricKey::TotalTokens,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKey::Total => "Total instances",
            MetricKey::Resolved => "Resolved",
            MetricKey::ResolvedRate => "Resolved rate",
            MetricKey::Attempted => "Attempted",
            MetricKey::AttemptedRate => "Attempted rate",
            MetricKey::SuccessRate => "Success rate (of attempted)",
            MetricKey::Errors => "Errors",
            MetricKey::ErrorRate => "Error rate",
            MetricKey::AvgCost => "Avg cost",
            MetricKey::AvgTokens => "Avg tokens",
            MetricKey::TotalCost => "Total cost",
            MetricKey::TotalTokens => "Total tokens",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricKey::Total
            | MetricKey::Resolved
            | MetricKey::Attempted
            | MetricKey::Errors
            | MetricKey::AvgTokens
            | MetricKey::TotalTokens => MetricKind::Count,
            MetricKey::ResolvedRate
            | MetricKey::AttemptedRate
            | MetricKey::SuccessRate
            | MetricKey::ErrorRate => MetricKind::Rate,
            MetricKey::AvgCost | MetricKey::TotalCost => MetricKind::Cost,
        }
    }

    pub fn value(self, s: &MetricsSnapshot) -> f64 {
        match self {
            MetricKey::Total => s.total as f64,
            MetricKey::Resolved => s.resolved as f64,
            MetricKey::ResolvedRate => s.resolved_rate,
            MetricKey::Attempted => s.attempted as f64,
            MetricKey::AttemptedRate => s.attempted_rate,
            MetricKey::SuccessRate => s.success_rate,
            MetricKey::Errors => s.errors as f64,
            MetricKey::ErrorRate => s.error_rate,
            MetricKey::AvgCost => s.avg_cost,
            MetricKey::AvgTokens => s.avg_tokens,
            MetricKey::TotalCost => s.total_cost,
            MetricKey::TotalTokens => s.total_tokens,
        }
    }
}

/// One line of the metrics table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: MetricKey,
    pub baseline: f64,
    pub optimized: f64,
    pub delta: f64,
    /// Relative change in percent; zero when the baseline is not positive.
    pub delta_pct: f64,
}

impl MetricRow {
    pub fn new(key: MetricKey, base: &MetricsSnapshot, opt: &MetricsSnapshot) -> Self {
        let baseline = key.value(base);
        let optimized = key.value(opt);
        let delta = optimized - baseline;
        let delta_pct = if baseline > 0.0 {
            delta / baseline * 100.0
        } else {
            0.0
        };
        Self {
            key,
            baseline,
            optimized,
            delta,
            delta_pct,
        }
    }

    /// Rendered `(baseline, optimized, delta, delta %)` cells.
    pub fn cells(&self) -> [String; 4] {
        match self.key.kind() {
            MetricKind::Rate => [
                format!("{:.2}%", self.baseline),
                format!("{:.2}%", self.optimized),
                format!("{:+.2}pp", self.delta),
                format!("{:+.2}pp", self.delta),
            ],
            MetricKind::Cost => [
                format!("${:.4}", self.baseline),
                format!("${:.4}", self.optimized),
                format_signed_dollars(self.delta),
                format!("{:+.1}%", self.delta_pct),
            ],
            MetricKind::Count => [
                format!("{:.0}", self.baseline),
                format!("{:.0}", self.optimized),
                format!("{:+.0}", self.delta),
                format!("{:+.1}%", self.delta_pct),
            ],
        }
    }
}

/// `$+0.5000` style, sign after the currency symbol.
fn format_signed_dollars(v: f64) -> String {
    format!("${v:+.4}")
}

/// Qualitative reading of the ROI ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiBand {
    CostEffective,
    Marginal,
    Poor,
}

impl RoiBand {
    pub fn from_roi(roi: f64) -> Self {
        if roi > 1.0 {
            RoiBand::CostEffective
        } else if roi > 0.5 {
            RoiBand::Marginal
        } else {
            RoiBand::Poor
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RoiBand::CostEffective => "ROI > 1: cost-effective, worth adopting",
            RoiBand::Marginal => "ROI > 0.5: marginal, weigh cost against the gain",
            RoiBand::Poor => "ROI <= 0.5: poor cost-effectiveness, re-evaluate the approach",
        }
    }
}

/// Resolved-rate gain per unit of relative cost increase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiAnalysis {
    /// Percentage points.
    pub resolved_improvement: f64,
    /// Percent change of the average cost; zero when the baseline has none.
    pub cost_increase: f64,
    /// `None` when the cost did not move, so no ratio exists.
    pub roi: Option<f64>,
}

impl RoiAnalysis {
    pub fn new(base: &MetricsSnapshot, opt: &MetricsSnapshot) -> Self {
        let resolved_improvement = opt.resolved_rate - base.resolved_rate;
        let cost_increase = if base.avg_cost > 0.0 {
            (opt.avg_cost - base.avg_cost) / base.avg_cost * 100.0
        } else {
            0.0
        };
        let roi = (cost_increase != 0.0).then(|| resolved_improvement / cost_increase.abs());
        Self {
            resolved_improvement,
            cost_increase,
            roi,
        }
    }

    pub fn band(&self) -> Option<RoiBand> {
        self.roi.map(RoiBand::from_roi)
    }
}

/// Instances whose resolution flipped between the two runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceDiff {
    /// Resolved in the optimized run only.
    pub newly_resolved: Vec<String>,
    /// Resolved in the baseline run only.
    pub newly_failed: Vec<String>,
}

impl InstanceDiff {
    pub fn new(base: &MetricsSnapshot, opt: &MetricsSnapshot) -> Self {
        Self {
            newly_resolved: difference(&opt.resolved_ids, &base.resolved_ids),
            newly_failed: difference(&base.resolved_ids, &opt.resolved_ids),
        }
    }

    pub fn net(&self) -> i64 {
        self.newly_resolved.len() as i64 - self.newly_failed.len() as i64
    }
}

/// Distinct ids of `left` missing from `right`, in first-encounter order.
fn difference(left: &[String], right: &[String]) -> Vec<String> {
    let exclude: HashSet<&str> = right.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|id| !exclude.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Everything the report shows about two runs.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub rows: Vec<MetricRow>,
    pub roi: RoiAnalysis,
    pub diff: InstanceDiff,
}

pub fn compare(baseline: &MetricsSnapshot, optimized: &MetricsSnapshot) -> Comparison {
    let rows = MetricKey::ALL
        .iter()
        .map(|&key| MetricRow::new(key, baseline, optimized))
        .collect();
    Comparison {
        rows,
        roi: RoiAnalysis::new(baseline, optimized),
        diff: InstanceDiff::new(baseline, optimized),
    }
}
