use crate::compare;
use crate::config::CompareConfig;
use crate::loader::{self, LoadedLog};
use crate::report::{self, InputSummary};
use crate::snapshot;
use std::path::Path;

fn summary(log: &LoadedLog) -> InputSummary {
    InputSummary {
        path: log.path.clone(),
        records: log.records.len(),
        skipped: log.skipped,
    }
}

/// Load both logs, compare them and render the report text.
///
/// Both inputs are resolved before either is read, so a missing file
/// stops the run before any computation.
pub fn build_report(
    baseline: &Path,
    optimized: &Path,
    cfg: &CompareConfig,
    generated_at: &str,
) -> Result<String, String> {
    let baseline = loader::resolve_input(baseline).map_err(|e| e.to_string())?;
    let optimized = loader::resolve_input(optimized).map_err(|e| e.to_string())?;

    let base_log = loader::load_jsonl(&baseline).map_err(|e| e.to_string())?;
    let opt_log = loader::load_jsonl(&optimized).map_err(|e| e.to_string())?;

    let base = snapshot::extract(&base_log.records);
    let opt = snapshot::extract(&opt_log.records);
    for (label, s) in [("baseline", &base), ("optimized", &opt)] {
        tracing::debug!(
            run = label,
            total = s.total,
            resolved = s.resolved_ids.len(),
            failed = s.failed_ids.len(),
            errored = s.error_ids.len(),
            "metrics extracted"
        );
    }

    let cmp = compare::compare(&base, &opt);
    tracing::debug!(
        resolved_improvement = cmp.roi.resolved_improvement,
        cost_increase = cmp.roi.cost_increase,
        net = cmp.diff.net(),
        "comparison computed"
    );

    Ok(report::render(
        &cmp,
        &summary(&base_log),
        &summary(&opt_log),
        generated_at,
        cfg.id_preview_limit,
    ))
}

/// Handle the `compare` subcommand: build, save and echo the report.
pub fn handle_compare(baseline: &Path, optimized: &Path, cfg: &CompareConfig) -> Result<(), String> {
    let rule = "=".repeat(80);
    println!("{rule}");
    println!("{}", report::TITLE);
    println!("{rule}");
    println!();

    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let text = build_report(baseline, optimized, cfg, &generated_at)?;

    report::write_report(&cfg.output, &text).map_err(|e| format!("Failed to save report: {e}"))?;
    println!("Report saved to: {}", cfg.output.display());

    println!();
    println!("{rule}");
    println!("Report preview:");
    println!("{rule}");
    println!("{text}");
    Ok(())
}
