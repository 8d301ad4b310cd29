//! Aggregate metrics over the records of one evaluation run.

use crate::record::{EvalRecord, Outcome};

/// Derived statistics for one run. Recomputed from scratch on every call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub total: usize,
    pub resolved: usize,
    pub resolved_rate: f64,
    pub attempted: usize,
    pub attempted_rate: f64,
    /// Resolved as a share of attempted.
    pub success_rate: f64,
    pub errors: usize,
    pub error_rate: f64,
    pub avg_cost: f64,
    pub avg_tokens: f64,
    pub total_cost: f64,
    pub total_tokens: f64,
    pub resolved_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub error_ids: Vec<String>,
}

/// Build a snapshot from records, in input order.
pub fn extract(records: &[EvalRecord]) -> MetricsSnapshot {
    let mut s = MetricsSnapshot {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let id = record.instance_id();

        match record.outcome() {
            Some(Outcome::Resolved) => {
                s.resolved += 1;
                s.resolved_ids.push(id.to_string());
            }
            Some(Outcome::Failed) => s.failed_ids.push(id.to_string()),
            None => {}
        }

        if record.is_attempted() {
            s.attempted += 1;
        }

        if record.is_errored() {
            s.errors += 1;
            s.error_ids.push(id.to_string());
        }

        s.total_cost += record.cost();
        s.total_tokens += record.tokens();
    }

    s.resolved_rate = percent(s.resolved, s.total);
    s.attempted_rate = percent(s.attempted, s.total);
    s.success_rate = percent(s.resolved, s.attempted);
    s.error_rate = percent(s.errors, s.total);
    s.avg_cost = ratio(s.total_cost, s.total);
    s.avg_tokens = ratio(s.total_tokens, s.total);
    s
}

/// `count / denom * 100`, or zero for an empty denominator.
pub fn percent(count: usize, denom: usize) -> f64 {
    if denom > 0 {
        count as f64 / denom as f64 * 100.0
    } else {
        0.0
    }
}

fn ratio(sum: f64, denom: usize) -> f64 {
    if denom > 0 {
        sum / denom as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(line: &str) -> EvalRecord {
        EvalRecord::from_line(line).unwrap()
    }

    #[test]
    fn extract_empty_is_all_zero() {
        let s = extract(&[]);
        assert_eq!(s, MetricsSnapshot::default());
    }

    #[test]
    fn resolved_count_and_rate() {
        let records = vec![
            rec(r#"{"instance_id":"a","test_result":{"resolved":true}}"#),
            rec(r#"{"instance_id":"b","test_result":{"resolved":false}}"#),
            rec(r#"{"instance_id":"c","test_result":{"resolved":true}}"#),
            rec(r#"{"instance_id":"d"}"#),
        ];
        let s = extract(&records);
        assert_eq!(s.total, 4);
        assert_eq!(s.resolved, 2);
        assert!((s.resolved_rate - 50.0).abs() < 1e-9);
        assert_eq!(s.resolved_ids, vec!["a", "c"]);
        assert_eq!(s.failed_ids, vec!["b"]);
    }

    #[test]
    fn success_rate_is_zero_without_attempts() {
        let records = vec![
            rec(r#"{"test_result":{"resolved":true}}"#),
            rec(r#"{"test_result":{"resolved":true}}"#),
        ];
        let s = extract(&records);
        assert_eq!(s.resolved, 2);
        assert_eq!(s.attempted, 0);
        assert_eq!(s.success_rate, 0.0);
    }

    #[test]
    fn success_rate_divides_by_attempted() {
        let records = vec![
            rec(r#"{"git_patch":"x","test_result":{"resolved":true}}"#),
            rec(r#"{"git_patch":"y","test_result":{"resolved":false}}"#),
            rec(r#"{"model_patch":"z","test_result":{"resolved":false}}"#),
            rec(r#"{"model_patch":"w","test_result":{"resolved":false}}"#),
        ];
        let s = extract(&records);
        assert_eq!(s.attempted, 4);
        assert!((s.attempted_rate - 100.0).abs() < 1e-9);
        assert!((s.success_rate - 25.0).abs() < 1e-9);
    }

    #[test]
    fn errored_record_without_test_result_is_not_classified() {
        let records = vec![rec(r#"{"instance_id":"x","error":"timeout"}"#)];
        let s = extract(&records);
        assert_eq!(s.errors, 1);
        assert_eq!(s.error_ids, vec!["x"]);
        assert!(s.resolved_ids.is_empty());
        assert!(s.failed_ids.is_empty());
        assert!((s.error_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn buckets_are_independent() {
        let records = vec![rec(
            r#"{"instance_id":"x","git_patch":"diff","error":"agent crashed"}"#,
        )];
        let s = extract(&records);
        assert_eq!(s.attempted, 1);
        assert_eq!(s.errors, 1);
        assert_eq!(s.resolved, 0);
        assert!(s.failed_ids.is_empty());
    }

    #[test]
    fn cost_and_tokens_sum_and_average() {
        let records = vec![
            rec(r#"{"metrics":{"accumulated_cost":1.5,"total_tokens":1000}}"#),
            rec(r#"{"metrics":{"accumulated_cost":0.5}}"#),
            rec(r#"{"metrics":{"total_tokens":3000}}"#),
            rec(r#"{}"#),
        ];
        let s = extract(&records);
        assert!((s.total_cost - 2.0).abs() < 1e-9);
        assert!((s.avg_cost - 0.5).abs() < 1e-9);
        assert!((s.total_tokens - 4000.0).abs() < 1e-9);
        assert!((s.avg_tokens - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn float_token_counts_keep_the_record() {
        let records = vec![
            rec(r#"{"instance_id":"a","test_result":{"resolved":true},"metrics":{"total_tokens":1500.0}}"#),
            rec(r#"{"instance_id":"b","metrics":{"total_tokens":499.5}}"#),
        ];
        let s = extract(&records);
        assert_eq!(s.total, 2);
        assert_eq!(s.resolved, 1);
        assert!((s.total_tokens - 1999.5).abs() < 1e-9);
        assert!((s.avg_tokens - 999.75).abs() < 1e-9);
    }

    #[test]
    fn missing_instance_id_uses_sentinel() {
        let records = vec![rec(r#"{"test_result":{"resolved":true}}"#)];
        let s = extract(&records);
        assert_eq!(s.resolved_ids, vec!["unknown"]);
    }

    #[test]
    fn resolved_rate_matches_formula_across_sizes() {
        for n in 1..=12usize {
            for r in 0..=n {
                let records: Vec<EvalRecord> = (0..n)
                    .map(|i| {
                        let resolved = i < r;
                        rec(&format!(
                            r#"{{"instance_id":"t{i}","test_result":{{"resolved":{resolved}}}}}"#
                        ))
                    })
                    .collect();
                let s = extract(&records);
                assert_eq!(s.resolved, r);
                let expected = r as f64 / n as f64 * 100.0;
                assert!((s.resolved_rate - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn percent_guards_zero_denominator() {
        assert_eq!(percent(5, 0), 0.0);
        assert_eq!(percent(0, 0), 0.0);
        assert!((percent(1, 4) - 25.0).abs() < 1e-9);
    }
}
