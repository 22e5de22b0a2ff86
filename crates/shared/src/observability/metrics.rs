//! 指标模块
//!
//! 基于 metrics crate 记录转发指标。导出由宿主进程安装的 recorder 决定，
//! 未安装 recorder 时记录操作为空操作。

/// 注册指标描述
pub fn describe() {
    metrics::describe_counter!(
        "forwarder_records_total",
        "Total number of processed records by outcome"
    );
    metrics::describe_counter!(
        "rule_evaluations_total",
        "Total number of rule evaluations by match result"
    );
    metrics::describe_histogram!(
        "forwarder_send_duration_seconds",
        "Endpoint delivery duration in seconds"
    );
    metrics::describe_counter!("admin_alerts_total", "Total number of admin alerts");
}

/// 记录单条记录的处理结果
#[inline]
pub fn record_outcome(outcome: &str) {
    metrics::counter!("forwarder_records_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录规则评估
#[inline]
pub fn record_rule_evaluation(matched: bool) {
    metrics::counter!("rule_evaluations_total", "matched" => matched.to_string()).increment(1);
}

/// 记录投递耗时
#[inline]
pub fn record_send(profile: &str, status: u16, duration_secs: f64) {
    metrics::histogram!(
        "forwarder_send_duration_seconds",
        "profile" => profile.to_string(),
        "status" => status.to_string()
    )
    .record(duration_secs);
}

/// 记录管理员告警
#[inline]
pub fn record_admin_alert(delivered: bool) {
    metrics::counter!("admin_alerts_total", "delivered" => delivered.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe();
        record_outcome("sent");
        record_admin_alert(false);
    }

    #[test]
    fn test_outcome_counter_labels() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_outcome("sent");
            record_outcome("sent");
            record_outcome("failed");
        });

        let mut counts: Vec<(String, u64)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, ..)| key.key().name() == "forwarder_records_total")
            .map(|(key, _, _, value)| {
                let outcome = key
                    .key()
                    .labels()
                    .find(|label| label.key() == "outcome")
                    .map(|label| label.value().to_string())
                    .unwrap_or_default();
                match value {
                    DebugValue::Counter(n) => (outcome, n),
                    other => panic!("unexpected value {:?}", other),
                }
            })
            .collect();
        counts.sort();

        assert_eq!(
            counts,
            vec![("failed".to_string(), 1), ("sent".to_string(), 2)]
        );
    }
}
