use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::PoisonError;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use crate::agent::Arguments;
use crate::envelope::ResponseEnvelope;
use crate::envelope::Status;

/// One invocation attempt, including lookups that found no agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    pub agent_name: String,
    pub arguments: Arguments,
    pub result: ResponseEnvelope,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecutionRecord {
    pub fn status(&self) -> Status {
        self.result.status()
    }
}

/// Bounded FIFO of execution records shared by every caller of a registry.
#[derive(Debug)]
pub struct ExecutionHistory {
    capacity: usize,
    records: Mutex<VecDeque<ExecutionRecord>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_relevant: usize,
    pub average_duration_ms: u64,
    pub per_agent: BTreeMap<String, AgentStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStats {
    pub invocations: usize,
    pub success_rate: f64,
    pub average_duration_ms: u64,
}

impl ExecutionHistory {
    /// A capacity of zero is bumped to one so the latest record is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, record: ExecutionRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Up to `limit` records, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<ExecutionRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn summary(&self) -> HistorySummary {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.is_empty() {
            return HistorySummary::default();
        }

        let mut summary = HistorySummary {
            total: records.len(),
            ..HistorySummary::default()
        };
        let mut total_duration: u64 = 0;
        let mut per_agent: BTreeMap<String, (usize, usize, u64)> = BTreeMap::new();

        for record in records.iter() {
            match record.status() {
                Status::Success => summary.succeeded += 1,
                Status::Error => summary.failed += 1,
                Status::NotRelevant => summary.not_relevant += 1,
            }
            total_duration = total_duration.saturating_add(record.duration_ms);

            let entry = per_agent.entry(record.agent_name.clone()).or_default();
            entry.0 += 1;
            if record.status() == Status::Success {
                entry.1 += 1;
            }
            entry.2 = entry.2.saturating_add(record.duration_ms);
        }

        summary.average_duration_ms = total_duration / records.len() as u64;
        summary.per_agent = per_agent
            .into_iter()
            .map(|(name, (invocations, successes, duration))| {
                let stats = AgentStats {
                    invocations,
                    success_rate: successes as f64 / invocations as f64,
                    average_duration_ms: duration / invocations as u64,
                };
                (name, stats)
            })
            .collect();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(agent: &str, result: ResponseEnvelope, duration_ms: u64) -> ExecutionRecord {
        ExecutionRecord {
            agent_name: agent.to_string(),
            arguments: Arguments::new(),
            result,
            started_at: Utc::now(),
            duration_ms,
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let history = ExecutionHistory::new(3);
        for i in 0..5 {
            history.push(record(&format!("agent{i}"), ResponseEnvelope::success("ok"), i));
        }
        assert_eq!(history.len(), 3);
        let names: Vec<String> = history
            .recent(10)
            .into_iter()
            .map(|r| r.agent_name)
            .collect();
        assert_eq!(names, vec!["agent4", "agent3", "agent2"]);
    }

    #[test]
    fn recent_respects_limit() {
        let history = ExecutionHistory::new(10);
        for i in 0..4 {
            history.push(record("echo", ResponseEnvelope::success(format!("{i}")), 1));
        }
        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].result.report(), "3");
        assert_eq!(recent[1].result.report(), "2");
        assert!(history.recent(0).is_empty());
    }

    #[test]
    fn zero_capacity_keeps_latest() {
        let history = ExecutionHistory::new(0);
        history.push(record("a1", ResponseEnvelope::success("first"), 1));
        history.push(record("a2", ResponseEnvelope::success("second"), 1));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.recent(5)[0].agent_name, "a2");
    }

    #[test]
    fn summary_aggregates_per_agent() {
        let history = ExecutionHistory::new(10);
        history.push(record("weather", ResponseEnvelope::success("sunny"), 10));
        history.push(record("weather", ResponseEnvelope::error("timeout"), 30));
        history.push(record("legal", ResponseEnvelope::not_relevant("?"), 5));

        let summary = history.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.not_relevant, 1);
        assert_eq!(summary.average_duration_ms, 15);

        let weather = &summary.per_agent["weather"];
        assert_eq!(weather.invocations, 2);
        assert_eq!(weather.success_rate, 0.5);
        assert_eq!(weather.average_duration_ms, 20);
    }

    #[test]
    fn empty_summary_is_default() {
        let history = ExecutionHistory::new(4);
        assert_eq!(history.summary(), HistorySummary::default());
        history.push(record("x1", ResponseEnvelope::success("ok"), 1));
        history.clear();
        assert!(history.is_empty());
    }
}
