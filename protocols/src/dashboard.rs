//! Dashboard summary derived from the record list and configurations.

use serde::{Deserialize, Serialize};

use crate::{
    configuration::AgentConfiguration,
    record::{CallRecord, CallStatus},
};

/// Number of calls shown in the "recent calls" panel.
pub const RECENT_CALLS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_calls: usize,
    pub active_calls: usize,
    pub completed_calls: usize,
    pub emergencies: usize,
}

impl DashboardStats {
    pub fn from_records(records: &[CallRecord]) -> Self {
        let count = |status: CallStatus| records.iter().filter(|r| r.status == status).count();
        Self {
            total_calls: records.len(),
            active_calls: count(CallStatus::InProgress),
            completed_calls: count(CallStatus::Completed),
            emergencies: records.iter().filter(|r| r.emergency_detected()).count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    /// Newest first, as ordered by the backend.
    pub recent_calls: Vec<CallRecord>,
    pub configurations: Vec<AgentConfiguration>,
}

impl DashboardSummary {
    /// `records` must already be ordered newest first.
    pub fn new(records: &[CallRecord], configurations: Vec<AgentConfiguration>) -> Self {
        Self {
            stats: DashboardStats::from_records(records),
            recent_calls: records.iter().take(RECENT_CALLS).cloned().collect(),
            configurations,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ids::CallId;

    fn record(id: &str, status: CallStatus, emergency: bool) -> CallRecord {
        CallRecord {
            id: CallId::new(id),
            provider_call_id: None,
            status,
            transcript: None,
            structured_data: Some(json!({ "emergency_detected": emergency })),
            driver_name: "Driver".to_string(),
            load_number: "L-1".to_string(),
            created_at: None,
            updated_at: None,
            duration_ms: None,
            agent_config: None,
        }
    }

    #[test]
    fn stats_count_statuses_and_emergencies() {
        let records = vec![
            record("1", CallStatus::InProgress, false),
            record("2", CallStatus::Completed, true),
            record("3", CallStatus::Completed, false),
            record("4", CallStatus::Failed, false),
            record("5", CallStatus::Pending, false),
            record("6", CallStatus::Completed, true),
        ];
        let summary = DashboardSummary::new(&records, Vec::new());
        assert_eq!(
            summary.stats,
            DashboardStats {
                total_calls: 6,
                active_calls: 1,
                completed_calls: 3,
                emergencies: 2,
            }
        );
        assert_eq!(summary.recent_calls.len(), RECENT_CALLS);
        assert_eq!(summary.recent_calls[0].id.as_str(), "1");
    }

    #[test]
    fn empty_dashboard() {
        let summary = DashboardSummary::new(&[], Vec::new());
        assert_eq!(summary.stats, DashboardStats::default());
        assert!(summary.recent_calls.is_empty());
    }
}
