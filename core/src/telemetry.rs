use std::time::Duration;

use tracing::info;

use crate::envelope::Status;

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Emit a telemetry log for a completed agent invocation.
pub(crate) fn record_invocation(agent_name: &str, duration: Duration, status: Status) {
    let duration_ms = duration_ms(duration);
    let success = matches!(status, Status::Success);
    info!(
        target: "switchboard::telemetry",
        event = "agent_invocation",
        agent = agent_name,
        success,
        status = status.as_str(),
        duration_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1_250)), 1_250);
        assert_eq!(duration_ms(Duration::from_secs(u64::MAX)), u64::MAX);
    }
}
