//! Cohort outcome counts, throughput and setup-latency percentiles

use crate::resource::SessionStatus;
use crate::session::TestSession;
use serde::{Deserialize, Serialize};

/// Percentiles reported for session setup latency
pub const REPORTED_PERCENTILES: [usize; 3] = [50, 90, 99];

/// Summary of one cohort (or any set of sessions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortSummary {
    /// Sessions considered
    pub total: usize,
    /// Sessions that became available
    pub success: usize,
    /// Sessions that closed before becoming available
    pub failed: usize,
    /// Sessions that timed out
    pub timeout: usize,
    /// Sessions still pending (not counted in any outcome)
    pub pending: usize,
    /// Wall time between start and end (ms)
    pub duration_ms: i64,
    /// `total * 1000 / duration_ms`, integer sessions per second.
    /// `None` when the duration is not positive.
    pub sessions_per_second: Option<i64>,
    /// Setup latency over available sessions; `None` when there are none
    pub setup_latency: Option<SetupLatency>,
}

/// Nearest-rank setup latency percentiles (microseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupLatency {
    /// Available sessions the percentiles are drawn from
    pub samples: usize,
    /// Fastest setup
    pub min_micros: i64,
    /// Median
    pub p50_micros: i64,
    /// 90th percentile
    pub p90_micros: i64,
    /// 99th percentile
    pub p99_micros: i64,
    /// Slowest setup
    pub max_micros: i64,
    /// Session at the 99th percentile
    pub p99_session: String,
}

/// Index of the `p`th percentile in an ascending slice of `len` elements
///
/// `floor(len * p / 100)`; for `p < 100` and `len > 0` the index is in range.
pub fn percentile_index(len: usize, p: usize) -> usize {
    len * p / 100
}

/// Summarize a set of sessions observed between `start_time_milli` and
/// `end_time_milli`.
///
/// Returns `None` for an empty slice. Only `Available` sessions feed the
/// latency percentiles.
pub fn summarize(
    sessions: &[TestSession],
    start_time_milli: i64,
    end_time_milli: i64,
) -> Option<CohortSummary> {
    if sessions.is_empty() {
        return None;
    }

    let mut success = 0;
    let mut failed = 0;
    let mut timeout = 0;
    let mut pending = 0;
    for session in sessions {
        match session.status() {
            SessionStatus::Available => success += 1,
            SessionStatus::Closed => failed += 1,
            SessionStatus::Timeout => timeout += 1,
            _ => pending += 1,
        }
    }

    let total = sessions.len();
    let duration_ms = end_time_milli - start_time_milli;
    let sessions_per_second = (duration_ms > 0).then(|| total as i64 * 1000 / duration_ms);

    let mut available: Vec<&TestSession> = sessions
        .iter()
        .filter(|s| s.status() == SessionStatus::Available)
        .collect();
    available.sort_by_key(|s| s.setup_latency_micros().unwrap_or_default());
    let setup_latency = setup_latency(&available);

    let summary = CohortSummary {
        total,
        success,
        failed,
        timeout,
        pending,
        duration_ms,
        sessions_per_second,
        setup_latency,
    };
    summary.log();
    Some(summary)
}

fn setup_latency(sorted: &[&TestSession]) -> Option<SetupLatency> {
    let first = *sorted.first()?;
    let last = *sorted.last()?;
    let at = |p: usize| sorted[percentile_index(sorted.len(), p)];
    let latency = |s: &TestSession| s.setup_latency_micros().unwrap_or_default();

    let [p50, p90, p99] = REPORTED_PERCENTILES.map(at);

    Some(SetupLatency {
        samples: sorted.len(),
        min_micros: latency(first),
        p50_micros: latency(p50),
        p90_micros: latency(p90),
        p99_micros: latency(p99),
        max_micros: latency(last),
        p99_session: p99.name().to_string(),
    })
}

impl CohortSummary {
    fn log(&self) {
        tracing::info!(
            sessions = self.total,
            duration_ms = self.duration_ms,
            sessions_per_second = ?self.sessions_per_second,
            success = self.success,
            failed = self.failed,
            timeout = self.timeout,
            pending = self.pending,
            "Session cohort summary"
        );

        match &self.setup_latency {
            Some(latency) => tracing::info!(
                samples = latency.samples,
                p50_micros = latency.p50_micros,
                p90_micros = latency.p90_micros,
                p99_micros = latency.p99_micros,
                p99_session = %latency.p99_session,
                "Session setup latency"
            ),
            None => tracing::info!("No available sessions, no setup latency percentiles"),
        }
    }

    /// Fraction of sessions that became available (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ApplicationSession, ObjectMeta, SessionSpec};

    fn session(name: &str, status: SessionStatus, created: i64, available: i64) -> TestSession {
        let pending = ApplicationSession::new(ObjectMeta::new("ns", name), SessionSpec::default());
        let mut ts = TestSession::new(&pending, created);

        let mut observed = pending;
        observed.status.session_status = status;
        observed.status.available_time_micro = available;
        ts.observe(&observed);
        ts
    }

    fn available(name: &str, latency: i64) -> TestSession {
        session(name, SessionStatus::Available, 1_000, 1_000 + latency)
    }

    #[test]
    fn test_empty_cohort_is_noop() {
        assert_eq!(summarize(&[], 0, 0), None);
    }

    #[test]
    fn test_percentile_index_bounds() {
        assert_eq!(percentile_index(100, 50), 50);
        assert_eq!(percentile_index(100, 90), 90);
        assert_eq!(percentile_index(100, 99), 99);
        assert_eq!(percentile_index(1, 99), 0);
        assert_eq!(percentile_index(10, 99), 9);
    }

    #[test]
    fn test_percentiles_over_hundred_sessions() {
        // Latencies 0..100 submitted in reverse to exercise the sort
        let sessions: Vec<_> = (0..100)
            .rev()
            .map(|i| available(&format!("s-{i}"), i))
            .collect();

        let summary = summarize(&sessions, 0, 1_000).unwrap();
        let latency = summary.setup_latency.unwrap();

        assert_eq!(latency.samples, 100);
        assert_eq!(latency.min_micros, 0);
        assert_eq!(latency.p50_micros, 50);
        assert_eq!(latency.p90_micros, 90);
        assert_eq!(latency.p99_micros, 99);
        assert_eq!(latency.max_micros, 99);
        assert_eq!(latency.p99_session, "s-99");
    }

    #[test]
    fn test_outcome_classification() {
        let sessions = vec![
            available("a", 10),
            available("b", 20),
            session("c", SessionStatus::Closed, 1_000, 0),
            session("d", SessionStatus::Timeout, 1_000, 0),
            session("e", SessionStatus::Pending, 1_000, 0),
        ];

        let summary = summarize(&sessions, 0, 1_000).unwrap();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.timeout, 1);
        assert_eq!(summary.pending, 1);
        assert!((summary.success_rate() - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_percentiles_exclude_unavailable_sessions() {
        let sessions = vec![
            session("closed", SessionStatus::Closed, 5_000, 0),
            session("timeout", SessionStatus::Timeout, 5_000, 0),
            available("ok", 300),
        ];

        let latency = summarize(&sessions, 0, 100).unwrap().setup_latency.unwrap();
        assert_eq!(latency.samples, 1);
        assert_eq!(latency.min_micros, 300);
        assert_eq!(latency.p99_micros, 300);
    }

    #[test]
    fn test_no_available_sessions_has_no_percentiles() {
        let sessions = vec![
            session("c", SessionStatus::Closed, 1_000, 0),
            session("d", SessionStatus::Timeout, 1_000, 0),
        ];
        let summary = summarize(&sessions, 0, 1_000).unwrap();
        assert!(summary.setup_latency.is_none());
    }

    #[test]
    fn test_throughput_integer_math() {
        let sessions: Vec<_> = (0..10).map(|i| available(&format!("s-{i}"), 5)).collect();
        let summary = summarize(&sessions, 5_000, 6_000).unwrap();
        assert_eq!(summary.duration_ms, 1_000);
        assert_eq!(summary.sessions_per_second, Some(10));

        let summary = summarize(&sessions, 0, 3_000).unwrap();
        assert_eq!(summary.sessions_per_second, Some(3));
    }

    #[test]
    fn test_zero_duration_has_no_throughput() {
        let sessions = vec![available("a", 1)];
        let summary = summarize(&sessions, 1_000, 1_000).unwrap();
        assert_eq!(summary.sessions_per_second, None);
    }
}
