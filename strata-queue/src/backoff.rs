//! Retry policy: which failures retry, how often, and how long to wait.

use std::time::Duration;

/// Hard ceiling on execution attempts per job.
pub const MAX_ATTEMPTS: i32 = 3;

/// Backoff before re-running a job whose `attempt`-th execution just failed:
/// 1s, 4s, 16s.
pub fn backoff_delay(attempt: i32) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(0);
    Duration::from_secs(4u64.saturating_pow(exponent))
}

/// What to do with a job whose execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Park the job as `delayed` and retry after the given backoff.
    Retry(Duration),
    /// Mark the job terminally `failed`.
    Fail,
}

/// Decides the transition for a failed execution.
///
/// Only transient infrastructure errors (deadlock, lost connection) retry, and only
/// while the attempt budget lasts. Everything else is terminal.
pub fn failure_action(transient: bool, attempt: i32, max_attempts: i32) -> FailureAction {
    if transient && attempt < max_attempts {
        FailureAction::Retry(backoff_delay(attempt))
    } else {
        FailureAction::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(16));
        // Defensive inputs stay sane.
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
    }

    #[test]
    fn test_transient_failures_retry_until_budget_exhausted() {
        assert_eq!(
            failure_action(true, 1, MAX_ATTEMPTS),
            FailureAction::Retry(Duration::from_secs(1))
        );
        assert_eq!(
            failure_action(true, 2, MAX_ATTEMPTS),
            FailureAction::Retry(Duration::from_secs(4))
        );
        assert_eq!(failure_action(true, 3, MAX_ATTEMPTS), FailureAction::Fail);
    }

    #[test]
    fn test_permanent_failures_never_retry() {
        for attempt in 1..=5 {
            assert_eq!(failure_action(false, attempt, MAX_ATTEMPTS), FailureAction::Fail);
        }
    }

    #[test]
    fn test_attempts_are_bounded() {
        // Simulate a job that fails transiently forever: it is charged one attempt
        // per execution and must stop retrying before exceeding the budget.
        let mut attempt = 1;
        let mut executions = 0;
        loop {
            executions += 1;
            match failure_action(true, attempt, MAX_ATTEMPTS) {
                FailureAction::Retry(_) => attempt += 1,
                FailureAction::Fail => break,
            }
        }
        assert_eq!(executions, MAX_ATTEMPTS);
        assert!(attempt <= MAX_ATTEMPTS);
    }
}
