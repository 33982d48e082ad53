use crate::status::is_ready_status;

/// What the reconcile pass must do for one record after a successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// Terminal status: notify once and delete the record.
    Ready,
    /// Status differs from the stored one: notify, persist it, counter to 0.
    Changed(String),
    /// Unchanged and the counter hit the threshold: stale alert, counter to 0.
    StaleAlert,
    /// Unchanged below the threshold: persist the incremented counter.
    Count(u32),
}

/// Pure notification/throttling policy. A `None` stored status (first pass
/// for a long-validity record) counts as a change so the user learns the
/// initial status.
pub fn decide(
    stored_status: Option<&str>,
    checks_since_change: u32,
    polled_status: &str,
    stale_threshold: u32,
) -> PollDecision {
    if is_ready_status(polled_status) {
        return PollDecision::Ready;
    }

    if stored_status != Some(polled_status) {
        return PollDecision::Changed(polled_status.to_string());
    }

    let next = checks_since_change + 1;
    if next >= stale_threshold {
        PollDecision::StaleAlert
    } else {
        PollDecision::Count(next)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{decide, PollDecision};
    use crate::status::READY_STATUS;

    const THRESHOLD: u32 = 48;

    #[test]
    fn change_always_wins_regardless_of_counter() {
        for checks in [0, 1, 47, 48] {
            assert_eq!(
                decide(Some("В обработке"), checks, "Готов к выдаче", THRESHOLD),
                PollDecision::Changed("Готов к выдаче".to_string())
            );
        }
    }

    #[test]
    fn first_poll_counts_as_change() {
        assert_eq!(
            decide(None, 0, "В обработке", THRESHOLD),
            PollDecision::Changed("В обработке".to_string())
        );
    }

    #[test]
    fn unchanged_increments_below_threshold() {
        assert_eq!(
            decide(Some("В обработке"), 1, "В обработке", THRESHOLD),
            PollDecision::Count(2)
        );
        assert_eq!(
            decide(Some("В обработке"), 46, "В обработке", THRESHOLD),
            PollDecision::Count(47)
        );
    }

    #[test]
    fn forty_eighth_unchanged_poll_fires_exactly_one_stale_alert() {
        // 47 checks on the clock, the 48th unchanged poll alerts...
        assert_eq!(
            decide(Some("В обработке"), 47, "В обработке", THRESHOLD),
            PollDecision::StaleAlert
        );
        // ...and the next one after the reset does not.
        assert_eq!(
            decide(Some("В обработке"), 0, "В обработке", THRESHOLD),
            PollDecision::Count(1)
        );
    }

    #[test]
    fn ready_preempts_both_change_and_stale() {
        assert_eq!(
            decide(Some("В обработке"), 47, READY_STATUS, THRESHOLD),
            PollDecision::Ready
        );
        assert_eq!(decide(None, 0, READY_STATUS, THRESHOLD), PollDecision::Ready);
    }
}
