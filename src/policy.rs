/// Revision tracking and the staleness gate for device points
use time::{Duration, OffsetDateTime};

/// Unchanged data older than this is no longer written
pub const DEFAULT_STALE_AFTER: Duration = Duration::minutes(15);

/// What to do with the device data fetched this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// The revision moved since the last successful poll
    Changed,
    /// Same revision, but the last change is recent enough to write again
    Fresh,
    /// Same revision for longer than the threshold, skip device points
    Stale,
}

impl PollDecision {
    pub fn should_write(self) -> bool {
        !matches!(self, PollDecision::Stale)
    }
}

/// State carried from one poll cycle to the next
///
/// The failure count only grows and the last update time never moves backwards.
#[derive(Debug, Clone)]
pub struct PollState {
    last_revision: Option<String>,
    last_update: Option<OffsetDateTime>,
    failure_total: u64,
    stale_after: Duration,
}

impl PollState {
    pub fn new(stale_after: Duration) -> Self {
        PollState {
            last_revision: None,
            last_update: None,
            failure_total: 0,
            stale_after,
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_total = self.failure_total.saturating_add(1);
    }

    /// Compare `revision` with the last one seen and remember it
    ///
    /// Nothing has been seen before the first call, so a cold start always counts
    /// as changed.
    pub fn observe_revision(&mut self, revision: &str, now: OffsetDateTime) -> PollDecision {
        if self.last_revision.as_deref() != Some(revision) {
            self.last_revision = Some(revision.to_string());
            self.last_update = Some(match self.last_update {
                Some(previous) if previous > now => previous,
                _ => now,
            });
            return PollDecision::Changed;
        }

        match self.last_update {
            Some(last) if now - last <= self.stale_after => PollDecision::Fresh,
            _ => PollDecision::Stale,
        }
    }

    pub fn failure_total(&self) -> u64 {
        self.failure_total
    }

    pub fn last_update(&self) -> Option<OffsetDateTime> {
        self.last_update
    }

    pub fn last_revision(&self) -> Option<&str> {
        self.last_revision.as_deref()
    }
}

impl Default for PollState {
    fn default() -> Self {
        PollState::new(DEFAULT_STALE_AFTER)
    }
}
