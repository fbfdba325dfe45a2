use std::fmt;
use std::time::Duration;

/// Granularity of the acquisition poll loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const POLL_MILLIS: u64 = 100;

/// How long an acquisition may wait for the lock.
///
/// `Millis(0)` makes a single attempt and never sleeps. Waiting happens in
/// [`POLL_INTERVAL`] steps (shorter when less budget remains), so a call
/// returns within the budget plus at most one poll interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Millisecond budget.
    Millis(u64),
    /// Keep polling until the lock is available.
    Unbounded,
}

impl Timeout {
    /// One attempt, no waiting.
    pub const IMMEDIATE: Timeout = Timeout::Millis(0);

    pub const fn from_millis(millis: u64) -> Self {
        Timeout::Millis(millis)
    }

    /// Consumes budget for the next sleep. `None` once the budget is spent.
    pub(crate) fn take_delay(&mut self) -> Option<Duration> {
        match self {
            Timeout::Unbounded => Some(POLL_INTERVAL),
            Timeout::Millis(0) => None,
            Timeout::Millis(remaining) => {
                let delay = (*remaining).min(POLL_MILLIS);
                *remaining -= delay;
                Some(Duration::from_millis(delay))
            }
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::IMMEDIATE
    }
}

impl From<u64> for Timeout {
    fn from(millis: u64) -> Self {
        Timeout::Millis(millis)
    }
}

/// Rounds up to whole milliseconds, so a non-zero duration never becomes
/// [`Timeout::IMMEDIATE`].
impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        let millis = duration.as_nanos().div_ceil(1_000_000);
        Timeout::Millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeout::Millis(ms) => write!(f, "{ms}ms"),
            Timeout::Unbounded => f.write_str("unbounded"),
        }
    }
}
