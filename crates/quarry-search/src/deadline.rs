//! Wall-clock deadline for bounding query execution time.

use std::time::{Duration, Instant};

/// A point in time after which a running search should stop collecting.
///
/// A deadline is either unbounded or anchored to an [`Instant`]. Collectors
/// poll [`Deadline::expired`] between documents and stop early once it
/// returns true, marking their result as truncated rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    end: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Deadline { end: None }
    }

    /// A deadline expiring `budget` from now.
    ///
    /// A budget too large to represent is treated as unbounded.
    pub fn from_timeout(budget: Duration) -> Self {
        Deadline {
            end: Instant::now().checked_add(budget),
        }
    }

    /// A deadline expiring at the given instant.
    pub fn at(end: Instant) -> Self {
        Deadline { end: Some(end) }
    }

    /// Whether the deadline has passed.
    pub fn expired(&self) -> bool {
        match self.end {
            Some(end) => Instant::now() >= end,
            None => false,
        }
    }

    /// Time left before expiry, or `None` when unbounded.
    ///
    /// Returns a zero duration once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(Instant::now()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.expired());
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let deadline = Deadline::from_timeout(Duration::ZERO);
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn generous_budget_not_expired() {
        let deadline = Deadline::from_timeout(Duration::from_secs(3600));
        assert!(!deadline.expired());
        assert!(deadline.remaining().is_some_and(|r| r > Duration::ZERO));
    }

    #[test]
    fn past_instant_is_expired() {
        let deadline = Deadline::at(Instant::now());
        assert!(deadline.expired());
    }
}
