use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a capture or display session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which flow a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Capture,
    Display,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Capture produced text
    Decoded,
    /// Cancelled by the user or by the caller
    Cancelled,
    /// The configured timeout elapsed
    TimedOut,
    /// No camera device was available
    NoDevice,
    /// Display widget was hidden
    Closed,
    /// Session aborted with an error
    Failed(String),
}

impl SessionOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            SessionOutcome::Decoded => "decoded",
            SessionOutcome::Cancelled => "cancelled",
            SessionOutcome::TimedOut => "timed out",
            SessionOutcome::NoDevice => "no device",
            SessionOutcome::Closed => "closed",
            SessionOutcome::Failed(reason) => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(SessionOutcome::TimedOut.as_str(), "timed out");
        assert_eq!(SessionOutcome::Failed("boom".into()).as_str(), "boom");
    }
}
