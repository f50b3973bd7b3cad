use crate::error::CodeGraphError;
use crate::Result;
use std::time::{Duration, Instant};

/// An optional wall-clock deadline threaded through the core's top-level entry points
/// (§5 Cancellation / timeouts). Every synchronous entry point has a matching
/// cancellation-aware variant that accepts one of these; plain callers pass `None`.
///
/// Checked at file boundaries (parser, governance validator) and at commit boundaries
/// (git history analyzer). On expiry the stage returns `CodeGraphError::Cancelled` and
/// discards whatever it had accumulated so far — no partial graph or report is handed
/// back to the caller.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(duration: Duration) -> Self {
        Self(Instant::now() + duration)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Returns `Err(Cancelled)` once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(CodeGraphError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Checks a deadline if one is present; a `None` deadline never expires.
pub fn check_deadline(deadline: Option<&Deadline>) -> Result<()> {
    match deadline {
        Some(d) => d.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_deadline_in_the_past_is_immediately_expired() {
        let deadline = Deadline::after(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(CodeGraphError::Cancelled)));
    }

    #[test]
    fn a_far_future_deadline_has_not_expired() {
        let deadline = Deadline::after(Duration::from_secs(3600));
        assert!(!deadline.is_expired());
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn no_deadline_never_cancels() {
        assert!(check_deadline(None).is_ok());
    }
}
