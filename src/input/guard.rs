use std::cell::Cell;

/// Marks the window in which a hardware read is executing.
///
/// Overlapping register transactions corrupt shared bus state, so at most one
/// [`ReadToken`] may exist at a time.
#[derive(Debug, Default)]
pub struct OverlapGuard {
    busy: Cell<bool>,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a read is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Claim the bus for one read, or `None` if a read is already in flight.
    pub fn enter(&self) -> Option<ReadToken<'_>> {
        if self.busy.replace(true) {
            return None;
        }
        Some(ReadToken { busy: &self.busy })
    }
}

/// Releases the guard when dropped, including on error paths.
#[derive(Debug)]
pub struct ReadToken<'a> {
    busy: &'a Cell<bool>,
}

impl Drop for ReadToken<'_> {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_enter_is_refused_until_release() {
        let guard = OverlapGuard::new();

        let token = guard.enter();
        assert!(token.is_some());
        assert!(guard.is_busy());
        assert!(guard.enter().is_none());

        drop(token);
        assert!(!guard.is_busy());
        assert!(guard.enter().is_some());
    }

    #[test]
    fn refused_enter_keeps_the_first_claim() {
        let guard = OverlapGuard::new();
        let _token = guard.enter().unwrap();

        assert!(guard.enter().is_none());
        assert!(guard.is_busy());
    }
}
