/// Map-library initialization lifecycle.
///
/// The surface retries loading on a fixed interval for a bounded number of
/// attempts, then gives up and stays permanently not-ready. The host has no
/// recovery beyond a full reload of the embedding surface, which builds a
/// fresh runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InitState {
    Loading { attempts: u32 },
    Ready,
    Failed,
}

/// Fixed retry interval, in milliseconds.
pub const INIT_RETRY_MS: u64 = 500;

/// Attempts before giving up.
pub const MAX_INIT_ATTEMPTS: u32 = 10;

impl InitState {
    pub fn new() -> Self {
        InitState::Loading { attempts: 0 }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, InitState::Ready)
    }

    /// One retry tick. `library_available` is whether the mapping library
    /// has finished loading in the script context.
    ///
    /// Returns `true` exactly once, on the tick that reaches `Ready`.
    pub fn tick(&mut self, library_available: bool) -> bool {
        match *self {
            InitState::Loading { attempts } => {
                if library_available {
                    *self = InitState::Ready;
                    true
                } else if attempts + 1 >= MAX_INIT_ATTEMPTS {
                    *self = InitState::Failed;
                    false
                } else {
                    *self = InitState::Loading {
                        attempts: attempts + 1,
                    };
                    false
                }
            }
            InitState::Ready | InitState::Failed => false,
        }
    }
}

impl Default for InitState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{InitState, MAX_INIT_ATTEMPTS};

    #[test]
    fn becomes_ready_once() {
        let mut s = InitState::new();
        assert!(!s.tick(false));
        assert!(s.tick(true));
        assert!(s.is_ready());
        assert!(!s.tick(true));
    }

    #[test]
    fn gives_up_after_bounded_attempts() {
        let mut s = InitState::new();
        for _ in 0..MAX_INIT_ATTEMPTS {
            assert!(!s.tick(false));
        }
        assert_eq!(s, InitState::Failed);
        // Permanently not-ready: a late library load changes nothing.
        assert!(!s.tick(true));
        assert_eq!(s, InitState::Failed);
    }
}
