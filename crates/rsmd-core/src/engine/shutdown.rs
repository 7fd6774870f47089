use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use tracing::{info, warn};

/// The signal number that requests a civilised shutdown (`SIGUSR1` on Linux).
pub const CIVILISED_SIGNAL: i32 = 10;

/// What the receiver of a signal should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownAction {
    /// Stop at the next cycle boundary.
    Graceful,
    /// Stop immediately with the given exit code.
    Terminate(i32),
}

/// Tracks shutdown requests from signal handlers.
///
/// The first signal requests a stop at the next cycle boundary. The civilised signal
/// additionally lets the current cycle finish its MD sequence and makes the driver write a
/// restart checkpoint. The third signal asks for immediate termination.
#[derive(Debug, Default)]
pub struct ShutdownController {
    signal: AtomicI32,
    civilised: AtomicBool,
    received: AtomicUsize,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a received signal and returns how the process should react.
    pub fn notify(&self, signal: i32) -> ShutdownAction {
        let received = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        match received {
            1 => info!(signal, "Received signal, attempting civilised shutdown."),
            2 => info!(signal, "Received signal, still attempting civilised shutdown."),
            _ => {
                warn!(signal, "Received signal, shutting down immediately.");
                self.signal.store(signal, Ordering::SeqCst);
                return ShutdownAction::Terminate(signal);
            }
        }

        if signal == CIVILISED_SIGNAL {
            self.civilised.store(true, Ordering::SeqCst);
        }
        self.signal.store(signal, Ordering::SeqCst);
        ShutdownAction::Graceful
    }

    pub fn is_requested(&self) -> bool {
        self.signal.load(Ordering::SeqCst) != 0
    }

    pub fn is_civilised(&self) -> bool {
        self.civilised.load(Ordering::SeqCst)
    }

    pub fn last_signal(&self) -> Option<i32> {
        match self.signal.load(Ordering::SeqCst) {
            0 => None,
            signal => Some(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_controller_has_no_request() {
        let controller = ShutdownController::new();
        assert!(!controller.is_requested());
        assert!(!controller.is_civilised());
        assert_eq!(controller.last_signal(), None);
    }

    #[test]
    fn interrupt_requests_plain_stop() {
        let controller = ShutdownController::new();
        assert_eq!(controller.notify(2), ShutdownAction::Graceful);
        assert!(controller.is_requested());
        assert!(!controller.is_civilised());
        assert_eq!(controller.last_signal(), Some(2));
    }

    #[test]
    fn civilised_signal_sets_flag() {
        let controller = ShutdownController::new();
        controller.notify(CIVILISED_SIGNAL);
        assert!(controller.is_requested());
        assert!(controller.is_civilised());
    }

    #[test]
    fn third_signal_terminates() {
        let controller = ShutdownController::new();
        assert_eq!(controller.notify(15), ShutdownAction::Graceful);
        assert_eq!(controller.notify(15), ShutdownAction::Graceful);
        assert_eq!(controller.notify(15), ShutdownAction::Terminate(15));
    }
}
