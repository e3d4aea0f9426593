//! Cooperative cancellation and watchdog deadlines.
//!
//! Solvers are cancelled cooperatively: the inner solve routine polls a
//! shared [`CancelToken`] at its loop boundaries and bails out with an
//! abnormal result once the flag is set. A [`Deadline`] arms a watchdog
//! thread that flips the token when the timeout expires and disarms on
//! drop. Tokens are per-solve, so timed solves nest and overlap freely;
//! the trade-off is that an inner loop which never polls can overrun the
//! deadline by the length of its longest non-polling stretch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Shared cancellation flag polled by solve routines.
///
/// Cloning shares the flag; any clone can cancel and every clone observes
/// the cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Watchdog that cancels a token when a timeout expires.
///
/// The watchdog thread parks on a channel: dropping the guard wakes it up
/// and disarms the deadline without cancelling.
#[derive(Debug)]
pub struct Deadline {
    disarm_tx: Option<Sender<()>>,
    watchdog: Option<JoinHandle<()>>,
}

impl Deadline {
    /// Arms a watchdog that cancels `token` after `timeout`.
    pub fn arm(token: &CancelToken, timeout: Duration) -> Self {
        let token = token.clone();
        let (disarm_tx, disarm_rx) = mpsc::channel();
        let watchdog = std::thread::spawn(move || {
            match disarm_rx.recv_timeout(timeout) {
                // Disarmed (or the guard vanished) before expiry.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                Err(RecvTimeoutError::Timeout) => token.cancel(),
            }
        });
        Self {
            disarm_tx: Some(disarm_tx),
            watchdog: Some(watchdog),
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        if let Some(tx) = self.disarm_tx.take() {
            let _ = tx.send(());
        }
        if let Some(watchdog) = self.watchdog.take() {
            let _ = watchdog.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn token_starts_clear_and_cancels_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn deadline_cancels_after_expiry() {
        let token = CancelToken::new();
        let deadline = Deadline::arm(&token, Duration::from_millis(20));

        let started = Instant::now();
        while !token.is_cancelled() {
            assert!(started.elapsed() < Duration::from_secs(2), "watchdog never fired");
            std::thread::sleep(Duration::from_millis(1));
        }
        drop(deadline);
    }

    #[test]
    fn dropping_the_guard_disarms() {
        let token = CancelToken::new();
        let deadline = Deadline::arm(&token, Duration::from_millis(20));
        drop(deadline);

        std::thread::sleep(Duration::from_millis(40));
        assert!(!token.is_cancelled());
    }
}
