//! Process-level signal coordinator.
//!
//! The only piece of genuinely global state in the crate, because signals
//! are a process-level resource — every other component (git driver,
//! filesystem driver, locker, hook runner) takes its cancellation flag as a
//! plain `Arc<AtomicBool>` parameter instead. Built on `signal-hook`'s
//! background-thread iterator rather than a raw `libc` handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

/// Grace window after the first interrupt before the coordinator force-exits,
/// chosen to strictly contain the hook runner's 7-second cooperative window.
const GRACE_WINDOW: Duration = Duration::from_secs(10);

/// Handle to the installed signal coordinator. Cloning [`cancelled`] gives
/// engines a flag they can poll at their suspension points (lock waits, git
/// subprocess waits, hook waits).
pub struct SignalCoordinator {
    cancelled: Arc<AtomicBool>,
}

impl SignalCoordinator {
    /// The cancellation flag: `true` once the first interrupt has been
    /// delivered.
    pub fn cancelled(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

#[cfg(unix)]
pub fn install() -> Result<SignalCoordinator> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let cancelled = Arc::new(AtomicBool::new(false));
    let delivered = Arc::new(AtomicBool::new(false));
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    let cancelled_for_thread = cancelled.clone();
    thread::spawn(move || {
        for _signal in signals.forever() {
            if delivered.swap(true, Ordering::SeqCst) {
                // Second delivery while we're already waiting: no more grace.
                eprintln!();
                std::process::exit(130);
            }
            cancelled_for_thread.store(true, Ordering::SeqCst);
            eprintln!("Interrupted, waiting up to 10s for cleanup…");

            // Backstop watchdog: if the running operation hasn't returned
            // (and therefore exited the process itself) within the grace
            // window, force the exit. Runs on its own thread so a second
            // signal during the wait is still observed by the loop above.
            thread::spawn(|| {
                thread::sleep(GRACE_WINDOW);
                std::process::exit(130);
            });
        }
    });

    Ok(SignalCoordinator { cancelled })
}

/// No interrupt handling outside unix: the coordinator's flag never flips.
/// `wt` still runs correctly, it just can't cancel mid-operation on Ctrl-C.
#[cfg(not(unix))]
pub fn install() -> Result<SignalCoordinator> {
    Ok(SignalCoordinator { cancelled: Arc::new(AtomicBool::new(false)) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_coordinator_is_not_cancelled() {
        let cancelled = Arc::new(AtomicBool::new(false));
        assert!(!cancelled.load(Ordering::SeqCst));
    }
}
