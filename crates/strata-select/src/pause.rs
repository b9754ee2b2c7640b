//! Cancellable suspensions.
//!
//! The selection loop only ever blocks in three places: the boot gate, the
//! sampling interval and the post-promotion dwell. All of them go through
//! [`pause`] so a shutdown request interrupts the wait immediately.

use std::time::Duration;

use tokio::sync::watch;

/// Outcome of a [`pause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// The full duration elapsed.
    Elapsed,
    /// Shutdown was requested before the duration elapsed.
    Cancelled,
}

/// Whether a shutdown has been requested on `shutdown`.
pub fn is_shutdown(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Sleep for `duration` unless `shutdown` flips to `true` first.
///
/// A closed shutdown channel (sender dropped) is treated as "never cancel".
pub async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> Pause {
    if is_shutdown(shutdown) {
        return Pause::Cancelled;
    }
    if duration.is_zero() {
        return Pause::Elapsed;
    }

    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    let mut watching = true;
    loop {
        tokio::select! {
            _ = &mut sleep => return Pause::Elapsed,
            changed = shutdown.changed(), if watching => match changed {
                Ok(()) if *shutdown.borrow_and_update() => return Pause::Cancelled,
                Ok(()) => {}
                Err(_) => watching = false,
            },
        }
    }
}
