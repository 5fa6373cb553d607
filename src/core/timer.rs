//! Background timing for a connection: the heartbeat watchdog and one-shot
//! scheduled tasks (reconnect).
//!
//! Both are plain threads parked on crossbeam channels; re-arming and
//! cancellation are channel messages, so there is no polling while idle.

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

enum WatchdogCommand {
    Arm(Instant),
    Cancel,
}

/// Deadline watchdog with a single timeout callback.
///
/// `arm` moves the deadline; `cancel` disarms it. When the deadline passes
/// without another `arm`, the callback fires once and the watchdog disarms
/// itself. Dropping the watchdog shuts the thread down.
pub(crate) struct Watchdog {
    commands: Sender<WatchdogCommand>,
}

impl Watchdog {
    pub fn spawn(on_timeout: impl Fn() + Send + 'static) -> Self {
        let (commands, receiver) = unbounded();
        thread::spawn(move || {
            let mut deadline: Option<Instant> = None;
            loop {
                let command = match deadline {
                    Some(at) => match receiver.recv_deadline(at) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            deadline = None;
                            on_timeout();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => return,
                    },
                    None => match receiver.recv() {
                        Ok(command) => command,
                        Err(_) => return,
                    },
                };
                match command {
                    WatchdogCommand::Arm(at) => deadline = Some(at),
                    WatchdogCommand::Cancel => deadline = None,
                }
            }
        });
        Self { commands }
    }

    /// (Re-)arm the watchdog to fire after `lifetime` of silence.
    pub fn arm(&self, lifetime: Duration) {
        let _ = self.commands.send(WatchdogCommand::Arm(Instant::now() + lifetime));
    }

    pub fn cancel(&self) {
        let _ = self.commands.send(WatchdogCommand::Cancel);
    }
}

/// Handle to a task scheduled with [`schedule`]. Cancelling is idempotent;
/// dropping the handle does not cancel the task.
pub(crate) struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let _ = self.wake.try_send(());
    }
}

/// Run `task` once after `delay`, unless cancelled first.
pub(crate) fn schedule(delay: Duration, task: impl FnOnce() + Send + 'static) -> TaskHandle {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let (wake, receiver) = bounded::<()>(1);
    thread::spawn(move || {
        let deadline = Instant::now() + delay;
        loop {
            match receiver.recv_deadline(deadline) {
                // Woken by cancel, or the delay elapsed.
                Ok(()) | Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    // Handle dropped without cancelling; honor the delay.
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    break;
                }
            }
        }
        if !flag.load(Ordering::Acquire) {
            task();
        }
    });
    TaskHandle { cancelled, wake }
}
