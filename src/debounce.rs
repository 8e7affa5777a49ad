use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Runs an action only after calls have been quiet for `window`.
///
/// Holds at most one pending value: every call replaces the pending one and
/// restarts the quiet window, so a burst of calls runs the action once, with
/// the last value. The action runs on the debouncer's own thread.
pub struct Debouncer<T: Send + 'static> {
    sender: Option<Sender<T>>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(window: Duration, action: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (sender, receiver) = unbounded();
        let handle = thread::spawn(move || debounce_loop(receiver, window, action));
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Schedules `value`, cancelling whatever was pending.
    pub fn call(&self, value: T) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(value);
        }
    }
}

fn debounce_loop<T, F: FnMut(T)>(receiver: Receiver<T>, window: Duration, mut action: F) {
    while let Ok(mut pending) = receiver.recv() {
        loop {
            match receiver.recv_timeout(window) {
                Ok(newer) => pending = newer,
                Err(RecvTimeoutError::Timeout) => {
                    action(pending);
                    break;
                }
                // Shutting down: the pending call is dropped.
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_burst_runs_last_value_once() {
        let (tx, rx) = unbounded();
        let debouncer = Debouncer::new(Duration::from_millis(150), move |v: u32| {
            let _ = tx.send(v);
        });

        for v in 1..=5 {
            debouncer.call(v);
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 5);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_separate_bursts_each_run() {
        let (tx, rx) = unbounded();
        let debouncer = Debouncer::new(Duration::from_millis(30), move |v: &'static str| {
            let _ = tx.send(v);
        });

        debouncer.call("first");
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "first");
        debouncer.call("second");
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), "second");
    }

    #[test]
    fn test_waits_for_quiet_window() {
        let (tx, rx) = unbounded();
        let window = Duration::from_millis(100);
        let debouncer = Debouncer::new(window, move |_: ()| {
            let _ = tx.send(Instant::now());
        });

        let start = Instant::now();
        debouncer.call(());
        let fired = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(fired.duration_since(start) >= window);
    }

    #[test]
    fn test_drop_discards_pending() {
        let (tx, rx) = unbounded();
        let debouncer = Debouncer::new(Duration::from_secs(5), move |v: u8| {
            let _ = tx.send(v);
        });
        debouncer.call(1);
        drop(debouncer);
        assert!(rx.try_recv().is_err());
    }
}
