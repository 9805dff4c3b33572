// Fixed-cadence pollers for the player service
// Each one just posts an event into the service loop; the loop does the work.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// A repeating timer task. Dropping it cancels the timer.
pub struct PeriodicTask {
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Send `make()` into `events` every `period`, first tick immediately.
    /// Stops by itself once the receiving side is gone.
    pub fn spawn<T, F>(period: Duration, events: mpsc::UnboundedSender<T>, make: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            // a slow consumer should see fewer ticks, not a burst
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if events.send(make()).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn ticks_until_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = PeriodicTask::spawn(Duration::from_millis(5), tx, || "tick");

        for _ in 0..3 {
            let tick = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
            assert_eq!(tick, Some("tick"));
        }

        drop(task);
        // the aborted task drops its sender, so the channel drains and closes
        let closed = timeout(Duration::from_secs(2), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test]
    async fn stops_when_receiver_goes_away() {
        let (tx, rx) = mpsc::unbounded_channel::<()>();
        let task = PeriodicTask::spawn(Duration::from_millis(5), tx, || ());
        drop(rx);

        timeout(Duration::from_secs(2), async {
            while !task.handle.is_finished() {
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
