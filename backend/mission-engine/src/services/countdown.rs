use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining: u32 },
    Expired,
}

/// Countdown owned by one quiz session.
///
/// Emits a `Tick` each interval with the seconds left and a final `Expired`
/// when it reaches zero. Stopping (or dropping) the countdown aborts the
/// ticker and closes the event channel.
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn start(
        seconds: u32,
        tick_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<CountdownEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut remaining = seconds;
            while remaining > 0 {
                tokio::time::sleep(tick_interval).await;
                remaining -= 1;
                let event = if remaining == 0 {
                    CountdownEvent::Expired
                } else {
                    CountdownEvent::Tick { remaining }
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        (
            Self {
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_down_then_expires_once() {
        let (_countdown, mut rx) = Countdown::start(3, Duration::from_secs(1));

        assert_eq!(rx.recv().await, Some(CountdownEvent::Tick { remaining: 2 }));
        assert_eq!(rx.recv().await, Some(CountdownEvent::Tick { remaining: 1 }));
        assert_eq!(rx.recv().await, Some(CountdownEvent::Expired));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_the_channel() {
        let (mut countdown, mut rx) = Countdown::start(30, Duration::from_secs(1));
        assert_eq!(rx.recv().await, Some(CountdownEvent::Tick { remaining: 29 }));

        countdown.stop();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_countdown_stops_it() {
        let (countdown, mut rx) = Countdown::start(5, Duration::from_secs(1));
        drop(countdown);
        assert_eq!(rx.recv().await, None);
    }
}
