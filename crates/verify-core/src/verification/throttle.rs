//! Cooldown gate for re-sending the verification message.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const TICK: Duration = Duration::from_secs(1);

/// Allows a resend only once the previous cooldown has fully elapsed.
///
/// The remaining time is derived from a deadline on the tokio clock, so it
/// never increases between resends. A one-second ticker publishes the
/// countdown for rendering.
pub struct ResendThrottle {
    cooldown: Duration,
    deadline: Mutex<Option<Instant>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    remaining_tx: Arc<watch::Sender<u64>>,
}

impl ResendThrottle {
    pub fn new(cooldown: Duration) -> Self {
        let (remaining_tx, _) = watch::channel(0);
        Self {
            cooldown,
            deadline: Mutex::new(None),
            ticker: Mutex::new(None),
            remaining_tx: Arc::new(remaining_tx),
        }
    }

    pub fn can_resend(&self) -> bool {
        self.remaining_seconds() == 0
    }

    /// Whole seconds left, rounded up.
    pub fn remaining_seconds(&self) -> u64 {
        let Some(deadline) = *self.deadline.lock() else {
            return 0;
        };
        seconds_until(deadline)
    }

    /// Restart the cooldown and its countdown.
    pub fn on_resend_issued(&self) {
        let deadline = Instant::now() + self.cooldown;
        *self.deadline.lock() = Some(deadline);
        self.remaining_tx.send_replace(seconds_until(deadline));

        let tx = Arc::clone(&self.remaining_tx);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
            loop {
                ticker.tick().await;
                let remaining = seconds_until(deadline);
                tx.send_replace(remaining);
                if remaining == 0 {
                    break;
                }
            }
        });

        if let Some(previous) = self.ticker.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Countdown updates for rendering.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining_tx.subscribe()
    }

    /// Stop the countdown task. The cooldown itself still applies.
    pub fn cancel(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ResendThrottle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn seconds_until(deadline: Instant) -> u64 {
    let left = deadline.saturating_duration_since(Instant::now());
    let secs = left.as_secs();
    if left.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_blocks_until_elapsed() {
        let throttle = ResendThrottle::new(Duration::from_secs(60));
        assert!(throttle.can_resend());

        throttle.on_resend_issued();
        assert!(!throttle.can_resend());
        assert_eq!(throttle.remaining_seconds(), 60);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!throttle.can_resend());
        assert_eq!(throttle.remaining_seconds(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(throttle.can_resend());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_never_increases() {
        let throttle = ResendThrottle::new(Duration::from_secs(5));
        throttle.on_resend_issued();

        let mut last = throttle.remaining_seconds();
        for _ in 0..20 {
            tokio::time::advance(Duration::from_millis(400)).await;
            let now = throttle.remaining_seconds();
            assert!(now <= last);
            last = now;
        }
        assert_eq!(last, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_is_published() {
        let throttle = ResendThrottle::new(Duration::from_secs(3));
        let mut rx = throttle.subscribe();

        throttle.on_resend_issued();
        assert_eq!(*rx.borrow_and_update(), 3);

        let mut seen = Vec::new();
        while seen.last() != Some(&0) {
            rx.changed().await.unwrap();
            seen.push(*rx.borrow_and_update());
        }
        assert_eq!(seen, vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_countdown_updates() {
        let throttle = ResendThrottle::new(Duration::from_secs(3));
        let mut rx = throttle.subscribe();
        throttle.on_resend_issued();
        let _ = rx.borrow_and_update();

        throttle.cancel();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().unwrap());
        assert!(throttle.can_resend());
    }
}
