use std::{
    thread,
    time::{Duration, Instant},
};

use tracing::trace;

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Spaces out outbound requests: two calls to [`RateLimiter::wait`] return
/// at least `interval` apart, measured from when the earlier one returned.
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
    clock: Box<dyn Clock>,
}

impl RateLimiter {
    pub fn new(interval: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            interval,
            last: None,
            clock: Box::new(clock),
        }
    }

    /// Blocks until the next request may start, then claims that slot.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                trace!("rate limited for {remaining:?}");
                self.clock.sleep(remaining);
            }
        }
        self.last = Some(self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::test_support::FakeClock;

    #[test]
    fn first_request_does_not_wait() {
        let clock = FakeClock::new();
        let mut limiter = RateLimiter::new(Duration::from_secs(1), clock.clone());
        limiter.wait();
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn waits_out_the_rest_of_the_interval() {
        let clock = FakeClock::new();
        let mut limiter = RateLimiter::new(Duration::from_secs(1), clock.clone());

        limiter.wait();
        clock.advance(Duration::from_millis(300));
        limiter.wait();
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(700)]);

        clock.advance(Duration::from_secs(2));
        limiter.wait();
        assert_eq!(clock.sleeps().len(), 1);
    }

    #[test]
    fn consecutive_slots_never_closer_than_interval() {
        let clock = FakeClock::new();
        let interval = Duration::from_millis(250);
        let mut limiter = RateLimiter::new(interval, clock.clone());

        let mut starts = Vec::new();
        for latency in [0, 10, 400, 0, 249, 251] {
            limiter.wait();
            starts.push(clock.now());
            clock.advance(Duration::from_millis(latency));
        }
        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= interval);
        }
    }
}
