//! Attempt sequences for whole-operation retries
//!
//! An [`AttemptStrategy`] describes how long and how often a logical
//! operation may be retried; [`Attempt`] is the per-call state a caller
//! polls. Unlike the transport-level retries in
//! [`transport`](crate::transport), each pass through an attempt loop
//! re-resolves and re-signs the request, so this is the layer that
//! handles failures a plain redelivery cannot fix.
//!
//! Time comes from `tokio::time`, so tests can drive the sequence under
//! a paused clock.

use std::time::Duration;

use tokio::time::{sleep, Instant};

/// Retry policy for a logical operation: at least `min` attempts, then
/// as many more as fit in `total`, spaced `delay` apart.
#[derive(Clone, Copy, Debug)]
pub struct AttemptStrategy {
    /// Total duration of the attempt sequence
    pub total: Duration,
    /// Interval between attempts
    pub delay: Duration,
    /// Minimum number of attempts; overrides `total`
    pub min: u32,
}

impl AttemptStrategy {
    /// Begin a new sequence of attempts
    pub fn start(self) -> Attempt {
        let now = Instant::now();
        Attempt {
            strategy: self,
            last: now,
            end: now + self.total,
            force: true,
            count: 0,
        }
    }
}

/// One call's progression through an [`AttemptStrategy`].
#[derive(Debug)]
pub struct Attempt {
    strategy: AttemptStrategy,
    last: Instant,
    end: Instant,
    force: bool,
    count: u32,
}

impl Attempt {
    /// Wait until it is time for the next attempt, or return false when
    /// it is time to stop trying. The first call always returns true.
    pub async fn next(&mut self) -> bool {
        let mut now = Instant::now();
        let wait = self.next_sleep(now);

        if !self.force && now + wait >= self.end && self.strategy.min <= self.count {
            return false;
        }

        self.force = false;

        if wait > Duration::ZERO && self.count > 0 {
            sleep(wait).await;
            now = Instant::now();
        }

        self.count += 1;
        self.last = now;
        true
    }

    /// Whether another attempt will be made if the current one fails.
    /// A true answer is binding: the following [`next`](Self::next) is
    /// guaranteed to return true even if the clock advances meanwhile.
    pub fn has_next(&mut self) -> bool {
        if self.force || self.strategy.min > self.count {
            return true;
        }

        let now = Instant::now();
        if now + self.next_sleep(now) < self.end {
            self.force = true;
            return true;
        }

        false
    }

    /// Attempts made so far
    pub fn count(&self) -> u32 {
        self.count
    }

    fn next_sleep(&self, now: Instant) -> Duration {
        self.strategy.delay.saturating_sub(now - self.last)
    }
}
