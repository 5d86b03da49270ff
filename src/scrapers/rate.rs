//! Request pacing primitives.
//!
//! `RateGate` enforces a minimum spacing between grants; `Pacing` models the
//! coarser fixed-or-random inter-page delays some sources use instead.

use std::time::{Duration, Instant, SystemTime};

use tokio::sync::Mutex;
use tracing::debug;

/// Minimum-spacing gate over outbound requests.
///
/// `acquire` returns once at least the configured interval has passed since
/// the previous grant. Concurrent acquirers serialize on the internal lock,
/// so grants are spaced even under contention.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    /// Gate allowing `calls_per_second` grants per second.
    pub fn per_second(calls_per_second: f64) -> Self {
        let interval = if calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / calls_per_second)
        } else {
            Duration::ZERO
        };
        Self::with_interval(interval)
    }

    /// Gate with an explicit minimum interval between grants.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Block until the gate opens, then record the grant time.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate gate: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Delay policy between page fetches or retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Always sleep the same duration.
    Fixed(Duration),
    /// Sleep a uniformly random duration from the inclusive range.
    Range(Duration, Duration),
}

impl Pacing {
    pub fn fixed_secs(secs: u64) -> Self {
        Pacing::Fixed(Duration::from_secs(secs))
    }

    pub fn range_secs(lo: u64, hi: u64) -> Self {
        Pacing::Range(Duration::from_secs(lo), Duration::from_secs(hi))
    }

    /// Bounds in seconds, as configured; equal bounds collapse to a fixed
    /// delay.
    pub fn from_bounds(bounds: [u64; 2]) -> Self {
        let lo = bounds[0].min(bounds[1]);
        let hi = bounds[0].max(bounds[1]);
        if lo == hi {
            Pacing::fixed_secs(lo)
        } else {
            Pacing::range_secs(lo, hi)
        }
    }

    /// Draw one delay from the policy.
    pub fn sample(&self) -> Duration {
        match *self {
            Pacing::Fixed(d) => d,
            Pacing::Range(lo, hi) => uniform_duration(lo, hi),
        }
    }

    /// Sleep for one sampled delay.
    pub async fn wait(&self) {
        let delay = self.sample();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniform draw from `[lo, hi]` at millisecond granularity.
///
/// Seeded from the system clock's nanosecond field, matching how user agents
/// are selected; pacing jitter does not need a real RNG.
fn uniform_duration(lo: Duration, hi: Duration) -> Duration {
    if hi <= lo {
        return lo;
    }
    let span_ms = (hi - lo).as_millis() as u64;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    lo + Duration::from_millis(nanos % (span_ms + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_interval() {
        let gate = RateGate::per_second(2.0);
        assert_eq!(gate.min_interval, Duration::from_millis(500));
        let gate = RateGate::per_second(0.0);
        assert_eq!(gate.min_interval, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_acquire_spaces_grants() {
        let gate = RateGate::with_interval(Duration::from_millis(40));
        let start = Instant::now();
        gate.acquire().await;
        gate.acquire().await;
        gate.acquire().await;
        // Two full intervals must have elapsed between the three grants.
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let gate = RateGate::with_interval(Duration::from_secs(60));
        let start = Instant::now();
        gate.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_fixed_pacing_sample() {
        let pacing = Pacing::fixed_secs(2);
        assert_eq!(pacing.sample(), Duration::from_secs(2));
    }

    #[test]
    fn test_range_pacing_sample_within_bounds() {
        let pacing = Pacing::range_secs(1, 3);
        for _ in 0..32 {
            let d = pacing.sample();
            assert!(d >= Duration::from_secs(1));
            assert!(d <= Duration::from_secs(3));
        }
    }

    #[test]
    fn test_from_bounds() {
        assert_eq!(Pacing::from_bounds([2, 2]), Pacing::fixed_secs(2));
        assert_eq!(Pacing::from_bounds([5, 1]), Pacing::range_secs(1, 5));
    }

    #[test]
    fn test_degenerate_range() {
        let lo = Duration::from_secs(5);
        assert_eq!(uniform_duration(lo, lo), lo);
        assert_eq!(uniform_duration(lo, Duration::from_secs(1)), lo);
    }
}
