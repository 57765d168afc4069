use std::time::Duration;

use outpost_model::RestartDelay;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Turns a [`RestartDelay`] into concrete sleep durations.
///
/// Each supervisor owns its sampler, so jitter sequences are independent.
#[derive(Debug)]
pub struct DelaySampler {
    delay: RestartDelay,
    rng: StdRng,
}

impl DelaySampler {
    pub fn new(delay: RestartDelay) -> Self {
        Self {
            delay,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(delay: RestartDelay, seed: u64) -> Self {
        Self {
            delay,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next pause; jitter has millisecond resolution.
    pub fn next_delay(&mut self) -> Duration {
        match self.delay {
            RestartDelay::Fixed(d) => d,
            RestartDelay::Jitter => {
                let ceiling = RestartDelay::JITTER_CEILING.as_millis() as u64;
                Duration::from_millis(self.rng.random_range(0..ceiling))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_is_exact() {
        let mut s = DelaySampler::new(RestartDelay::Fixed(Duration::from_millis(1500)));
        for _ in 0..3 {
            assert_eq!(s.next_delay(), Duration::from_millis(1500));
        }
    }

    #[test]
    fn jitter_stays_below_ceiling() {
        let mut s = DelaySampler::new(RestartDelay::Jitter);
        for _ in 0..1000 {
            assert!(s.next_delay() < RestartDelay::JITTER_CEILING);
        }
    }

    #[test]
    fn jitter_spreads() {
        let mut s = DelaySampler::seeded(RestartDelay::Jitter, 7);
        let samples: Vec<Duration> = (0..200).map(|_| s.next_delay()).collect();
        let low = samples.iter().filter(|d| **d < Duration::from_secs(5)).count();
        assert!(low > 50 && low < 150, "skewed jitter: {low}/200 below 5s");
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = DelaySampler::seeded(RestartDelay::Jitter, 42);
        let mut b = DelaySampler::seeded(RestartDelay::Jitter, 42);
        for _ in 0..16 {
            assert_eq!(a.next_delay(), b.next_delay());
        }
    }
}
