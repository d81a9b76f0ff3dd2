use std::time::Duration;

const MIN_DELAY: Duration = Duration::from_millis(1);

/// Parameters of the exponential backoff applied between failed passes.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub multiplier: f64,
    /// Fraction of the current delay added or removed at random, in `0..=1`.
    pub jitter: f64,
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            multiplier: 1.6,
            jitter: 0.2,
            max: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
    last: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let initial = config.initial.max(MIN_DELAY);
        let config = BackoffConfig {
            initial,
            multiplier: config.multiplier.max(1.0),
            jitter: if config.jitter.is_finite() {
                config.jitter.clamp(0.0, 1.0)
            } else {
                0.0
            },
            max: config.max.max(initial),
        };

        Self {
            current: config.initial,
            last: Duration::ZERO,
            config,
        }
    }

    /// Delay to wait before the next attempt.
    ///
    /// Never shorter than the delay returned by the previous call since the
    /// last [`reset`](Self::reset), never longer than the configured maximum.
    pub fn next_delay(&mut self) -> Duration {
        let factor = if self.config.jitter > 0.0 {
            1.0 + rand::random_range(-self.config.jitter..=self.config.jitter)
        } else {
            1.0
        };

        let delay = self.scaled(factor).max(self.last).max(MIN_DELAY);

        self.last = delay;
        self.current = self.scaled(self.config.multiplier);

        delay
    }

    /// `current * factor`, capped at the maximum. The product is clamped in
    /// float seconds first so huge or infinite factors saturate.
    fn scaled(&self, factor: f64) -> Duration {
        let max = self.config.max;
        let secs = (self.current.as_secs_f64() * factor).min(max.as_secs_f64());
        Duration::try_from_secs_f64(secs).map_or(max, |d| d.min(max))
    }

    pub fn reset(&mut self) {
        self.current = self.config.initial;
        self.last = Duration::ZERO;
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter() -> Backoff {
        Backoff::new(BackoffConfig {
            initial: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: 0.0,
            max: Duration::from_millis(1000),
        })
    }

    #[test]
    fn grows_until_capped() {
        let mut backoff = without_jitter();

        let delays: Vec<_> = (0..6).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn reset_returns_to_initial() {
        let mut backoff = without_jitter();
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn default_delays_strictly_increase_before_cap() {
        for _ in 0..100 {
            let mut backoff = Backoff::default();
            let mut previous = Duration::ZERO;
            for _ in 0..8 {
                let delay = backoff.next_delay();
                assert!(delay > previous, "{:?} <= {:?}", delay, previous);
                previous = delay;
            }
        }
    }

    #[test]
    fn never_decreases_at_cap() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::from_millis(10),
            multiplier: 3.0,
            jitter: 0.5,
            max: Duration::from_millis(50),
        });

        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(50));
            previous = delay;
        }
    }

    #[test]
    fn degenerate_config_is_sanitized() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::ZERO,
            multiplier: 0.5,
            jitter: f64::NAN,
            max: Duration::ZERO,
        });

        let delay = backoff.next_delay();
        assert!(delay > Duration::ZERO);
        assert!(backoff.next_delay() >= delay);
        assert_eq!(backoff.config().jitter, 0.0);
        assert_eq!(backoff.config().multiplier, 1.0);
    }

    #[test]
    fn unbounded_max_saturates() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::from_secs(1),
            multiplier: 2.0,
            jitter: 0.0,
            max: Duration::MAX,
        });

        let mut previous = Duration::ZERO;
        for _ in 0..100 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(previous, Duration::MAX);
    }

    #[test]
    fn infinite_multiplier_jumps_to_max() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::from_secs(1),
            multiplier: f64::INFINITY,
            jitter: 0.2,
            max: Duration::from_secs(60),
        });

        let first = backoff.next_delay();
        assert!(first >= Duration::from_millis(800) && first <= Duration::from_millis(1200));
        for _ in 0..10 {
            let delay = backoff.next_delay();
            assert!(delay >= first && delay <= Duration::from_secs(60));
        }
    }

    #[test]
    fn full_jitter_never_yields_zero() {
        let mut backoff = Backoff::new(BackoffConfig {
            initial: Duration::from_millis(5),
            multiplier: 1.0,
            jitter: 1.0,
            max: Duration::from_millis(5),
        });

        for _ in 0..100 {
            assert!(backoff.next_delay() >= MIN_DELAY);
        }
    }
}
