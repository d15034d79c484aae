use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the watcher's poll interval reacts to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStrategy {
    /// Halve on change, double while idle.
    Basic,
    /// Like `Basic`, but long streaks in one direction accelerate the ramp.
    #[default]
    Momentum,
}

pub(crate) struct AdaptivePoller {
    current: Duration,
    min: Duration,
    max: Duration,
    strategy: PollStrategy,
    streak: i32,
}

impl AdaptivePoller {
    pub(crate) fn new(min: Duration, max: Duration, strategy: PollStrategy) -> Self {
        let max = max.max(min);
        Self {
            current: max,
            min,
            max,
            strategy,
            streak: 0,
        }
    }

    pub(crate) fn tick(&mut self, changed: bool) -> Duration {
        self.current = match self.strategy {
            PollStrategy::Basic => self.basic_next(changed),
            PollStrategy::Momentum => self.momentum_next(changed),
        }
        .clamp(self.min, self.max);
        self.current
    }

    /// Jump straight to the fastest rate, e.g. while the picker is visible.
    pub(crate) fn hurry(&mut self) {
        self.current = self.min;
        self.streak = 0;
    }

    pub(crate) fn current(&self) -> Duration {
        self.current
    }

    pub(crate) fn reconfigure(&mut self, min: Duration, max: Duration, strategy: PollStrategy) {
        self.min = min;
        self.max = max.max(min);
        if self.strategy != strategy {
            self.streak = 0;
        }
        self.strategy = strategy;
        self.current = self.current.clamp(self.min, self.max);
    }

    fn basic_next(&self, changed: bool) -> Duration {
        if changed {
            self.current / 2
        } else {
            self.current.saturating_mul(2)
        }
    }

    fn momentum_next(&mut self, changed: bool) -> Duration {
        self.streak = match (changed, self.streak) {
            (true, s) if s < 0 => 1,
            (true, s) => s.saturating_add(1),
            (false, s) if s > 0 => -1,
            (false, s) => s.saturating_sub(1),
        };
        let run = self.streak.unsigned_abs().max(1);
        if changed {
            self.current / run.clamp(2, 8)
        } else {
            self.current.saturating_mul(run + 1) / run
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn at(current: Duration, strategy: PollStrategy) -> AdaptivePoller {
        let mut p = AdaptivePoller::new(ms(16), ms(500), strategy);
        p.current = current;
        p
    }

    #[test]
    fn basic_halves_on_change() {
        let cases = [
            (ms(500), ms(250)),
            (ms(128), ms(64)),
            (ms(32), ms(16)),
            (ms(16), ms(16)),
        ];
        for (current, expected) in cases {
            assert_eq!(
                at(current, PollStrategy::Basic).tick(true),
                expected,
                "current: {current:?}"
            );
        }
    }

    #[test]
    fn basic_doubles_on_idle() {
        let cases = [
            (ms(16), ms(32)),
            (ms(64), ms(128)),
            (ms(256), ms(500)),
            (ms(500), ms(500)),
        ];
        for (current, expected) in cases {
            assert_eq!(
                at(current, PollStrategy::Basic).tick(false),
                expected,
                "current: {current:?}"
            );
        }
    }

    #[test]
    fn poller_ramps_down_then_up() {
        let mut p = AdaptivePoller::new(ms(16), ms(500), PollStrategy::Basic);
        assert_eq!(p.current(), ms(500));

        let after_change = p.tick(true);
        assert!(after_change < ms(500), "should ramp down");

        let mut interval = after_change;
        for _ in 0..20 {
            interval = p.tick(false);
        }
        assert_eq!(interval, ms(500), "should reach max after enough idle ticks");
    }

    #[test]
    fn momentum_direction_change_resets_streak() {
        let mut p = AdaptivePoller::new(ms(16), ms(500), PollStrategy::Momentum);
        for _ in 0..5 {
            p.tick(false);
        }
        assert!(p.streak < -1);

        p.tick(true);
        assert_eq!(p.streak, 1);
    }

    #[test]
    fn momentum_ramps_down_harder_after_repeated_change() {
        let mut p = AdaptivePoller::new(ms(16), ms(500), PollStrategy::Momentum);
        let first = p.tick(true);
        p.current = ms(500);
        let third = {
            p.tick(true);
            p.current = ms(500);
            p.tick(true)
        };
        assert!(third <= first, "{third:?} vs {first:?}");
    }

    #[test]
    fn hurry_jumps_to_min() {
        let mut p = AdaptivePoller::new(ms(50), ms(2000), PollStrategy::Momentum);
        p.hurry();
        assert_eq!(p.current(), ms(50));
    }

    #[test]
    fn reconfigure_clamps_current() {
        let mut p = AdaptivePoller::new(ms(16), ms(500), PollStrategy::Basic);
        p.reconfigure(ms(16), ms(100), PollStrategy::Momentum);
        assert_eq!(p.current(), ms(100));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_interval_stays_in_bounds(
            current_ms in 1u64..2000,
            changes in proptest::collection::vec(proptest::bool::ANY, 1..40),
            momentum in proptest::bool::ANY,
        ) {
            let strategy = if momentum { PollStrategy::Momentum } else { PollStrategy::Basic };
            let mut p = at(ms(current_ms), strategy);
            for changed in changes {
                let next = p.tick(changed);
                prop_assert!(next >= ms(16) && next <= ms(500), "next={next:?}");
            }
        }
    }
}
