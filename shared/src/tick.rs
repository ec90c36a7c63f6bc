//! Fixed-rate simulation clock
//!
//! Rendering frames arrive with variable duration; the simulation advances in
//! discrete ticks of exactly `1 / tick_rate` seconds. Frame time is accumulated
//! and whole intervals are consumed one at a time, carrying the remainder
//! forward so drift stays below one interval.

/// Discrete simulation step counter shared conceptually by client and server.
pub type Tick = u32;

#[derive(Debug, Clone)]
pub struct TickClock {
    accumulator: f64,
    interval: f64,
    current_tick: Tick,
}

impl TickClock {
    /// Creates a clock ticking `tick_rate` times per second, starting at tick 0.
    pub fn new(tick_rate: f32) -> Self {
        Self {
            accumulator: 0.0,
            interval: 1.0 / f64::from(tick_rate.max(1.0)),
            current_tick: 0,
        }
    }

    /// Clock resuming from `tick`, used when joining a session already in progress.
    pub fn starting_at(tick_rate: f32, tick: Tick) -> Self {
        Self {
            current_tick: tick,
            ..Self::new(tick_rate)
        }
    }

    /// Adds elapsed frame time to the accumulator.
    pub fn advance(&mut self, delta_seconds: f32) {
        if delta_seconds > 0.0 {
            self.accumulator += f64::from(delta_seconds);
        }
    }

    /// Consumes one interval if enough time has accumulated.
    ///
    /// Call in a loop until it returns false. Only the consumed interval is
    /// subtracted, the accumulator is never reset.
    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            self.current_tick += 1;
            true
        } else {
            false
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Fixed step length in seconds.
    pub fn interval(&self) -> f32 {
        self.interval as f32
    }

    /// Time carried towards the next tick, always below one interval after draining.
    pub fn accumulated(&self) -> f64 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut TickClock) -> u32 {
        let mut consumed = 0;
        while clock.consume_tick() {
            consumed += 1;
        }
        consumed
    }

    #[test]
    fn test_no_tick_before_interval() {
        let mut clock = TickClock::new(60.0);
        clock.advance(0.01);
        assert!(!clock.consume_tick());
        assert_eq!(clock.current_tick(), 0);
    }

    #[test]
    fn test_large_frame_consumes_multiple_ticks() {
        let mut clock = TickClock::new(60.0);
        clock.advance(0.05);
        assert_eq!(drain(&mut clock), 3);
        assert_eq!(clock.current_tick(), 3);
        assert!(clock.accumulated() < 1.0 / 60.0);
    }

    #[test]
    fn test_bounded_drift_over_variable_frames() {
        let frames = [0.016_f32, 0.033, 0.001, 0.1, 0.0167, 0.02, 0.007, 0.25, 0.011, 0.0];
        let mut clock = TickClock::new(60.0);
        let mut total = 0.0_f64;
        let mut consumed = 0_u32;

        for _ in 0..50 {
            for dt in frames {
                clock.advance(dt);
                total += f64::from(dt);
                consumed += drain(&mut clock);

                let covered = f64::from(consumed) / 60.0;
                assert!(covered <= total + 1e-9, "consumed more time than elapsed");
                assert!(covered > total - 1.0 / 60.0 - 1e-9, "drift exceeded one interval");
            }
        }
        assert_eq!(clock.current_tick(), consumed);
    }

    #[test]
    fn test_negative_delta_is_ignored() {
        let mut clock = TickClock::new(60.0);
        clock.advance(-1.0);
        assert_eq!(clock.accumulated(), 0.0);
    }

    #[test]
    fn test_tick_counter_is_monotonic() {
        let mut clock = TickClock::new(30.0);
        let mut last = clock.current_tick();
        for _ in 0..200 {
            clock.advance(0.021);
            while clock.consume_tick() {
                assert_eq!(clock.current_tick(), last + 1);
                last = clock.current_tick();
            }
        }
    }

    #[test]
    fn test_starting_at_resumes_count() {
        let mut clock = TickClock::starting_at(60.0, 500);
        clock.advance(1.0 / 30.0 + 1e-4);
        assert_eq!(drain(&mut clock), 2);
        assert_eq!(clock.current_tick(), 502);
    }
}
