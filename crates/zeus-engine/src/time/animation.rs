/// Animation time added per rendered frame (unitless).
pub const DEFAULT_TIME_STEP: f64 = 0.001;

/// Per-primitive animation clock.
///
/// Advances by a fixed step once per rendered frame. Never reset and never
/// shared between primitives. The accumulator is `f64` so that `N` frames
/// stay within rounding noise of `step * N` for long sessions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AnimationState {
    elapsed: f64,
    step: f64,
}

impl AnimationState {
    pub fn new(step: f64) -> Self {
        debug_assert!(step.is_finite() && step >= 0.0);
        Self { elapsed: 0.0, step }
    }

    /// Advances by one frame and returns the new elapsed time.
    #[inline]
    pub fn advance(&mut self) -> f64 {
        self.elapsed += self.step;
        self.elapsed
    }

    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Overrides the accumulated time.
    ///
    /// Lets callers render a primitive at a known time without replaying frames.
    #[inline]
    pub fn set_elapsed(&mut self, elapsed: f64) {
        self.elapsed = elapsed;
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let a = AnimationState::default();
        assert_eq!(a.elapsed(), 0.0);
        assert_eq!(a.step(), DEFAULT_TIME_STEP);
    }

    #[test]
    fn elapsed_is_step_times_frames() {
        for frames in [0u32, 1, 2, 10, 1_000, 25_000] {
            let mut a = AnimationState::default();
            for _ in 0..frames {
                a.advance();
            }
            let expected = DEFAULT_TIME_STEP * frames as f64;
            assert!(
                (a.elapsed() - expected).abs() < 1e-9,
                "frames={frames} elapsed={} expected={expected}",
                a.elapsed()
            );
        }
    }

    #[test]
    fn clocks_are_independent() {
        let mut a = AnimationState::default();
        let mut b = AnimationState::default();
        a.advance();
        a.advance();
        b.advance();
        assert!((a.elapsed() - 0.002).abs() < 1e-12);
        assert!((b.elapsed() - 0.001).abs() < 1e-12);
    }

    #[test]
    fn set_elapsed_then_advance() {
        let mut a = AnimationState::new(0.5);
        a.set_elapsed(2.0);
        assert_eq!(a.advance(), 2.5);
    }
}
