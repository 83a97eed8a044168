//! Exponential moving averages.

/// An exponential moving average with a smooth warm-up.
///
/// The configured weight `alpha` is approached from above: updates start with a weight of 1 which
/// is halved on an exponentially growing schedule until it reaches `alpha`. This initializes the
/// average from the first samples instead of from an arbitrary initial value.
#[derive(Clone)]
pub struct Ema {
    value: f64,
    alpha: f64,
    beta: f64,
    wait: u64,
    period: u64,
}

impl Ema {
    /// Create an average with the given target weight.
    pub fn new(alpha: f64) -> Ema {
        Ema {
            value: 0.0,
            alpha,
            beta: 1.0,
            wait: 0,
            period: 0,
        }
    }

    /// Change the target weight.
    ///
    /// Takes effect once the warm-up weight has decayed to the new target.
    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
        if self.beta < alpha {
            self.beta = alpha;
        }
    }

    /// The current value of the average.
    pub fn get(&self) -> f64 {
        self.value
    }

    /// Add a sample to the average.
    pub fn update(&mut self, sample: f64) {
        self.value += self.beta * (sample - self.value);

        if self.beta <= self.alpha {
            return;
        }
        // Halve the warm-up weight on a doubling schedule until it reaches alpha.
        if self.wait > 0 {
            self.wait -= 1;
            return;
        }
        self.period = 2 * (self.period + 1) - 1;
        self.wait = self.period;
        self.beta *= 0.5;
        if self.beta < self.alpha {
            self.beta = self.alpha;
        }
    }
}

/// The moving averages maintained during search.
pub struct Emas {
    /// Short horizon average of learned clause glues.
    pub fast_glue: Ema,
    /// Long horizon average of learned clause glues.
    pub slow_glue: Ema,
    /// Average trail size at conflicts.
    pub trail: Ema,
    /// Average backjump length.
    pub jump: Ema,
    /// Average learned clause size.
    pub size: Ema,
    /// Average decision level at conflicts.
    pub level: Ema,
}

impl Default for Emas {
    fn default() -> Emas {
        let config = crate::config::SolverConfig::default();
        Emas {
            fast_glue: Ema::new(config.fast_glue_alpha),
            slow_glue: Ema::new(config.slow_glue_alpha),
            trail: Ema::new(1e-4),
            jump: Ema::new(1e-4),
            size: Ema::new(1e-4),
            level: Ema::new(1e-4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_tracks_first_samples() {
        let mut ema = Ema::new(1e-5);
        ema.update(7.0);
        // The first update uses weight 1 and adopts the sample.
        assert_eq!(ema.get(), 7.0);
        ema.update(3.0);
        assert!(ema.get() < 7.0 && ema.get() > 3.0);
    }

    #[test]
    fn beta_decays_towards_alpha() {
        let mut ema = Ema::new(0.25);
        for _ in 0..100 {
            ema.update(1.0);
        }
        assert!(ema.beta <= 0.25 + f64::EPSILON);
        assert!((ema.get() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_input_is_fixed_point() {
        let mut ema = Ema::new(0.5);
        for _ in 0..10 {
            ema.update(4.0);
        }
        assert!((ema.get() - 4.0).abs() < 1e-9);
    }
}
