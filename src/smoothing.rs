//! Exponential moving average over raw sensor samples.

/// Integer exponential smoother: `smoothed += (sample - smoothed) / window`.
///
/// The window is fixed at construction. A window of 1 passes samples through
/// unchanged; larger windows trade latency for noise rejection. The first
/// sample seeds the estimate directly instead of ramping up from zero.
#[derive(Clone, Debug)]
pub struct ExponentialFilter {
    window: i32,
    smoothed: i32,
    last: i32,
    primed: bool,
}

impl ExponentialFilter {
    /// `window` must be positive; the pad constructor validates this before
    /// any filter is built.
    pub fn new(window: i32) -> Self {
        debug_assert!(window > 0);
        Self {
            window,
            smoothed: 0,
            last: 0,
            primed: false,
        }
    }

    /// Record a raw sample.
    pub fn add(&mut self, sample: i32) {
        self.last = sample;
        if self.primed {
            self.smoothed += (sample - self.smoothed) / self.window;
        } else {
            self.smoothed = sample;
            self.primed = true;
        }
    }

    /// Current smoothed estimate.
    pub fn value(&self) -> i32 {
        self.smoothed
    }

    /// Most recent raw input.
    pub fn last(&self) -> i32 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_estimate() {
        let mut filter = ExponentialFilter::new(17);
        filter.add(612);
        assert_eq!(filter.value(), 612);
        assert_eq!(filter.last(), 612);
    }

    #[test]
    fn approaches_step_input() {
        let mut filter = ExponentialFilter::new(17);
        filter.add(0);
        for _ in 0..100 {
            filter.add(680);
        }
        // Integer division plateaus within one window of the target.
        assert!(filter.value() > 680 - 17);
        assert!(filter.value() <= 680);
    }

    #[test]
    fn single_outlier_barely_moves_estimate() {
        let mut filter = ExponentialFilter::new(17);
        filter.add(400);
        filter.add(700);
        assert_eq!(filter.value(), 400 + (700 - 400) / 17);
        assert_eq!(filter.last(), 700);
    }

    #[test]
    fn window_of_one_passes_through() {
        let mut filter = ExponentialFilter::new(1);
        filter.add(123);
        filter.add(987);
        assert_eq!(filter.value(), 987);
    }
}
