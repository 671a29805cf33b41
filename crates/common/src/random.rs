use rand::Rng;

/// Uniform random numbers for stochastic world queries.
///
/// Callers inject the source so tests can script exact draws.
pub trait RandomSource {
    /// Uniform float in `[min, max)`. Returns `min` when the range is empty.
    fn uniform(&mut self, min: f32, max: f32) -> f32;

    /// Uniform float in `[min, max]`. Returns `min` when the range is empty.
    fn uniform_inclusive(&mut self, min: f32, max: f32) -> f32;

    /// Uniform index in `0..len`. Returns 0 when `len` is 0.
    fn index(&mut self, len: usize) -> usize;
}

/// Adapts any `rand` generator to [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.0.random_range(min..max)
        } else {
            min
        }
    }

    fn uniform_inclusive(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.0.random_range(min..=max)
        } else {
            min
        }
    }

    fn index(&mut self, len: usize) -> usize {
        if len == 0 { 0 } else { self.0.random_range(0..len) }
    }
}
