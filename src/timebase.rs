//! Sample clock and delay-aware signal container
//!
//! Every stage that filters or differentiates a signal shifts it in time.
//! Rather than trimming buffers ad hoc, signals travel as [`Aligned`] values:
//! the raw samples, the accumulated group delay, and the range of *time*
//! indices that are fully settled. Downstream stages intersect valid ranges
//! instead of guessing how many samples to skip.

use std::ops::Range;

use crate::error::{Result, SimError};

/// Sample clock for one simulation run
#[derive(Debug, Clone, Copy)]
pub struct TimeBase {
    sample_rate: f64,
    num_samples: usize,
}

impl TimeBase {
    pub fn new(sample_rate: f64, duration_secs: f64) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SimError::Configuration(format!(
                "sample_rate must be positive, got {}",
                sample_rate
            )));
        }
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(SimError::Configuration(format!(
                "duration_secs must be positive, got {}",
                duration_secs
            )));
        }
        let num_samples = (sample_rate * duration_secs).round() as usize;
        if num_samples == 0 {
            return Err(SimError::Configuration(
                "duration too short for one sample".into(),
            ));
        }
        Ok(Self {
            sample_rate,
            num_samples,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.num_samples
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Time of sample `n` in seconds
    pub fn t(&self, n: usize) -> f64 {
        n as f64 / self.sample_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Frequency a configured tone actually lands on after sampling.
    ///
    /// Anything above Nyquist folds; filter designs must target the folded
    /// frequency so they agree with what synthesis and mixing produce.
    pub fn alias_hz(&self, freq_hz: f64) -> f64 {
        let r = freq_hz.rem_euclid(self.sample_rate);
        if r > self.nyquist() {
            self.sample_rate - r
        } else {
            r
        }
    }
}

/// A signal paired with its accumulated group delay and valid time range.
///
/// Sample index `i` estimates the signal at time index `i - delay`; the
/// `valid` range is expressed in time indices, so two `Aligned` values from
/// different processing chains can be compared sample-for-sample over the
/// intersection of their valid ranges.
#[derive(Debug, Clone)]
pub struct Aligned<T> {
    samples: Vec<T>,
    delay: isize,
    valid: Range<usize>,
}

impl<T: Copy> Aligned<T> {
    /// Wrap a freshly synthesized signal: zero delay, fully valid.
    pub fn new(samples: Vec<T>) -> Self {
        let n = samples.len();
        Self {
            samples,
            delay: 0,
            valid: 0..n,
        }
    }

    /// Wrap a processed signal, clamping `valid` to addressable time indices.
    pub fn with_delay(samples: Vec<T>, delay: isize, valid: Range<usize>) -> Self {
        let n = samples.len() as isize;
        let lo = (-delay).max(0) as usize;
        let hi = (n - delay).max(0) as usize;
        let start = valid.start.max(lo).min(hi);
        let end = valid.end.min(hi).max(start);
        Self {
            samples,
            delay,
            valid: start..end,
        }
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [T] {
        &mut self.samples
    }

    pub fn delay(&self) -> isize {
        self.delay
    }

    pub fn valid(&self) -> Range<usize> {
        self.valid.clone()
    }

    /// Sample at time index `tau`. Caller keeps `tau` inside `valid()`.
    pub fn at(&self, tau: usize) -> T {
        self.samples[(tau as isize + self.delay) as usize]
    }

    pub fn at_mut(&mut self, tau: usize) -> &mut T {
        &mut self.samples[(tau as isize + self.delay) as usize]
    }

    /// Narrow the valid range to its intersection with `range`.
    pub fn restrict(&mut self, range: Range<usize>) {
        let start = self.valid.start.max(range.start);
        let end = self.valid.end.min(range.end).max(start);
        self.valid = start..end;
    }

    /// Trim `front`/`back` time indices off the valid range.
    pub fn shrink_valid(&mut self, front: usize, back: usize) {
        let start = self.valid.start + front;
        let end = self.valid.end.saturating_sub(back).max(start);
        self.valid = start..end;
    }
}

/// Intersection of two valid ranges (empty range if disjoint)
pub fn intersect(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end).max(start);
    start..end
}
