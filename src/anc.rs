//! Adaptive noise canceller
//!
//! A growing-weight LMS stage: at step `k` the prediction is the dot product
//! of the first `k` weights with the time-reversed reference history, so the
//! filter order grows with the amount of reference seen. The error trace is
//! retained for convergence inspection; for a stationary reference the
//! trailing mean squared error is non-increasing as long as the step size
//! stays inside the stability region for the reference power.

use crate::error::{Result, SimError};
use crate::timebase::Aligned;

pub struct LmsCanceller {
    mu: f64,
    weights: Vec<f64>,
    errors: Vec<f64>,
}

impl LmsCanceller {
    pub fn new(mu: f64) -> Self {
        Self {
            mu,
            weights: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Run one adaptation pass over paired reference and desired sequences.
    ///
    /// Step 0 predicts zero and records the error without touching any
    /// weight. An empty reference is a no-op: no weights, nothing to cancel.
    pub fn adapt(&mut self, reference: &[f64], desired: &[f64]) -> Result<()> {
        if reference.len() != desired.len() {
            return Err(SimError::Configuration(format!(
                "canceller inputs disagree in length: reference {}, desired {}",
                reference.len(),
                desired.len()
            )));
        }
        let n = reference.len();
        self.weights = vec![0.0; n.saturating_sub(1)];
        self.errors = Vec::with_capacity(n);

        for k in 0..n {
            let mut prediction = 0.0;
            for j in 0..k {
                prediction += self.weights[j] * reference[k - 1 - j];
            }
            let error = desired[k] - prediction;
            for j in 0..k {
                self.weights[j] += self.mu * error * reference[k - 1 - j];
            }
            self.errors.push(error);
        }
        Ok(())
    }

    /// Subtract the learned weight vector, as a time series, from `signal`
    /// starting at time index `start`. Bounded by the signal's valid range;
    /// a canceller that never adapted subtracts nothing.
    pub fn cancel(&self, signal: &mut Aligned<f64>, start: usize) {
        let valid = signal.valid();
        for (k, &w) in self.weights.iter().enumerate() {
            let tau = start + k;
            if tau >= valid.end {
                break;
            }
            if tau < valid.start {
                continue;
            }
            *signal.at_mut(tau) -= w;
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    /// Mean squared error over the last `window` recorded errors.
    pub fn trailing_mse(&self, window: usize) -> f64 {
        let n = self.errors.len().min(window.max(1));
        if n == 0 {
            return 0.0;
        }
        let tail = &self.errors[self.errors.len() - n..];
        tail.iter().map(|e| e * e).sum::<f64>() / n as f64
    }
}
