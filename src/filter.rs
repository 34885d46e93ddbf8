//! Separation filter bank
//!
//! Linear-phase FIR designs built from windowed-sinc prototypes (Hamming
//! window, odd tap count). Linear phase keeps the group delay constant, so
//! every application shifts a signal by exactly `(taps - 1) / 2` samples and
//! the [`Aligned`] bookkeeping stays honest.
//!
//! Filters compose by coefficient convolution; the composed response equals
//! sequential application and the composed group delay is the sum of the
//! parts.

use std::ops::{AddAssign, Mul};

use crate::error::{Result, SimError};
use crate::timebase::Aligned;

/// Linear-phase FIR filter
#[derive(Debug, Clone)]
pub struct FirFilter {
    coeffs: Vec<f64>,
}

impl FirFilter {
    /// Windowed-sinc lowpass with unity DC gain.
    pub fn lowpass(cutoff_hz: f64, sample_rate: f64, num_taps: usize) -> Result<Self> {
        check_band(cutoff_hz, sample_rate)?;
        let mut coeffs = sinc_kernel(cutoff_hz, sample_rate, num_taps);
        let sum: f64 = coeffs.iter().sum();
        for c in &mut coeffs {
            *c /= sum;
        }
        Ok(Self { coeffs })
    }

    /// Bandpass as the difference of two lowpass kernels.
    pub fn bandpass(low_hz: f64, high_hz: f64, sample_rate: f64, num_taps: usize) -> Result<Self> {
        check_band(low_hz, sample_rate)?;
        check_band(high_hz, sample_rate)?;
        if low_hz >= high_hz {
            return Err(SimError::Configuration(format!(
                "bandpass edges inverted: {} >= {}",
                low_hz, high_hz
            )));
        }
        let hi = Self::lowpass(high_hz, sample_rate, num_taps)?;
        let lo = Self::lowpass(low_hz, sample_rate, num_taps)?;
        let coeffs = hi
            .coeffs
            .iter()
            .zip(lo.coeffs.iter())
            .map(|(a, b)| a - b)
            .collect();
        Ok(Self { coeffs })
    }

    /// Band-stop notch: spectral inversion of the matching bandpass.
    pub fn notch(low_hz: f64, high_hz: f64, sample_rate: f64, num_taps: usize) -> Result<Self> {
        let bp = Self::bandpass(low_hz, high_hz, sample_rate, num_taps)?;
        let mut coeffs: Vec<f64> = bp.coeffs.iter().map(|c| -c).collect();
        let center = (coeffs.len() - 1) / 2;
        coeffs[center] += 1.0;
        Ok(Self { coeffs })
    }

    /// Single filter equivalent to applying `self` after `other`.
    pub fn compose(&self, other: &FirFilter) -> FirFilter {
        let mut coeffs = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        FirFilter { coeffs }
    }

    pub fn num_taps(&self) -> usize {
        self.coeffs.len()
    }

    /// Group delay in samples, exact for linear-phase designs
    pub fn group_delay(&self) -> usize {
        (self.coeffs.len() - 1) / 2
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Linear convolution with zero initial history; output length matches
    /// the input.
    pub fn apply<T>(&self, input: &[T]) -> Vec<T>
    where
        T: Copy + Default + Mul<f64, Output = T> + AddAssign,
    {
        let mut output = Vec::with_capacity(input.len());
        for i in 0..input.len() {
            let mut acc = T::default();
            let k_max = self.coeffs.len().min(i + 1);
            for k in 0..k_max {
                acc += input[i - k] * self.coeffs[k];
            }
            output.push(acc);
        }
        output
    }

    /// Filter an aligned signal, advancing its delay and shrinking its valid
    /// range by one group delay on each side.
    pub fn filter_aligned<T>(&self, input: &Aligned<T>) -> Aligned<T>
    where
        T: Copy + Default + Mul<f64, Output = T> + AddAssign,
    {
        let d = self.group_delay();
        let out = self.apply(input.samples());
        let valid = input.valid();
        let start = valid.start + d;
        let end = valid.end.saturating_sub(d).max(start);
        Aligned::with_delay(out, input.delay() + d as isize, start..end)
    }
}

fn check_band(freq_hz: f64, sample_rate: f64) -> Result<()> {
    if !freq_hz.is_finite() || freq_hz <= 0.0 || freq_hz >= sample_rate / 2.0 {
        return Err(SimError::Configuration(format!(
            "filter edge {} Hz outside (0, {}) at fs {}",
            freq_hz,
            sample_rate / 2.0,
            sample_rate
        )));
    }
    Ok(())
}

/// Hamming-windowed sinc prototype, forced to an odd tap count
fn sinc_kernel(cutoff_hz: f64, sample_rate: f64, num_taps: usize) -> Vec<f64> {
    use std::f64::consts::PI;

    let num_taps = if num_taps % 2 == 0 { num_taps + 1 } else { num_taps };
    let center = (num_taps - 1) / 2;
    let fc = cutoff_hz / sample_rate;

    let mut coeffs = vec![0.0; num_taps];
    for i in 0..num_taps {
        let n = i as f64 - center as f64;

        let sinc = if n.abs() < 1e-10 {
            2.0 * fc
        } else {
            (2.0 * PI * fc * n).sin() / (PI * n)
        };

        let window = 0.54 - 0.46 * (2.0 * PI * i as f64 / (num_taps - 1) as f64).cos();

        coeffs[i] = sinc * window;
    }
    coeffs
}
