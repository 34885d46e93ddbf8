//! Analytic signal and phase utilities
//!
//! FFT-based Hilbert transform: forward FFT, zero the negative-frequency
//! half, double the positive half, inverse FFT. The block transform leaks at
//! the buffer edges, so callers shrink valid ranges by [`EDGE_GUARD`].

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Samples at each buffer edge considered unsettled after the transform
pub const EDGE_GUARD: usize = 128;

/// Analytic signal of a real input, same length.
pub fn analytic(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut buf: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    fft.process(&mut buf);

    // Keep DC (and Nyquist for even n) as-is, double positive frequencies,
    // zero negative frequencies.
    let half = n / 2;
    for (k, v) in buf.iter_mut().enumerate() {
        if k == 0 || (n % 2 == 0 && k == half) {
            continue;
        } else if k < half || (n % 2 == 1 && k == half) {
            *v *= 2.0;
        } else {
            *v = Complex64::new(0.0, 0.0);
        }
    }

    ifft.process(&mut buf);
    let scale = 1.0 / n as f64;
    for v in buf.iter_mut() {
        *v *= scale;
    }
    buf
}

/// Continuous phase track of a complex signal (unwrapped atan2).
pub fn unwrapped_phase(signal: &[Complex64]) -> Vec<f64> {
    let mut phase = Vec::with_capacity(signal.len());
    let mut offset = 0.0;
    let mut prev = 0.0;
    for (i, z) in signal.iter().enumerate() {
        let raw = z.im.atan2(z.re);
        if i > 0 {
            let d = raw - prev;
            if d > PI {
                offset -= 2.0 * PI;
            } else if d < -PI {
                offset += 2.0 * PI;
            }
        }
        prev = raw;
        phase.push(raw + offset);
    }
    phase
}
