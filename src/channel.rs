//! Channel model
//!
//! Applies the configured impairments to the real composite. Each block is
//! independently optional and a disabled block is an exact identity, so the
//! clean-channel path returns the input bit-for-bit (delay 0, fully valid
//! apart from the echo settling region).
//!
//! Gaussian sources draw their seeds from the run RNG in a fixed order, so a
//! given seed always produces the same channel realization.

use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

use crate::config::Impairments;
use crate::error::{Result, SimError};
use crate::noise::GaussianNoise;
use crate::timebase::{Aligned, TimeBase};

pub struct ChannelModel<'a> {
    impairments: &'a Impairments,
    tb: TimeBase,
}

impl<'a> ChannelModel<'a> {
    pub fn new(impairments: &'a Impairments, tb: TimeBase) -> Self {
        Self { impairments, tb }
    }

    pub fn apply(&self, composite: &[f64], rng: &mut ChaCha8Rng) -> Result<Aligned<f64>> {
        let n = composite.len();
        let mut y = composite.to_vec();

        // Multipath: direct path plus attenuated, delayed copies
        let mut settle = 0usize;
        if !self.impairments.multipath.is_empty() {
            for echo in &self.impairments.multipath {
                if echo.delay_samples >= n {
                    return Err(SimError::Configuration(format!(
                        "multipath delay {} exceeds signal length {}",
                        echo.delay_samples, n
                    )));
                }
                settle = settle.max(echo.delay_samples);
            }
            let direct = y.clone();
            for echo in &self.impairments.multipath {
                for i in echo.delay_samples..n {
                    y[i] += echo.attenuation * direct[i - echo.delay_samples];
                }
            }
        }

        // Additive narrowband interferers
        if let Some(tone) = self.impairments.interference {
            for (i, v) in y.iter_mut().enumerate() {
                *v += tone.amplitude
                    * (2.0 * PI * tone.freq_hz * self.tb.t(i) + tone.phase_rad).sin();
            }
        }
        for hum in &self.impairments.hum {
            for (i, v) in y.iter_mut().enumerate() {
                *v += hum.amplitude * (2.0 * PI * hum.freq_hz * self.tb.t(i)).sin();
            }
        }

        // Wideband Gaussian interference, then thermal noise
        if let Some(power) = self.impairments.wideband_power {
            let mut noise = GaussianNoise::new(power, rng);
            for v in y.iter_mut() {
                *v += noise.next_sample();
            }
        }
        if let Some(power) = self.impairments.awgn_power {
            let mut noise = GaussianNoise::new(power, rng);
            for v in y.iter_mut() {
                *v += noise.next_sample();
            }
        }

        // Front end amplifies signal and noise alike, then adds its own
        // noise-figure contribution
        if let Some(fe) = self.impairments.front_end {
            let gain = 10.0_f64.powf(fe.gain_db / 20.0);
            let nf_power = fe.noise_floor * 10.0_f64.powf(fe.noise_figure_db / 10.0);
            let mut noise = GaussianNoise::new(nf_power, rng);
            for v in y.iter_mut() {
                *v = gain * (*v + noise.next_sample());
            }
        }

        Ok(Aligned::with_delay(y, 0, settle..n))
    }
}
