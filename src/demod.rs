//! Demodulator and separation stage
//!
//! The receiver runs in two passes. `demodulate` recovers the raw modulating
//! estimate (instantaneous frequency for frequency coupling, normalized
//! envelope for amplitude coupling) together with an optional noise
//! reference for the adaptive canceller. After cancellation, the branch
//! extractors split the cleaned estimate into the analog program signal and
//! the complex digital baseband.
//!
//! All mixing happens in absolute time coordinates (honoring accumulated
//! group delay), so recovered signals line up sample-for-sample with the
//! synthesizer's references.

use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use crate::config::{Coupling, SimConfig};
use crate::error::{Result, SimError};
use crate::filter::FirFilter;
use crate::hilbert::{analytic, unwrapped_phase, EDGE_GUARD};
use crate::timebase::{Aligned, TimeBase};

/// Half-width of the notch carved around a configured interference tone
const NOTCH_HALF_HZ: f64 = 800.0;
const NOTCH_TAPS: usize = 301;

/// Half-width of the pilot extraction band
const PILOT_HALF_HZ: f64 = 900.0;
const PILOT_TAPS: usize = 301;

/// Cutoff of the subsonic noise-reference band (amplitude coupling)
const SUBSONIC_CUTOFF_HZ: f64 = 250.0;
const SUBSONIC_TAPS: usize = 401;

/// Raw demodulation product, pre-cancellation
#[derive(Debug, Clone)]
pub struct Demodulated {
    /// Recovered modulating estimate in reference units
    pub raw: Aligned<f64>,
    /// Band-limited estimate of what should not be there
    pub noise_reference: Option<Aligned<f64>>,
}

pub struct Demodulator<'a> {
    config: &'a SimConfig,
    tb: TimeBase,
}

impl<'a> Demodulator<'a> {
    pub fn new(config: &'a SimConfig) -> Result<Self> {
        let tb = config.timebase()?;
        Ok(Self { config, tb })
    }

    pub fn demodulate(&self, received: &Aligned<f64>) -> Result<Demodulated> {
        match self.config.coupling {
            Coupling::Frequency { analog_dev_hz, .. } => {
                self.demodulate_frequency(received, analog_dev_hz)
            }
            Coupling::Amplitude { .. } => self.demodulate_amplitude(received),
        }
    }

    /// Analog program branch: lowpass below the digital band, rescaled to
    /// reference units.
    pub fn analog_branch(&self, cleaned: &Aligned<f64>) -> Result<Aligned<f64>> {
        let lp = FirFilter::lowpass(self.analog_cutoff_hz(), self.tb.sample_rate(), 141)?;
        let mut out = lp.filter_aligned(cleaned);
        let scale = match self.config.coupling {
            Coupling::Amplitude { analog_index, .. } => 1.0 / analog_index,
            Coupling::Frequency { .. } => 1.0,
        };
        for v in out.samples_mut() {
            *v *= scale;
        }
        Ok(out)
    }

    /// Digital branch: bandpass at the folded subcarrier, complex downshift,
    /// image-reject lowpass, rescale to the unit constellation.
    pub fn digital_branch(&self, cleaned: &Aligned<f64>) -> Result<Aligned<Complex64>> {
        let fs = self.tb.sample_rate();
        let f_sub = self.config.subcarrier_hz;
        let f_eff = self.tb.alias_hz(f_sub);
        let half = 2.0 * self.config.symbol_rate;

        let bp = FirFilter::bandpass(f_eff - half, f_eff + half, fs, 61)?;
        let band = bp.filter_aligned(cleaned);

        let shifted: Vec<Complex64> = band
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let tau = (i as isize - band.delay()) as f64;
                Complex64::from_polar(1.0, -2.0 * PI * f_sub * tau / fs) * v
            })
            .collect();
        let shifted = Aligned::with_delay(shifted, band.delay(), band.valid());

        let lp = FirFilter::lowpass(2.0 * self.config.symbol_rate, fs, 41)?;
        let mut out = lp.filter_aligned(&shifted);

        let scale = match self.config.coupling {
            Coupling::Amplitude { digital_index, .. } => 2.0 / digital_index,
            Coupling::Frequency {
                analog_dev_hz,
                digital_dev_hz,
            } => 2.0 * analog_dev_hz / digital_dev_hz,
        };
        for v in out.samples_mut() {
            *v *= scale;
        }
        Ok(out)
    }

    fn demodulate_frequency(
        &self,
        received: &Aligned<f64>,
        analog_dev_hz: f64,
    ) -> Result<Demodulated> {
        let fs = self.tb.sample_rate();
        let fc = self.config.carrier_hz;

        let front = self.front_filter()?;
        let filtered = front.filter_aligned(received);

        let z = analytic(filtered.samples());
        let rotated: Vec<Complex64> = z
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let tau = (i as isize - filtered.delay()) as f64;
                v * Complex64::from_polar(1.0, -2.0 * PI * fc * tau / fs)
            })
            .collect();
        let theta = unwrapped_phase(&rotated);

        // First difference inverts the synthesizer's running integral
        // exactly; index i carries time i + 1 - delay.
        let raw_samples: Vec<f64> = theta
            .windows(2)
            .map(|w| (w[1] - w[0]) * fs / (2.0 * PI) / analog_dev_hz)
            .collect();
        let mut raw = Aligned::with_delay(raw_samples, filtered.delay() - 1, filtered.valid());
        raw.shrink_valid(EDGE_GUARD, EDGE_GUARD + 1);

        let noise_reference = match self.config.pilot {
            Some(pilot) => Some(self.pilot_reference(&raw, pilot)?),
            None => None,
        };

        Ok(Demodulated {
            raw,
            noise_reference,
        })
    }

    fn demodulate_amplitude(&self, received: &Aligned<f64>) -> Result<Demodulated> {
        let filtered = match self.interference_notch()? {
            Some(notch) => notch.filter_aligned(received),
            None => received.clone(),
        };

        let z = analytic(filtered.samples());
        let env: Vec<f64> = z.iter().map(|v| v.norm()).collect();
        let mut env = Aligned::with_delay(env, filtered.delay(), filtered.valid());
        env.shrink_valid(EDGE_GUARD, EDGE_GUARD);

        // Mean envelope over the settled region stands in for the carrier
        // amplitude, making the branch immune to front-end gain.
        let valid = env.valid();
        if valid.is_empty() {
            return Err(SimError::DegenerateSignal(
                "no settled samples for envelope normalization".into(),
            ));
        }
        let mean: f64 =
            valid.clone().map(|tau| env.at(tau)).sum::<f64>() / valid.len() as f64;
        if mean < 1e-12 {
            return Err(SimError::DegenerateSignal(
                "envelope mean is zero".into(),
            ));
        }
        for v in env.samples_mut() {
            *v = *v / mean - 1.0;
        }

        let noise_reference = Some(self.subsonic_reference(&env)?);

        Ok(Demodulated {
            raw: env,
            noise_reference,
        })
    }

    /// Receiver front filter: bandpass around the carrier, composed with an
    /// interference notch when one is configured in-band.
    fn front_filter(&self) -> Result<FirFilter> {
        let fs = self.tb.sample_rate();
        let fc = self.config.carrier_hz;
        let span = match self.config.coupling {
            Coupling::Frequency {
                analog_dev_hz,
                digital_dev_hz,
            } => analog_dev_hz + digital_dev_hz + 2.0 * self.config.symbol_rate,
            Coupling::Amplitude { .. } => unreachable!("front filter is frequency-coupling only"),
        };
        let lo = (fc - span).max(fs * 0.005);
        let hi = (fc + span).min(self.tb.nyquist() - fs * 0.005);
        let bp = FirFilter::bandpass(lo, hi, fs, 101)?;

        Ok(match self.interference_notch()? {
            Some(notch) => bp.compose(&notch),
            None => bp,
        })
    }

    fn interference_notch(&self) -> Result<Option<FirFilter>> {
        let fs = self.tb.sample_rate();
        if let Some(tone) = self.config.impairments.interference {
            let f = self.tb.alias_hz(tone.freq_hz);
            if f - NOTCH_HALF_HZ > 0.0 && f + NOTCH_HALF_HZ < self.tb.nyquist() {
                return Ok(Some(FirFilter::notch(
                    f - NOTCH_HALF_HZ,
                    f + NOTCH_HALF_HZ,
                    fs,
                    NOTCH_TAPS,
                )?));
            }
        }
        Ok(None)
    }

    /// Pilot-band content of the raw estimate minus the analytically
    /// expected pilot. In a clean channel this is near zero.
    fn pilot_reference(
        &self,
        raw: &Aligned<f64>,
        pilot: crate::config::Tone,
    ) -> Result<Aligned<f64>> {
        let fs = self.tb.sample_rate();
        let fp = self.tb.alias_hz(pilot.freq_hz);
        let lo = (fp - PILOT_HALF_HZ).max(fs * 0.005);
        let hi = (fp + PILOT_HALF_HZ).min(self.tb.nyquist() - fs * 0.001);
        let bp = FirFilter::bandpass(lo, hi, fs, PILOT_TAPS)?;

        let meas = bp.filter_aligned(raw);
        let est: Vec<f64> = meas
            .samples()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let tau = (i as isize - meas.delay()) as f64;
                v - pilot.amplitude * (2.0 * PI * pilot.freq_hz * tau / fs).sin()
            })
            .collect();
        Ok(Aligned::with_delay(est, meas.delay(), meas.valid()))
    }

    /// Subsonic band of the normalized envelope; expected zero, so whatever
    /// lives there is treated as correlated noise.
    fn subsonic_reference(&self, raw: &Aligned<f64>) -> Result<Aligned<f64>> {
        let lp = FirFilter::lowpass(SUBSONIC_CUTOFF_HZ, self.tb.sample_rate(), SUBSONIC_TAPS)?;
        Ok(lp.filter_aligned(raw))
    }

    // A tight cutoff matters for frequency coupling: sideband images of the
    // folded subcarrier beat against the carrier and land just above the
    // program band, so the lowpass must stop well below the folded band.
    fn analog_cutoff_hz(&self) -> f64 {
        let fmax = self
            .config
            .analog_tones
            .iter()
            .fold(0.0_f64, |m, t| m.max(t.freq_hz));
        fmax + 1000.0
    }
}
