//! Waveform synthesizer
//!
//! Builds the transmitted composite for either coupling model, along with
//! the references the scorer needs: the analog program signal, the drawn
//! symbol stream, and the held constellation trajectory.
//!
//! Frequency coupling integrates the modulating signals (running sum over
//! the sample clock) so the deviations are true Hz; the real carrier term
//! keeps the occupied band away from DC, where phase recovery through the
//! analytic signal is well posed.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use crate::config::{Coupling, SimConfig, Tone};
use crate::constellation::Constellation;
use crate::error::{Result, SimError};
use crate::timebase::TimeBase;

/// Everything the rest of the pipeline needs from one transmission
#[derive(Debug, Clone)]
pub struct SynthOutput {
    /// Scored analog reference (program tones only, pilot excluded)
    pub analog: Vec<f64>,
    /// Drawn symbol indices
    pub symbols: Vec<u8>,
    /// Constellation point held at every sample
    pub reference_iq: Vec<Complex64>,
    /// Real transmitted composite
    pub composite: Vec<f64>,
    /// Exportable complex baseband rendition of the composite
    pub baseband_iq: Vec<Complex64>,
}

pub struct WaveformSynthesizer<'a> {
    config: &'a SimConfig,
    tb: TimeBase,
}

impl<'a> WaveformSynthesizer<'a> {
    pub fn new(config: &'a SimConfig) -> Result<Self> {
        config.validate()?;
        let tb = config.timebase()?;
        Ok(Self { config, tb })
    }

    pub fn synthesize(&self, rng: &mut ChaCha8Rng) -> Result<SynthOutput> {
        let analog = self.tone_sum(&self.config.analog_tones);
        let symbols = self.draw_symbols(rng);
        let reference_iq = self.held_iq(&symbols);
        let subcarrier = self.subcarrier_real(&reference_iq);

        match self.config.coupling {
            Coupling::Amplitude {
                analog_index,
                digital_index,
            } => {
                let fc = self.config.carrier_hz;
                let mut composite = Vec::with_capacity(self.tb.len());
                let mut baseband_iq = Vec::with_capacity(self.tb.len());
                for n in 0..self.tb.len() {
                    let envelope = 1.0 + analog_index * analog[n] + digital_index * subcarrier[n];
                    let carrier = (2.0 * PI * fc * self.tb.t(n)).cos();
                    composite.push(envelope * carrier);
                    baseband_iq.push(Complex64::new(envelope, 0.0));
                }
                Ok(SynthOutput {
                    analog,
                    symbols,
                    reference_iq,
                    composite,
                    baseband_iq,
                })
            }
            Coupling::Frequency {
                analog_dev_hz,
                digital_dev_hz,
            } => {
                // Pilot rides in the modulating signal but is not scored
                let mut modulating = analog.clone();
                if let Some(p) = self.config.pilot {
                    for (n, m) in modulating.iter_mut().enumerate() {
                        *m += p.amplitude * (2.0 * PI * p.freq_hz * self.tb.t(n)).sin();
                    }
                }

                let dig_unit = normalize_to_unit_peak(subcarrier)?;
                let ca = self.running_integral(&modulating);
                let cd = self.running_integral(&dig_unit);

                let fc = self.config.carrier_hz;
                let dev_sum = analog_dev_hz + digital_dev_hz;
                let mut composite = Vec::with_capacity(self.tb.len());
                let mut baseband_iq = Vec::with_capacity(self.tb.len());
                for n in 0..self.tb.len() {
                    // Phase in cycles; bounded combined phase drives the export
                    let phase = analog_dev_hz * ca[n] + digital_dev_hz * cd[n];
                    let combined = phase / dev_sum;
                    composite.push((2.0 * PI * (fc * self.tb.t(n) + phase)).cos());
                    baseband_iq.push(Complex64::from_polar(1.0, 2.0 * PI * combined));
                }
                Ok(SynthOutput {
                    analog,
                    symbols,
                    reference_iq,
                    composite,
                    baseband_iq,
                })
            }
        }
    }

    fn tone_sum(&self, tones: &[Tone]) -> Vec<f64> {
        (0..self.tb.len())
            .map(|n| {
                let t = self.tb.t(n);
                tones
                    .iter()
                    .map(|tone| tone.amplitude * (2.0 * PI * tone.freq_hz * t).sin())
                    .sum()
            })
            .collect()
    }

    fn draw_symbols(&self, rng: &mut ChaCha8Rng) -> Vec<u8> {
        let sps = self.config.samples_per_symbol();
        let num_symbols = self.tb.len() / sps;
        let order = self.config.alphabet.order() as u8;
        (0..num_symbols).map(|_| rng.gen_range(0..order)).collect()
    }

    /// Rectangular hold; the tail past the last full symbol holds the final
    /// point so the trajectory never drops to zero.
    fn held_iq(&self, symbols: &[u8]) -> Vec<Complex64> {
        let sps = self.config.samples_per_symbol();
        (0..self.tb.len())
            .map(|n| {
                let idx = (n / sps).min(symbols.len() - 1);
                self.config.alphabet.symbol_to_iq(symbols[idx])
            })
            .collect()
    }

    fn subcarrier_real(&self, reference_iq: &[Complex64]) -> Vec<f64> {
        let f = self.config.subcarrier_hz;
        reference_iq
            .iter()
            .enumerate()
            .map(|(n, iq)| (iq * Complex64::from_polar(1.0, 2.0 * PI * f * self.tb.t(n))).re)
            .collect()
    }

    fn running_integral(&self, x: &[f64]) -> Vec<f64> {
        let dt = 1.0 / self.tb.sample_rate();
        let mut acc = 0.0;
        x.iter()
            .map(|v| {
                acc += v * dt;
                acc
            })
            .collect()
    }
}

/// Scale a signal to unit peak magnitude.
pub fn normalize_to_unit_peak(signal: Vec<f64>) -> Result<Vec<f64>> {
    let peak = signal.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if peak < 1e-12 {
        return Err(SimError::DegenerateSignal(
            "cannot normalize: peak magnitude is zero".into(),
        ));
    }
    Ok(signal.into_iter().map(|x| x / peak).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_fm_composite_shape() {
        let cfg = SimConfig::fm_default();
        let synth = WaveformSynthesizer::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let out = synth.synthesize(&mut rng).unwrap();

        assert_eq!(out.composite.len(), 4800);
        assert_eq!(out.symbols.len(), 120);
        for &x in &out.composite {
            assert!(x.abs() <= 1.0 + 1e-12, "constant-envelope bound: {}", x);
        }
        for z in &out.baseband_iq {
            assert!((z.norm() - 1.0).abs() < 1e-12, "baseband magnitude {}", z.norm());
        }
    }

    #[test]
    fn test_am_envelope_positive() {
        let cfg = SimConfig::am_default();
        let synth = WaveformSynthesizer::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let out = synth.synthesize(&mut rng).unwrap();

        for z in &out.baseband_iq {
            assert!(z.re > 0.0, "envelope dipped to {}", z.re);
            assert_eq!(z.im, 0.0);
        }
    }

    #[test]
    fn test_symbols_deterministic_per_seed() {
        let cfg = SimConfig::fm_default();
        let synth = WaveformSynthesizer::new(&cfg).unwrap();

        let mut rng1 = ChaCha8Rng::seed_from_u64(5);
        let mut rng2 = ChaCha8Rng::seed_from_u64(5);
        let mut rng3 = ChaCha8Rng::seed_from_u64(6);

        let a = synth.synthesize(&mut rng1).unwrap();
        let b = synth.synthesize(&mut rng2).unwrap();
        let c = synth.synthesize(&mut rng3).unwrap();

        assert_eq!(a.symbols, b.symbols);
        assert_ne!(a.symbols, c.symbols);
        assert_eq!(a.composite, b.composite);
    }

    #[test]
    fn test_held_reference_boundaries() {
        let cfg = SimConfig::fm_default();
        let synth = WaveformSynthesizer::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let out = synth.synthesize(&mut rng).unwrap();

        let sps = cfg.samples_per_symbol();
        for (i, &sym) in out.symbols.iter().enumerate() {
            let expected = cfg.alphabet.symbol_to_iq(sym);
            let got = out.reference_iq[i * sps + sps / 2];
            assert!((got - expected).norm() < 1e-12, "symbol {} held value", i);
        }
    }

    #[test]
    fn test_analog_reference_excludes_pilot() {
        let cfg = SimConfig::fm_default();
        let synth = WaveformSynthesizer::new(&cfg).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let out = synth.synthesize(&mut rng).unwrap();

        // 1 kHz tone alone peaks at 1.0; with the pilot it would exceed it
        let peak = out.analog.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        assert!((peak - 1.0).abs() < 1e-3, "analog peak {}", peak);
    }

    #[test]
    fn test_normalize_rejects_silence() {
        let err = normalize_to_unit_peak(vec![0.0; 64]).unwrap_err();
        assert!(matches!(err, SimError::DegenerateSignal(_)));

        let ok = normalize_to_unit_peak(vec![0.0, -0.5, 0.25]).unwrap();
        assert_eq!(ok[1], -1.0);
    }
}
