//! Closed-loop scoring
//!
//! All comparisons run over the intersection of the recovered signal's valid
//! time range with the reference; scoring with no overlap at all raises
//! `UndefinedMetric`. A residual with exactly zero variance reports infinite
//! SNR rather than failing, so an identity round trip scores cleanly.

use rustfft::num_complex::Complex64;
use std::fmt;

use crate::config::SimConfig;
use crate::error::{Result, SimError};
use crate::timebase::{intersect, Aligned};

/// Final metrics for one run
#[derive(Debug, Clone, Copy)]
pub struct ScoreRecord {
    pub analog_snr_db: f64,
    pub digital_snr_db: f64,
    pub ber: f64,
    pub effective_rate_bps: f64,
}

impl fmt::Display for ScoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "analog SNR {:.1} dB, digital SNR {:.1} dB, BER {:.4}, effective rate {:.1} bit/s",
            self.analog_snr_db, self.digital_snr_db, self.ber, self.effective_rate_bps
        )
    }
}

pub struct Scorer<'a> {
    config: &'a SimConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self { config }
    }

    /// SNR in dB: mean reference power over the variance of the residual.
    pub fn analog_snr_db(&self, recovered: &Aligned<f64>, reference: &[f64]) -> Result<f64> {
        let span = intersect(&recovered.valid(), &(0..reference.len()));
        if span.is_empty() {
            return Err(SimError::UndefinedMetric(
                "analog SNR: no overlapping valid samples".into(),
            ));
        }
        let n = span.len() as f64;
        let ref_power = span
            .clone()
            .map(|tau| reference[tau] * reference[tau])
            .sum::<f64>()
            / n;
        if ref_power == 0.0 {
            return Err(SimError::UndefinedMetric(
                "analog SNR: reference power is zero".into(),
            ));
        }
        let residual: Vec<f64> = span
            .map(|tau| recovered.at(tau) - reference[tau])
            .collect();
        let var = variance(&residual);
        if var == 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(10.0 * (ref_power / var).log10())
    }

    /// Phase-error SNR in dB: mean reference magnitude squared over the
    /// variance of the wrapped phase difference.
    pub fn digital_snr_db(
        &self,
        recovered: &Aligned<Complex64>,
        reference: &[Complex64],
    ) -> Result<f64> {
        let span = intersect(&recovered.valid(), &(0..reference.len()));
        if span.is_empty() {
            return Err(SimError::UndefinedMetric(
                "digital SNR: no overlapping valid samples".into(),
            ));
        }
        let n = span.len() as f64;
        let ref_power = span
            .clone()
            .map(|tau| reference[tau].norm_sqr())
            .sum::<f64>()
            / n;
        if ref_power == 0.0 {
            return Err(SimError::UndefinedMetric(
                "digital SNR: reference power is zero".into(),
            ));
        }
        // (a * conj(b)).arg() is the wrapped phase difference in (-pi, pi]
        let phase_err: Vec<f64> = span
            .map(|tau| (recovered.at(tau) * reference[tau].conj()).arg())
            .collect();
        let var = variance(&phase_err);
        if var == 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(10.0 * (ref_power / var).log10())
    }

    /// Fraction of symbol-center samples whose wrapped phase difference
    /// against the reference exceeds the decision threshold.
    pub fn ber(&self, recovered: &Aligned<Complex64>, reference: &[Complex64]) -> Result<f64> {
        let sps = self.config.samples_per_symbol();
        let valid = recovered.valid();
        let mut centers = 0usize;
        let mut errors = 0usize;
        let mut tau = sps / 2;
        while tau < reference.len() {
            if valid.contains(&tau) {
                centers += 1;
                let diff = (recovered.at(tau) * reference[tau].conj()).arg();
                if diff.abs() > self.config.decision_threshold_rad {
                    errors += 1;
                }
            }
            tau += sps;
        }
        if centers == 0 {
            return Err(SimError::UndefinedMetric(
                "BER: no symbol centers inside the valid range".into(),
            ));
        }
        Ok(errors as f64 / centers as f64)
    }

    /// Nominal rate scaled by the FEC rate and the surviving bit fraction.
    pub fn effective_rate_bps(&self, ber: f64) -> f64 {
        self.config.nominal_data_rate() * self.config.fec_rate * (1.0 - ber)
    }

    pub fn score(
        &self,
        recovered_analog: &Aligned<f64>,
        analog_reference: &[f64],
        recovered_digital: &Aligned<Complex64>,
        digital_reference: &[Complex64],
    ) -> Result<ScoreRecord> {
        let analog_snr_db = self.analog_snr_db(recovered_analog, analog_reference)?;
        let digital_snr_db = self.digital_snr_db(recovered_digital, digital_reference)?;
        let ber = self.ber(recovered_digital, digital_reference)?;
        let effective_rate_bps = self.effective_rate_bps(ber);
        Ok(ScoreRecord {
            analog_snr_db,
            digital_snr_db,
            ber,
            effective_rate_bps,
        })
    }
}

fn variance(x: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq_hz: f64, amp: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq_hz * i as f64 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_effective_rate_exact() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        // 1200 baud x 3 bits x 0.25 FEC = 900 bit/s nominal payload
        assert_eq!(scorer.effective_rate_bps(0.0), 900.0);
        assert_eq!(scorer.effective_rate_bps(0.25), 675.0);
        assert_eq!(scorer.effective_rate_bps(0.5), 450.0);
        assert_eq!(scorer.effective_rate_bps(1.0), 0.0);
    }

    #[test]
    fn test_identical_signals_score_infinite_snr() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let reference = sine(1000.0, 1.0, 4800);
        let recovered = Aligned::new(reference.clone());
        assert_eq!(
            scorer.analog_snr_db(&recovered, &reference).unwrap(),
            f64::INFINITY
        );
    }

    #[test]
    fn test_known_residual_snr() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let reference = sine(1000.0, 1.0, 4800);
        // Residual power 20 dB below a unit-amplitude reference
        let noise = sine(3000.0, 0.1, 4800);
        let recovered = Aligned::new(
            reference
                .iter()
                .zip(&noise)
                .map(|(r, n)| r + n)
                .collect::<Vec<_>>(),
        );
        let snr = scorer.analog_snr_db(&recovered, &reference).unwrap();
        assert!((snr - 20.0).abs() < 0.1, "SNR {}", snr);
    }

    #[test]
    fn test_disjoint_ranges_are_undefined() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let reference = sine(1000.0, 1.0, 100);
        let mut recovered = Aligned::new(sine(1000.0, 1.0, 4800));
        recovered.restrict(200..4800);
        let err = scorer.analog_snr_db(&recovered, &reference).unwrap_err();
        assert!(matches!(err, SimError::UndefinedMetric(_)));
    }

    #[test]
    fn test_zero_reference_power_is_undefined() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let reference = vec![0.0; 4800];
        let recovered = Aligned::new(sine(1000.0, 1.0, 4800));
        let err = scorer.analog_snr_db(&recovered, &reference).unwrap_err();
        assert!(matches!(err, SimError::UndefinedMetric(_)));
    }

    #[test]
    fn test_ber_counts_rotated_centers() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let sps = cfg.samples_per_symbol();
        let n = 120 * sps;

        let reference = vec![Complex64::new(1.0, 0.0); n];
        // Rotate every second symbol period past the pi/4 threshold
        let recovered: Vec<Complex64> = (0..n)
            .map(|i| {
                if (i / sps) % 2 == 1 {
                    Complex64::from_polar(1.0, PI / 2.0)
                } else {
                    Complex64::new(1.0, 0.0)
                }
            })
            .collect();
        let recovered = Aligned::new(recovered);
        let ber = scorer.ber(&recovered, &reference).unwrap();
        assert_eq!(ber, 0.5);
    }

    #[test]
    fn test_ber_phase_wraps_across_pi() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let n = 120 * cfg.samples_per_symbol();

        // Recovered and reference straddle the branch cut; the wrapped
        // difference is 0.02 rad, well inside the threshold.
        let reference = vec![Complex64::from_polar(1.0, -(PI - 0.01)); n];
        let recovered = Aligned::new(vec![Complex64::from_polar(1.0, PI - 0.01); n]);
        let ber = scorer.ber(&recovered, &reference).unwrap();
        assert_eq!(ber, 0.0);
    }

    #[test]
    fn test_ber_no_centers_in_valid_range() {
        let cfg = SimConfig::fm_default();
        let scorer = Scorer::new(&cfg);
        let n = 120 * cfg.samples_per_symbol();
        let reference = vec![Complex64::new(1.0, 0.0); n];
        let mut recovered = Aligned::new(vec![Complex64::new(1.0, 0.0); n]);
        recovered.restrict(0..0);
        let err = scorer.ber(&recovered, &reference).unwrap_err();
        assert!(matches!(err, SimError::UndefinedMetric(_)));
    }

    #[test]
    fn test_score_record_display() {
        let record = ScoreRecord {
            analog_snr_db: 43.21,
            digital_snr_db: 21.0,
            ber: 0.0,
            effective_rate_bps: 900.0,
        };
        let line = record.to_string();
        assert!(line.contains("43.2 dB"));
        assert!(line.contains("900.0 bit/s"));
    }
}
