//! Simulation configuration
//!
//! One plain struct drives a whole run. Every impairment is optional and
//! disabled impairments are exact identities, so a "clean channel" run is a
//! config with `Impairments::clean()`. Validation is eager and names the
//! offending field.

use std::f64::consts::FRAC_PI_4;

use crate::constellation::{Alphabet, Constellation};
use crate::error::{Result, SimError};
use crate::timebase::TimeBase;

/// A sinusoid by frequency and amplitude
#[derive(Debug, Clone, Copy)]
pub struct Tone {
    pub freq_hz: f64,
    pub amplitude: f64,
}

/// Narrowband interferer with a fixed phase offset
#[derive(Debug, Clone, Copy)]
pub struct InterferenceTone {
    pub freq_hz: f64,
    pub amplitude: f64,
    pub phase_rad: f64,
}

/// One deterministic multipath echo
#[derive(Debug, Clone, Copy)]
pub struct Echo {
    pub delay_samples: usize,
    pub attenuation: f64,
}

/// Receiver front-end stage: linear gain plus noise-figure noise
#[derive(Debug, Clone, Copy)]
pub struct FrontEnd {
    pub gain_db: f64,
    pub noise_figure_db: f64,
    /// Reference noise power the noise figure multiplies
    pub noise_floor: f64,
}

/// Channel impairments, all independently optional
#[derive(Debug, Clone, Default)]
pub struct Impairments {
    /// Thermal AWGN power
    pub awgn_power: Option<f64>,
    /// Narrowband interference tone
    pub interference: Option<InterferenceTone>,
    /// Wideband Gaussian interference power
    pub wideband_power: Option<f64>,
    /// Mains hum harmonics
    pub hum: Vec<Tone>,
    /// Multipath echoes
    pub multipath: Vec<Echo>,
    /// Front-end gain and noise figure
    pub front_end: Option<FrontEnd>,
}

impl Impairments {
    /// Identity channel
    pub fn clean() -> Self {
        Self::default()
    }
}

/// How the analog and digital signals couple onto the composite
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coupling {
    /// Envelope modulation: 1 + ia*analog + id*digital on a cosine carrier
    Amplitude { analog_index: f64, digital_index: f64 },
    /// Phase modulation: integrated analog and digital terms, each scaled by
    /// a deviation in Hz
    Frequency {
        analog_dev_hz: f64,
        digital_dev_hz: f64,
    },
}

/// Full configuration for one simulation run
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub sample_rate: f64,
    pub duration_secs: f64,
    pub seed: u64,
    /// Intermediate carrier of the real composite waveform
    pub carrier_hz: f64,
    /// Scored analog program material
    pub analog_tones: Vec<Tone>,
    /// Ultrasonic noise-reference tone (frequency coupling only)
    pub pilot: Option<Tone>,
    pub coupling: Coupling,
    pub subcarrier_hz: f64,
    pub alphabet: Alphabet,
    pub symbol_rate: f64,
    /// Accounting-only FEC code rate in (0, 1]
    pub fec_rate: f64,
    /// LMS step size for the adaptive canceller
    pub lms_mu: f64,
    /// Phase distance beyond which a symbol counts as errored
    pub decision_threshold_rad: f64,
    pub impairments: Impairments,
}

impl SimConfig {
    /// Frequency-coupled default: 1 kHz program tone, 8-PSK subcarrier at
    /// 67 kHz (folds to 19 kHz), 25 kHz pilot.
    pub fn fm_default() -> Self {
        Self {
            sample_rate: 48000.0,
            duration_secs: 0.1,
            seed: 7,
            carrier_hz: 12000.0,
            analog_tones: vec![Tone {
                freq_hz: 1000.0,
                amplitude: 1.0,
            }],
            pilot: Some(Tone {
                freq_hz: 25000.0,
                amplitude: 0.3,
            }),
            coupling: Coupling::Frequency {
                analog_dev_hz: 5000.0,
                digital_dev_hz: 2500.0,
            },
            subcarrier_hz: 67000.0,
            alphabet: Alphabet::Psk8,
            symbol_rate: 1200.0,
            fec_rate: 0.25,
            lms_mu: 0.01,
            decision_threshold_rad: FRAC_PI_4,
            impairments: Impairments::clean(),
        }
    }

    /// Amplitude-coupled default: QPSK subcarrier at 7 kHz under a 12 kHz
    /// carrier.
    pub fn am_default() -> Self {
        Self {
            sample_rate: 48000.0,
            duration_secs: 0.1,
            seed: 11,
            carrier_hz: 12000.0,
            analog_tones: vec![Tone {
                freq_hz: 1000.0,
                amplitude: 1.0,
            }],
            pilot: None,
            coupling: Coupling::Amplitude {
                analog_index: 0.5,
                digital_index: 0.3,
            },
            subcarrier_hz: 7000.0,
            alphabet: Alphabet::Qpsk,
            symbol_rate: 1200.0,
            fec_rate: 1.0 / 3.0,
            lms_mu: 0.01,
            decision_threshold_rad: FRAC_PI_4,
            impairments: Impairments::clean(),
        }
    }

    pub fn timebase(&self) -> Result<TimeBase> {
        TimeBase::new(self.sample_rate, self.duration_secs)
    }

    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate / self.symbol_rate) as usize
    }

    /// Uncoded bit rate of the digital subcarrier
    pub fn nominal_data_rate(&self) -> f64 {
        self.symbol_rate * self.alphabet.bits_per_symbol() as f64
    }

    pub fn validate(&self) -> Result<()> {
        let tb = self.timebase()?;

        require_positive("carrier_hz", self.carrier_hz)?;
        require_positive("subcarrier_hz", self.subcarrier_hz)?;
        require_positive("symbol_rate", self.symbol_rate)?;
        require_positive("lms_mu", self.lms_mu)?;

        if self.samples_per_symbol() < 1 {
            return Err(SimError::Configuration(format!(
                "symbol_rate {} exceeds sample_rate {}",
                self.symbol_rate, self.sample_rate
            )));
        }
        if tb.len() / self.samples_per_symbol() == 0 {
            return Err(SimError::Configuration(
                "duration too short for one full symbol".into(),
            ));
        }
        if !self.fec_rate.is_finite() || self.fec_rate <= 0.0 || self.fec_rate > 1.0 {
            return Err(SimError::Configuration(format!(
                "fec_rate must be in (0, 1], got {}",
                self.fec_rate
            )));
        }
        if !self.decision_threshold_rad.is_finite()
            || self.decision_threshold_rad <= 0.0
            || self.decision_threshold_rad > std::f64::consts::PI
        {
            return Err(SimError::Configuration(format!(
                "decision_threshold_rad must be in (0, pi], got {}",
                self.decision_threshold_rad
            )));
        }

        for (i, t) in self.analog_tones.iter().enumerate() {
            require_positive(&format!("analog_tones[{}].freq_hz", i), t.freq_hz)?;
            require_positive(&format!("analog_tones[{}].amplitude", i), t.amplitude)?;
        }
        if self.analog_tones.is_empty() {
            return Err(SimError::Configuration(
                "analog_tones must contain at least one tone".into(),
            ));
        }

        match self.coupling {
            Coupling::Amplitude {
                analog_index,
                digital_index,
            } => {
                require_positive("analog_index", analog_index)?;
                require_positive("digital_index", digital_index)?;
                let tone_sum: f64 = self.analog_tones.iter().map(|t| t.amplitude).sum();
                if analog_index * tone_sum + digital_index >= 1.0 {
                    return Err(SimError::Configuration(format!(
                        "overmodulation: {:.3}*{:.3} + {:.3} >= 1",
                        analog_index, tone_sum, digital_index
                    )));
                }
                if self.pilot.is_some() {
                    return Err(SimError::Configuration(
                        "pilot reference requires frequency coupling".into(),
                    ));
                }
            }
            Coupling::Frequency {
                analog_dev_hz,
                digital_dev_hz,
            } => {
                require_positive("analog_dev_hz", analog_dev_hz)?;
                require_positive("digital_dev_hz", digital_dev_hz)?;
                if let Some(p) = self.pilot {
                    require_positive("pilot.freq_hz", p.freq_hz)?;
                    require_positive("pilot.amplitude", p.amplitude)?;
                }
            }
        }

        for (i, e) in self.impairments.multipath.iter().enumerate() {
            if e.delay_samples == 0 || e.delay_samples >= tb.len() {
                return Err(SimError::Configuration(format!(
                    "multipath[{}].delay_samples {} outside [1, {})",
                    i,
                    e.delay_samples,
                    tb.len()
                )));
            }
            if !e.attenuation.is_finite() || e.attenuation < 0.0 {
                return Err(SimError::Configuration(format!(
                    "multipath[{}].attenuation must be finite and >= 0",
                    i
                )));
            }
        }
        if let Some(p) = self.impairments.awgn_power {
            require_non_negative("awgn_power", p)?;
        }
        if let Some(p) = self.impairments.wideband_power {
            require_non_negative("wideband_power", p)?;
        }
        if let Some(t) = self.impairments.interference {
            require_positive("interference.freq_hz", t.freq_hz)?;
            require_non_negative("interference.amplitude", t.amplitude)?;
        }
        for (i, h) in self.impairments.hum.iter().enumerate() {
            require_positive(&format!("hum[{}].freq_hz", i), h.freq_hz)?;
            require_non_negative(&format!("hum[{}].amplitude", i), h.amplitude)?;
        }
        if let Some(fe) = self.impairments.front_end {
            if !fe.gain_db.is_finite() || !fe.noise_figure_db.is_finite() {
                return Err(SimError::Configuration(
                    "front_end gain and noise figure must be finite".into(),
                ));
            }
            require_non_negative("front_end.noise_floor", fe.noise_floor)?;
        }

        Ok(())
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::Configuration(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::Configuration(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}
