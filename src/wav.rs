//! IQ export
//!
//! Persists a complex baseband buffer as a standard two-channel 16-bit PCM
//! WAV, in-phase left, quadrature right. Samples are peak-normalized across
//! both channels so the file always uses the full fixed-point range.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rustfft::num_complex::Complex64;

use crate::error::{Result, SimError};

pub fn write_iq_wav(path: &Path, iq: &[Complex64], sample_rate: f64) -> Result<()> {
    let peak = iq
        .iter()
        .fold(0.0_f64, |m, z| m.max(z.re.abs()).max(z.im.abs()));
    if peak < 1e-12 {
        return Err(SimError::DegenerateSignal(
            "cannot export: IQ buffer peak is zero".into(),
        ));
    }

    let spec = WavSpec {
        channels: 2,
        sample_rate: sample_rate.round() as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    let scale = i16::MAX as f64 / peak;
    for z in iq {
        writer.write_sample((z.re * scale).round() as i16)?;
        writer.write_sample((z.im * scale).round() as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a two-channel IQ WAV back into unit-range complex samples.
pub fn read_iq_wav(path: &Path) -> Result<Vec<Complex64>> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 2 {
        return Err(SimError::Io(format!(
            "expected 2 channels, found {}",
            spec.channels
        )));
    }
    let raw: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<_, _>>()?;
    Ok(raw
        .chunks_exact(2)
        .map(|p| {
            Complex64::new(
                p[0] as f64 / i16::MAX as f64,
                p[1] as f64 / i16::MAX as f64,
            )
        })
        .collect())
}
