//! PSK constellations (natural mapping)
//!
//! Symbol k sits at phase k * 2*pi/M on the unit circle. Decisions round to
//! the nearest sector with a half-sector offset.

use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// One point-set on the unit circle
pub trait Constellation {
    fn order(&self) -> usize;

    fn bits_per_symbol(&self) -> u32 {
        (self.order() as u32).trailing_zeros()
    }

    fn phase_of(&self, sym: u8) -> f64 {
        (sym as usize % self.order()) as f64 * 2.0 * PI / self.order() as f64
    }

    fn symbol_to_iq(&self, sym: u8) -> Complex64 {
        Complex64::from_polar(1.0, self.phase_of(sym))
    }

    fn iq_to_symbol(&self, iq: Complex64) -> u8 {
        let sector = 2.0 * PI / self.order() as f64;
        let angle = iq.im.atan2(iq.re);
        let angle_pos = if angle < 0.0 { angle + 2.0 * PI } else { angle };
        // Half-sector offset rounds to the nearest point
        let sym = ((angle_pos + sector / 2.0) / sector).floor() as usize;
        (sym % self.order()) as u8
    }
}

/// 4-PSK, 2 bits per symbol
#[derive(Debug, Clone, Copy, Default)]
pub struct Qpsk;

impl Constellation for Qpsk {
    fn order(&self) -> usize {
        4
    }
}

/// 8-PSK, 3 bits per symbol
#[derive(Debug, Clone, Copy, Default)]
pub struct Psk8;

impl Constellation for Psk8 {
    fn order(&self) -> usize {
        8
    }
}

/// Configurable alphabet choice, dispatching to the unit constellations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Qpsk,
    Psk8,
}

impl Constellation for Alphabet {
    fn order(&self) -> usize {
        match self {
            Alphabet::Qpsk => Qpsk.order(),
            Alphabet::Psk8 => Psk8.order(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_all_symbols() {
        for sym in 0..4u8 {
            let iq = Qpsk.symbol_to_iq(sym);
            assert_eq!(Qpsk.iq_to_symbol(iq), sym, "QPSK symbol {}", sym);
        }
        for sym in 0..8u8 {
            let iq = Psk8.symbol_to_iq(sym);
            assert_eq!(Psk8.iq_to_symbol(iq), sym, "8-PSK symbol {}", sym);
        }
    }

    #[test]
    fn test_unit_power() {
        for sym in 0..8u8 {
            let iq = Psk8.symbol_to_iq(sym);
            assert!((iq.norm_sqr() - 1.0).abs() < 1e-12, "symbol {} power", sym);
        }
    }

    #[test]
    fn test_cardinal_phases() {
        let iq = Psk8.symbol_to_iq(0);
        assert!((iq.re - 1.0).abs() < 1e-12);
        assert!(iq.im.abs() < 1e-12);

        // Symbol 2 of 8-PSK is at 90 degrees
        let iq = Psk8.symbol_to_iq(2);
        assert!(iq.re.abs() < 1e-12);
        assert!((iq.im - 1.0).abs() < 1e-12);

        // Symbol 2 of QPSK is at 180 degrees
        let iq = Qpsk.symbol_to_iq(2);
        assert!((iq.re + 1.0).abs() < 1e-12);
        assert!(iq.im.abs() < 1e-12);
    }

    #[test]
    fn test_decision_tolerates_phase_noise() {
        // A quarter-sector of phase error must not flip the decision
        for sym in 0..8u8 {
            let nudged = Complex64::from_polar(1.0, Psk8.phase_of(sym) + PI / 16.0);
            assert_eq!(Psk8.iq_to_symbol(nudged), sym);
        }
    }

    #[test]
    fn test_alphabet_dispatch() {
        assert_eq!(Alphabet::Qpsk.order(), 4);
        assert_eq!(Alphabet::Qpsk.bits_per_symbol(), 2);
        assert_eq!(Alphabet::Psk8.order(), 8);
        assert_eq!(Alphabet::Psk8.bits_per_symbol(), 3);
    }
}
