//! Rotating reference frame transform

// standard library
use std::f64::consts::TAU;

// internal modules
use crate::config::{RrfSettings, RrfUnit};
use crate::constants::{GAMMA_BAR_MUON, RRF_FILTER_ATTENUATION, RRF_FILTER_TRANSITION};
use crate::kaiser::KaiserLowPass;
use crate::pack::{block_average, pack_rrf};

// external crates
use log::debug;

impl RrfUnit {
    /// Angular frequency (rad/us) of a frequency given in this unit
    ///
    /// ```rust
    /// # use musrtools_asymmetry::RrfUnit;
    /// assert_eq!(RrfUnit::Mc.angular_frequency(2.5), 2.5);
    /// assert!((RrfUnit::MHz.angular_frequency(1.0) - std::f64::consts::TAU).abs() < 1e-15);
    /// ```
    pub fn angular_frequency(&self, value: f64) -> f64 {
        match self {
            Self::KHz => TAU * value / 1.0e3,
            Self::MHz => TAU * value,
            Self::Mc => value,
            Self::G => TAU * GAMMA_BAR_MUON * value,
            Self::T => TAU * GAMMA_BAR_MUON * 1.0e4 * value,
            Self::MilliTesla => TAU * GAMMA_BAR_MUON * 10.0 * value,
        }
    }
}

/// Carrier and packing of a rotating reference frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfTransformer {
    /// Angular frequency (rad/us)
    pub omega: f64,
    /// Phase (rad)
    pub phase: f64,
    /// Packing applied after the carrier
    pub packing: usize,
}

impl RrfTransformer {
    /// Transformer from the global rrf settings, `None` without a packing
    pub fn from_settings(settings: &RrfSettings) -> Option<Self> {
        Some(Self {
            omega: settings.unit.angular_frequency(settings.frequency),
            phase: settings.phase.to_radians(),
            packing: settings.packing.filter(|p| *p > 0)?,
        })
    }

    /// Multiply the series by `2 cos(omega (t0 + i dt) + phase)` in place
    ///
    /// ```rust
    /// # use musrtools_asymmetry::RrfTransformer;
    /// let rrf = RrfTransformer { omega: 0.0, phase: 0.0, packing: 1 };
    /// let mut values = vec![0.1, 0.2];
    /// rrf.apply(&mut values, 0.0, 0.01);
    /// assert_eq!(values, vec![0.2, 0.4]);
    /// ```
    pub fn apply(&self, values: &mut [f64], time_start: f64, time_step: f64) {
        for (i, v) in values.iter_mut().enumerate() {
            let t = time_start + i as f64 * time_step;
            *v *= 2.0 * (self.omega * t + self.phase).cos();
        }
    }

    /// Apply the carrier and pack the result
    pub fn transform(
        &self,
        values: &[f64],
        errors: &[f64],
        time_start: f64,
        time_step: f64,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut rotated = values.to_vec();
        self.apply(&mut rotated, time_start, time_step);
        pack_rrf(&rotated, errors, self.packing)
    }

    /// Low-pass filter and pack a finely sampled theory curve
    ///
    /// The cutoff sits at the Nyquist frequency of the packed data. The
    /// filtered curve is then block averaged with the packing, so the caller
    /// must move the time origin by `(packing - 1) / 2` theory steps.
    pub fn filter_theory(&self, theory: &[f64], theory_step: f64, data_step: f64) -> Vec<f64> {
        let cutoff = theory_step / (2.0 * data_step);
        let filtered = if cutoff < 0.5 {
            let filter = KaiserLowPass::design(cutoff, RRF_FILTER_ATTENUATION, RRF_FILTER_TRANSITION);
            debug!(
                "RRFTransformer::filter_theory(): {} taps, beta = {}",
                filter.len(),
                filter.beta()
            );
            filter.filter(theory)
        } else {
            theory.to_vec()
        };
        block_average(&filtered, self.packing)
    }
}

#[cfg(test)]
mod rrf_tests {
    use super::*;

    #[test]
    fn field_units_agree() {
        let g = RrfUnit::G.angular_frequency(10_000.0);
        let t = RrfUnit::T.angular_frequency(1.0);
        let mt = RrfUnit::MilliTesla.angular_frequency(1_000.0);
        assert!((g - t).abs() < 1e-9);
        assert!((g - mt).abs() < 1e-9);
        assert!((RrfUnit::KHz.angular_frequency(1_000.0) - TAU).abs() < 1e-12);
    }

    #[test]
    fn settings_need_packing() {
        let settings = RrfSettings {
            frequency: 13.0,
            unit: RrfUnit::MHz,
            phase: 90.0,
            packing: None,
        };
        assert!(RrfTransformer::from_settings(&settings).is_none());

        let settings = RrfSettings {
            packing: Some(10),
            ..settings
        };
        let rrf = RrfTransformer::from_settings(&settings).unwrap();
        assert!((rrf.phase - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
        assert_eq!(rrf.packing, 10);
    }

    #[test]
    fn demodulates_to_slow_signal() {
        // a precession at the rrf frequency becomes a constant after packing
        let omega = TAU * 5.0;
        let dt = 0.001;
        let values: Vec<f64> = (0..4000).map(|i| 0.2 * (omega * i as f64 * dt).cos()).collect();
        let rrf = RrfTransformer {
            omega,
            phase: 0.0,
            packing: 200,
        };
        let (packed, _) = rrf.transform(&values, &vec![0.01; 4000], 0.0, dt);
        for v in &packed[1..] {
            assert!((v - 0.2).abs() < 1e-3);
        }
    }

    #[test]
    fn filtered_theory_length() {
        let rrf = RrfTransformer {
            omega: 1.0,
            phase: 0.0,
            packing: 4,
        };
        let theory = vec![0.1; 800];
        let filtered = rrf.filter_theory(&theory, 0.001, 0.032);
        assert_eq!(filtered.len(), 200);
        assert!(filtered[1..].iter().all(|v| (v - 0.1).abs() < 1e-9));
    }
}
