//! Kaiser windowed-sinc low-pass FIR filter

// external crates
use rayon::prelude::*;

/// Low-pass FIR filter designed with a Kaiser window
///
/// Frequencies are normalised to the sample rate, so the Nyquist frequency
/// is 0.5. The coefficients are normalised to unit gain at zero frequency.
///
/// ```rust
/// # use musrtools_asymmetry::KaiserLowPass;
/// let filter = KaiserLowPass::design(0.05, 60.0, 0.2);
/// assert_eq!(filter.len() % 2, 1);
///
/// // a constant passes unchanged
/// let filtered = filter.filter(&vec![0.3; 500]);
/// assert!(filtered.iter().all(|v| (v - 0.3).abs() < 1e-9));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct KaiserLowPass {
    coefficients: Vec<f64>,
    beta: f64,
}

impl KaiserLowPass {
    /// Design a filter with the cutoff, stopband attenuation (dB) and
    /// transition width relative to the cutoff
    pub fn design(cutoff: f64, attenuation: f64, transition_ratio: f64) -> Self {
        let beta = Self::kaiser_beta(attenuation);
        let n = Self::kaiser_length(attenuation, cutoff * transition_ratio);
        let centre = (n - 1) as f64 / 2.0;
        let i0_beta = bessel_i0(beta);

        let mut coefficients: Vec<f64> = (0..n)
            .map(|i| {
                let x = i as f64 - centre;
                let ratio = if n > 1 { 2.0 * i as f64 / (n - 1) as f64 - 1.0 } else { 0.0 };
                let window = bessel_i0(beta * (1.0 - ratio * ratio).max(0.0).sqrt()) / i0_beta;
                2.0 * cutoff * sinc(2.0 * cutoff * x) * window
            })
            .collect();

        let sum: f64 = coefficients.iter().sum();
        if sum != 0.0 {
            coefficients.iter_mut().for_each(|c| *c /= sum);
        }

        Self { coefficients, beta }
    }

    /// Kaiser's empirical shape parameter for a stopband attenuation (dB)
    ///
    /// ```rust
    /// # use musrtools_asymmetry::KaiserLowPass;
    /// assert!((KaiserLowPass::kaiser_beta(60.0) - 5.653_26).abs() < 1e-5);
    /// assert_eq!(KaiserLowPass::kaiser_beta(20.0), 0.0);
    /// ```
    pub fn kaiser_beta(attenuation: f64) -> f64 {
        if attenuation > 50.0 {
            0.1102 * (attenuation - 8.7)
        } else if attenuation > 21.0 {
            0.5842 * (attenuation - 21.0).powf(0.4) + 0.07886 * (attenuation - 21.0)
        } else {
            0.0
        }
    }

    /// Odd filter length for an attenuation (dB) and normalised transition
    /// width
    ///
    /// ```rust
    /// # use musrtools_asymmetry::KaiserLowPass;
    /// assert_eq!(KaiserLowPass::kaiser_length(60.0, 0.01), 365);
    /// ```
    pub fn kaiser_length(attenuation: f64, transition: f64) -> usize {
        let width = 2.0 * std::f64::consts::PI * transition;
        let n = ((attenuation - 8.0) / (2.285 * width)).ceil().max(0.0) as usize + 1;
        if n % 2 == 0 {
            n + 1
        } else {
            n
        }
    }

    /// Filter coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Shape parameter the window was built with
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of taps
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// True if the filter has no taps
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Convolve the signal with the filter
    ///
    /// The output is compensated for the group delay so that sample `m` of the
    /// output lines up with sample `m` of the input. Near the edges only the
    /// overlapping taps are used and renormalised.
    pub fn filter(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len() as i64;
        let m = self.coefficients.len() as i64;
        let half = (m - 1) / 2;

        (0..n)
            .into_par_iter()
            .map(|k| {
                // signal index k + half - j must be in 0..n
                let j_min = (k + half - n + 1).max(0);
                let j_max = (k + half).min(m - 1);
                let mut acc = 0.0;
                let mut weight = 0.0;
                for j in j_min..=j_max {
                    let h = self.coefficients[j as usize];
                    acc += h * signal[(k + half - j) as usize];
                    weight += h;
                }
                if weight.abs() > 1.0e-12 {
                    acc / weight
                } else {
                    acc
                }
            })
            .collect()
    }
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

/// Modified Bessel function of the first kind, order zero
pub(crate) fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..500 {
        term *= half / k as f64;
        let t2 = term * term;
        sum += t2;
        if t2 < sum * 1.0e-16 {
            break;
        }
    }
    sum
}
