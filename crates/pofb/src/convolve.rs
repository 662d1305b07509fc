// standard library
use std::f64::consts::PI;

// internal modules
use crate::distribution::{PofB, GAMMA_BAR};

// external crates
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;

impl PofB {
    /// Broaden the distribution by a Gaussian of width `width` (G)
    ///
    /// The convolution is a damping of the Fourier transform of P(B) on the
    /// conjugate time axis with spacing `1 / (gamma_bar (N - 1) dB)`, so the
    /// field range wraps around at its ends. A zero width leaves the
    /// distribution untouched.
    ///
    /// ```rust
    /// # use musrtools_pofb::PofB;
    /// let mut pofb = PofB::new(0.01, 1.0)?;
    /// let mut pb = vec![0.0; pofb.len()];
    /// pb[1000] = 1.0;
    /// pofb.set_pb(pb)?;
    ///
    /// pofb.convolve_gss(3.0);
    /// assert!(pofb.pb()[1000] < 1.0);
    /// assert!((pofb.pb().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    /// # Ok::<(), musrtools_pofb::Error>(())
    /// ```
    pub fn convolve_gss(&mut self, width: f64) {
        if width == 0.0 {
            return;
        }

        let n = self.pb.len();
        let t = 1.0 / (GAMMA_BAR * (n - 1) as f64 * self.db);
        let expo = -2.0 * PI * PI * GAMMA_BAR * GAMMA_BAR * width * width * t * t;

        let mut buffer = self
            .pb
            .iter()
            .map(|p| Complex::new(*p, 0.0))
            .collect::<Vec<_>>();

        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(n).process(&mut buffer);

        buffer.par_iter_mut().enumerate().for_each(|(i, c)| {
            let f = i.min(n - i) as f64;
            *c *= (expo * f * f).exp();
        });

        planner.plan_fft_inverse(n).process(&mut buffer);

        let scale = n as f64;
        self.pb
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(p, c)| *p = c.re / scale);

        log::debug!("PofB::convolve_gss(): broadened {n} bins by {width} G");
        self.normalize();
    }
}
