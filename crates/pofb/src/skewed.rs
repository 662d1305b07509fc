// standard library
use std::f64::consts::PI;

// internal modules
use crate::distribution::{PofB, GAMMA_BAR};
use crate::error::Result;

impl PofB {
    /// Analytic skewed Gaussian distribution
    ///
    /// Two half Gaussians meet at the peak frequency `nu0` (MHz), with
    /// relaxation rates `s_minus` below and `s_plus` above the peak (1/us).
    /// The upper tail is cut ten widths above the peak.
    ///
    /// ```rust
    /// # use musrtools_pofb::PofB;
    /// let pofb = PofB::skewed_gaussian(0.01, 0.5, 13.55342, 0.5, 1.5)?;
    ///
    /// // mean pulled above the 1000 G peak by the wider upper half
    /// assert!(pofb.first_moment() > 1000.0);
    /// assert!(pofb.skewness_alpha() > 0.0);
    /// # Ok::<(), musrtools_pofb::Error>(())
    /// ```
    pub fn skewed_gaussian(dt: f64, db: f64, nu0: f64, s_minus: f64, s_plus: f64) -> Result<Self> {
        let mut pofb = Self::new(dt, db)?;
        let last = pofb.len() - 1;

        let b0 = nu0 / GAMMA_BAR;
        let b_max = b0 + 10.0 * s_plus.abs() / (2.0 * PI * GAMMA_BAR);

        let below = (b_max / db).floor();
        let above = (b_max / db).ceil();
        let max_index = if below < above { above } else { above + 1.0 };
        let max_index = (max_index.max(0.0) as usize).min(last);
        let peak_index = ((nu0 / (GAMMA_BAR * db)).ceil().max(0.0) as usize).min(last + 1);

        let expo_minus = s_minus * s_minus / (2.0 * PI * PI * GAMMA_BAR * GAMMA_BAR);
        let expo_plus = s_plus * s_plus / (2.0 * PI * PI * GAMMA_BAR * GAMMA_BAR);

        for (i, (b, p)) in pofb.b.iter().zip(pofb.pb.iter_mut()).enumerate().take(max_index + 1) {
            let expo = if i < peak_index { expo_minus } else { expo_plus };
            *p = (-(b - b0).powi(2) / expo).exp();
        }

        pofb.normalize_range(0, max_index)?;
        pofb.b_min = 0.0;
        pofb.b_max = pofb.b[max_index];
        Ok(pofb)
    }
}
