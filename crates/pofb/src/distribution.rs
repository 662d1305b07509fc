// standard library
use std::f64::consts::PI;

// internal modules
use crate::error::{Error, Result};

// external crates
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Muon gyromagnetic ratio over 2 pi in MHz/G
pub const GAMMA_BAR: f64 = 0.013_553_42;

/// Gaussian background field blended into a distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Background {
    /// Centre of the background (G)
    pub field: f64,
    /// Relaxation rate of the background (1/us)
    pub width: f64,
    /// Fraction of the background in [0, 1]
    pub weight: f64,
}

/// Normalised field distribution P(B) on a uniform field grid
///
/// The field step `db` and the time resolution `dt` of a later Fourier
/// transform to the time domain fix the number of bins.
///
/// ```rust
/// # use musrtools_pofb::PofB;
/// let pofb = PofB::new(0.01, 1.0)?;
/// assert_eq!(pofb.len(), 7380);
/// assert_eq!(pofb.b()[3], 3.0);
/// # Ok::<(), musrtools_pofb::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PofB {
    pub(crate) b: Vec<f64>,
    pub(crate) pb: Vec<f64>,
    pub(crate) dt: f64,
    pub(crate) db: f64,
    pub(crate) b_min: f64,
    pub(crate) b_max: f64,
}

impl PofB {
    /// Empty distribution for time resolution `dt` (us) and field step `db` (G)
    ///
    /// The number of bins is `1 / (gamma_bar dt db)`, rounded up to an even
    /// number with at least one bin of margin.
    pub fn new(dt: f64, db: f64) -> Result<Self> {
        if !(dt > 0.0 && db > 0.0) {
            return Err(Error::InvalidResolution { dt, db });
        }

        let mut size = (1.0 / (GAMMA_BAR * dt * db)) as usize;
        size += if size % 2 == 1 { 1 } else { 2 };

        Ok(Self {
            b: (0..size).map(|i| i as f64 * db).collect(),
            pb: vec![0.0; size],
            dt,
            db,
            b_min: 0.0,
            b_max: 0.0,
        })
    }

    /// Wrap an existing distribution
    ///
    /// The field step is taken from the first two fields, and the support of
    /// `pb` gives the field extrema.
    pub fn from_parts(b: Vec<f64>, pb: Vec<f64>, dt: f64) -> Result<Self> {
        if b.len() != pb.len() {
            return Err(Error::LengthMismatch {
                b: b.len(),
                pb: pb.len(),
            });
        }
        if b.len() < 2 {
            return Err(Error::TooFewBins(b.len()));
        }

        let first = pb.iter().position(|p| *p != 0.0);
        let (b_min, b_max) = match first {
            Some(start) => {
                let end = pb[start..]
                    .iter()
                    .position(|p| *p == 0.0)
                    .map(|offset| start + offset - 1)
                    .unwrap_or(pb.len() - 1);
                (b[start], b[end])
            }
            None => (0.0, 0.0),
        };

        Ok(Self {
            db: b[1] - b[0],
            b,
            pb,
            dt,
            b_min,
            b_max,
        })
    }

    pub fn b(&self) -> &[f64] {
        &self.b
    }

    pub fn pb(&self) -> &[f64] {
        &self.pb
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn db(&self) -> f64 {
        self.db
    }

    /// Lowest field with any weight
    pub fn b_min(&self) -> f64 {
        self.b_min
    }

    /// Highest field with any weight
    pub fn b_max(&self) -> f64 {
        self.b_max
    }

    pub fn len(&self) -> usize {
        self.pb.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pb.is_empty()
    }

    /// Drop all weights, keeping the field grid
    pub fn clear(&mut self) {
        self.pb.par_iter_mut().for_each(|p| *p = 0.0);
    }

    /// Replace the weights with values on the same field grid
    pub fn set_pb(&mut self, pb: Vec<f64>) -> Result<()> {
        if pb.len() != self.b.len() {
            return Err(Error::LengthMismatch {
                b: self.b.len(),
                pb: pb.len(),
            });
        }
        self.pb = pb;
        Ok(())
    }

    /// Scale the whole distribution so that sum(P(B) dB) = 1
    pub fn normalize(&mut self) {
        let max = self.pb.len().saturating_sub(1);
        // the full range is always in bounds
        let _ = self.normalize_range(0, max);
    }

    /// Scale bins `min..=max` so that their sum(P(B) dB) = 1
    ///
    /// Bins outside of the range are left untouched.
    pub fn normalize_range(&mut self, min: usize, max: usize) -> Result<()> {
        if min > max || max >= self.pb.len() {
            return Err(Error::RangeOutOfBounds {
                min,
                max,
                len: self.pb.len(),
            });
        }

        let range = &mut self.pb[min..=max];
        let sum = range.par_iter().sum::<f64>() * self.db;
        if sum == 0.0 || !sum.is_finite() {
            log::warn!("PofB::normalize_range(): sum of {sum} over bins {min}..={max}, leaving P(B) unscaled");
            return Ok(());
        }

        range.par_iter_mut().for_each(|p| *p /= sum);
        Ok(())
    }

    /// Blend in a normalised Gaussian background
    ///
    /// The background width is a relaxation rate and enters as a field
    /// width of `width / (2 pi gamma_bar)`. Nothing happens for a zero
    /// width, a weight outside of [0, 1] or a negative field.
    ///
    /// ```rust
    /// # use musrtools_pofb::{Background, PofB};
    /// let mut pofb = PofB::from_parts(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0, 0.0, 0.0], 0.01)?;
    /// let before = pofb.clone();
    ///
    /// pofb.add_background(&Background { field: 2.0, width: 0.0, weight: 0.5 });
    /// assert_eq!(pofb, before);
    /// # Ok::<(), musrtools_pofb::Error>(())
    /// ```
    pub fn add_background(&mut self, background: &Background) {
        let Background {
            field,
            width,
            weight,
        } = *background;
        if width == 0.0 || !(0.0..=1.0).contains(&weight) || field < 0.0 {
            log::debug!("PofB::add_background(): skipped for {background:?}");
            return;
        }

        let sigma_sq = width * width / (GAMMA_BAR * GAMMA_BAR * 4.0 * PI * PI);
        let mut bg = self
            .b
            .par_iter()
            .map(|b| (-(b - field).powi(2) / (2.0 * sigma_sq)).exp())
            .collect::<Vec<_>>();

        let sum = bg.par_iter().sum::<f64>() * self.db;
        if sum == 0.0 {
            log::warn!("PofB::add_background(): background at {field} G is outside of the field range");
            return;
        }
        bg.par_iter_mut().for_each(|v| *v /= sum);

        self.pb
            .par_iter_mut()
            .zip(bg.par_iter())
            .for_each(|(p, g)| *p = (1.0 - weight) * *p + weight * g);
    }

    /// Mean field, sum(B P(B) dB)
    pub fn first_moment(&self) -> f64 {
        self.b
            .par_iter()
            .zip(self.pb.par_iter())
            .map(|(b, p)| b * p)
            .sum::<f64>()
            * self.db
    }

    /// n-th moment about the mean field
    pub fn central_moment(&self, n: i32) -> f64 {
        let mean = self.first_moment();
        self.b
            .par_iter()
            .zip(self.pb.par_iter())
            .map(|(b, p)| (b - mean).powi(n) * p)
            .sum::<f64>()
            * self.db
    }

    /// Skewness parameter alpha = M3^(1/3) / M2^(1/2)
    pub fn skewness_alpha(&self) -> f64 {
        let m2 = self.central_moment(2);
        let m3 = self.central_moment(3);
        m3.cbrt() / m2.sqrt()
    }
}
