//! Binning of vortex lattice field grids

// internal modules
use crate::distribution::{Background, PofB};
use crate::error::Result;

// external crates
use musrtools_vortex::{FieldGrid, VortexFieldCalc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Per grid point weight applied while binning a triangular lattice
///
/// Gaussian and Lorentzian weights depend on the distances to the six
/// closest vortex cores and emulate a core contribution to the muon
/// signal. The antiferromagnetic variant shifts the field near the cores
/// instead.
///
/// ```rust
/// # use musrtools_pofb::Weighting;
/// let weighting: Weighting = serde_json::from_str(r#"{"kind": "gaussian", "sigma": 2.5}"#)?;
/// assert_eq!(weighting, Weighting::Gaussian { sigma: 2.5 });
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Uniform,
    /// sum of exp(-sigma^2 r^2 / 2)
    Gaussian { sigma: f64 },
    /// sum of 1 / (1 + sigma^2 r^2)
    Lorentzian { sigma: f64 },
    /// Field `field * sum exp(-r^2 / xi^2)` added to every sample
    AntiferromagneticCores { field: f64, xi: f64 },
}

impl Weighting {
    /// Whether the weighting changes anything at all
    fn is_active(&self) -> bool {
        match self {
            Self::Uniform => false,
            Self::Gaussian { sigma } | Self::Lorentzian { sigma } => *sigma != 0.0,
            Self::AntiferromagneticCores { field, .. } => *field != 0.0,
        }
    }

    /// Field and weight of the sample at column `i`, row `j`
    fn sample(&self, field: f64, i: usize, j: usize, steps: usize) -> (f64, f64) {
        match *self {
            Self::Uniform => (field, 1.0),
            Self::Gaussian { sigma } => {
                let s = 0.5 * sigma * sigma;
                let weight = core_distances(i, j, steps)
                    .iter()
                    .map(|r| (-s * r).exp())
                    .sum();
                (field, weight)
            }
            Self::Lorentzian { sigma } => {
                let s = sigma * sigma;
                let weight = core_distances(i, j, steps)
                    .iter()
                    .map(|r| 1.0 / (1.0 + s * r))
                    .sum();
                (field, weight)
            }
            Self::AntiferromagneticCores { field: core, xi } => {
                let xi_sq = xi * xi;
                let shift: f64 = core_distances(i, j, steps)
                    .iter()
                    .map(|r| (-r / xi_sq).exp())
                    .sum();
                (field + core * shift, 1.0)
            }
        }
    }
}

/// Squared distances to the six closest cores of a triangular lattice
///
/// Grid point (`i`, `j`) lies in the first quadrant of the unit cell, with
/// distances in units of the lattice constant.
pub(crate) fn core_distances(i: usize, j: usize, steps: usize) -> [f64; 6] {
    let (i, j) = (i as f64, j as f64);
    let n = steps as f64;
    let h = 0.5 * n;
    let n_sq = n * n;

    [
        3.0 * i * i + j * j,
        3.0 * (h - i).powi(2) + (h - j).powi(2),
        3.0 * (n - i).powi(2) + j * j,
        3.0 * (h - i).powi(2) + (h + j).powi(2),
        3.0 * i * i + (n - j).powi(2),
        3.0 * (h + i).powi(2) + (h - j).powi(2),
    ]
    .map(|r| r / n_sq)
}

impl PofB {
    /// Histogram the first quadrant of a bulk field grid
    ///
    /// Every field falls into bin `ceil(|B| / dB)` and samples beyond the
    /// last bin are dropped. Weightings other than [Weighting::Uniform]
    /// only apply to triangular lattices.
    pub fn from_grid(
        dt: f64,
        db: f64,
        grid: &FieldGrid,
        triangular: bool,
        weighting: &Weighting,
    ) -> Result<Self> {
        let mut pofb = Self::new(dt, db)?;

        let weighting = if !weighting.is_active() {
            Weighting::Uniform
        } else if !triangular {
            log::warn!("PofB::from_grid(): {weighting:?} needs a triangular lattice, using uniform weights");
            Weighting::Uniform
        } else {
            *weighting
        };

        let (histogram, dropped) = bin_quadrant(grid, db, pofb.len(), &weighting);
        if dropped > 0 {
            match weighting {
                Weighting::AntiferromagneticCores { .. } => log::warn!(
                    "PofB::from_grid(): {dropped} shifted fields are beyond the last bin ({} G)",
                    pofb.b[pofb.len() - 1]
                ),
                _ => log::debug!("PofB::from_grid(): dropped {dropped} fields beyond the last bin"),
            }
        }

        pofb.pb = histogram;
        pofb.b_min = grid.b_min();
        pofb.b_max = grid.b_max();
        pofb.normalize();
        Ok(pofb)
    }

    /// Solve `solver` if needed and histogram its field grid
    ///
    /// The optional background is blended in after normalisation.
    ///
    /// ```rust
    /// # use musrtools_pofb::{PofB, Weighting};
    /// # use musrtools_vortex::{VortexLattice, VortexParameters};
    /// let params = VortexParameters::new(1000.0, 200.0, 20.0, 64);
    /// let mut solver = VortexLattice::BulkTriangular.bulk_solver(params)?;
    ///
    /// let pofb = PofB::from_lattice(0.01, 0.5, solver.as_mut(), &Weighting::Uniform, None)?;
    /// assert!(pofb.b_min() < 1000.0 && 1000.0 < pofb.b_max());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_lattice<S>(
        dt: f64,
        db: f64,
        solver: &mut S,
        weighting: &Weighting,
        background: Option<&Background>,
    ) -> Result<Self>
    where
        S: VortexFieldCalc<Grid = FieldGrid> + ?Sized,
    {
        let triangular = solver.is_triangular();
        let mut pofb = Self::from_grid(dt, db, solver.grid(), triangular, weighting)?;
        if let Some(background) = background {
            pofb.add_background(background);
        }
        Ok(pofb)
    }
}

/// Thread local partial histograms over the rows, merged at the end
fn bin_quadrant(grid: &FieldGrid, db: f64, size: usize, weighting: &Weighting) -> (Vec<f64>, usize) {
    let steps = grid.steps();
    let half = steps / 2;
    let values = grid.values();

    (0..half)
        .into_par_iter()
        .fold(
            || (vec![0.0; size], 0_usize),
            |(mut histogram, mut dropped), j| {
                for i in 0..half {
                    let (field, weight) = weighting.sample(values[i + steps * j], i, j, steps);
                    let index = (field / db).abs().ceil() as usize;
                    match histogram.get_mut(index) {
                        Some(bin) => *bin += weight,
                        None => dropped += 1,
                    }
                }
                (histogram, dropped)
            },
        )
        .reduce(
            || (vec![0.0; size], 0),
            |(mut total, dropped_a), (partial, dropped_b)| {
                total
                    .iter_mut()
                    .zip(partial)
                    .for_each(|(t, p)| *t += p);
                (total, dropped_a + dropped_b)
            },
        )
}
