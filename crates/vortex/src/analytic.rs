//! Closed form London type vortex lattices
//!
//! The field of every model is a Fourier series over the reciprocal lattice
//! with a known coefficient per wave vector, so a single inverse FFT gives
//! the whole grid.

// standard library
use std::f64::consts::{PI, SQRT_2};

// internal modules
use crate::bessel::bessel_k1;
use crate::error::{Error, Result};
use crate::fft::{signed_index, FftPlans};
use crate::grid::FieldGrid;
use crate::lattice::{VortexFieldCalc, VortexLattice};
use crate::params::{even_steps, VortexParameters};

// external crates
use num_complex::Complex64;
use rayon::prelude::*;

/// Coefficients below this are dropped from direct lattice sums
const COEFFICIENT_CUTOFF: f64 = 1e-16;

/// Fourier coefficients as a function of the reduced |G|^2
#[derive(Debug, Clone, Copy)]
enum Coefficients {
    London { xisq: f64, lambdasq: f64 },
    AnalyticGl { f_inf: f64, xiv_lambda: f64, lambdasq: f64, norm: f64 },
}

impl Coefficients {
    fn new(lattice: VortexLattice, params: &VortexParameters) -> Result<Self> {
        let a = params.lattice_constant(lattice);
        let (xi, lambda) = (params.xi, params.lambda);
        let b = params.field / params.upper_critical_field();

        // reduced |G|^2 is in units of (2 pi / sqrt(3) a)^2 for triangular
        // lattices and (2 pi / a)^2 for square ones
        let xisq = 2.0 / 3.0 * (xi * PI / a).powi(2);
        let lambdasq = 4.0 / 3.0 * (lambda * PI / a).powi(2);

        match lattice {
            VortexLattice::BulkTriangular => Ok(Self::London { xisq, lambdasq }),
            VortexLattice::BulkSquare => Ok(Self::London {
                xisq: 2.0 * (xi * PI / a).powi(2),
                lambdasq: 4.0 * (lambda * PI / a).powi(2),
            }),
            VortexLattice::BulkModifiedLondon => Ok(Self::London {
                xisq: xisq / (1.0 - b),
                lambdasq: lambdasq / (1.0 - b),
            }),
            VortexLattice::BulkAnalyticGl => {
                let b4 = b.powi(4);
                let f_inf = 1.0 - b4;
                let xiv = xi
                    * (SQRT_2 - 0.75 * xi / lambda)
                    * ((1.0 + b4) * (1.0 - 2.0 * b * (1.0 - b).powi(2))).sqrt();
                let xiv_lambda = xiv / lambda;
                Ok(Self::AnalyticGl {
                    f_inf,
                    xiv_lambda,
                    lambdasq,
                    norm: bessel_k1(xiv_lambda * f_inf),
                })
            }
            _ => Err(Error::NotAnalytic(lattice)),
        }
    }

    /// Lower bound of the dropped |G|^2 in direct sums
    fn g_sq_cutoff(&self) -> f64 {
        match self {
            Self::London { xisq, .. } => -COEFFICIENT_CUTOFF.ln() / xisq,
            Self::AnalyticGl {
                xiv_lambda,
                lambdasq,
                ..
            } => {
                // K1(x) decays like exp(-x)
                let s = -COEFFICIENT_CUTOFF.ln() / xiv_lambda;
                s * s / lambdasq
            }
        }
    }

    fn at(&self, g_sq: f64) -> f64 {
        match *self {
            Self::London { xisq, lambdasq } => (-xisq * g_sq).exp() / (1.0 + lambdasq * g_sq),
            Self::AnalyticGl {
                f_inf,
                xiv_lambda,
                lambdasq,
                norm,
            } => {
                if g_sq == 0.0 {
                    return 1.0;
                }
                let s = (f_inf * f_inf + lambdasq * g_sq).sqrt();
                f_inf * bessel_k1(xiv_lambda * s) / (s * norm)
            }
        }
    }
}

/// Reduced |G|^2 of a grid entry, `None` off the reciprocal lattice
fn reduced_g_sq(row: usize, col: usize, steps: usize, triangular: bool) -> Option<f64> {
    let (kk, ll) = (signed_index(col, steps), signed_index(row, steps));
    if !triangular {
        Some(kk * kk + ll * ll)
    } else if (row + col) % 2 == 0 {
        Some(kk * kk + 3.0 * ll * ll)
    } else {
        None
    }
}

/// London, modified London and analytical Ginzburg-Landau lattices
///
/// Odd step counts are rounded up to the next even number.
#[derive(Debug)]
pub struct AnalyticFieldCalc {
    lattice: VortexLattice,
    params: VortexParameters,
    plans: FftPlans,
    grid: Option<FieldGrid>,
}

impl AnalyticFieldCalc {
    pub fn new(lattice: VortexLattice, params: VortexParameters) -> Result<Self> {
        let params = Self::prepare(lattice, &params)?;
        Ok(Self {
            lattice,
            plans: FftPlans::new(params.steps),
            params,
            grid: None,
        })
    }

    fn prepare(lattice: VortexLattice, params: &VortexParameters) -> Result<VortexParameters> {
        let mut params = params.validated()?;
        params.steps = even_steps(params.steps);
        // rejects lattices without a closed form
        Coefficients::new(lattice, &params)?;
        Ok(params)
    }

    fn solve(lattice: VortexLattice, params: &VortexParameters, plans: &mut FftPlans) -> FieldGrid {
        let steps = params.steps;
        if params.is_degenerate() {
            log::debug!("AnalyticFieldCalc::solve(): no vortex lattice, uniform field");
            return FieldGrid::uniform(steps, params.field);
        }

        let coefficients = match Coefficients::new(lattice, params) {
            Ok(c) => c,
            Err(_) => return FieldGrid::uniform(steps, params.field),
        };
        let triangular = lattice.is_triangular();

        let mut fourier = (0..steps * steps)
            .into_par_iter()
            .map(|idx| {
                reduced_g_sq(idx / steps, idx % steps, steps, triangular)
                    .map(|g_sq| Complex64::new(coefficients.at(g_sq), 0.0))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();

        plans.inverse(&mut fourier);

        let values = fourier.par_iter().map(|c| c.re * params.field).collect();
        FieldGrid::from_values(steps, values)
    }
}

impl VortexFieldCalc for AnalyticFieldCalc {
    type Grid = FieldGrid;

    fn calculate_grid(&mut self) -> &FieldGrid {
        let grid = Self::solve(self.lattice, &self.params, &mut self.plans);
        self.grid.insert(grid)
    }

    fn grid(&mut self) -> &FieldGrid {
        self.grid
            .get_or_insert_with(|| Self::solve(self.lattice, &self.params, &mut self.plans))
    }

    fn grid_exists(&self) -> bool {
        self.grid.is_some()
    }

    fn parameters(&self) -> &VortexParameters {
        &self.params
    }

    fn set_parameters(&mut self, params: VortexParameters) -> Result<()> {
        let params = Self::prepare(self.lattice, &params)?;
        if params.steps != self.plans.steps() {
            self.plans = FftPlans::new(params.steps);
        }
        self.params = params;
        self.grid = None;
        Ok(())
    }

    fn lattice(&self) -> VortexLattice {
        self.lattice
    }
}

/// Triangular London field (G) at a point of the unit cell
///
/// The origin is a vortex core, `x` runs along the `sqrt(3) a` side of the
/// rectangular cell and `y` along the `a` side, both in nm. The reciprocal
/// lattice sum is truncated once the coefficients fall below 1e-16.
///
/// ```rust
/// # use musrtools_vortex::{london_field_at, VortexParameters};
/// let params = VortexParameters::new(1000.0, 200.0, 20.0, 64);
/// let core = london_field_at(&params, 0.0, 0.0)?;
/// let between = london_field_at(&params, 100.0, 0.0)?;
/// assert!(core > 1000.0 && between < core);
/// # Ok::<(), musrtools_vortex::Error>(())
/// ```
pub fn london_field_at(params: &VortexParameters, x: f64, y: f64) -> Result<f64> {
    let lattice = VortexLattice::BulkTriangular;
    let params = params.validated()?;
    if params.is_degenerate() {
        return Ok(params.field);
    }

    let coefficients = Coefficients::new(lattice, &params)?;
    let a = params.lattice_constant(lattice);
    let (kx, ky) = (2.0 * PI / (3.0_f64.sqrt() * a), 2.0 * PI / a);

    let g_sq_max = coefficients.g_sq_cutoff();
    let j_max = g_sq_max.sqrt().ceil() as i64;
    let i_max = (g_sq_max / 3.0).sqrt().ceil() as i64;

    let sum = (-i_max..=i_max)
        .into_par_iter()
        .map(|i| {
            (-j_max..=j_max)
                .filter(|j| (i + j).rem_euclid(2) == 0)
                .map(|j| {
                    let g_sq = (j * j + 3 * i * i) as f64;
                    coefficients.at(g_sq) * (kx * j as f64 * x + ky * i as f64 * y).cos()
                })
                .sum::<f64>()
        })
        .sum::<f64>();

    Ok(params.field * sum)
}
