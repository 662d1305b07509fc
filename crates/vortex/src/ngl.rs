//! Nonlinear Ginzburg-Landau solution of a bulk triangular lattice
//!
//! The order parameter and the field are iterated as Fourier series in
//! reduced units, lengths in lambda and fields in Hc2 / kappa. Only the
//! triangular reciprocal lattice positions are kept, every other
//! coefficient is forced to zero each iteration.

// standard library
use std::f64::consts::PI;

// internal modules
use crate::constants::{MAX_BULK_ITERATIONS, PI_4SQRT3};
use crate::error::Result;
use crate::fft::{signed_index, FftPlans};
use crate::grid::FieldGrid;
use crate::lattice::{VortexFieldCalc, VortexLattice};
use crate::params::{quad_steps, VortexParameters};

// external crates
use num_complex::Complex64;
use rayon::prelude::*;

/// Geometry of the rectangular unit cell in reduced units
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReducedCell {
    pub steps: usize,
    pub kappa: f64,
    /// Applied field in units of Hc2 / kappa
    pub scaled_field: f64,
    /// Hc2 / kappa in G
    pub field_unit: f64,
    /// Lattice constant in units of lambda
    pub a: f64,
}

impl ReducedCell {
    pub fn new(params: &VortexParameters) -> Self {
        let kappa = params.kappa();
        let field_unit = params.upper_critical_field() / kappa;
        let scaled_field = params.field / field_unit;
        Self {
            steps: params.steps,
            kappa,
            scaled_field,
            field_unit,
            a: (4.0 * PI / (kappa * scaled_field * 3.0_f64.sqrt())).sqrt(),
        }
    }

    /// Planar index of the second vortex core of the cell
    pub fn second_core(&self) -> usize {
        (self.steps + 1) * self.steps / 2
    }

    /// (4/3) (pi / a)^2, converts the reduced |G|^2 to K^2
    pub fn g_sq_unit(&self) -> f64 {
        4.0 / 3.0 * (PI / self.a).powi(2)
    }

    pub fn kx(&self, col: usize) -> f64 {
        2.0 * PI * signed_index(col, self.steps) / (3.0_f64.sqrt() * self.a)
    }

    pub fn ky(&self, row: usize) -> f64 {
        2.0 * PI * signed_index(row, self.steps) / self.a
    }

    /// Reduced |G|^2 = j^2 + 3 i^2 on the reciprocal lattice, else `None`
    pub fn g_sq(&self, row: usize, col: usize) -> Option<f64> {
        if (row + col) % 2 != 0 {
            return None;
        }
        let (jj, ii) = (signed_index(col, self.steps), signed_index(row, self.steps));
        Some(jj * jj + 3.0 * ii * ii)
    }

    /// Abrikosov solution near Hc2 as starting order parameter
    pub fn abrikosov(&self, row: usize, col: usize) -> f64 {
        if row == 0 && col == 0 {
            return 0.0;
        }
        match self.g_sq(row, col) {
            None => 0.0,
            Some(g_sq) if row % 2 == 0 => {
                let sign = if (row / 2 + col / 2) % 2 == 0 { -1.0 } else { 1.0 };
                sign * (-PI_4SQRT3 * g_sq).exp()
            }
            Some(g_sq) => (-PI_4SQRT3 * g_sq).exp(),
        }
    }

    /// Vector potential contribution of the field coefficient at (row, col)
    ///
    /// Returns the x and y weights whose inverse transforms give the in-plane
    /// components of the vector potential.
    pub fn potential_weights(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        let g_sq = self.g_sq(row, col).filter(|g| *g != 0.0)?;
        let (jj, ii) = (signed_index(col, self.steps), signed_index(row, self.steps));
        let coeff_x = 1.5 * self.a / PI;
        let coeff_y = 0.5 * 3.0_f64.sqrt() * self.a / PI;
        Some((coeff_x * ii / g_sq, coeff_y * jj / g_sq))
    }
}

/// Fill a complex buffer with real values
pub(crate) fn load(buffer: &mut [Complex64], f: impl Fn(usize) -> f64 + Sync) {
    buffer
        .par_iter_mut()
        .enumerate()
        .for_each(|(idx, v)| *v = Complex64::new(f(idx), 0.0));
}

/// Relative change test of the leading coefficients
///
/// A coefficient fails when it changed by more than `tolerance` relative to
/// its magnitude (only above `floor`), or when it flipped sign (only above
/// `sign_floor`). The previous values are replaced afterwards.
pub(crate) fn coefficients_converged(
    values: &[f64],
    previous: &mut [f64],
    floor: f64,
    tolerance: f64,
    sign_floor: f64,
) -> bool {
    let converged = values.iter().zip(previous.iter()).all(|(v, old)| {
        if *v == 0.0 {
            return true;
        }
        let drifting = v.abs() > floor && ((old - v) / v).abs() > tolerance;
        let flipped = v.abs() > sign_floor && old / v < 0.0;
        !(drifting || flipped)
    });
    previous.copy_from_slice(values);
    converged
}

/// Order parameter and its gradient on the planar grid
#[derive(Debug, Clone)]
struct OrderParameter {
    sum_ak: f64,
    omega: Vec<f64>,
    dx: Vec<f64>,
    dy: Vec<f64>,
}

impl OrderParameter {
    fn new(len: usize) -> Self {
        Self {
            sum_ak: 0.0,
            omega: vec![0.0; len],
            dx: vec![0.0; len],
            dy: vec![0.0; len],
        }
    }

    /// omega = sum(aK) - Re(IFFT aK), with the gradient from i K aK
    fn update(&mut self, cell: &ReducedCell, ak: &[f64], plans: &mut FftPlans, buffer: &mut [Complex64]) {
        let n = cell.steps;
        self.sum_ak = ak.par_iter().sum();

        load(buffer, |idx| ak[idx]);
        plans.inverse(buffer);
        let sum_ak = self.sum_ak;
        self.omega
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(w, c)| *w = sum_ak - c.re);

        load(buffer, |idx| ak[idx] * cell.kx(idx % n));
        plans.inverse(buffer);
        self.dx
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(d, c)| *d = c.im);

        load(buffer, |idx| ak[idx] * cell.ky(idx / n));
        plans.inverse(buffer);
        self.dy
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(d, c)| *d = c.im);

        for core in [0, cell.second_core()] {
            self.omega[core] = 0.0;
            self.dx[core] = 0.0;
            self.dy[core] = 0.0;
        }
    }

    fn gradient_sq(&self, idx: usize) -> f64 {
        self.dx[idx] * self.dx[idx] + self.dy[idx] * self.dy[idx]
    }
}

/// Iterative bulk nonlinear Ginzburg-Landau solver
///
/// Step counts are rounded up to a multiple of four so that both vortex
/// cores of the rectangular cell sit on grid points.
#[derive(Debug)]
pub struct NglFieldCalc {
    params: VortexParameters,
    plans: FftPlans,
    grid: Option<FieldGrid>,
}

impl NglFieldCalc {
    pub fn new(params: VortexParameters) -> Result<Self> {
        let params = Self::prepare(&params)?;
        Ok(Self {
            plans: FftPlans::new(params.steps),
            params,
            grid: None,
        })
    }

    fn prepare(params: &VortexParameters) -> Result<VortexParameters> {
        let mut params = params.validated()?;
        params.steps = quad_steps(params.steps);
        Ok(params)
    }

    fn solve(params: &VortexParameters, plans: &mut FftPlans) -> FieldGrid {
        let n = params.steps;
        let nsq = n * n;
        if params.is_degenerate() {
            log::debug!("NglFieldCalc::solve(): no vortex lattice, uniform field");
            return FieldGrid::uniform(n, params.field);
        }

        let cell = ReducedCell::new(params);
        let kappa = cell.kappa;
        let core = cell.second_core();
        let g_sq_unit = cell.g_sq_unit();
        let four_kappa_sq = 4.0 * kappa * kappa;
        let two_kappa_sq = 2.0 * kappa * kappa;

        let mut buffer = vec![Complex64::default(); nsq];
        let mut ak = (0..nsq)
            .into_par_iter()
            .map(|idx| cell.abrikosov(idx / n, idx % n))
            .collect::<Vec<_>>();

        let mut order = OrderParameter::new(nsq);
        order.update(&cell, &ak, plans, &mut buffer);

        // supercurrent of the bare order parameter
        let (qa_x, qa_y): (Vec<f64>, Vec<f64>) = (0..nsq)
            .into_par_iter()
            .map(|idx| {
                let w = order.omega[idx];
                if w == 0.0 || idx == 0 || idx == core {
                    (0.0, 0.0)
                } else {
                    let scale = 0.5 / (kappa * w);
                    (order.dy[idx] * scale, -order.dx[idx] * scale)
                }
            })
            .unzip();
        let (mut q_x, mut q_y) = (qa_x.clone(), qa_y.clone());

        let mut field = vec![cell.scaled_field; nsq];
        let mut bk = vec![0.0; nsq];
        let mut ak_check = vec![0.0; n];
        let mut bk_check = vec![0.0; n];
        let mut ak_converged = false;
        let mut bk_converged = false;
        let mut ak_initially_converged = false;
        let mut first_bk = true;

        let mut iterations = 0;
        loop {
            if iterations == MAX_BULK_ITERATIONS {
                log::warn!(
                    "NglFieldCalc::solve(): no convergence after {MAX_BULK_ITERATIONS} iterations, using the last grid"
                );
                break;
            }
            iterations += 1;

            // nonlinear term of the order parameter equation
            let order_ref = &order;
            load(&mut buffer, |idx| {
                let w = order_ref.omega[idx];
                if w == 0.0 {
                    return 0.0;
                }
                let q_sq = q_x[idx] * q_x[idx] + q_y[idx] * q_y[idx];
                w * (w + q_sq - 2.0) + order_ref.gradient_sq(idx) / (four_kappa_sq * w)
            });
            buffer[0] = buffer[n];
            buffer[core] = buffer[0];
            plans.forward(&mut buffer);

            let coeff2 = two_kappa_sq / nsq as f64;
            ak.par_iter_mut().enumerate().for_each(|(idx, a)| {
                *a = match cell.g_sq(idx / n, idx % n) {
                    Some(g_sq) if idx != 0 => {
                        buffer[idx].re * coeff2 / (g_sq_unit * g_sq + two_kappa_sq)
                    }
                    _ => 0.0,
                };
            });

            order.update(&cell, &ak, plans, &mut buffer);

            // rescale aK to the free energy minimum
            let order_ref = &order;
            let sum_sum: f64 = (0..nsq)
                .into_par_iter()
                .map(|l| {
                    let m = if order_ref.omega[l] != 0.0 {
                        l
                    } else if l + n < nsq && order_ref.omega[l + n] != 0.0 {
                        l + n
                    } else {
                        return 0.0;
                    };
                    let w = order_ref.omega[m];
                    let q_sq = q_x[m] * q_x[m] + q_y[m] * q_y[m];
                    w * (1.0 - q_sq) - order_ref.gradient_sq(m) / (four_kappa_sq * w)
                })
                .sum();
            let sum_omega_sq: f64 = order.omega.par_iter().map(|w| w * w).sum();
            if sum_omega_sq > 0.0 {
                let ratio = sum_sum / sum_omega_sq;
                ak.par_iter_mut().for_each(|a| *a *= ratio);
            }

            ak_converged = coefficients_converged(&ak[..n], &mut ak_check, 1e-6, 1e-6, 0.0);
            order.update(&cell, &ak, plans, &mut buffer);

            if !(ak_converged || ak_initially_converged) {
                continue;
            }
            ak_initially_converged = true;

            // field equation source term
            let order_ref = &order;
            let field_ref = &field;
            load(&mut buffer, |idx| {
                order_ref.omega[idx] * field_ref[idx]
                    + order_ref.sum_ak * (cell.scaled_field - field_ref[idx])
                    + q_y[idx] * order_ref.dx[idx]
                    - q_x[idx] * order_ref.dy[idx]
            });
            buffer[0] = buffer[n];
            buffer[core] = buffer[0];
            plans.forward(&mut buffer);

            let coeff_b = -1.0 / nsq as f64;
            let sum_ak = order.sum_ak;
            bk.par_iter_mut().enumerate().for_each(|(idx, b)| {
                *b = match cell.g_sq(idx / n, idx % n) {
                    Some(g_sq) if idx != 0 => buffer[idx].re * coeff_b / (g_sq_unit * g_sq + sum_ak),
                    _ => 0.0,
                };
            });

            if first_bk {
                ak_converged = false;
                first_bk = false;
            }
            bk_converged = coefficients_converged(&bk[..n], &mut bk_check, 1e-6, 1e-6, 0.0);

            load(&mut buffer, |idx| bk[idx]);
            plans.inverse(&mut buffer);
            field
                .par_iter_mut()
                .zip(buffer.par_iter())
                .for_each(|(b, c)| *b = cell.scaled_field + c.re);

            if ak_converged && bk_converged {
                break;
            }

            // supercurrent including the field vector potential
            let weights = (0..nsq)
                .into_par_iter()
                .map(|idx| cell.potential_weights(idx / n, idx % n).unwrap_or_default())
                .collect::<Vec<_>>();

            load(&mut buffer, |idx| bk[idx] * weights[idx].0);
            plans.inverse(&mut buffer);
            q_x.par_iter_mut()
                .zip(qa_x.par_iter().zip(buffer.par_iter()))
                .for_each(|(q, (qa, c))| *q = qa - c.im);

            load(&mut buffer, |idx| bk[idx] * weights[idx].1);
            plans.inverse(&mut buffer);
            q_y.par_iter_mut()
                .zip(qa_y.par_iter().zip(buffer.par_iter()))
                .for_each(|(q, (qa, c))| *q = qa + c.im);
        }

        log::info!(
            "NglFieldCalc::solve(): {iterations} iterations, order parameter converged: {ak_converged}, field converged: {bk_converged}"
        );

        let values = field.par_iter().map(|b| b * cell.field_unit).collect();
        FieldGrid::from_values(n, values)
    }
}

impl VortexFieldCalc for NglFieldCalc {
    type Grid = FieldGrid;

    fn calculate_grid(&mut self) -> &FieldGrid {
        let grid = Self::solve(&self.params, &mut self.plans);
        self.grid.insert(grid)
    }

    fn grid(&mut self) -> &FieldGrid {
        self.grid
            .get_or_insert_with(|| Self::solve(&self.params, &mut self.plans))
    }

    fn grid_exists(&self) -> bool {
        self.grid.is_some()
    }

    fn parameters(&self) -> &VortexParameters {
        &self.params
    }

    fn set_parameters(&mut self, params: VortexParameters) -> Result<()> {
        let params = Self::prepare(&params)?;
        if params.steps != self.plans.steps() {
            self.plans = FftPlans::new(params.steps);
        }
        self.params = params;
        self.grid = None;
        Ok(())
    }

    fn lattice(&self) -> VortexLattice {
        VortexLattice::BulkNonlinearGl
    }
}
