//! Nonlinear Ginzburg-Landau solution of a thin film with a triangular
//! vortex lattice
//!
//! The film is periodic across its thickness in the Fourier picture, the
//! grid holds depths from the film centre (index 0) to the surface (index
//! `steps_z / 2`) and back. The first passes are solved in two dimensions,
//! after which the z dependence of the order parameter is switched on.

// standard library
use std::f64::consts::PI;

// internal modules
use crate::constants::{FILM_FORCED_CONVERGENCE, MAX_FILM_ITERATIONS};
use crate::error::Result;
use crate::fft::{signed_index, FftPlans};
use crate::grid::FilmFieldGrid;
use crate::lattice::{VortexFieldCalc, VortexLattice};
use crate::ngl::{coefficients_converged, load, ReducedCell};
use crate::params::{even_steps, quad_steps, VortexParameters};

// external crates
use num_complex::Complex64;
use rayon::prelude::*;

/// Reduced unit cell extended by the film thickness
#[derive(Debug, Clone, Copy)]
struct FilmCell {
    cell: ReducedCell,
    steps_z: usize,
    /// Film thickness in units of lambda
    thickness: f64,
}

impl FilmCell {
    fn len(&self) -> usize {
        self.cell.steps * self.cell.steps * self.steps_z
    }

    /// Row, column and depth of a flat index
    fn split(&self, idx: usize) -> (usize, usize, usize) {
        let plane = idx / self.steps_z;
        (plane / self.cell.steps, plane % self.cell.steps, idx % self.steps_z)
    }

    fn kz(&self, k: usize) -> f64 {
        2.0 * PI * signed_index(k, self.steps_z) / self.thickness
    }

    /// Flat indices of both vortex cores at every depth
    fn cores(&self) -> impl Iterator<Item = usize> + '_ {
        let second = self.cell.second_core();
        (0..self.steps_z).flat_map(move |k| [k, k + self.steps_z * second])
    }

    /// Sum over every plane of `f(idx)`, transformed along z
    fn depth_profile(&self, plans: &FftPlans, f: impl Fn(usize) -> f64 + Sync) -> Vec<Complex64> {
        let planar = self.cell.steps * self.cell.steps;
        let mut line = (0..self.steps_z)
            .into_par_iter()
            .map(|k| {
                let sum = (0..planar).map(|ij| f(k + self.steps_z * ij)).sum::<f64>();
                Complex64::new(sum, 0.0)
            })
            .collect::<Vec<_>>();
        plans.forward_z(&mut line);
        line
    }
}

/// Order parameter, its gradient and the depth profile of sum(aK)
#[derive(Debug, Clone)]
struct FilmOrderParameter {
    sum_ak: Vec<f64>,
    omega: Vec<f64>,
    dx: Vec<f64>,
    dy: Vec<f64>,
    dz: Vec<f64>,
}

impl FilmOrderParameter {
    fn new(film: &FilmCell) -> Self {
        let len = film.len();
        Self {
            sum_ak: vec![0.0; film.steps_z],
            omega: vec![0.0; len],
            dx: vec![0.0; len],
            dy: vec![0.0; len],
            dz: vec![0.0; len],
        }
    }

    fn update(
        &mut self,
        film: &FilmCell,
        ak: &[f64],
        plans: &mut FftPlans,
        buffer: &mut [Complex64],
        find_3d: bool,
    ) {
        let nz = film.steps_z;
        self.sum_ak = film
            .depth_profile(plans, |idx| ak[idx])
            .iter()
            .map(|c| c.re)
            .collect();

        load(buffer, |idx| ak[idx]);
        plans.inverse(buffer);
        let sum_ak = &self.sum_ak;
        self.omega
            .par_iter_mut()
            .enumerate()
            .zip(buffer.par_iter())
            .for_each(|((idx, w), c)| *w = sum_ak[idx % nz] - c.re);

        load(buffer, |idx| ak[idx] * film.cell.kx(film.split(idx).1));
        plans.inverse(buffer);
        self.dx
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(d, c)| *d = c.im);

        load(buffer, |idx| ak[idx] * film.cell.ky(film.split(idx).0));
        plans.inverse(buffer);
        self.dy
            .par_iter_mut()
            .zip(buffer.par_iter())
            .for_each(|(d, c)| *d = c.im);

        if find_3d {
            load(buffer, |idx| ak[idx] * film.kz(idx % nz));
            plans.inverse(buffer);
            let profile = film.depth_profile(plans, |idx| ak[idx] * film.kz(idx % nz));
            self.dz
                .par_iter_mut()
                .enumerate()
                .zip(buffer.par_iter())
                .for_each(|((idx, d), c)| *d = c.im + profile[idx % nz].im);
        } else {
            self.dz.par_iter_mut().for_each(|d| *d = 0.0);
        }

        for core in film.cores() {
            self.omega[core] = 0.0;
            self.dx[core] = 0.0;
            self.dy[core] = 0.0;
            self.dz[core] = 0.0;
        }
    }

    fn gradient_sq(&self, idx: usize) -> f64 {
        self.dx[idx].powi(2) + self.dy[idx].powi(2) + self.dz[idx].powi(2)
    }

    fn mean_sum_ak(&self) -> f64 {
        self.sum_ak.iter().sum::<f64>() / self.sum_ak.len().max(1) as f64
    }
}

/// Iterative film nonlinear Ginzburg-Landau solver
///
/// In-plane steps are rounded up to a multiple of four and steps across
/// the film up to the next even number.
///
/// ```rust
/// # use musrtools_vortex::{FilmNglFieldCalc, VortexFieldCalc, VortexParameters};
/// // a field above Hc2 leaves the film in the normal state
/// let params = VortexParameters::new(1.0e5, 100.0, 10.0, 16).with_film(200.0, 7);
/// let mut film = FilmNglFieldCalc::new(params)?;
/// assert_eq!(film.steps_z(), 8);
/// assert!(film.grid().bx().iter().all(|b| *b == 0.0));
/// assert_eq!(film.b_max(), 1.0e5);
/// # Ok::<(), musrtools_vortex::Error>(())
/// ```
#[derive(Debug)]
pub struct FilmNglFieldCalc {
    params: VortexParameters,
    plans: FftPlans,
    grid: Option<FilmFieldGrid>,
    iterations: usize,
}

impl FilmNglFieldCalc {
    pub fn new(params: VortexParameters) -> Result<Self> {
        let params = Self::prepare(&params)?;
        let steps_z = params.steps_z.unwrap_or(2);
        Ok(Self {
            plans: FftPlans::with_depth(params.steps, steps_z),
            params,
            grid: None,
            iterations: 0,
        })
    }

    /// Grid points across the film, after rounding
    pub fn steps_z(&self) -> usize {
        self.plans.steps_z()
    }

    fn prepare(params: &VortexParameters) -> Result<VortexParameters> {
        let mut params = params.validated()?;
        let (thickness, steps_z) = params.film_geometry()?;
        params.steps = quad_steps(params.steps);
        params.thickness = Some(thickness);
        params.steps_z = Some(even_steps(steps_z));
        Ok(params)
    }

    /// Iterations taken by the last solve, 0 for a uniform field
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    fn solve(params: &VortexParameters, plans: &mut FftPlans) -> (FilmFieldGrid, usize) {
        let (n, nz) = (plans.steps(), plans.steps_z());
        if params.is_degenerate() {
            log::debug!("FilmNglFieldCalc::solve(): no vortex lattice, uniform field");
            return (FilmFieldGrid::uniform(n, nz, params.field), 0);
        }

        let cell = ReducedCell::new(params);
        let film = FilmCell {
            cell,
            steps_z: nz,
            thickness: params.thickness.unwrap_or_default() / params.lambda,
        };
        let len = film.len();
        let nsq = n * n;
        let kappa = cell.kappa;
        let four_kappa_sq = 4.0 * kappa * kappa;
        let two_kappa_sq = 2.0 * kappa * kappa;
        let g_sq_unit = cell.g_sq_unit();
        let core = cell.second_core();
        let d = film.thickness;
        let f_c = 3.0 + (0.4 + 60.0 * cell.scaled_field.powi(2)) * kappa * kappa * cell.a / d;

        let mut buffer = vec![Complex64::default(); len];
        let mut spare = vec![Complex64::default(); len];

        // Abrikosov start in the kz = 0 plane
        let mut ak = (0..len)
            .into_par_iter()
            .map(|idx| match film.split(idx) {
                (row, col, 0) => cell.abrikosov(row, col),
                _ => 0.0,
            })
            .collect::<Vec<_>>();

        let mut find_3d = false;
        let mut order = FilmOrderParameter::new(&film);
        order.update(&film, &ak, plans, &mut buffer, find_3d);

        // supercurrent of the bare order parameter, from the central plane
        let qa_plane = (0..nsq)
            .into_par_iter()
            .map(|ij| {
                let idx = nz * ij;
                let w = order.omega[idx];
                if w == 0.0 || ij == 0 || ij == core {
                    (0.0, 0.0)
                } else {
                    let scale = 0.5 / (kappa * w);
                    (order.dy[idx] * scale, -order.dx[idx] * scale)
                }
            })
            .collect::<Vec<_>>();
        let (qa_x, qa_y): (Vec<f64>, Vec<f64>) =
            (0..len).into_par_iter().map(|idx| qa_plane[idx / nz]).unzip();
        let (mut q_x, mut q_y) = (qa_x.clone(), qa_y.clone());

        let mut bk = vec![0.0; len];
        let mut bks = vec![0.0; nsq];
        let mut ak_check = vec![0.0; n * nz];
        let mut bk_check = vec![0.0; n * nz];

        let weights = (0..len)
            .into_par_iter()
            .map(|idx| {
                let (row, col, _) = film.split(idx);
                cell.potential_weights(row, col).unwrap_or_default()
            })
            .collect::<Vec<_>>();

        let mut count = 0;
        loop {
            count += 1;

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
            for k in 0..nz {
                buffer[k] = buffer[k + nz * n];
                buffer[k + nz * core] = buffer[k];
            }
            plans.forward(&mut buffer);

            let coeff2 = two_kappa_sq / len as f64;
            ak.par_iter_mut().enumerate().for_each(|(idx, a)| {
                let (row, col, k) = film.split(idx);
                *a = match cell.g_sq(row, col) {
                    Some(g_sq) if (row, col) != (0, 0) && (k == 0 || find_3d) => {
                        let kz = film.kz(k);
                        buffer[idx].re * coeff2 / (g_sq_unit * g_sq + kz * kz + two_kappa_sq)
                    }
                    _ => 0.0,
                };
            });

            order.update(&film, &ak, plans, &mut buffer, find_3d);

            // rescale aK to the free energy minimum
            let order_ref = &order;
            let sum_sum: f64 = (0..len)
                .into_par_iter()
                .map(|l| {
                    let m = if order_ref.omega[l] != 0.0 {
                        l
                    } else if l + nz * n < len && order_ref.omega[l + nz * n] != 0.0 {
                        l + nz * n
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

            let ak_converged =
                coefficients_converged(&ak[..n * nz], &mut ak_check, 1e-5, 5e-3, 1e-10);
            order.update(&film, &ak, plans, &mut buffer, find_3d);

            // supercurrent density in Fourier space
            let order_ref = &order;
            load(&mut buffer, |idx| order_ref.omega[idx] * q_y[idx]);
            plans.forward(&mut buffer);
            load(&mut spare, |idx| order_ref.omega[idx] * q_x[idx]);
            plans.forward(&mut spare);

            // field coefficients at the film surface
            bks.par_iter_mut().enumerate().for_each(|(ij, s)| {
                *s = (0..nz)
                    .map(|k| if k % 2 == 0 { bk[k + nz * ij] } else { -bk[k + nz * ij] })
                    .sum();
            });

            let screening = f_c * order.mean_sum_ak();
            let coeff_pk = 1.0 / len as f64;
            let (current_y, current_x) = (&buffer, &spare);
            let bks_ref = &bks;
            let bk_old = bk.clone();
            bk.par_iter_mut().enumerate().for_each(|(idx, b)| {
                let (row, col, k) = film.split(idx);
                *b = match cell.g_sq(row, col) {
                    Some(g_sq) if (row, col) != (0, 0) && (k == 0 || find_3d) => {
                        let kz = film.kz(k);
                        let g_phys_sq = g_sq_unit * g_sq;
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        let curl = cell.kx(col) * current_y[idx].im - cell.ky(row) * current_x[idx].im;
                        (coeff_pk * curl + screening * bk_old[idx]
                            - sign * 2.0 / d * g_phys_sq.sqrt() * bks_ref[idx / nz])
                            / (g_phys_sq + kz * kz + screening)
                    }
                    _ => 0.0,
                };
            });

            // the first field coefficients are measured against zeros
            let ak_converged = ak_converged && count > 1;
            let bk_converged =
                coefficients_converged(&bk[..n * nz], &mut bk_check, 1e-5, 5e-3, 1e-10);

            if count == MAX_FILM_ITERATIONS {
                log::warn!(
                    "FilmNglFieldCalc::solve(): no convergence after {MAX_FILM_ITERATIONS} iterations, using the last grid"
                );
                break;
            }
            if count == FILM_FORCED_CONVERGENCE || (ak_converged && bk_converged) {
                if find_3d {
                    log::info!("FilmNglFieldCalc::solve(): converged after {count} iterations");
                    break;
                }
                log::debug!("FilmNglFieldCalc::solve(): switching to three dimensions after {count} iterations");
                find_3d = true;
            }

            // supercurrent including the field vector potential
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

        (Self::field_components(&film, &bk, &bks, plans, &mut buffer), count)
    }

    /// Field components in G from the converged field coefficients
    fn field_components(
        film: &FilmCell,
        bk: &[f64],
        bks: &[f64],
        plans: &mut FftPlans,
        buffer: &mut [Complex64],
    ) -> FilmFieldGrid {
        let cell = &film.cell;
        let (n, nz) = (cell.steps, film.steps_z);
        let unit = cell.field_unit;

        let mut bx = Self::perpendicular(film, bk, plans, buffer, true);
        let mut by = Self::perpendicular(film, bk, plans, buffer, false);

        load(buffer, |idx| bk[idx]);
        plans.inverse(buffer);
        let bz = buffer
            .par_iter()
            .map(|c| (cell.scaled_field + c.re) * unit)
            .collect::<Vec<_>>();

        // the surface plane follows from the summed coefficients
        let surface_x = Self::surface(film, bks, plans, true);
        let surface_y = Self::surface(film, bks, plans, false);
        for ij in 0..n * n {
            bx[nz / 2 + nz * ij] = surface_x[ij].im * unit;
            by[nz / 2 + nz * ij] = surface_y[ij].im * unit;
        }

        FilmFieldGrid::new(n, nz, bx, by, bz)
    }

    /// In-plane component inside the film from the kz > 0 coefficients
    fn perpendicular(
        film: &FilmCell,
        bk: &[f64],
        plans: &mut FftPlans,
        buffer: &mut [Complex64],
        along_x: bool,
    ) -> Vec<f64> {
        let cell = &film.cell;
        let (n, nz) = (cell.steps, film.steps_z);
        let coeff = if along_x {
            3.0_f64.sqrt() * cell.a / film.thickness
        } else {
            3.0 * cell.a / film.thickness
        };

        load(buffer, |idx| {
            let (row, col, k) = film.split(idx);
            let (jj, ii) = (signed_index(col, n), signed_index(row, n));
            let lateral = if along_x { jj } else { ii };
            if k == 0 || k >= nz / 2 || lateral == 0.0 {
                0.0
            } else {
                bk[idx] * coeff * lateral * k as f64 / (jj * jj + 3.0 * ii * ii)
            }
        });
        plans.inverse(buffer);
        buffer.par_iter().map(|c| c.re * cell.field_unit).collect()
    }

    /// Transform of the surface coefficients weighted by the in-plane
    /// direction of each wave vector
    fn surface(film: &FilmCell, bks: &[f64], plans: &mut FftPlans, along_x: bool) -> Vec<Complex64> {
        let n = film.cell.steps;
        let mut plane = (0..n * n)
            .map(|ij| {
                let (jj, ii) = (signed_index(ij % n, n), signed_index(ij / n, n));
                let g = (jj * jj + 3.0 * ii * ii).sqrt();
                let lateral = if along_x { jj } else { 3.0_f64.sqrt() * ii };
                if g == 0.0 {
                    Complex64::default()
                } else {
                    Complex64::new(bks[ij] * lateral / g, 0.0)
                }
            })
            .collect::<Vec<_>>();
        plans.forward_plane(&mut plane);
        plane
    }
}

impl VortexFieldCalc for FilmNglFieldCalc {
    type Grid = FilmFieldGrid;

    fn calculate_grid(&mut self) -> &FilmFieldGrid {
        let (grid, iterations) = Self::solve(&self.params, &mut self.plans);
        self.iterations = iterations;
        self.grid.insert(grid)
    }

    fn grid(&mut self) -> &FilmFieldGrid {
        self.grid
            .get_or_insert_with(|| {
                let (grid, iterations) = Self::solve(&self.params, &mut self.plans);
                self.iterations = iterations;
                grid
            })
    }

    fn grid_exists(&self) -> bool {
        self.grid.is_some()
    }

    fn parameters(&self) -> &VortexParameters {
        &self.params
    }

    fn set_parameters(&mut self, params: VortexParameters) -> Result<()> {
        let params = Self::prepare(&params)?;
        let steps_z = params.steps_z.unwrap_or(2);
        if params.steps != self.plans.steps() || steps_z != self.plans.steps_z() {
            self.plans = FftPlans::with_depth(params.steps, steps_z);
        }
        self.params = params;
        self.grid = None;
        Ok(())
    }

    fn lattice(&self) -> VortexLattice {
        VortexLattice::FilmNonlinearGl
    }
}

#[cfg(test)]
mod film_tests {
    use super::*;
    use crate::error::Error;
    use crate::grid::FieldGrid;

    #[test]
    fn thickness_required() {
        let params = VortexParameters::new(5000.0, 100.0, 10.0, 16);
        assert!(matches!(
            FilmNglFieldCalc::new(params),
            Err(Error::MissingThickness)
        ));
    }

    #[test]
    fn steps_rounded() {
        let params = VortexParameters::new(5000.0, 100.0, 10.0, 18).with_film(300.0, 5);
        let film = FilmNglFieldCalc::new(params).unwrap();
        assert_eq!(film.steps(), 20);
        assert_eq!(film.steps_z(), 6);
    }

    #[test]
    fn flat_index_layout() {
        let params = VortexParameters::new(5000.0, 100.0, 10.0, 8).with_film(300.0, 4);
        let film = FilmCell {
            cell: ReducedCell::new(&params),
            steps_z: 4,
            thickness: 3.0,
        };
        // row 2, column 3, depth 1
        assert_eq!(film.split(1 + 4 * (3 + 8 * 2)), (2, 3, 1));
        assert_eq!(film.cores().count(), 8);
    }

    #[test]
    fn mean_field_is_applied_field() {
        let params = VortexParameters::new(5000.0, 100.0, 10.0, 16).with_film(300.0, 4);
        let mut film = FilmNglFieldCalc::new(params).unwrap();
        let grid = film.grid();
        let mean = grid.bz().iter().sum::<f64>() / grid.bz().len() as f64;
        assert!(((mean - 5000.0) / 5000.0).abs() < 1e-9);
    }

    fn spread(grid: &FieldGrid) -> f64 {
        let max = grid.values().iter().copied().fold(f64::MIN, f64::max);
        let min = grid.values().iter().copied().fold(f64::MAX, f64::min);
        max - min
    }

    fn thick_film() -> FilmNglFieldCalc {
        let params = VortexParameters::new(500.0, 150.0, 10.0, 32).with_film(300.0, 16);
        FilmNglFieldCalc::new(params).unwrap()
    }

    #[test]
    fn applied_field_inside_extrema() {
        let mut film = thick_film();
        let (b_min, b_max) = (film.b_min(), film.b_max());
        assert!(b_min < 500.0, "b_min = {b_min}");
        assert!(b_max > 500.0, "b_max = {b_max}");
    }

    #[test]
    fn field_spreads_out_at_the_surface() {
        let mut film = thick_film();
        let nz = film.steps_z();
        let grid = film.grid();

        let centre = grid.magnitude_slice(0).unwrap();
        let surface = grid.magnitude_slice(nz / 2).unwrap();
        assert!(spread(&centre) > spread(&surface));
        assert!(grid.magnitude_slice(nz).is_none());
    }

    #[test]
    fn in_plane_components_at_the_surface() {
        let mut film = thick_film();
        let nz = film.steps_z();
        let grid = film.grid();

        let surface = |values: &[f64]| {
            values
                .iter()
                .skip(nz / 2)
                .step_by(nz)
                .fold(0.0_f64, |m, v| m.max(v.abs()))
        };
        assert!(surface(grid.bx()) > 1.0);
        assert!(surface(grid.by()) > 1.0);
        assert!(grid.bx().iter().chain(grid.by()).all(|b| b.is_finite()));
    }

    #[test]
    fn iterations_are_capped() {
        let mut film = thick_film();
        assert_eq!(film.iterations(), 0);
        film.grid();
        // the first pass never converges, then one pass each in 2D and 3D
        assert!(film.iterations() >= 3);
        assert!(film.iterations() <= MAX_FILM_ITERATIONS);

        let above_hc2 = VortexParameters::new(1.0e6, 150.0, 10.0, 32).with_film(300.0, 16);
        film.set_parameters(above_hc2).unwrap();
        film.calculate_grid();
        assert_eq!(film.iterations(), 0);
    }
}
