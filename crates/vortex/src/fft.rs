//! Multi-dimensional complex FFTs over the solver grids
//!
//! Grids are stored row major with z as the fastest axis, so the value at
//! row `i`, column `j` and depth `k` sits at `k + nz * (j + n * i)`. Planar
//! grids are the special case `nz = 1`.
//!
//! Transforms are unnormalised. The inverse uses exp(+i), so a forward
//! transform followed by an inverse one scales the data by the grid size.

// standard library
use std::sync::Arc;

// external crates
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

/// Owner of the FFT plans and scratch space of one solver
///
/// The plans are created once for the grid side length and reused for
/// every transform of the solver.
pub struct FftPlans {
    steps: usize,
    steps_z: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    forward_z: Arc<dyn Fft<f64>>,
    inverse_z: Arc<dyn Fft<f64>>,
    scratch: Vec<Complex64>,
}

impl std::fmt::Debug for FftPlans {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPlans")
            .field("steps", &self.steps)
            .field("steps_z", &self.steps_z)
            .finish()
    }
}

impl FftPlans {
    /// Plans for a square `steps` x `steps` grid
    pub fn new(steps: usize) -> Self {
        Self::with_depth(steps, 1)
    }

    /// Plans for a `steps` x `steps` x `steps_z` grid
    pub fn with_depth(steps: usize, steps_z: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let steps_z = steps_z.max(1);
        Self {
            steps,
            steps_z,
            forward: planner.plan_fft_forward(steps),
            inverse: planner.plan_fft_inverse(steps),
            forward_z: planner.plan_fft_forward(steps_z),
            inverse_z: planner.plan_fft_inverse(steps_z),
            scratch: vec![Complex64::default(); steps * steps * steps_z],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn steps_z(&self) -> usize {
        self.steps_z
    }

    /// Number of values in a full grid
    pub fn len(&self) -> usize {
        self.steps * self.steps * self.steps_z
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forward transform of the full grid
    pub fn forward(&mut self, data: &mut [Complex64]) {
        self.transform(data, self.steps_z, Direction::Forward);
    }

    /// Inverse transform of the full grid
    pub fn inverse(&mut self, data: &mut [Complex64]) {
        self.transform(data, self.steps_z, Direction::Inverse);
    }

    /// Forward transform of a single `steps` x `steps` plane
    pub fn forward_plane(&mut self, data: &mut [Complex64]) {
        self.transform(data, 1, Direction::Forward);
    }

    /// Forward transform of a single line along z
    pub fn forward_z(&self, data: &mut [Complex64]) {
        self.forward_z.process(data);
    }

    fn transform(&mut self, data: &mut [Complex64], steps_z: usize, direction: Direction) {
        let n = self.steps;
        debug_assert_eq!(data.len(), n * n * steps_z);

        let (line, line_z) = match direction {
            Direction::Forward => (&self.forward, &self.forward_z),
            Direction::Inverse => (&self.inverse, &self.inverse_z),
        };
        let scratch = &mut self.scratch[..data.len()];

        // depth
        if steps_z > 1 {
            data.par_chunks_mut(steps_z)
                .for_each(|values| line_z.process(values));
        }

        // columns, strided by the depth inside every row
        if steps_z > 1 {
            data.par_chunks_mut(n * steps_z)
                .zip(scratch.par_chunks_mut(n * steps_z))
                .for_each(|(row, tmp)| {
                    transpose(row, tmp, n, steps_z);
                    line.process(tmp);
                    transpose(tmp, row, steps_z, n);
                });
        } else {
            data.par_chunks_mut(n).for_each(|row| line.process(row));
        }

        // rows
        transpose(data, scratch, n, n * steps_z);
        scratch.par_chunks_mut(n).for_each(|values| line.process(values));
        transpose(scratch, data, n * steps_z, n);
    }
}

/// Write the `rows` x `cols` matrix `src` into `dst` as `cols` x `rows`
fn transpose(src: &[Complex64], dst: &mut [Complex64], rows: usize, cols: usize) {
    dst.par_chunks_mut(rows)
        .enumerate()
        .for_each(|(c, column)| {
            column
                .iter_mut()
                .enumerate()
                .for_each(|(r, value)| *value = src[r * cols + c]);
        });
}

/// Signed wave number of an FFT index, negative in the upper half
pub(crate) fn signed_index(index: usize, n: usize) -> f64 {
    if index < n / 2 {
        index as f64
    } else {
        index as f64 - n as f64
    }
}

#[cfg(test)]
mod fft_tests {
    use super::*;

    fn naive_dft_2d(data: &[Complex64], n: usize) -> Vec<Complex64> {
        let tau = -2.0 * std::f64::consts::PI / n as f64;
        (0..n * n)
            .map(|out| {
                let (p, q) = (out / n, out % n);
                data.iter()
                    .enumerate()
                    .map(|(idx, v)| {
                        let (i, j) = (idx / n, idx % n);
                        let phase = tau * ((p * i + q * j) % n) as f64;
                        v * Complex64::from_polar(1.0, phase)
                    })
                    .sum()
            })
            .collect()
    }

    #[test]
    fn plane_matches_naive_dft() {
        let n = 6;
        let data = (0..n * n)
            .map(|i| Complex64::new(i as f64 * 0.5, (i % 5) as f64))
            .collect::<Vec<_>>();

        let mut plans = FftPlans::new(n);
        let mut fast = data.clone();
        plans.forward(&mut fast);

        let slow = naive_dft_2d(&data, n);
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn inverse_undoes_forward_in_3d() {
        let (n, nz) = (4, 6);
        let data = (0..n * n * nz)
            .map(|i| Complex64::new((i * 7 % 11) as f64, -(i as f64)))
            .collect::<Vec<_>>();

        let mut plans = FftPlans::with_depth(n, nz);
        let mut values = data.clone();
        plans.forward(&mut values);
        plans.inverse(&mut values);

        let scale = plans.len() as f64;
        for (a, b) in values.iter().zip(data.iter()) {
            assert!((a / scale - b).norm() < 1e-9);
        }
    }

    #[test]
    fn depth_is_the_fastest_axis() {
        // a constant along z transforms to a single kz = 0 entry per column
        let (n, nz) = (4, 4);
        let mut values = vec![Complex64::default(); n * n * nz];
        (0..nz).for_each(|k| values[k] = Complex64::new(1.0, 0.0));

        let mut plans = FftPlans::with_depth(n, nz);
        plans.forward(&mut values);

        for (idx, v) in values.iter().enumerate() {
            let expected = if idx % nz == 0 { nz as f64 } else { 0.0 };
            assert!((v.re - expected).abs() < 1e-12);
            assert!(v.im.abs() < 1e-12);
        }
    }

    #[test]
    fn signed_wave_numbers() {
        assert_eq!(signed_index(0, 8), 0.0);
        assert_eq!(signed_index(3, 8), 3.0);
        assert_eq!(signed_index(4, 8), -4.0);
        assert_eq!(signed_index(7, 8), -1.0);
    }
}
