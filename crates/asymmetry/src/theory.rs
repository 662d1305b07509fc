//! Theory and user function interfaces

/// Polarisation model evaluated at a time for a parameter set
///
/// Implementations must be safe to call from several threads with the same
/// parameters. Any per-parameter-set caching should happen on the first call,
/// which is always made serially before a parallel chi-square loop.
///
/// Closures implement this directly:
///
/// ```rust
/// # use musrtools_asymmetry::Theory;
/// let theory = |t: f64, par: &[f64], _: &[f64]| par[0] * (-par[1] * t).exp();
/// assert_eq!(theory.func(0.0, &[0.25, 1.0], &[]), 0.25);
/// ```
pub trait Theory: Sync {
    /// Value at time `t` (us)
    fn func(&self, t: f64, par: &[f64], funcs: &[f64]) -> f64;
}

impl<F> Theory for F
where
    F: Fn(f64, &[f64], &[f64]) -> f64 + Sync,
{
    fn func(&self, t: f64, par: &[f64], funcs: &[f64]) -> f64 {
        self(t, par, funcs)
    }
}

/// User functions of the fit parameters
pub trait Functions: Sync {
    /// Values of every function for the parameter set
    fn eval(&self, par: &[f64]) -> Vec<f64>;
}

impl<F> Functions for F
where
    F: Fn(&[f64]) -> Vec<f64> + Sync,
{
    fn eval(&self, par: &[f64]) -> Vec<f64> {
        self(par)
    }
}

/// No user functions defined
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFunctions;

impl Functions for NoFunctions {
    fn eval(&self, _: &[f64]) -> Vec<f64> {
        Vec::new()
    }
}
