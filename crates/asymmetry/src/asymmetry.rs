//! Asymmetry formation and the alpha/beta correction

// internal modules
use crate::background::Channel;
use crate::config::Parameter;
use crate::constants::PARAM_FUN_OFFSET;
use crate::error::{Error, Result};

/// Reference to either a fit parameter or a user function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOrFunc {
    /// 0-based parameter index
    Param(usize),
    /// 0-based function index
    Func(usize),
}

impl ParamOrFunc {
    /// Interpret a 1-based parameter number, or an offset function number
    ///
    /// ```rust
    /// # use musrtools_asymmetry::ParamOrFunc;
    /// assert_eq!(ParamOrFunc::from_number(3), Some(ParamOrFunc::Param(2)));
    /// assert_eq!(ParamOrFunc::from_number(20_001), Some(ParamOrFunc::Func(1)));
    /// assert_eq!(ParamOrFunc::from_number(0), None);
    /// ```
    pub fn from_number(number: usize) -> Option<Self> {
        if number >= PARAM_FUN_OFFSET {
            Some(Self::Func(number - PARAM_FUN_OFFSET))
        } else {
            number.checked_sub(1).map(Self::Param)
        }
    }

    /// Current value from parameters and function values
    ///
    /// Indices have been checked when the mode was built, anything missing
    /// is taken as 1.
    pub fn value(&self, par: &[f64], funcs: &[f64]) -> f64 {
        match self {
            Self::Param(i) => par.get(*i).copied().unwrap_or(1.0),
            Self::Func(i) => funcs.get(*i).copied().unwrap_or(1.0),
        }
    }
}

/// Which of alpha and beta differ from one
///
/// Built once per run from the parameter list. A parameter counts as one
/// only if it is fixed at exactly 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaBetaMode {
    /// alpha = beta = 1
    Fixed,
    /// beta = 1
    AlphaOnly(ParamOrFunc),
    /// alpha = 1
    BetaOnly(ParamOrFunc),
    /// Neither is one
    Both(ParamOrFunc, ParamOrFunc),
}

impl AlphaBetaMode {
    /// Build the mode from the alpha/beta numbers of a run
    ///
    /// Alpha is required. A missing beta is taken as fixed to one.
    pub fn new(
        run_name: &str,
        alpha: Option<usize>,
        beta: Option<usize>,
        params: &[Parameter],
        n_functions: usize,
    ) -> Result<Self> {
        let alpha = alpha.ok_or_else(|| Error::MissingAlpha(run_name.to_string()))?;
        let alpha = checked_reference("alpha", alpha, params.len(), n_functions)?;
        let alpha_is_one = fixed_to_one(alpha, params);

        let beta = match beta {
            Some(number) => Some(checked_reference("beta", number, params.len(), n_functions)?),
            None => None,
        };
        let beta_is_one = beta.map(|b| fixed_to_one(b, params)).unwrap_or(true);

        Ok(match (alpha_is_one, beta_is_one, beta) {
            (true, true, _) => Self::Fixed,
            (false, true, _) => Self::AlphaOnly(alpha),
            (true, false, Some(b)) => Self::BetaOnly(b),
            (false, false, Some(b)) => Self::Both(alpha, b),
            (_, false, None) => Self::AlphaOnly(alpha),
        })
    }

    /// The numeric tag, 1 to 4
    pub fn tag(&self) -> u8 {
        match self {
            Self::Fixed => 1,
            Self::AlphaOnly(_) => 2,
            Self::BetaOnly(_) => 3,
            Self::Both(..) => 4,
        }
    }

    /// Alpha and beta for a parameter set
    pub fn values(&self, par: &[f64], funcs: &[f64]) -> (f64, f64) {
        match self {
            Self::Fixed => (1.0, 1.0),
            Self::AlphaOnly(a) => (a.value(par, funcs), 1.0),
            Self::BetaOnly(b) => (1.0, b.value(par, funcs)),
            Self::Both(a, b) => (a.value(par, funcs), b.value(par, funcs)),
        }
    }

    /// Map a raw polarisation onto the measured asymmetry
    ///
    /// `A = (f (a b + 1) - (a - 1)) / ((a + 1) - f (a b - 1))`, which reduces
    /// to `f` for alpha = beta = 1.
    ///
    /// ```rust
    /// # use musrtools_asymmetry::{AlphaBetaMode, ParamOrFunc};
    /// let mode = AlphaBetaMode::AlphaOnly(ParamOrFunc::Param(0));
    /// let a = mode.evaluate(0.0, &[3.0], &[]);
    /// assert_eq!(a, -2.0 / 4.0);
    /// assert_eq!(AlphaBetaMode::Fixed.evaluate(0.2, &[], &[]), 0.2);
    /// ```
    pub fn evaluate(&self, f: f64, par: &[f64], funcs: &[f64]) -> f64 {
        match self {
            Self::Fixed => f,
            _ => {
                let (a, b) = self.values(par, funcs);
                (f * (a * b + 1.0) - (a - 1.0)) / ((a + 1.0) - f * (a * b - 1.0))
            }
        }
    }
}

fn checked_reference(
    name: &'static str,
    number: usize,
    n_params: usize,
    n_functions: usize,
) -> Result<ParamOrFunc> {
    let out_of_bounds = |available| Error::ParameterOutOfBounds {
        name,
        number,
        available,
    };
    match ParamOrFunc::from_number(number) {
        Some(ParamOrFunc::Param(i)) if i < n_params => Ok(ParamOrFunc::Param(i)),
        Some(ParamOrFunc::Func(i)) if i < n_functions => Ok(ParamOrFunc::Func(i)),
        Some(ParamOrFunc::Func(_)) => Err(out_of_bounds(n_functions)),
        _ => Err(out_of_bounds(n_params)),
    }
}

fn fixed_to_one(reference: ParamOrFunc, params: &[Parameter]) -> bool {
    match reference {
        ParamOrFunc::Param(i) => params
            .get(i)
            .map(|p| p.is_fixed() && p.value == 1.0)
            .unwrap_or(false),
        ParamOrFunc::Func(_) => false,
    }
}

/// Asymmetry of a single forward/backward pair
///
/// Returns `(A, dA)` with `A = (f - b)/(f + b)`, or `(0, 1)` if `f + b` is
/// zero.
///
/// ```rust
/// # use musrtools_asymmetry::asymmetry_value;
/// let (a, _) = asymmetry_value(100.0, 10.0, 50.0, 5.0);
/// assert!((a - 1.0 / 3.0).abs() < 1e-12);
/// assert_eq!(asymmetry_value(0.0, 1.0, 0.0, 1.0), (0.0, 1.0));
/// ```
pub fn asymmetry_value(f: f64, df: f64, b: f64, db: f64) -> (f64, f64) {
    corrected_asymmetry_value(f, df, b, db, 1.0, 1.0)
}

/// Alpha/beta corrected asymmetry `(a f - b)/(a b f + b)`
///
/// The error keeps the uncorrected form.
pub fn corrected_asymmetry_value(
    f: f64,
    df: f64,
    b: f64,
    db: f64,
    alpha: f64,
    beta: f64,
) -> (f64, f64) {
    let sum = f + b;
    if sum == 0.0 {
        return (0.0, 1.0);
    }
    let value = (alpha * f - b) / (alpha * beta * f + b);
    let error = 2.0 / (sum * sum) * (b * b * df * df + f * f * db * db).sqrt();
    (value, error)
}

/// Asymmetry of two packed channels, bin by bin
///
/// The shorter channel limits the number of bins.
pub fn build_asymmetry(forward: &Channel, backward: &Channel) -> Channel {
    build_corrected_asymmetry(forward, backward, 1.0, 1.0)
}

/// Alpha/beta corrected asymmetry of two packed channels
pub fn build_corrected_asymmetry(
    forward: &Channel,
    backward: &Channel,
    alpha: f64,
    beta: f64,
) -> Channel {
    let (values, errors) = (0..forward.len().min(backward.len()))
        .map(|i| {
            corrected_asymmetry_value(
                forward.values[i],
                forward.errors[i],
                backward.values[i],
                backward.errors[i],
                alpha,
                beta,
            )
        })
        .unzip();
    Channel { values, errors }
}

/// Difference of the positive and negative helicity asymmetries
///
/// Errors add in quadrature. Each helicity falls back to `(0, 1)` on its own
/// when its forward and backward sum is zero.
pub fn build_helicity_asymmetry(
    forward: [&Channel; 2],
    backward: [&Channel; 2],
    alpha: f64,
    beta: f64,
) -> Channel {
    let n = forward
        .iter()
        .chain(backward.iter())
        .map(|c| c.len())
        .min()
        .unwrap_or(0);

    let (values, errors) = (0..n)
        .map(|i| {
            let (ap, dap) = corrected_asymmetry_value(
                forward[0].values[i],
                forward[0].errors[i],
                backward[0].values[i],
                backward[0].errors[i],
                alpha,
                beta,
            );
            let (am, dam) = corrected_asymmetry_value(
                forward[1].values[i],
                forward[1].errors[i],
                backward[1].values[i],
                backward[1].errors[i],
                alpha,
                beta,
            );
            (ap - am, (dap * dap + dam * dam).sqrt())
        })
        .unzip();
    Channel { values, errors }
}

#[cfg(test)]
mod asymmetry_tests {
    use super::*;

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::new("alpha", 1.0, 0.0),
            Parameter::new("beta", 1.0, 0.0),
            Parameter::new("alpha_free", 1.0, 0.01),
            Parameter::new("beta_fixed", 0.9, 0.0),
        ]
    }

    #[test]
    fn tags_from_parameters() {
        let p = params();
        assert_eq!(AlphaBetaMode::new("r", Some(1), None, &p, 0).unwrap().tag(), 1);
        assert_eq!(AlphaBetaMode::new("r", Some(1), Some(2), &p, 0).unwrap().tag(), 1);
        assert_eq!(AlphaBetaMode::new("r", Some(3), Some(2), &p, 0).unwrap().tag(), 2);
        assert_eq!(AlphaBetaMode::new("r", Some(1), Some(4), &p, 0).unwrap().tag(), 3);
        assert_eq!(AlphaBetaMode::new("r", Some(3), Some(4), &p, 0).unwrap().tag(), 4);
        // functions are never fixed to one
        assert_eq!(
            AlphaBetaMode::new("r", Some(20_000), None, &p, 1).unwrap(),
            AlphaBetaMode::AlphaOnly(ParamOrFunc::Func(0))
        );
    }

    #[test]
    fn configuration_errors() {
        let p = params();
        assert!(matches!(
            AlphaBetaMode::new("r", None, None, &p, 0),
            Err(Error::MissingAlpha(_))
        ));
        assert!(matches!(
            AlphaBetaMode::new("r", Some(5), None, &p, 0),
            Err(Error::ParameterOutOfBounds { name: "alpha", .. })
        ));
        assert!(matches!(
            AlphaBetaMode::new("r", Some(1), Some(20_002), &p, 2),
            Err(Error::ParameterOutOfBounds { name: "beta", .. })
        ));
    }

    #[test]
    fn evaluate_inverts_correction() {
        // forming the corrected asymmetry from counts generated by the model
        // must give back the polarisation
        let (alpha, beta) = (1.2, 0.9);
        let mode = AlphaBetaMode::Both(ParamOrFunc::Param(0), ParamOrFunc::Param(1));
        let polarisation = 0.18;
        let a = mode.evaluate(polarisation, &[alpha, beta], &[]);
        let (f, b) = (1.0 + a, 1.0 - a);
        let (corrected, _) = corrected_asymmetry_value(f, 0.0, b, 0.0, alpha, beta);
        assert!((corrected - polarisation).abs() < 1e-12);
    }

    #[test]
    fn asymmetry_is_bounded() {
        for (f, b) in [(0.0, 3.0), (7.0, 0.0), (5.0, 5.0), (120.0, 33.0)] {
            let (a, _) = asymmetry_value(f, f.sqrt(), b, b.sqrt());
            assert!((-1.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn helicity_difference() {
        let fp = Channel {
            values: vec![3.0],
            errors: vec![0.1],
        };
        let bp = Channel {
            values: vec![1.0],
            errors: vec![0.1],
        };
        let empty = Channel {
            values: vec![0.0],
            errors: vec![1.0],
        };
        let a = build_helicity_asymmetry([&fp, &empty], [&bp, &empty], 1.0, 1.0);
        assert_eq!(a.values, vec![0.5]);
        let (_, dap) = asymmetry_value(3.0, 0.1, 1.0, 0.1);
        assert_eq!(a.errors, vec![(dap * dap + 1.0).sqrt()]);
    }
}
