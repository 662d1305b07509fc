use crate::f;

/// Extends primitives with more specific formatting options
pub trait ValueExt {
    /// Better scientific number formatting
    ///
    /// The default is not very consistent for scientific in particular, so this
    /// allows easy definition of the precision and exponent padding.
    ///
    /// ```rust
    /// # use musrtools_utils::ValueExt;
    /// assert_eq!((-1.0).sci(5, 2), "-1.00000e+00".to_string());
    /// assert_eq!((0.01355342).sci(3, 2), "1.355e-02".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: std::fmt::LowerExp> ValueExt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let num = f!("{:.precision$e}", &self, precision = precision);
        let Some((mantissa, exp)) = num.split_once('e') else {
            return num;
        };
        // Make sure the exponent is signed
        let (sign, exp) = match exp.strip_prefix('-') {
            Some(exp) => ('-', exp),
            None => ('+', exp),
        };
        f!("{mantissa}e{sign}{exp:0>exp_pad$}")
    }
}
