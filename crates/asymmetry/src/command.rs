//! Parser for the `FIT_RANGE fgb+n0 lgb-n1` command

// internal modules
use crate::error::{Error, Result};

// external crates
use log::error;

// nom parser combinators
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, i64 as integer};
use nom::combinator::{all_consuming, map, opt};
use nom::sequence::preceded;
use nom::IResult;

/// `fgb` with an optional `+n` offset
fn first_good_bin(i: &str) -> IResult<&str, i64> {
    map(
        preceded(tag_no_case("fgb"), opt(preceded(char('+'), integer))),
        |offset| offset.unwrap_or(0),
    )(i)
}

/// `lgb` with an optional `-n` offset
fn last_good_bin(i: &str) -> IResult<&str, i64> {
    map(
        preceded(tag_no_case("lgb"), opt(preceded(char('-'), integer))),
        |offset| offset.unwrap_or(0),
    )(i)
}

/// Bin offsets `(n0, n1)` for the given run of a fit range command
///
/// A single `fgb lgb` pair applies to every run. With several pairs, one pair
/// per run is expected and `run_no` (0-based) selects it.
///
/// ```rust
/// # use musrtools_asymmetry::parse_fit_range_bins;
/// assert_eq!(parse_fit_range_bins("FIT_RANGE fgb+2 lgb-10", 3).unwrap(), (2, 10));
/// assert_eq!(parse_fit_range_bins("FIT_RANGE fgb lgb fgb+1 lgb-1", 1).unwrap(), (1, 1));
/// assert!(parse_fit_range_bins("FIT_RANGE fgb+2", 0).is_err());
/// ```
pub fn parse_fit_range_bins(command: &str, run_no: usize) -> Result<(i64, i64)> {
    let invalid = || Error::InvalidFitRangeCommand(command.to_string());
    let tokens: Vec<&str> = command.split_whitespace().collect();

    if tokens.first().map(|t| t.eq_ignore_ascii_case("FIT_RANGE")) != Some(true) {
        return Err(invalid());
    }

    let pos = if tokens.len() == 3 {
        1
    } else if tokens.len() > 3 && tokens.len() % 2 == 1 {
        2 * (run_no + 1) - 1
    } else {
        error!("AsymmetryRun::set_fit_range_bin(): invalid number of tokens in \"{command}\"");
        return Err(invalid());
    };

    let (Some(first), Some(last)) = (tokens.get(pos), tokens.get(pos + 1)) else {
        error!("AsymmetryRun::set_fit_range_bin(): no fit range given for run {run_no} in \"{command}\"");
        return Err(invalid());
    };

    let (_, n0) = all_consuming(first_good_bin)(first).map_err(|_| invalid())?;
    let (_, n1) = all_consuming(last_good_bin)(last).map_err(|_| invalid())?;
    Ok((n0, n1))
}
