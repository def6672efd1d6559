//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by the statistics helpers.
#[derive(Debug, Error, PartialEq)]
pub enum MathsError {
    #[error("Sample arrays have different lengths ({0} and {1})")]
    LengthMismatch(usize, usize),

    #[error("At least {0} samples are required, found {1}")]
    NotEnoughSamples(usize, usize),

    #[error("The independent samples have no spread, cannot fit a slope")]
    ZeroVariance
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The result of a least squares straight line fit `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,

    /// Coefficient of determination of the fit
    pub r_squared: f64
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Get the signed angular distance between two angles in the range of [0, 2pi].
///
/// This function will return the shortest signed distance between a and b accounting for wrapping
/// between 0 and 2pi.
pub fn get_ang_dist_2pi<T>(a: T, b: T) -> T
where
    T: Float
{
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();
    
    let c = rem_euclid(a - b, tau_t);
    let d = rem_euclid(b - a, tau_t);

    if c < d {
        -c
    }
    else {
        d
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Fit a straight line through the samples using ordinary least squares.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Result<LinearFit, MathsError> {
    if xs.len() != ys.len() {
        return Err(MathsError::LengthMismatch(xs.len(), ys.len()));
    }
    if xs.len() < 2 {
        return Err(MathsError::NotEnoughSamples(2, xs.len()));
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxx = 0f64;
    let mut sxy = 0f64;
    let mut syy = 0f64;
    for (x, y) in xs.iter().zip(ys.iter()) {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
        syy += (y - mean_y).powi(2);
    }

    if sxx <= std::f64::EPSILON {
        return Err(MathsError::ZeroVariance);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    // A perfectly flat response is perfectly explained by the fit
    let r_squared = if syy <= std::f64::EPSILON {
        1.0
    }
    else {
        (sxy * sxy) / (sxx * syy)
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_squared
    })
}
