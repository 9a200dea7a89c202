//! Parametric curve families for age-to-age development factors
//!
//! Each family linearises the factors with its own transform and is fitted
//! by least squares in the transformed space:
//!
//! | Family        | Curve                          | Linear form                        |
//! |---------------|--------------------------------|------------------------------------|
//! | Exponential   | `1 + A·exp(s·t)`               | `ln(f - 1) = ln A + s·t`           |
//! | Weibull       | `1 / (1 - exp(-A·t^s))`        | `ln(ln(f / (f - 1))) = ln A + s·ln t` |
//! | Power         | `exp(exp(i + s·t))`            | `ln(ln f) = i + s·t`               |
//! | Inverse power | `1 + A·(t + c)^s`              | `ln(f - 1) = ln A + s·ln(t + c)`   |
//!
//! Goodness of fit is the R² between the transformed factors and the
//! transformed fitted values.

use super::fit::weighted_line;
use crate::triangle::Triangle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offsets `c` tried for the inverse power curve; the best R² wins
pub const INVERSE_POWER_OFFSETS: [f64; 4] = [-0.5, 1.0, 3.0, 5.0];

/// Parametric form of the age-to-age factor curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveFamily {
    /// `1 + A·exp(s·t)`
    Exponential,

    /// `1 / (1 - exp(-A·t^s))`
    Weibull,

    /// `exp(exp(i + s·t))`
    Power,

    /// `1 + A·(t + c)^s` with `c` from [`INVERSE_POWER_OFFSETS`]
    InversePower,
}

impl CurveFamily {
    pub const ALL: [CurveFamily; 4] = [
        CurveFamily::Exponential,
        CurveFamily::Weibull,
        CurveFamily::Power,
        CurveFamily::InversePower,
    ];

    /// Linearising transform of a factor; non-finite when `factor <= 1`
    fn transform(self, factor: f64) -> f64 {
        match self {
            CurveFamily::Exponential | CurveFamily::InversePower => (factor - 1.0).ln(),
            CurveFamily::Weibull => (factor / (factor - 1.0)).ln().ln(),
            CurveFamily::Power => factor.ln().ln(),
        }
    }

    fn regressor(self, period: f64, offset: f64) -> f64 {
        match self {
            CurveFamily::Exponential | CurveFamily::Power => period,
            CurveFamily::Weibull => period.ln(),
            CurveFamily::InversePower => (period + offset).ln(),
        }
    }

    /// Factor from a value of the linear form
    fn invert(self, linear: f64) -> f64 {
        match self {
            CurveFamily::Exponential | CurveFamily::InversePower => 1.0 + linear.exp(),
            CurveFamily::Weibull => 1.0 / (1.0 - (-linear.exp()).exp()),
            CurveFamily::Power => linear.exp().exp(),
        }
    }
}

impl fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurveFamily::Exponential => "Exponential",
            CurveFamily::Weibull => "Weibull",
            CurveFamily::Power => "Power",
            CurveFamily::InversePower => "Inverse Power",
        };
        f.write_str(name)
    }
}

/// One fitted curve with its goodness of fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveFit {
    pub family: CurveFamily,

    /// Slope of the linear form
    pub slope: f64,

    /// Intercept of the linear form
    pub intercept: f64,

    /// Period offset `c`; zero for every family but the inverse power
    pub offset: f64,

    /// R² in the transformed space
    pub r_squared: f64,
}

impl CurveFit {
    /// Fitted age-to-age factor for the 1-based development period `period`
    pub fn predict(&self, period: f64) -> f64 {
        let x = self.family.regressor(period, self.offset);
        self.family.invert(self.intercept + self.slope * x)
    }
}

/// Squared sample correlation of `actual` and `fitted`
///
/// `NaN` when either series has no variance or fewer than two points.
pub fn r_squared(actual: &[f64], fitted: &[f64]) -> f64 {
    let n = actual.len().min(fitted.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_a = actual[..n].iter().sum::<f64>() / n as f64;
    let mean_f = fitted[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_f = 0.0;
    for (a, f) in actual.iter().zip(fitted) {
        cov += (a - mean_a) * (f - mean_f);
        var_a += (a - mean_a).powi(2);
        var_f += (f - mean_f).powi(2);
    }

    if var_a == 0.0 || var_f == 0.0 {
        return f64::NAN;
    }
    cov * cov / (var_a * var_f)
}

/// Fit one family to `factors` observed at the 1-based `periods`
///
/// Points whose transform is not finite (factors at or below 1) are left
/// out. Returns `None` when fewer than two distinct periods remain.
pub fn fit_curve(family: CurveFamily, factors: &[f64], periods: &[usize]) -> Option<CurveFit> {
    match family {
        CurveFamily::InversePower => INVERSE_POWER_OFFSETS
            .iter()
            .filter_map(|&offset| fit_with_offset(family, factors, periods, offset))
            .fold(None, |best: Option<CurveFit>, fit| match best {
                Some(b) if fit.r_squared.is_nan() || b.r_squared >= fit.r_squared => Some(b),
                _ => Some(fit),
            }),
        _ => fit_with_offset(family, factors, periods, 0.0),
    }
}

fn fit_with_offset(family: CurveFamily, factors: &[f64], periods: &[usize], offset: f64) -> Option<CurveFit> {
    let (x, y): (Vec<f64>, Vec<f64>) = factors
        .iter()
        .zip(periods)
        .filter_map(|(&f, &t)| {
            let x = family.regressor(t as f64, offset);
            let y = family.transform(f);
            (x.is_finite() && y.is_finite()).then_some((x, y))
        })
        .unzip();

    let (slope, intercept) = weighted_line(x.iter().zip(&y).map(|(&x, &y)| (x, y, 1.0)))?;
    let fitted: Vec<f64> = x.iter().map(|x| intercept + slope * x).collect();

    Some(CurveFit {
        family,
        slope,
        intercept,
        offset,
        r_squared: r_squared(&y, &fitted),
    })
}

/// Fit every family; families that cannot be fitted are skipped
pub fn fit_curves(factors: &[f64], periods: &[usize]) -> Vec<CurveFit> {
    CurveFamily::ALL
        .iter()
        .filter_map(|&family| fit_curve(family, factors, periods))
        .collect()
}

/// Fit with the highest R², ignoring `NaN`
pub fn best_curve(fits: &[CurveFit]) -> Option<&CurveFit> {
    fits.iter()
        .filter(|fit| fit.r_squared.is_finite())
        .max_by(|a, b| a.r_squared.total_cmp(&b.r_squared))
}

/// Volume-weighted age-to-age factors `Σ C[i, j+1] / Σ C[i, j]`
///
/// Only rows observed at both ages count. A column without such rows, or with
/// a zero denominator, yields `NaN`.
pub fn age_to_age_factors(triangle: &Triangle) -> Vec<f64> {
    (0..triangle.cols().saturating_sub(1))
        .map(|j| {
            let (next, current) = (0..triangle.rows())
                .filter(|&i| triangle.is_finite_at(i, j) && triangle.is_finite_at(i, j + 1))
                .fold((0.0, 0.0), |(n, c), i| (n + triangle[(i, j + 1)], c + triangle[(i, j)]));
            if current == 0.0 {
                f64::NAN
            } else {
                next / current
            }
        })
        .collect()
}
