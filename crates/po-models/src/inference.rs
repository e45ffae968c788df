//! Reference distributions for tests and intervals
//!
//! Thin wrappers over `statrs` that return `NaN` instead of failing when a
//! statistic or its degrees of freedom are not usable, so a degenerate fit
//! still produces a complete coefficient table.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use statrs::function::erf::{erf_inv, erfc};

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile
pub fn normal_quantile(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

/// Two-sided p-value of a z statistic
pub fn pvalue_z(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    (2.0 * normal_cdf(-z.abs())).clamp(0.0, 1.0)
}

/// Two-sided p-value of a t statistic with `df` degrees of freedom
pub fn pvalue_t(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail probability of a χ² statistic
pub fn pvalue_chi2(stat: f64, df: f64) -> f64 {
    if stat.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    match ChiSquared::new(df) {
        Ok(dist) => dist.sf(stat.max(0.0)),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail probability of an F statistic
pub fn pvalue_f(stat: f64, df1: f64, df2: f64) -> f64 {
    if stat.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(stat.max(0.0)),
        Err(_) => f64::NAN,
    }
}

/// Two-sided normal critical value for the given confidence level
pub fn z_critical(confidence: f64) -> f64 {
    normal_quantile(1.0 - (1.0 - confidence) / 2.0)
}

/// Two-sided Student t critical value for the given confidence level
pub fn t_critical(confidence: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => dist.inverse_cdf(1.0 - (1.0 - confidence) / 2.0),
        Err(_) => f64::NAN,
    }
}
