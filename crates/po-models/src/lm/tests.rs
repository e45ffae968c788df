//! Tests for linear regression models
//!
//! OLS values are checked against hand-computed results for small
//! datasets; robust and Bayesian fits are checked on seeded simulations.

use approx::assert_abs_diff_eq;
use ndarray::array;

use crate::{
    base::{ErrorKind, FittedModel, ModelError},
    lm::{
        BayesConfig, BayesianRegression, DiagnosticsConfig, LinearConfig,
        LinearRegression, RobustConfig, RobustMethod, RobustRegression, StandardErrorType,
        diagnostics::Diagnostics, lm, rlm,
    },
};
use po_core::data::{DataFrame, DataFrameBuilder, Series, Simulator};

// ==================== Test Fixtures ====================

/// x = 1..5, y = [2, 4, 5, 4, 5]: b = 0.6, a = 2.2, RSS = 2.4
fn textbook_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap()
        .with_column("y", Series::float(vec![2.0, 4.0, 5.0, 4.0, 5.0]))
        .unwrap()
        .build()
        .unwrap()
}

/// Exact relationship y = 2x
fn exact_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap()
        .with_column("y", Series::float(vec![2.0, 4.0, 6.0, 8.0, 10.0]))
        .unwrap()
        .build()
        .unwrap()
}

/// y = 1 + 2x1 + 3x2 without noise
fn multiple_regression_data() -> DataFrame {
    let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let x2 = vec![2.0, 1.0, 4.0, 3.0, 6.0, 5.0];
    let y: Vec<f64> = x1.iter().zip(&x2).map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b).collect();
    DataFrameBuilder::new()
        .with_column("x1", Series::float(x1))
        .unwrap()
        .with_column("x2", Series::float(x2))
        .unwrap()
        .with_column("y", Series::float(y))
        .unwrap()
        .build()
        .unwrap()
}

/// Seeded y = 1 + 0.8 x + N(0, 1) with an unrelated predictor z
fn noisy_data(n: usize, seed: u64) -> DataFrame {
    Simulator::new(n, seed)
        .normal("x", 0.0, 1.0)
        .unwrap()
        .normal("z", 0.0, 1.0)
        .unwrap()
        .linear("y", 1.0, &[("x", 0.8)], 1.0)
        .unwrap()
        .build()
}

/// y = 1 + 2x + N(0, 0.5²), with cases beyond x > 1.2 shifted down by 12
fn contaminated_data() -> (DataFrame, Vec<usize>) {
    let mut df = Simulator::new(100, 7)
        .normal("x", 0.0, 1.0)
        .unwrap()
        .linear("y", 1.0, &[("x", 2.0)], 0.5)
        .unwrap()
        .build();

    let x = df.float_column("x").unwrap();
    let mut y = df.float_column("y").unwrap();
    let mut contaminated = Vec::new();
    for i in 0..x.len() {
        if x[i] > 1.2 {
            y[i] -= 12.0;
            contaminated.push(i + 1);
        }
    }
    df.set_column("y", Series::float(y)).unwrap();
    (df, contaminated)
}

// ==================== OLS ====================

#[test]
fn test_textbook_coefficients() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let result = model.result().unwrap();

    assert_abs_diff_eq!(result.coefficients[0], 2.2, epsilon = 1e-10);
    assert_abs_diff_eq!(result.coefficients[1], 0.6, epsilon = 1e-10);
    assert_abs_diff_eq!(result.rss(), 2.4, epsilon = 1e-10);
    assert_abs_diff_eq!(result.sigma(), 0.8_f64.sqrt(), epsilon = 1e-10);
    assert_eq!(result.variable_names, vec!["(Intercept)", "x"]);
}

#[test]
fn test_textbook_inference() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let result = model.result().unwrap();

    assert_abs_diff_eq!(result.standard_errors[0], 0.938083, epsilon = 1e-6);
    assert_abs_diff_eq!(result.standard_errors[1], 0.282843, epsilon = 1e-6);
    assert_abs_diff_eq!(result.t_statistics[1], 2.121320, epsilon = 1e-6);
    assert_abs_diff_eq!(result.p_values[1], 0.124, epsilon = 0.005);

    // t(0.975, 3) = 3.182446
    assert_abs_diff_eq!(result.ci_lower[1], 0.6 - 3.182446 * 0.282843, epsilon = 1e-5);
    assert_abs_diff_eq!(result.ci_upper[1], 0.6 + 3.182446 * 0.282843, epsilon = 1e-5);

    let slope = result.coefficient("x").unwrap();
    assert_eq!(slope.std_error, Some(result.standard_errors[1]));
    assert!(!slope.is_intercept);
    assert!(result.coefficient("(Intercept)").unwrap().is_intercept);
}

#[test]
fn test_textbook_model_statistics() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let stats = model.result().unwrap().model_statistics;

    assert_abs_diff_eq!(stats.r_squared.unwrap(), 0.6, epsilon = 1e-10);
    assert_abs_diff_eq!(stats.adj_r_squared.unwrap(), 0.466667, epsilon = 1e-6);
    assert_abs_diff_eq!(stats.f_statistic.unwrap(), 4.5, epsilon = 1e-10);
    assert_abs_diff_eq!(stats.f_p_value.unwrap(), 0.124, epsilon = 0.005);
    assert_abs_diff_eq!(stats.log_likelihood.unwrap(), -5.259770, epsilon = 1e-5);
    assert_abs_diff_eq!(stats.aic.unwrap(), 16.519540, epsilon = 1e-5);
    assert_eq!(stats.df_residual, Some(3));
    assert_eq!(stats.df_model, Some(1));
}

#[test]
fn test_exact_fit() {
    let model = lm("y ~ x", &exact_data()).unwrap();
    let result = model.result().unwrap();

    assert_abs_diff_eq!(result.coefficients[0], 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(result.coefficients[1], 2.0, epsilon = 1e-10);
    assert_abs_diff_eq!(result.r_squared().unwrap(), 1.0, epsilon = 1e-12);
    for r in result.residuals.iter() {
        assert_abs_diff_eq!(*r, 0.0, epsilon = 1e-10);
    }
    assert!(result.is_perfect_fit());
}

#[test]
fn test_no_intercept() {
    let model = LinearRegression::new("y ~ x")
        .unwrap()
        .data(&exact_data())
        .no_intercept()
        .fit()
        .unwrap();
    let result = model.result().unwrap();

    assert_eq!(result.n_predictors(), 1);
    assert!(!result.has_intercept);
    assert_abs_diff_eq!(result.coefficients[0], 2.0, epsilon = 1e-10);

    let zero_plus = lm("y ~ 0 + x", &exact_data()).unwrap();
    assert_eq!(zero_plus.result().unwrap().variable_names, vec!["x"]);
}

#[test]
fn test_multiple_regression() {
    let model = lm("y ~ x1 + x2", &multiple_regression_data()).unwrap();
    let coefs = model.estimates().unwrap();

    assert_abs_diff_eq!(coefs[0], 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coefs[1], 2.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coefs[2], 3.0, epsilon = 1e-8);
}

#[test]
fn test_refit_is_bit_identical() {
    let df = noisy_data(200, 11);
    let first = lm("y ~ x + z", &df).unwrap();
    let second = lm("y ~ x + z", &df).unwrap();

    let (a, b) = (first.result().unwrap(), second.result().unwrap());
    assert_eq!(a.coefficients, b.coefficients);
    assert_eq!(a.standard_errors, b.standard_errors);
    assert_eq!(a.residuals, b.residuals);
}

#[test]
fn test_categorical_predictor() {
    let df = DataFrameBuilder::new()
        .with_column("group", Series::categorical(&["A", "A", "A", "B", "B", "B"]))
        .unwrap()
        .with_column("y", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .unwrap()
        .build()
        .unwrap();

    let model = lm("y ~ group", &df).unwrap();
    let result = model.result().unwrap();

    assert_eq!(result.variable_names, vec!["(Intercept)", "group[B]"]);
    assert_abs_diff_eq!(result.coefficients[0], 2.0, epsilon = 1e-10);
    assert_abs_diff_eq!(result.coefficients[1], 3.0, epsilon = 1e-10);
}

#[test]
fn test_prediction() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let new_data = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![6.0, 7.0]))
        .unwrap()
        .with_column("y", Series::float(vec![0.0, 0.0]))
        .unwrap()
        .build()
        .unwrap();

    let predictions = model.predict(&new_data).unwrap();
    assert_abs_diff_eq!(predictions[0], 5.8, epsilon = 1e-10);
    assert_abs_diff_eq!(predictions[1], 6.4, epsilon = 1e-10);

    let result = model.result().unwrap();
    let x_new = array![[1.0, 3.0]];
    let (lo, hi) = result.predict_ci(&x_new, 0.95);
    let (plo, phi) = result.predict_pi(&x_new, 0.95);
    assert!(lo[0] < 4.0 && hi[0] > 4.0);
    assert!(plo[0] < lo[0] && phi[0] > hi[0]);
}

#[test]
fn test_heteroscedasticity_consistent_errors() {
    let df = textbook_data();
    let expected = [
        (StandardErrorType::HC0, 0.185472),
        (StandardErrorType::HC1, 0.239444),
        (StandardErrorType::HC3, 0.429760),
    ];

    for (se_type, slope_se) in expected {
        let model = LinearRegression::new("y ~ x")
            .unwrap()
            .data(&df)
            .se_type(se_type)
            .fit()
            .unwrap();
        let result = model.result().unwrap();
        assert_abs_diff_eq!(result.standard_errors[1], slope_se, epsilon = 1e-6);
        // point estimates do not depend on the covariance estimator
        assert_abs_diff_eq!(result.coefficients[1], 0.6, epsilon = 1e-10);
    }
}

#[test]
fn test_summary_display() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let summary = model.summary().unwrap();

    assert_eq!(summary.n_obs, 5);
    assert_eq!(summary.n_predictors, 2);
    let text = summary.to_string();
    assert!(text.contains("y ~ x"));
    assert!(text.contains("(Intercept)"));
}

// ==================== Errors ====================

#[test]
fn test_zero_variance_predictor() {
    let df = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![3.0, 3.0, 3.0, 3.0]))
        .unwrap()
        .with_column("y", Series::float(vec![1.0, 2.0, 3.0, 4.0]))
        .unwrap()
        .build()
        .unwrap();

    let err = lm("y ~ x", &df).unwrap_err();
    assert!(matches!(err, ModelError::ZeroVariance { ref variable } if variable == "x"));
    assert_eq!(err.kind(), ErrorKind::EstimationFailure);
}

/// x = i·1e-7, y = 2x with ±1e-9 alternating noise
fn small_scale_data() -> DataFrame {
    let x: Vec<f64> = (1..=20).map(|i| i as f64 * 1e-7).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, v)| 2.0 * v + if i % 2 == 0 { 1e-9 } else { -1e-9 })
        .collect();
    DataFrameBuilder::new()
        .with_column("x", Series::float(x))
        .unwrap()
        .with_column("y", Series::float(y))
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_small_scale_predictor_is_not_constant() {
    let model = lm("y ~ x", &small_scale_data()).unwrap();
    assert_abs_diff_eq!(model.estimates().unwrap()[1], 2.0, epsilon = 1e-3);

    let tiny_constant = small_scale_data()
        .with_column("c", Series::float(vec![1e-7; 20]))
        .unwrap();
    let err = lm("y ~ c", &tiny_constant).unwrap_err();
    assert!(matches!(err, ModelError::ZeroVariance { ref variable } if variable == "c"));
}

#[test]
fn test_collinear_predictors() {
    let df = DataFrameBuilder::new()
        .with_column("x1", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap()
        .with_column("x2", Series::float(vec![2.0, 4.0, 6.0, 8.0, 10.0]))
        .unwrap()
        .with_column("y", Series::float(vec![1.0, 3.0, 2.0, 5.0, 4.0]))
        .unwrap()
        .build()
        .unwrap();

    let err = lm("y ~ x1 + x2", &df).unwrap_err();
    assert!(matches!(err, ModelError::SingularMatrix { .. }));
    assert_eq!(err.kind(), ErrorKind::EstimationFailure);
}

#[test]
fn test_insufficient_data() {
    let df = DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0]))
        .unwrap()
        .with_column("y", Series::float(vec![1.0, 3.0]))
        .unwrap()
        .build()
        .unwrap();

    assert!(matches!(
        lm("y ~ x", &df),
        Err(ModelError::InsufficientData {
            n_samples: 2,
            n_predictors: 2
        })
    ));
}

#[test]
fn test_unfitted_and_missing_data() {
    let model = LinearRegression::new("y ~ x").unwrap();
    assert!(matches!(model.summary(), Err(ModelError::NotFitted)));
    assert!(model.estimates().is_none());
    assert!(matches!(model.fit(), Err(ModelError::NoData)));
}

#[test]
fn test_missing_column_is_data_shape_error() {
    let err = lm("y ~ w", &textbook_data()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataShapeError);
}

#[test]
fn test_invalid_confidence_level() {
    let config = LinearConfig {
        confidence_level: 1.5,
        ..LinearConfig::default()
    };
    let err = LinearRegression::new("y ~ x")
        .unwrap()
        .data(&textbook_data())
        .config(config)
        .fit()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SpecificationError);
}

// ==================== Diagnostics ====================

#[test]
fn test_textbook_diagnostics() {
    let model = lm("y ~ x", &textbook_data()).unwrap();
    let diag = model.diagnostics(&DiagnosticsConfig::default()).unwrap();

    let leverage = diag.leverages();
    for (h, expected) in leverage.iter().zip([0.6, 0.3, 0.2, 0.3, 0.6]) {
        assert_abs_diff_eq!(*h, expected, epsilon = 1e-10);
    }
    assert_abs_diff_eq!(leverage.sum(), 2.0, epsilon = 1e-10);

    let cooks = diag.cooks_distances();
    assert_abs_diff_eq!(cooks[0], 1.5, epsilon = 1e-10);
    assert_abs_diff_eq!(cooks[2], 0.1953125, epsilon = 1e-10);
    assert_abs_diff_eq!(cooks[4], 0.09375, epsilon = 1e-10);
    assert_eq!(diag.influential_cases, vec![1]);

    let third = diag.case(3).unwrap();
    assert_abs_diff_eq!(third.residual, 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(third.standardized_residual, 1.25, epsilon = 1e-10);
    assert_abs_diff_eq!(third.studentized_residual, 1.474420, epsilon = 1e-5);

    let dw = diag.durbin_watson.unwrap();
    assert_abs_diff_eq!(dw.statistic, 2.016667, epsilon = 1e-6);
    assert_abs_diff_eq!(dw.autocorrelation, 1.0 - 2.016667 / 2.0, epsilon = 1e-6);
}

#[test]
fn test_diagnostics_on_perfect_fit() {
    let model = lm("y ~ x", &exact_data()).unwrap();
    let diag = model.diagnostics(&DiagnosticsConfig::default()).unwrap();

    assert!(diag.records.iter().all(|r| r.cooks_distance == 0.0));
    assert!(diag.records.iter().all(|r| r.standardized_residual == 0.0));
    assert!(diag.influential_cases.is_empty());
}

#[test]
fn test_residual_proportions_for_normal_data() {
    let df = noisy_data(2000, 42);
    let model = lm("y ~ x", &df).unwrap();
    let diag = model.diagnostics(&DiagnosticsConfig::default()).unwrap();

    assert!(diag.proportions.above_1_96 > 0.03 && diag.proportions.above_1_96 < 0.07);
    assert!(diag.proportions.above_2_58 < diag.proportions.above_1_96);
    assert!(diag.records.iter().all(|r| r.cooks_distance >= 0.0 && r.leverage >= 0.0));
    assert_abs_diff_eq!(diag.leverages().sum(), 2.0, epsilon = 1e-8);
}

#[test]
fn test_outlier_is_flagged_not_removed() {
    let mut df = noisy_data(30, 5);
    let mut y = df.float_column("y").unwrap();
    y[14] += 20.0;
    df.set_column("y", Series::float(y)).unwrap();

    let model = lm("y ~ x", &df).unwrap();
    let diag = model.diagnostics(&DiagnosticsConfig::default()).unwrap();

    assert!(diag.candidate_outliers.contains(&15));
    assert_eq!(diag.records.len(), 30);
    assert!(diag.case(15).unwrap().candidate_outlier);
}

#[test]
fn test_vif() {
    let df = Simulator::new(500, 3)
        .normal("x1", 0.0, 1.0)
        .unwrap()
        .normal("x2", 0.0, 1.0)
        .unwrap()
        .linear("x3", 0.0, &[("x1", 1.0)], 0.1)
        .unwrap()
        .linear("y", 0.0, &[("x1", 1.0), ("x2", 1.0)], 1.0)
        .unwrap()
        .build();

    let independent = lm("y ~ x1 + x2", &df).unwrap();
    let vif = &independent.diagnostics(&DiagnosticsConfig::default()).unwrap().vif;
    assert_eq!(vif.len(), 2);
    assert!(vif.iter().all(|v| v.vif >= 1.0 && v.vif < 1.1));

    let correlated = lm("y ~ x1 + x3", &df).unwrap();
    let vif = &correlated.diagnostics(&DiagnosticsConfig::default()).unwrap().vif;
    assert_eq!(vif[0].variable, "x1");
    assert!(vif[0].vif > 10.0);
    assert_abs_diff_eq!(vif[1].tolerance, 1.0 / vif[1].vif, epsilon = 1e-12);
}

#[test]
fn test_qq_points_are_symmetric() {
    let values = array![2.0, -1.0, 0.0, 1.0, -2.0];
    let qq = Diagnostics::qq_points(&values);

    assert_eq!(qq.len(), 5);
    assert_eq!(qq[0].sample, -2.0);
    assert_eq!(qq[4].sample, 2.0);
    assert_abs_diff_eq!(qq[2].theoretical, 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(qq[0].theoretical, -qq[4].theoretical, epsilon = 1e-12);
    assert!(qq.windows(2).all(|w| w[0].theoretical < w[1].theoretical));
}

// ==================== Robust Regression ====================

#[test]
fn test_psi_functions() {
    assert_abs_diff_eq!(RobustMethod::Huber.psi(3.0, 1.345), 1.345);
    assert_abs_diff_eq!(RobustMethod::Huber.psi(-0.5, 1.345), -0.5);
    assert_abs_diff_eq!(RobustMethod::Bisquare.psi(5.0, 4.685), 0.0);
    assert_abs_diff_eq!(RobustMethod::Hampel.psi(5.0, 2.0), 1.5);
    assert_abs_diff_eq!(RobustMethod::Hampel.psi(-3.0, 2.0), -2.0);
    assert_abs_diff_eq!(RobustMethod::Huber.weight(0.0, 1.345), 1.0);
    assert_abs_diff_eq!(RobustMethod::Huber.weight(2.69, 1.345), 0.5, epsilon = 1e-12);
}

#[test]
fn test_gaussian_efficiency_of_default_tunings() {
    for method in [RobustMethod::Huber, RobustMethod::Bisquare] {
        let eff = method.gaussian_efficiency(method.default_tuning());
        assert_abs_diff_eq!(eff, 0.95, epsilon = 0.005);
    }
}

#[test]
fn test_robust_matches_ols_on_clean_data() {
    let df = noisy_data(200, 21);
    let robust = rlm("y ~ x", &df, RobustMethod::Huber).unwrap();
    let result = robust.result().unwrap();

    for (rob, ols) in result.coefficients.iter().zip(result.ols.coefficients.iter()) {
        assert_abs_diff_eq!(*rob, *ols, epsilon = 0.1);
    }
    assert!(result.weights.iter().all(|w| *w > 0.0 && *w <= 1.0));
    assert!(result.model_statistics.converged == Some(true));
}

#[test]
fn test_robust_resists_contamination() {
    let (df, contaminated) = contaminated_data();
    assert!(contaminated.len() >= 3);

    let ols_slope = lm("y ~ x", &df).unwrap().estimates().unwrap()[1];
    assert!((ols_slope - 2.0).abs() > 0.5);

    let huber = rlm("y ~ x", &df, RobustMethod::Huber).unwrap();
    assert_abs_diff_eq!(huber.result().unwrap().coefficients[1], 2.0, epsilon = 0.5);

    let bisquare = rlm("y ~ x", &df, RobustMethod::Bisquare).unwrap();
    let result = bisquare.result().unwrap();
    assert_abs_diff_eq!(result.coefficients[1], 2.0, epsilon = 0.2);

    let downweighted = result.downweighted_cases(0.1);
    assert!(contaminated.iter().all(|c| downweighted.contains(c)));
}

#[test]
fn test_bias_test_flags_contaminated_ols() {
    let (df, _) = contaminated_data();
    let robust = rlm("y ~ x", &df, RobustMethod::Bisquare).unwrap();
    let test = robust.bias_test().unwrap();

    assert!(test.biased);
    assert!(test.p_value < 0.05);
    assert_eq!(test.df, 2);
    assert_eq!(test.discrepancies.len(), 2);
    assert_eq!(test.discrepancies[1].name, "x");
    assert!(test.discrepancies[1].standardized > 1.0);
}

#[test]
fn test_robust_non_convergence() {
    let (df, _) = contaminated_data();
    let config = RobustConfig {
        max_iterations: 1,
        tolerance: 1e-14,
        ..RobustConfig::new(RobustMethod::Bisquare)
    };
    let err = RobustRegression::new("y ~ x")
        .unwrap()
        .data(&df)
        .config(config)
        .fit()
        .unwrap_err();

    assert!(matches!(err, ModelError::NotConverged { max_iter: 1 }));
    assert_eq!(err.kind(), ErrorKind::EstimationFailure);
}

#[test]
fn test_robust_summary() {
    let robust = rlm("y ~ x", &noisy_data(100, 2), RobustMethod::Hampel).unwrap();
    let summary = robust.summary().unwrap();

    assert_eq!(summary.n_obs, 100);
    assert_eq!(summary.coefficients.len(), 2);
    assert!(summary.coefficients.iter().all(|c| c.std_error.unwrap() > 0.0));
}

// ==================== Bayesian Regression ====================

fn small_bayes_config(seed: u64) -> BayesConfig {
    BayesConfig {
        draws: 1000,
        grid_points: 1000,
        seed,
        ..BayesConfig::default()
    }
}

#[test]
fn test_bayes_is_reproducible_with_seed() {
    let df = noisy_data(100, 8);
    let fit = |seed| {
        BayesianRegression::new("y ~ x + z")
            .unwrap()
            .data(&df)
            .config(small_bayes_config(seed))
            .fit()
            .unwrap()
    };

    let a = fit(1);
    let b = fit(1);
    assert_eq!(a.result().unwrap().coefficients, b.result().unwrap().coefficients);
    assert_eq!(a.result().unwrap().bf10, b.result().unwrap().bf10);
    assert_eq!(
        serde_json::to_string(a.result().unwrap()).unwrap(),
        serde_json::to_string(b.result().unwrap()).unwrap()
    );

    let c = fit(2);
    assert_ne!(a.result().unwrap().coefficients, c.result().unwrap().coefficients);
    // the Bayes factor does not depend on the sampler
    assert_eq!(a.result().unwrap().bf10, c.result().unwrap().bf10);
}

#[test]
fn test_bayes_factors_track_effects() {
    let df = noisy_data(100, 8);
    let model = BayesianRegression::new("y ~ x + z")
        .unwrap()
        .data(&df)
        .config(small_bayes_config(3))
        .fit()
        .unwrap();
    let result = model.result().unwrap();

    assert!(result.bf10 > 100.0);
    let x = result.term("x").unwrap();
    let z = result.term("z").unwrap();
    assert!(x.bf10 > 100.0);
    assert!(x.log_bf10 > z.log_bf10);
    assert_abs_diff_eq!(x.bf10, x.log_bf10.exp(), epsilon = 1e-6 * x.bf10);
}

#[test]
fn test_bayes_posterior_near_ols() {
    let df = noisy_data(200, 13);
    let ols = lm("y ~ x", &df).unwrap();
    let ols_slope = ols.estimates().unwrap()[1];

    let model = BayesianRegression::new("y ~ x")
        .unwrap()
        .data(&df)
        .config(small_bayes_config(4))
        .fit()
        .unwrap();
    let slope = model.result().unwrap().coefficient("x").unwrap();

    assert_abs_diff_eq!(slope.mean, ols_slope, epsilon = 0.1);
    assert!(slope.ci_lower < ols_slope && ols_slope < slope.ci_upper);
    assert!(slope.sd > 0.0);
    assert!(model.result().unwrap().coefficient("(Intercept)").is_some());
}

#[test]
fn test_jzs_bayes_factor_grows_with_r_squared() {
    let weak = crate::lm::bayes::jzs_log_bf(0.01, 100, 1, 0.354, 2000).unwrap();
    let strong = crate::lm::bayes::jzs_log_bf(0.3, 100, 1, 0.354, 2000).unwrap();

    assert!(weak < 0.0);
    assert!(strong > weak);
    assert_eq!(crate::lm::bayes::jzs_log_bf(0.5, 100, 0, 0.354, 2000).unwrap(), 0.0);
}

#[test]
fn test_bayes_rejects_degenerate_models() {
    let intercept_only = BayesianRegression::new("y ~ 1")
        .unwrap()
        .data(&textbook_data())
        .fit();
    assert!(matches!(intercept_only, Err(ModelError::InvalidConfig { .. })));

    let no_intercept = BayesianRegression::new("y ~ 0 + x")
        .unwrap()
        .data(&textbook_data())
        .fit();
    assert!(matches!(no_intercept, Err(ModelError::InvalidConfig { .. })));

    let perfect = BayesianRegression::new("y ~ x").unwrap().data(&exact_data()).fit();
    assert!(matches!(perfect, Err(ModelError::NumericalError { .. })));
}
