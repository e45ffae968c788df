//! End-to-end regression runs

use approx::assert_abs_diff_eq;
use po_analyses::regression::RegressionSimulation;
use po_analyses::{AnalysisError, DataSource, RegressionAnalysis, RegressionConfig};
use po_core::data::DataError;
use po_models::ErrorKind;
use po_models::lm::BayesConfig;

fn config(simulation: RegressionSimulation) -> RegressionConfig {
    RegressionConfig {
        data: DataSource::Simulated(simulation),
        bayes: BayesConfig {
            draws: 2000,
            ..BayesConfig::default()
        },
        ..RegressionConfig::default()
    }
}

fn coefficient(summary: &po_models::ModelSummary, name: &str) -> f64 {
    summary
        .coefficients
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.estimate)
        .unwrap()
}

#[test]
fn test_clean_data_report() {
    let report = RegressionAnalysis::new(config(RegressionSimulation::default()))
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.ols.n_obs, 200);
    assert_abs_diff_eq!(coefficient(&report.ols, "x1"), 0.5, epsilon = 0.25);
    assert_abs_diff_eq!(coefficient(&report.ols, "x2"), 0.3, epsilon = 0.25);

    let diagnostics = &report.diagnostics;
    assert_eq!(diagnostics.records.len(), 200);
    let leverage: f64 = diagnostics.records.iter().map(|r| r.leverage).sum();
    assert_abs_diff_eq!(leverage, 4.0, epsilon = 1e-8);
    assert!(diagnostics.records.iter().all(|r| r.cooks_distance >= 0.0));
    assert!(diagnostics.proportions.above_1_96 < 0.1);
    assert_eq!(diagnostics.vif.len(), 3);

    // robust and OLS agree closely on normal errors
    assert_abs_diff_eq!(
        coefficient(&report.robust, "x1"),
        coefficient(&report.ols, "x1"),
        epsilon = 0.1
    );
    assert_eq!(report.bias_test.discrepancies.len(), 4);

    let bayes = &report.bayes;
    let x1 = bayes.term("x1").unwrap().bf10;
    let x3 = bayes.term("x3").unwrap().bf10;
    assert!(x1 > 100.0);
    assert!(x3 < x1);
    assert!(bayes.bf10 > 1.0);
    assert_abs_diff_eq!(
        bayes.coefficient("x1").unwrap().mean,
        coefficient(&report.ols, "x1"),
        epsilon = 0.05
    );

    let descriptives = &report.descriptives;
    assert_eq!(descriptives.variables.keys().next().map(String::as_str), Some("y"));
    assert_abs_diff_eq!(descriptives.correlation("x1", "x1").unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_contamination_trips_bias_test() {
    let simulation = RegressionSimulation {
        outliers: 20,
        ..RegressionSimulation::default()
    };
    let report = RegressionAnalysis::new(config(simulation)).unwrap().run().unwrap();

    assert!(report.bias_test.biased);
    assert!(report.bias_test.p_value < 0.05);
    for case in 1..=20 {
        assert!(report.downweighted_cases.contains(&case), "case {} kept full weight", case);
    }

    // the shift moves the OLS intercept by about 20 * 8 / 200
    let shift =
        coefficient(&report.ols, "(Intercept)") - coefficient(&report.robust, "(Intercept)");
    assert!(shift > 0.4);
}

#[test]
fn test_runs_are_reproducible() {
    let run = || {
        let report = RegressionAnalysis::new(config(RegressionSimulation::default()))
            .unwrap()
            .run()
            .unwrap();
        serde_json::to_string(&report).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_supplied_frame_overrides_source() {
    let df = RegressionSimulation {
        seed: 99,
        ..RegressionSimulation::default()
    }
    .simulate("y")
    .unwrap();

    let mut settings = config(RegressionSimulation::default());
    settings.formula = "y ~ x1 + x2".to_string();
    let report = RegressionAnalysis::new(settings).unwrap().data(&df).run().unwrap();

    assert_eq!(report.ols.coefficients.len(), 3);
    assert_eq!(report.descriptives.variables.len(), 3);
}

#[test]
fn test_missing_predictor() {
    let df = RegressionSimulation::default().simulate("y").unwrap();
    let err = RegressionAnalysis::new(RegressionConfig::new("y ~ x1 + age"))
        .unwrap()
        .data(&df)
        .run()
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Data(DataError::ColumnNotFound(ref c)) if c == "age"));
    assert_eq!(err.kind(), ErrorKind::DataShapeError);
}

#[test]
fn test_csv_missing_file() {
    let settings = RegressionConfig {
        data: DataSource::Csv {
            path: "does/not/exist.csv".into(),
        },
        ..RegressionConfig::default()
    };
    let err = RegressionAnalysis::new(settings).unwrap().run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataShapeError);
}
