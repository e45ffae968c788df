//! End-to-end mediation runs

use std::io::Write;

use approx::assert_abs_diff_eq;
use po_analyses::mediation::{MediationConfig, MediationSimulation, MediationType};
use po_analyses::{DataSource, MediationAnalysis, MediationDesign};
use po_models::ErrorKind;
use po_models::sem::{BootstrapCi, SemConfig};

fn with_data(mut config: MediationConfig, n: usize, seed: u64) -> MediationConfig {
    config.data = DataSource::Simulated(MediationSimulation {
        n,
        seed,
        ..MediationSimulation::default()
    });
    config.sem.bootstrap.replicates = 400;
    config
}

#[test]
fn test_simple_mediation_recovers_indirect_effect() {
    let config = with_data(MediationConfig::simple(), 500, 3);
    let report = MediationAnalysis::new(config).unwrap().run().unwrap();

    let a = report.model.estimate("a").unwrap();
    let b = report.model.estimate("b").unwrap();
    let cp = report.model.estimate("cp").unwrap();
    let ab = report.indirect_effect("ab").unwrap();

    assert_eq!(report.design, MediationDesign::Simple);
    assert_abs_diff_eq!(ab.estimate, a * b, epsilon = 1e-12);
    assert_abs_diff_eq!(ab.estimate, 0.2, epsilon = 0.1);
    assert_abs_diff_eq!(report.total.estimate, cp + ab.estimate, epsilon = 1e-12);
    assert_eq!(ab.through, vec!["m".to_string()]);
    assert!(ab.is_significant());
    assert!(matches!(
        report.classification,
        MediationType::Full | MediationType::Partial
    ));

    let proportion = report.proportion_mediated.unwrap();
    assert_abs_diff_eq!(proportion, ab.estimate / report.total.estimate, epsilon = 1e-12);

    let bootstrap = report.model.bootstrap.unwrap();
    assert_eq!(bootstrap.attempted, 400);
    assert_eq!(bootstrap.successful, 400);
    assert_eq!(report.descriptives.variables["x"].count, 500);
}

#[test]
fn test_causal_steps_match_path_model() {
    let mut config = with_data(MediationConfig::simple(), 300, 8);
    config.sem = SemConfig::standard();
    let report = MediationAnalysis::new(config).unwrap().run().unwrap();
    let steps = &report.causal_steps;

    assert_eq!(steps.a_paths[0].name, "m~x");
    assert_eq!(steps.b_paths[0].name, "y~m");
    assert_abs_diff_eq!(
        steps.a_paths[0].estimate,
        report.model.estimate("a").unwrap(),
        epsilon = 1e-10
    );
    assert_abs_diff_eq!(
        steps.b_paths[0].estimate,
        report.model.estimate("b").unwrap(),
        epsilon = 1e-10
    );
    assert_abs_diff_eq!(steps.direct.estimate, report.direct.estimate, epsilon = 1e-10);

    // c = c' + ab in a saturated model
    assert_abs_diff_eq!(steps.total.estimate, report.total.estimate, epsilon = 1e-10);
    assert_eq!(report.model.fit.df, 0);
}

#[test]
fn test_parallel_effects_add_up() {
    let config = with_data(MediationConfig::parallel(&["m1", "m2", "m3"]), 400, 5);
    let report = MediationAnalysis::new(config).unwrap().run().unwrap();

    let names: Vec<&str> = report.indirect.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ind1", "ind2", "ind3"]);

    let sum: f64 = report.indirect.iter().map(|e| e.estimate).sum();
    assert_abs_diff_eq!(report.total_indirect.estimate, sum, epsilon = 1e-12);
    assert_abs_diff_eq!(
        report.total.estimate,
        report.direct.estimate + report.total_indirect.estimate,
        epsilon = 1e-12
    );
    assert_eq!(report.causal_steps.a_paths.len(), 3);

    // mediators are uncorrelated given x: three fixed covariances
    assert_eq!(report.model.fit.df, 3);
}

#[test]
fn test_serial_mediation_chains() {
    let config = with_data(MediationConfig::serial(&["m1", "m2"]), 600, 21);
    let report = MediationAnalysis::new(config).unwrap().run().unwrap();
    let model = &report.model;

    let chain = report.indirect_effect("ind12").unwrap();
    assert_eq!(chain.through, vec!["m1".to_string(), "m2".to_string()]);
    let path = |name: &str| model.estimate(name).unwrap();
    assert_abs_diff_eq!(
        chain.estimate,
        path("a1") * path("d21") * path("b2"),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(chain.estimate, 0.5 * 0.3 * 0.4, epsilon = 0.05);

    assert_eq!(model.fit.df, 0);
    assert_abs_diff_eq!(report.causal_steps.total.estimate, report.total.estimate, epsilon = 1e-10);
}

#[test]
fn test_runs_are_reproducible() {
    let run = |ci| {
        let mut config = with_data(MediationConfig::simple(), 200, 13);
        config.sem.bootstrap.ci = ci;
        let report = MediationAnalysis::new(config).unwrap().run().unwrap();
        serde_json::to_string(&report).unwrap()
    };

    assert_eq!(run(BootstrapCi::Percentile), run(BootstrapCi::Percentile));
    assert_ne!(run(BootstrapCi::Percentile), run(BootstrapCi::BiasCorrected));
}

#[test]
fn test_csv_source_with_custom_names() {
    let mut config = MediationConfig::simple();
    config.x = "treatment".to_string();
    config.mediators = vec!["anxiety".to_string()];
    config.y = "score".to_string();
    config.sem = SemConfig::standard();

    let df = MediationSimulation::default()
        .simulate(MediationDesign::Simple, "treatment", &config.mediators, "score")
        .unwrap();
    let (t, m, s) = (
        df.float_column("treatment").unwrap(),
        df.float_column("anxiety").unwrap(),
        df.float_column("score").unwrap(),
    );

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id,score,anxiety,treatment").unwrap();
    for i in 0..df.nrows() {
        writeln!(file, "{},{},{},{}", i + 1, s[i], m[i], t[i]).unwrap();
    }
    file.flush().unwrap();

    let from_frame = MediationAnalysis::new(config.clone()).unwrap().data(&df).run().unwrap();
    config.data = DataSource::Csv {
        path: file.path().to_path_buf(),
    };
    let from_csv = MediationAnalysis::new(config).unwrap().run().unwrap();

    assert!(from_csv.syntax.contains("anxiety ~ a*treatment"));
    assert_abs_diff_eq!(
        from_csv.total_indirect.estimate,
        from_frame.total_indirect.estimate,
        epsilon = 1e-9
    );
    assert_abs_diff_eq!(from_csv.total_indirect.se, from_frame.total_indirect.se, epsilon = 1e-9);
}

#[test]
fn test_missing_mediator_column() {
    let df = MediationSimulation::default()
        .simulate(MediationDesign::Simple, "x", &["m".to_string()], "y")
        .unwrap();
    let config = MediationConfig::parallel(&["m", "m2"]);
    let err = MediationAnalysis::new(config).unwrap().data(&df).run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataShapeError);
}
