//! Test suite for the formula module
//!
//! Covers parsing (intercept control, interactions, crossing, grouping,
//! removal, transforms) and design matrix construction.

use crate::data::{DataFrame, DataFrameBuilder, Series};
use crate::formula::error::FormulaError;
use crate::formula::*;
use approx::assert_abs_diff_eq;

fn moderation_frame() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("y", Series::float(vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0]))
        .unwrap()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
        .unwrap()
        .with_column("w", Series::float(vec![2.0, 1.0, 0.0, 1.0, 2.0, 0.0]))
        .unwrap()
        .with_column("group", Series::categorical(&["b", "a", "c", "a", "b", "c"]))
        .unwrap()
        .build()
        .unwrap()
}

fn interaction_vars(term: &Term) -> Vec<&str> {
    match &term.kind {
        TermKind::Interaction(interaction) => {
            interaction.variables.iter().map(String::as_str).collect()
        }
        other => panic!("Expected interaction term, got {:?}", other),
    }
}

#[test]
fn test_formula_parsing_basic_syntax() {
    let formula = Formula::parse("y ~ x1 + x2").unwrap();
    assert_eq!(formula.response, Some("y".to_string()));
    assert_eq!(formula.terms.len(), 2);
    assert!(formula.has_intercept);
    assert_eq!(formula.to_string(), "y ~ x1 + x2");

    let formula = Formula::parse("~ x1 + x2").unwrap();
    assert_eq!(formula.response, None);
    assert_eq!(formula.terms.len(), 2);

    let formula = Formula::parse("y ~ 0 + x1").unwrap();
    assert!(!formula.has_intercept);
    assert_eq!(formula.to_string(), "y ~ 0 + x1");

    let formula = Formula::parse("y ~ 1").unwrap();
    assert!(formula.has_intercept);
    assert!(formula.terms.is_empty());
    assert_eq!(formula.to_string(), "y ~ 1");

    let formula = Formula::parse("y ~ 0").unwrap();
    assert!(!formula.has_intercept);
    assert_eq!(formula.to_string(), "y ~ 0");

    let formula1 = Formula::parse("y~x1+x2").unwrap();
    let formula2 = Formula::parse("  y  ~  x1  +  x2  ").unwrap();
    assert_eq!(formula1, Formula { original: formula1.original.clone(), ..formula2 });
}

#[test]
fn test_intercept_removal_with_minus_one() {
    let formula = Formula::parse("y ~ x - 1").unwrap();
    assert!(!formula.has_intercept);
    assert_eq!(formula.terms, vec![Term::variable("x")]);
}

#[test]
fn test_formula_parsing_interactions() {
    let formula = Formula::parse("y ~ x1:x2").unwrap();
    assert_eq!(formula.terms.len(), 1);
    assert_eq!(interaction_vars(&formula.terms[0]), vec!["x1", "x2"]);

    let formula = Formula::parse("y ~ x1:x2:x3").unwrap();
    assert_eq!(interaction_vars(&formula.terms[0]), vec!["x1", "x2", "x3"]);
    if let TermKind::Interaction(interaction) = &formula.terms[0].kind {
        assert_eq!(interaction.order(), 3);
    }
}

#[test]
fn test_crossing_expands_main_effects() {
    let formula = Formula::parse("y ~ x*w").unwrap();
    assert_eq!(formula.to_string(), "y ~ x + w + x:w");

    let formula = Formula::parse("y ~ a*b*c").unwrap();
    let printed: Vec<String> = formula.terms.iter().map(|t| t.to_string()).collect();
    assert_eq!(printed, vec!["a", "b", "a:b", "c", "a:c", "b:c", "a:b:c"]);
}

#[test]
fn test_duplicate_terms_are_dropped() {
    let formula = Formula::parse("y ~ x + w + x:w + w:x + x").unwrap();
    assert_eq!(formula.to_string(), "y ~ x + w + x:w");
}

#[test]
fn test_grouping_distributes_interactions() {
    let formula = Formula::parse("y ~ (a + b):c").unwrap();
    assert_eq!(formula.to_string(), "y ~ a:c + b:c");
}

#[test]
fn test_term_removal() {
    let formula = Formula::parse("y ~ x*w - w").unwrap();
    assert_eq!(formula.to_string(), "y ~ x + x:w");
}

#[test]
fn test_transform_terms() {
    let formula = Formula::parse("y ~ center(x) + log(w)").unwrap();
    assert_eq!(formula.terms[0].term_type(), TermType::Transformed);
    assert_eq!(formula.to_string(), "y ~ center(x) + log(w)");
    assert_eq!(formula.variables(), vec!["y", "x", "w"]);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(Formula::parse(""), Err(FormulaError::Syntax { .. })));
    assert!(matches!(Formula::parse("y x"), Err(FormulaError::Syntax { .. })));
    assert!(matches!(Formula::parse("y ~ x +"), Err(FormulaError::Syntax { .. })));
    assert!(matches!(Formula::parse("y ~ (x"), Err(FormulaError::Syntax { .. })));
    assert!(matches!(Formula::parse("y ~ x )"), Err(FormulaError::Syntax { .. })));
    assert!(matches!(Formula::parse("y ~ 2 + x"), Err(FormulaError::Syntax { .. })));
    assert!(matches!(
        Formula::parse("y ~ poly(x)"),
        Err(FormulaError::FunctionError { .. })
    ));
    assert!(matches!(
        Formula::parse("y ~ log(x):w"),
        Err(FormulaError::Syntax { .. })
    ));
    assert!(matches!(
        Formula::parse("y ~ x + y"),
        Err(FormulaError::InvalidStructure { .. })
    ));
}

#[test]
fn test_design_matrix_simple() {
    let df = moderation_frame();
    let formula = Formula::parse("y ~ x + w").unwrap();
    let design = formula.design(&df).unwrap();

    assert_eq!(design.x.dim(), (6, 3));
    assert_eq!(design.names, vec!["(Intercept)", "x", "w"]);
    assert_eq!(design.x.column(0).to_vec(), vec![1.0; 6]);
    assert_eq!(design.x.column(1).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(
        design.response().unwrap().to_vec(),
        vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0]
    );
}

#[test]
fn test_design_matrix_interaction_is_product() {
    let df = moderation_frame();
    let design = Formula::parse("y ~ x*w").unwrap().design(&df).unwrap();

    assert_eq!(design.names, vec!["(Intercept)", "x", "w", "x:w"]);
    for i in 0..6 {
        assert_abs_diff_eq!(design.x[(i, 3)], design.x[(i, 1)] * design.x[(i, 2)]);
    }
}

#[test]
fn test_categorical_treatment_coding() {
    let df = moderation_frame();
    let design = Formula::parse("y ~ group").unwrap().design(&df).unwrap();

    // "a" is the reference level
    assert_eq!(design.names, vec!["(Intercept)", "group[b]", "group[c]"]);
    assert_eq!(design.x.column(1).to_vec(), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    assert_eq!(design.x.column(2).to_vec(), vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);

    let design = Formula::parse("y ~ x:group").unwrap().design(&df).unwrap();
    assert_eq!(design.names, vec!["(Intercept)", "x:group[b]", "x:group[c]"]);
    assert_eq!(design.x.column(2).to_vec(), vec![0.0, 0.0, 3.0, 0.0, 0.0, 6.0]);
}

#[test]
fn test_center_transform() {
    let df = moderation_frame();
    let design = Formula::parse("y ~ center(x)").unwrap().design(&df).unwrap();

    assert_eq!(design.names[1], "center(x)");
    assert_abs_diff_eq!(design.x.column(1).sum(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(design.x[(0, 1)], -2.5, epsilon = 1e-12);
}

#[test]
fn test_log_of_non_positive_fails() {
    let df = moderation_frame();
    let err = Formula::parse("y ~ log(w)").unwrap().design(&df).unwrap_err();
    assert!(matches!(err, FormulaError::NumericalError { .. }));
}

#[test]
fn test_missing_variable() {
    let df = moderation_frame();
    let err = Formula::parse("y ~ z").unwrap().design(&df).unwrap_err();
    assert!(matches!(err, FormulaError::VariableNotFound { .. }));
    assert!(err.is_data_shape());
}

#[test]
fn test_categorical_response_rejected() {
    let df = moderation_frame();
    let err = Formula::parse("group ~ x").unwrap().design(&df).unwrap_err();
    assert!(matches!(err, FormulaError::TypeMismatch { .. }));
}

#[test]
fn test_without_term() {
    let formula = Formula::parse("y ~ x*w").unwrap();
    let reduced = formula.without_term("w:x").unwrap();
    assert_eq!(reduced.to_string(), "y ~ x + w");
    assert!(formula.without_term("z").is_err());
}

#[test]
fn test_design_matrix_names_match_columns() {
    let df = moderation_frame();
    let formula = Formula::parse("y ~ x + group + x:w").unwrap();
    let design = formula.design(&df).unwrap();

    assert_eq!(design.names.len(), design.x.ncols());
    assert!(design.y.is_some());
    assert_eq!(design.names, vec!["(Intercept)", "x", "group[b]", "group[c]", "x:w"]);
}

#[test]
fn test_intercept_only_design() {
    let df = moderation_frame();
    let design = Formula::parse("y ~ 1").unwrap().design(&df).unwrap();
    assert_eq!(design.x.dim(), (6, 1));
}
