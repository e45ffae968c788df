//! Point estimation of recursive path models

use indexmap::IndexMap;
use ndarray::{Array1, Array2, Axis};

use crate::base::{ModelError, Result};
use crate::linalg;
use crate::lm::ols::{RANK_TOL, is_constant};
use po_core::data::DataFrame;
use po_core::syntax::ModelSpec;

/// The observed variables of a model as an n × k matrix, exogenous
/// variables first
#[derive(Debug, Clone)]
pub struct ObservedData {
    names: Vec<String>,
    values: Array2<f64>,
    n_exogenous: usize,
}

impl ObservedData {
    /// Pull the model's variables out of a frame
    pub fn from_frame(spec: &ModelSpec, df: &DataFrame) -> Result<Self> {
        let names: Vec<String> = spec.observed().into_iter().map(String::from).collect();
        let n = df.nrows();
        let mut values = Array2::zeros((n, names.len()));

        for (j, name) in names.iter().enumerate() {
            let column = df.float_column(name)?;
            if column.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::numerical(
                    format!("column '{}' contains non-finite values", name),
                    "path_model",
                ));
            }
            if n > 1 && is_constant(column.view()) {
                return Err(ModelError::ZeroVariance {
                    variable: name.clone(),
                });
            }
            values.column_mut(j).assign(&column);
        }

        let n_exogenous = spec.exogenous().len();
        let largest_equation = spec
            .relations()
            .iter()
            .map(|r| r.terms.len())
            .max()
            .unwrap_or(0);
        if n <= largest_equation + 1 {
            return Err(ModelError::InsufficientData {
                n_samples: n,
                n_predictors: largest_equation + 1,
            });
        }

        Ok(Self {
            names,
            values,
            n_exogenous,
        })
    }

    /// Rows drawn with the given indices
    pub fn resample(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(Axis(0), rows),
            n_exogenous: self.n_exogenous,
        }
    }

    pub fn n_obs(&self) -> usize {
        self.values.nrows()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_exogenous(&self) -> usize {
        self.n_exogenous
    }

    pub fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Covariance matrix with divisor N
    pub fn covariance(&self) -> Array2<f64> {
        let n = self.n_obs() as f64;
        let means = self
            .values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.names.len()));
        let centered = &self.values - &means;
        centered.t().dot(&centered) / n
    }
}

/// ML point estimates of a path model
#[derive(Debug, Clone)]
pub struct PointEstimates {
    /// Path coefficients, aligned with `ModelSpec::parameters`
    pub paths: Vec<f64>,
    /// Disturbance variances, aligned with `ModelSpec::relations`
    pub residual_variances: Vec<f64>,
    /// Derived quantities in declaration order
    pub defined: IndexMap<String, f64>,
    /// Normal-theory covariance of the path estimates
    pub path_covariance: Array2<f64>,
    pub sample_covariance: Array2<f64>,
    pub implied_covariance: Array2<f64>,
    /// Explained variance of each endogenous variable
    pub r_squared: IndexMap<String, f64>,
    pub n_obs: usize,
}

impl PointEstimates {
    /// Estimate every equation from the sample covariance matrix
    pub fn compute(spec: &ModelSpec, data: &ObservedData) -> Result<Self> {
        let s = data.covariance();
        let k = s.nrows();
        let n = data.n_obs() as f64;
        let parameters = spec.parameters();

        let mut paths = vec![0.0; parameters.len()];
        let mut path_covariance = Array2::zeros((parameters.len(), parameters.len()));
        let mut residual_variances = Vec::with_capacity(spec.relations().len());
        let mut b = Array2::zeros((k, k));
        let mut psi = Array2::zeros((k, k));

        let kx = data.n_exogenous();
        psi.slice_mut(ndarray::s![..kx, ..kx])
            .assign(&s.slice(ndarray::s![..kx, ..kx]));

        for relation in spec.relations() {
            let outcome = variable_index(data, &relation.outcome)?;
            let predictors = relation
                .predictors()
                .map(|p| variable_index(data, p))
                .collect::<Result<Vec<_>>>()?;
            let slots = relation
                .predictors()
                .map(|p| {
                    parameters
                        .iter()
                        .position(|q| q.outcome == relation.outcome && q.predictor == p)
                        .ok_or_else(|| ModelError::numerical("unknown path", "path_model"))
                })
                .collect::<Result<Vec<_>>>()?;

            let s_pp = s.select(Axis(0), &predictors).select(Axis(1), &predictors);
            let s_po: Array1<f64> = predictors.iter().map(|&p| s[[p, outcome]]).collect();
            let context = format!("predictor covariance of '{}'", relation.outcome);
            if linalg::rank(&s_pp, RANK_TOL) < predictors.len() {
                return Err(ModelError::singular(&context));
            }
            let (beta, s_pp_inv) = linalg::solve_and_invert(&s_pp, &s_po, &context)?;

            let s_oo = s[[outcome, outcome]];
            let disturbance = s_oo - beta.dot(&s_po);
            if disturbance <= 1e-12 * s_oo {
                return Err(ModelError::numerical(
                    format!("'{}' is an exact linear function of its predictors", relation.outcome),
                    "path_model",
                ));
            }

            for (i, (&slot, &pred)) in slots.iter().zip(&predictors).enumerate() {
                paths[slot] = beta[i];
                b[[outcome, pred]] = beta[i];
                for (j, &other) in slots.iter().enumerate() {
                    path_covariance[[slot, other]] = disturbance / n * s_pp_inv[[i, j]];
                }
            }
            psi[[outcome, outcome]] = disturbance;
            residual_variances.push(disturbance);
        }

        let implied_covariance = implied_covariance(&b, &psi)?;

        let r_squared = spec
            .relations()
            .iter()
            .zip(&residual_variances)
            .map(|(relation, &disturbance)| {
                let i = variable_index(data, &relation.outcome)?;
                Ok((
                    relation.outcome.clone(),
                    1.0 - disturbance / implied_covariance[[i, i]],
                ))
            })
            .collect::<Result<IndexMap<_, _>>>()?;

        let defined = spec.evaluate_defined(&named_paths(spec, &paths))?;

        Ok(Self {
            paths,
            residual_variances,
            defined,
            path_covariance,
            sample_covariance: s,
            implied_covariance,
            r_squared,
            n_obs: data.n_obs(),
        })
    }

    /// Paths, then disturbance variances, then derived quantities
    pub fn parameter_vector(&self) -> Vec<f64> {
        self.paths
            .iter()
            .chain(&self.residual_variances)
            .chain(self.defined.values())
            .copied()
            .collect()
    }

    /// Path estimates keyed by parameter name
    pub fn named_paths(&self, spec: &ModelSpec) -> IndexMap<String, f64> {
        named_paths(spec, &self.paths)
    }

    /// Implied standard deviation of an observed variable
    pub fn implied_sd(&self, data: &ObservedData, name: &str) -> Option<f64> {
        data.index(name)
            .map(|i| self.implied_covariance[[i, i]].sqrt())
    }

    /// Delta-method standard errors of the derived quantities, with a
    /// central-difference gradient
    pub fn defined_standard_errors(&self, spec: &ModelSpec) -> Result<Vec<f64>> {
        let m = self.defined.len();
        let p = self.paths.len();
        let mut gradient = Array2::zeros((m, p));

        for j in 0..p {
            let h = 1e-6 * self.paths[j].abs().max(1.0);
            let mut shifted = self.paths.clone();

            shifted[j] = self.paths[j] + h;
            let up = spec.evaluate_defined(&named_paths(spec, &shifted))?;
            shifted[j] = self.paths[j] - h;
            let down = spec.evaluate_defined(&named_paths(spec, &shifted))?;

            for (i, (u, d)) in up.values().zip(down.values()).enumerate() {
                gradient[[i, j]] = (u - d) / (2.0 * h);
            }
        }

        let covariance = gradient.dot(&self.path_covariance).dot(&gradient.t());
        Ok(covariance.diag().iter().map(|v| v.max(0.0).sqrt()).collect())
    }
}

fn variable_index(data: &ObservedData, name: &str) -> Result<usize> {
    data.index(name).ok_or_else(|| {
        ModelError::Data(po_core::data::DataError::ColumnNotFound(name.to_string()))
    })
}

fn named_paths(spec: &ModelSpec, paths: &[f64]) -> IndexMap<String, f64> {
    spec.parameters()
        .iter()
        .zip(paths)
        .map(|(p, &v)| (p.name.clone(), v))
        .collect()
}

/// Σ = (I − B)⁻¹ Ψ (I − B)⁻ᵀ
fn implied_covariance(b: &Array2<f64>, psi: &Array2<f64>) -> Result<Array2<f64>> {
    let k = b.nrows();
    let i_minus_b = Array2::eye(k) - b;
    let inv = linalg::invert(&i_minus_b, "I - B")?;
    Ok(inv.dot(psi).dot(&inv.t()))
}
