use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{PloidyError, Result};
use crate::gaussian::MultivariateNormal;
use crate::reference::ReferenceTable;
use crate::states::{Feature, ModelKind};
use crate::transition::transition_matrix;

const ROW_SUM_TOL: f64 = 1e-9;

/// Gaussian-emission HMM with fixed parameters.
///
/// Built once per decode call and shared read-only by every group decode.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    initial: Vec<f64>,
    transition: Array2<f64>,
    means: Array2<f64>,
    emissions: Vec<MultivariateNormal>,
    ln_initial: Vec<f64>,
    ln_transition: Array2<f64>,
}

impl GaussianHmm {
    pub fn new(
        initial: Vec<f64>,
        transition: Array2<f64>,
        means: Array2<f64>,
        covariances: Vec<Array2<f64>>,
    ) -> Result<Self> {
        let n_states = initial.len();
        if n_states == 0 {
            return Err(PloidyError::invalid_parameter("model needs at least one state"));
        }
        if transition.nrows() != n_states || transition.ncols() != n_states {
            return Err(PloidyError::invalid_parameter(format!(
                "transition matrix shape {:?} does not match {n_states} states",
                transition.shape()
            )));
        }
        if means.nrows() != n_states || covariances.len() != n_states {
            return Err(PloidyError::invalid_parameter(format!(
                "expected {n_states} means and covariances, got {} and {}",
                means.nrows(),
                covariances.len()
            )));
        }
        check_distribution("initial distribution", &initial)?;
        for (i, row) in transition.rows().into_iter().enumerate() {
            let row: Vec<f64> = row.to_vec();
            check_distribution(&format!("transition row {i}"), &row)?;
        }

        let mut emissions = Vec::with_capacity(n_states);
        for (state, cov) in covariances.into_iter().enumerate() {
            let mvn = MultivariateNormal::new(means.row(state).to_owned(), cov).map_err(|e| match e {
                PloidyError::InvalidParameter { message } => {
                    PloidyError::invalid_parameter(format!("state {}: {message}", state + 1))
                }
                other => other,
            })?;
            emissions.push(mvn);
        }

        let ln_initial = initial.iter().map(|p| p.ln()).collect();
        let ln_transition = transition.mapv(f64::ln);
        Ok(Self {
            initial,
            transition,
            means,
            emissions,
            ln_initial,
            ln_transition,
        })
    }

    pub fn n_states(&self) -> usize {
        self.initial.len()
    }

    pub fn n_dims(&self) -> usize {
        self.means.ncols()
    }

    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    pub fn transition_matrix(&self) -> &Array2<f64> {
        &self.transition
    }

    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    pub fn covariance(&self, state: usize) -> &Array2<f64> {
        self.emissions[state].covariance()
    }

    pub fn ln_initial(&self) -> &[f64] {
        &self.ln_initial
    }

    pub fn ln_transition(&self) -> &Array2<f64> {
        &self.ln_transition
    }

    /// Log emission density of `obs` under `state` (0-based).
    pub fn ln_emission(&self, state: usize, obs: ArrayView1<f64>) -> f64 {
        self.emissions[state].ln_pdf(obs)
    }
}

fn check_distribution(what: &str, probs: &[f64]) -> Result<()> {
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(PloidyError::invalid_parameter(format!(
            "{what} has a negative or non-finite entry"
        )));
    }
    let total: f64 = probs.iter().sum();
    if (total - 1.0).abs() > ROW_SUM_TOL {
        return Err(PloidyError::invalid_parameter(format!(
            "{what} sums to {total}, expected 1"
        )));
    }
    Ok(())
}

/// Reference tables a model may draw its emission parameters from.
#[derive(Debug, Clone, Copy, Default)]
pub struct References<'a> {
    pub read_count: Option<&'a ReferenceTable>,
    pub allelic_ratio: Option<&'a ReferenceTable>,
}

impl<'a> References<'a> {
    fn table(&self, feature: Feature) -> Result<&'a ReferenceTable> {
        let table = match feature {
            Feature::TotalCount => self.read_count,
            Feature::AllelicRatio => self.allelic_ratio,
        };
        table.ok_or_else(|| {
            PloidyError::invalid_parameter(format!(
                "model needs a {} reference table",
                feature.column()
            ))
        })
    }
}

/// Assemble the model for `kind` at one (coverage, fetal_fraction) key.
///
/// Allelic-ratio parameters are looked up per state (1..=7); read-count
/// parameters are looked up per transition class (state 1 or 2 of the
/// read-count table). Covariances are diagonal, one entry per feature.
pub fn build_model(
    kind: ModelKind,
    refs: &References<'_>,
    coverage: f64,
    fetal_fraction: f64,
    ssr: f64,
) -> Result<GaussianHmm> {
    let tags = kind.states();
    let features = kind.features();
    let n_states = tags.len();
    let n_dims = features.len();

    let transition = transition_matrix(ssr, tags)?;
    let initial = vec![1.0 / n_states as f64; n_states];

    let mut means = Array2::zeros((n_states, n_dims));
    let mut covariances = Vec::with_capacity(n_states);
    for (s, tag) in tags.iter().enumerate() {
        let mut variances = Array1::zeros(n_dims);
        for (d, feature) in features.iter().enumerate() {
            let table_state = match feature {
                Feature::TotalCount => tag.read_count_state(),
                Feature::AllelicRatio => (s + 1) as u8,
            };
            let params = refs
                .table(*feature)?
                .lookup(coverage, fetal_fraction, table_state)?;
            means[(s, d)] = params.mean;
            variances[d] = params.variance;
        }
        covariances.push(Array2::from_diag(&variances));
    }

    log::debug!(
        "built {} model: {n_states} states, {n_dims} dims, coverage={coverage}, fetal_fraction={fetal_fraction}, ssr={ssr}",
        kind.name()
    );
    GaussianHmm::new(initial, transition, means, covariances)
}
