use ndarray::ArrayView2;

use crate::error::{PloidyError, Result};
use crate::model::GaussianHmm;
use crate::utils::argmax;

/// Most likely state sequence of one observation group.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath {
    /// 0-based state per observation.
    pub states: Vec<usize>,
    /// Joint log probability of the path and the observations.
    pub ln_prob: f64,
}

impl ViterbiPath {
    /// 1-based state labels, as reported to callers.
    pub fn labels(&self) -> Vec<u8> {
        self.states.iter().map(|&s| (s + 1) as u8).collect()
    }
}

/// Log emission matrix laid out `[t * n_states + k]`.
fn ln_emission_table(model: &GaussianHmm, obs: &ArrayView2<f64>) -> Vec<f64> {
    let n_states = model.n_states();
    let mut em = Vec::with_capacity(obs.nrows() * n_states);
    for row in obs.rows() {
        for k in 0..n_states {
            em.push(model.ln_emission(k, row));
        }
    }
    em
}

/// Viterbi decoding of a single group, `obs` shaped `(len, n_dims)`.
///
/// Scores are kept in log space. Ties, both between predecessors and at
/// termination, resolve to the lowest state index.
pub fn viterbi(model: &GaussianHmm, obs: ArrayView2<f64>) -> Result<ViterbiPath> {
    let t_len = obs.nrows();
    let n_states = model.n_states();
    if t_len == 0 {
        return Err(PloidyError::invalid_parameter("cannot decode an empty observation group"));
    }
    if obs.ncols() != model.n_dims() {
        return Err(PloidyError::invalid_parameter(format!(
            "observation width {} does not match model dimension {}",
            obs.ncols(),
            model.n_dims()
        )));
    }

    let ln_pi = model.ln_initial();
    let ln_a = model.ln_transition();
    let em = ln_emission_table(model, &obs);

    let mut prev = vec![0.0f64; n_states];
    let mut cur = vec![0.0f64; n_states];
    let mut back = vec![0usize; t_len * n_states];

    for k in 0..n_states {
        prev[k] = ln_pi[k] + em[k];
    }
    for t in 1..t_len {
        let em_t = &em[t * n_states..(t + 1) * n_states];
        let back_t = &mut back[t * n_states..(t + 1) * n_states];
        for j in 0..n_states {
            let mut best_i = 0usize;
            let mut best = prev[0] + ln_a[(0, j)];
            for i in 1..n_states {
                let v = prev[i] + ln_a[(i, j)];
                if v > best {
                    best = v;
                    best_i = i;
                }
            }
            cur[j] = best + em_t[j];
            back_t[j] = best_i;
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    let last = argmax(&prev);
    let ln_prob = prev[last];
    if ln_prob.is_nan() {
        return Err(PloidyError::invalid_parameter("viterbi score is NaN"));
    }

    let mut states = vec![0usize; t_len];
    states[t_len - 1] = last;
    for t in (1..t_len).rev() {
        states[t - 1] = back[t * n_states + states[t]];
    }
    Ok(ViterbiPath { states, ln_prob })
}
