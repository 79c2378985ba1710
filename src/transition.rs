use ndarray::Array2;

use crate::error::{PloidyError, Result};
use crate::states::{StateTag, TransitionClass};

/// Stay-switch ratio used when none is configured.
pub const DEFAULT_STAY_SWITCH_RATIO: f64 = 10.0;

/// Normalised transition row for a state of class `from`.
///
/// Destinations in the same class get weight `ssr`, the others weight 1.
fn class_row(ssr: f64, from: TransitionClass, tags: &[StateTag]) -> Vec<f64> {
    let mut row: Vec<f64> = tags
        .iter()
        .map(|tag| {
            if tag.transition_class() == from {
                ssr
            } else {
                1.0
            }
        })
        .collect();
    let total: f64 = row.iter().sum();
    for v in row.iter_mut() {
        *v /= total;
    }
    row
}

/// Build the row-stochastic transition matrix for the given state tags.
///
/// Every state of one class shares the same row, so the matrix has at most
/// two distinct rows.
pub fn transition_matrix(ssr: f64, tags: &[StateTag]) -> Result<Array2<f64>> {
    if !ssr.is_finite() || ssr <= 0.0 {
        return Err(PloidyError::invalid_parameter(format!(
            "stay-switch ratio must be finite and > 0, got {ssr}"
        )));
    }
    if tags.is_empty() {
        return Err(PloidyError::invalid_parameter(
            "transition matrix needs at least one state",
        ));
    }

    let n_states = tags.len();
    let euploid_row = class_row(ssr, TransitionClass::EuploidLike, tags);
    let trisomy_row = class_row(ssr, TransitionClass::TrisomyLike, tags);

    let mut a = Array2::zeros((n_states, n_states));
    for (i, tag) in tags.iter().enumerate() {
        let row = match tag.transition_class() {
            TransitionClass::EuploidLike => &euploid_row,
            TransitionClass::TrisomyLike => &trisomy_row,
        };
        for (j, v) in row.iter().enumerate() {
            a[(i, j)] = *v;
        }
    }
    Ok(a)
}
