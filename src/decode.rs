use ndarray::{Array2, s};
use rayon::prelude::*;
use std::ops::Range;

use crate::config::DecodeConfig;
use crate::error::{PloidyError, Result};
use crate::grouping::{all_finite, sample_runs};
use crate::hmm::viterbi;
use crate::io::SegmentRow;
use crate::model::{GaussianHmm, References, build_model};
use crate::progress;
use crate::reference::ReferenceTable;
use crate::states::ModelKind;

/// Decoded state attached to the input row it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedState {
    pub index: usize,
    /// 1-based state label.
    pub state: u8,
}

/// Rows that survived filtering, packed as an `(n, n_dims)` matrix.
struct ObservationMatrix<'a> {
    samples: Vec<&'a str>,
    index: Vec<usize>,
    values: Array2<f64>,
}

fn collect_observations<'a>(kind: ModelKind, rows: &'a [SegmentRow]) -> Result<ObservationMatrix<'a>> {
    let features = kind.features();
    let mut samples = Vec::with_capacity(rows.len());
    let mut index = Vec::with_capacity(rows.len());
    let mut data = Vec::with_capacity(rows.len() * features.len());
    let mut vals = Vec::with_capacity(features.len());

    for (i, row) in rows.iter().enumerate() {
        vals.clear();
        vals.extend(features.iter().map(|f| row.feature(*f)));
        if !all_finite(&vals) {
            if kind.drops_non_finite() {
                continue;
            }
            let column = features
                .iter()
                .zip(&vals)
                .find(|(_, v)| !matches!(v, Some(x) if x.is_finite()))
                .map(|(f, _)| f.column())
                .unwrap_or("feature");
            return Err(PloidyError::malformed_row(
                i,
                format!("{column} is missing or non-finite"),
            ));
        }
        samples.push(row.sample.as_str());
        index.push(i);
        data.extend(vals.iter().flatten());
    }

    let dropped = rows.len() - index.len();
    if dropped > 0 {
        log::info!(
            "{} model: dropped {dropped} of {} rows with missing or non-finite values",
            kind.name(),
            rows.len()
        );
    }
    let values = Array2::from_shape_vec((index.len(), features.len()), data)
        .map_err(|e| PloidyError::invalid_parameter(format!("observation matrix: {e}")))?;
    Ok(ObservationMatrix {
        samples,
        index,
        values,
    })
}

/// Decode `rows` with an already built model.
///
/// Each contiguous run of one sample is decoded on its own, starting from
/// the initial distribution. Output is in input row order and omits rows
/// dropped by filtering.
pub fn decode_with_model(
    kind: ModelKind,
    model: &GaussianHmm,
    rows: &[SegmentRow],
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    if model.n_dims() != kind.features().len() {
        return Err(PloidyError::invalid_parameter(format!(
            "{} decoding needs a {}-dimensional model, got {}",
            kind.name(),
            kind.features().len(),
            model.n_dims()
        )));
    }
    if model.n_states() != kind.n_states() {
        return Err(PloidyError::invalid_parameter(format!(
            "{} decoding needs a {}-state model, got {}",
            kind.name(),
            kind.n_states(),
            model.n_states()
        )));
    }
    let obs = collect_observations(kind, rows)?;
    let groups: Vec<Range<usize>> = sample_runs(&obs.samples).map(|(_, r)| r).collect();

    let pb = if config.progress && !groups.is_empty() {
        Some(progress::bar(groups.len() as u64, kind.name(), "viterbi"))
    } else {
        None
    };
    let decode_group = |range: &Range<usize>| -> Result<Vec<u8>> {
        let path = viterbi(model, obs.values.slice(s![range.clone(), ..]))?;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
        Ok(path.labels())
    };
    let labels: Vec<Vec<u8>> = if config.parallel {
        groups.par_iter().map(decode_group).collect::<Result<_>>()?
    } else {
        groups.iter().map(decode_group).collect::<Result<_>>()?
    };
    if let Some(pb) = pb {
        pb.finish_with_message(format!("{} groups decoded", groups.len()));
    }

    let mut out = Vec::with_capacity(obs.index.len());
    for (range, group_labels) in groups.iter().zip(labels) {
        for (pos, state) in range.clone().zip(group_labels) {
            out.push(DecodedState {
                index: obs.index[pos],
                state,
            });
        }
    }
    log::info!(
        "{} model: decoded {} rows in {} groups",
        kind.name(),
        out.len(),
        groups.len()
    );
    Ok(out)
}

fn decode(
    kind: ModelKind,
    refs: References<'_>,
    rows: &[SegmentRow],
    coverage: f64,
    fetal_fraction: f64,
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    config.validate()?;
    let model = build_model(kind, &refs, coverage, fetal_fraction, config.stay_switch_ratio)?;
    decode_with_model(kind, &model, rows, config)
}

/// Two-state decoding of `total_count`.
pub fn decode_read_count(
    rows: &[SegmentRow],
    coverage: f64,
    fetal_fraction: f64,
    read_count: &ReferenceTable,
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    let refs = References {
        read_count: Some(read_count),
        allelic_ratio: None,
    };
    decode(ModelKind::ReadCount, refs, rows, coverage, fetal_fraction, config)
}

/// Two-state decoding of `total_count` with the fetal fraction pinned to
/// `config.fixed_fetal_fraction`.
pub fn decode_read_count_fixed_fraction(
    rows: &[SegmentRow],
    coverage: f64,
    read_count: &ReferenceTable,
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    decode_read_count(rows, coverage, config.fixed_fetal_fraction, read_count, config)
}

/// Seven-state decoding of `allelic_ratio`.
pub fn decode_allelic_ratio(
    rows: &[SegmentRow],
    coverage: f64,
    fetal_fraction: f64,
    allelic_ratio: &ReferenceTable,
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    let refs = References {
        read_count: None,
        allelic_ratio: Some(allelic_ratio),
    };
    decode(ModelKind::AllelicRatio, refs, rows, coverage, fetal_fraction, config)
}

/// Seven-state decoding of (`allelic_ratio`, `total_count`) pairs.
pub fn decode_joint(
    rows: &[SegmentRow],
    coverage: f64,
    fetal_fraction: f64,
    read_count: &ReferenceTable,
    allelic_ratio: &ReferenceTable,
    config: &DecodeConfig,
) -> Result<Vec<DecodedState>> {
    let refs = References {
        read_count: Some(read_count),
        allelic_ratio: Some(allelic_ratio),
    };
    decode(ModelKind::Joint, refs, rows, coverage, fetal_fraction, config)
}

/// Spread decoded states over `n_rows` slots; dropped rows stay `None`.
pub fn label_column(decoded: &[DecodedState], n_rows: usize) -> Vec<Option<u8>> {
    let mut col = vec![None; n_rows];
    for d in decoded {
        if let Some(slot) = col.get_mut(d.index) {
            *slot = Some(d.state);
        }
    }
    col
}
