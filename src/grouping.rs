use std::ops::Range;

/// Lazy iterator over maximal runs of equal keys in a slice.
///
/// Runs are reported in input order; a key that reappears after a different
/// key starts a new run.
#[derive(Debug, Clone)]
pub struct SampleRuns<'a, K> {
    keys: &'a [K],
    pos: usize,
}

impl<'a, K: PartialEq> Iterator for SampleRuns<'a, K> {
    type Item = (&'a K, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.pos;
        let key = self.keys.get(start)?;
        let mut end = start + 1;
        while end < self.keys.len() && self.keys[end] == *key {
            end += 1;
        }
        self.pos = end;
        Some((key, start..end))
    }
}

pub fn sample_runs<K: PartialEq>(keys: &[K]) -> SampleRuns<'_, K> {
    SampleRuns { keys, pos: 0 }
}

/// True when every value is present and finite.
pub fn all_finite(values: &[Option<f64>]) -> bool {
    values.iter().all(|v| matches!(v, Some(x) if x.is_finite()))
}
