pub const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Log-density of a univariate normal distribution.
pub fn ln_normal_pdf(x: f64, mean: f64, variance: f64) -> f64 {
    let d = x - mean;
    -0.5 * (LN_2PI + variance.ln() + d * d / variance)
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(vals: &[f64]) -> usize {
    let mut best = 0usize;
    for (i, &v) in vals.iter().enumerate().skip(1) {
        if v > vals[best] {
            best = i;
        }
    }
    best
}
