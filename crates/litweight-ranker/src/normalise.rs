//! Sigmoid curves used to map raw evidence onto edge weights.

/// Logistic (Boltzmann) sigmoid centred at `xmid` with width `tau`.
///
/// f(x) = 1 / (1 + exp(-(x - xmid) / tau))
pub fn boltzmann(x: f64, xmid: f64, tau: f64) -> f64 {
    1.0 / (1.0 + (-(x - xmid) / tau).exp())
}

/// Recency of a publication `age` years old, scaled so that age 0 maps to 1.0
/// and older papers decay towards 0.
pub fn recency_curve(age: f64, xmid: f64, tau: f64) -> f64 {
    let at_zero = 1.0 - boltzmann(0.0, xmid, tau);
    if at_zero <= 0.0 {
        return 0.0; // degenerate curve
    }
    (1.0 - boltzmann(age, xmid, tau)) / at_zero
}

/// Curve applied to `1 + Σ citations` in the combined weight.
/// Decreasing in the citation count.
pub fn citation_curve(citations: f64, xmid: f64, tau: f64) -> f64 {
    1.0 - boltzmann(citations, xmid, tau)
}

/// Authority weight for the largest author h-index on an edge.
pub fn authority_curve(max_h_index: f64, xmid: f64, tau: f64) -> f64 {
    boltzmann(max_h_index, xmid, tau)
}
