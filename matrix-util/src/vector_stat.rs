/// Location and spread of a vector of observations
///
/// The variance is the population variance (divided by `n`),
/// computed in two passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VectorSummary {
    pub n: usize,
    pub mean: f64,
    pub variance: f64,
}

impl VectorSummary {
    /// Summarize `xs`; an empty slice gives `NaN` mean and variance
    pub fn from_slice(xs: &[f64]) -> Self {
        let n = xs.len();
        let denom = n as f64;
        let mean = xs.iter().sum::<f64>() / denom;
        let variance = xs.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / denom;
        VectorSummary { n, mean, variance }
    }

    /// Population standard deviation
    pub fn std(&self) -> f64 {
        self.variance.sqrt()
    }

    /// `mean + num_sd * std`
    pub fn upper_bound(&self, num_sd: f64) -> f64 {
        self.mean + num_sd * self.std()
    }
}
