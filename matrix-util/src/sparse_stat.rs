use indicatif::ProgressIterator;
use nalgebra_sparse::CsrMatrix;
use num_traits::{ToPrimitive, Zero};

/// Row-wise sufficient statistics of a sparse matrix: the number of
/// non-zero elements, the total, and the total restricted to a
/// subset of columns.
///
/// Sums are accumulated in `f64` regardless of the storage type.
#[derive(Clone, Debug)]
pub struct SparseRowStatistics {
    nnz: Vec<u64>,
    s1: Vec<f64>,
    masked_s1: Vec<f64>,
}

impl SparseRowStatistics {
    /// Collect statistics over all rows of a CSR matrix
    ///
    /// # Arguments
    /// * `csr` - sparse matrix
    /// * `column_mask` - columns contributing to `masked_sum`; `None`
    ///   leaves `masked_sum` at zero
    ///
    pub fn from_csr<T>(csr: &CsrMatrix<T>, column_mask: Option<&[bool]>) -> anyhow::Result<Self>
    where
        T: Copy + Zero + PartialEq + ToPrimitive,
    {
        if let Some(mask) = column_mask {
            if mask.len() != csr.ncols() {
                anyhow::bail!(
                    "column mask length ({}) does not match ncols ({})",
                    mask.len(),
                    csr.ncols()
                );
            }
        }

        let nrows = csr.nrows();
        let mut nnz = Vec::with_capacity(nrows);
        let mut s1 = Vec::with_capacity(nrows);
        let mut masked_s1 = Vec::with_capacity(nrows);

        for row in csr.row_iter().progress_count(nrows as u64) {
            let mut npos = 0_u64;
            let mut tot = 0_f64;
            let mut masked = 0_f64;

            for (&j, &x) in row.col_indices().iter().zip(row.values().iter()) {
                // explicitly stored zeros are not counted
                if x != T::zero() {
                    npos += 1;
                }
                let x = x.to_f64().unwrap_or(0.0);
                tot += x;
                if column_mask.is_some_and(|mask| mask[j]) {
                    masked += x;
                }
            }

            nnz.push(npos);
            s1.push(tot);
            masked_s1.push(masked);
        }

        Ok(SparseRowStatistics {
            nnz,
            s1,
            masked_s1,
        })
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.s1.len()
    }

    /// Count of non-zero values per row
    pub fn count_nonzeros(&self) -> &[u64] {
        &self.nnz
    }

    /// Sum per row
    pub fn sum(&self) -> &[f64] {
        &self.s1
    }

    /// Sum per row over the masked columns
    pub fn masked_sum(&self) -> &[f64] {
        &self.masked_s1
    }
}
