use crate::annotation::*;

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::HashSet;

/// A cell-by-gene count matrix with named rows and columns.
///
/// Rows are cells and columns are genes. The counts are stored
/// row-major so that per-cell statistics read contiguous memory.
/// Counts never change after construction; subsetting creates a new
/// matrix. Annotation columns (`obs` for cells, `var` for genes) can
/// be attached later.
#[derive(Clone, Debug)]
pub struct CellMatrix {
    counts: CsrMatrix<f32>,
    cell_names: Vec<Box<str>>,
    gene_names: Vec<Box<str>>,
    obs: AnnotationTable,
    var: AnnotationTable,
}

fn check_unique(names: &[Box<str>], what: &str) -> anyhow::Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for x in names {
        if !seen.insert(&**x) {
            anyhow::bail!("duplicate {} name: {}", what, x);
        }
    }
    Ok(())
}

impl CellMatrix {
    /// Wrap a CSR matrix of counts
    ///
    /// # Arguments
    /// * `counts` - cell x gene counts, non-negative and finite
    /// * `cell_names` - unique cell identifiers, one per row
    /// * `gene_names` - unique gene names, one per column
    ///
    pub fn new(
        counts: CsrMatrix<f32>,
        cell_names: Vec<Box<str>>,
        gene_names: Vec<Box<str>>,
    ) -> anyhow::Result<Self> {
        if cell_names.len() != counts.nrows() {
            anyhow::bail!(
                "{} cell names for {} rows",
                cell_names.len(),
                counts.nrows()
            );
        }

        if gene_names.len() != counts.ncols() {
            anyhow::bail!(
                "{} gene names for {} columns",
                gene_names.len(),
                counts.ncols()
            );
        }

        check_unique(&cell_names, "cell")?;
        check_unique(&gene_names, "gene")?;

        if let Some(x) = counts.values().iter().find(|x| !x.is_finite() || **x < 0.0) {
            anyhow::bail!("counts must be non-negative and finite, found {}", x);
        }

        let ncells = cell_names.len();
        let ngenes = gene_names.len();

        Ok(CellMatrix {
            counts,
            cell_names,
            gene_names,
            obs: AnnotationTable::new(ncells),
            var: AnnotationTable::new(ngenes),
        })
    }

    /// Build from (cell, gene, count) triplets; duplicates are summed
    pub fn from_triplets(
        triplets: &[(usize, usize, f32)],
        cell_names: Vec<Box<str>>,
        gene_names: Vec<Box<str>>,
    ) -> anyhow::Result<Self> {
        let nrows = cell_names.len();
        let ncols = gene_names.len();

        let mut rows = Vec::with_capacity(triplets.len());
        let mut cols = Vec::with_capacity(triplets.len());
        let mut vals = Vec::with_capacity(triplets.len());
        for &(i, j, x) in triplets {
            rows.push(i);
            cols.push(j);
            vals.push(x);
        }

        let coo = CooMatrix::try_from_triplets(nrows, ncols, rows, cols, vals)
            .map_err(|e| anyhow::anyhow!("invalid triplets: {}", e))?;

        Self::new(CsrMatrix::from(&coo), cell_names, gene_names)
    }

    /// Build from a dense cell x gene matrix
    pub fn from_dense(
        dense: &DMatrix<f32>,
        cell_names: Vec<Box<str>>,
        gene_names: Vec<Box<str>>,
    ) -> anyhow::Result<Self> {
        Self::new(CsrMatrix::from(dense), cell_names, gene_names)
    }

    pub fn num_cells(&self) -> usize {
        self.counts.nrows()
    }

    pub fn num_genes(&self) -> usize {
        self.counts.ncols()
    }

    pub fn counts(&self) -> &CsrMatrix<f32> {
        &self.counts
    }

    pub fn cell_names(&self) -> &[Box<str>] {
        &self.cell_names
    }

    pub fn gene_names(&self) -> &[Box<str>] {
        &self.gene_names
    }

    /// per-cell annotation
    pub fn obs(&self) -> &AnnotationTable {
        &self.obs
    }

    /// per-gene annotation
    pub fn var(&self) -> &AnnotationTable {
        &self.var
    }

    pub fn insert_obs(&mut self, name: &str, column: AnnotationColumn) -> anyhow::Result<()> {
        self.obs.insert(name, column)
    }

    pub fn insert_var(&mut self, name: &str, column: AnnotationColumn) -> anyhow::Result<()> {
        self.var.insert(name, column)
    }

    /// Count at (cell, gene); zero if not stored
    pub fn get(&self, cell: usize, gene: usize) -> f32 {
        self.counts
            .get_entry(cell, gene)
            .map(|e| e.into_value())
            .unwrap_or(0.0)
    }

    /// Copy the cells at strictly increasing `indices` into a new
    /// matrix, keeping their `obs` rows and all of `var`
    pub fn subset_cells(&self, indices: &[usize]) -> anyhow::Result<Self> {
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!("cell indices must be strictly increasing");
        }

        let ncols = self.num_genes();
        let mut row_offsets = Vec::with_capacity(indices.len() + 1);
        let mut col_indices = vec![];
        let mut values = vec![];
        row_offsets.push(0);

        for &i in indices {
            let row = self.counts.get_row(i).ok_or_else(|| {
                anyhow::anyhow!("cell index {} out of range ({})", i, self.num_cells())
            })?;
            col_indices.extend_from_slice(row.col_indices());
            values.extend_from_slice(row.values());
            row_offsets.push(col_indices.len());
        }

        let counts = CsrMatrix::try_from_csr_data(
            indices.len(),
            ncols,
            row_offsets,
            col_indices,
            values,
        )
        .map_err(|e| anyhow::anyhow!("failed to subset rows: {}", e))?;

        Ok(CellMatrix {
            counts,
            cell_names: indices.iter().map(|&i| self.cell_names[i].clone()).collect(),
            gene_names: self.gene_names.clone(),
            obs: self.obs.select_rows(indices),
            var: self.var.clone(),
        })
    }

    /// (cell, gene, count) triplets in row-major order
    pub fn to_triplets(&self) -> Vec<(usize, usize, f32)> {
        self.counts
            .triplet_iter()
            .map(|(i, j, &x)| (i, j, x))
            .collect()
    }
}
