//! Per-cell quality control: metrics, thresholds, pass flags and the
//! filtered subset of a `CellMatrix`.
//!
//! Thresholds are derived from the whole (unfiltered) population
//! before any cell is removed:
//!
//! ```text
//! pass_n_genes       = n_genes       >= min_n_genes
//! pass_n_counts      = n_counts      >= min_n_counts
//! pass_fraction_mito = fraction_mito <= mean(fraction_mito) + k * sd(fraction_mito)
//! pass_all_qc        = pass_n_genes & pass_n_counts & pass_fraction_mito
//! ```
//!
//! where `fraction_mito = (1 + mito_counts) / (1 + n_counts)`.

use crate::annotation::AnnotationColumn;
use crate::cell_matrix::CellMatrix;

use log::{info, warn};
use matrix_util::common_io::open_buf_writer;
use matrix_util::sparse_stat::SparseRowStatistics;
use matrix_util::vector_stat::VectorSummary;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_MIN_N_COUNTS: f64 = 1000.0;
pub const DEFAULT_MITO_PREFIX: &str = "mt-";
pub const DEFAULT_MITO_NUM_SD: f64 = 2.0;

pub const SAMPLE_KEY: &str = "sample";
pub const N_COUNTS_KEY: &str = "n_counts";
pub const N_GENES_KEY: &str = "n_genes";
pub const FRACTION_MITO_KEY: &str = "fraction_mito";
pub const PASS_N_GENES_KEY: &str = "pass_n_genes";
pub const PASS_N_COUNTS_KEY: &str = "pass_n_counts";
pub const PASS_FRACTION_MITO_KEY: &str = "pass_fraction_mito";
pub const PASS_ALL_QC_KEY: &str = "pass_all_qc";
pub const MITO_KEY: &str = "mito";

/// Parameters of the QC filter
#[derive(Clone, Debug)]
pub struct QcParams {
    pub min_n_genes: u64,
    pub min_n_counts: f64,
    /// case-sensitive prefix of mitochondrial gene names
    pub mito_prefix: Box<str>,
    /// number of standard deviations above the mean `fraction_mito`
    pub mito_num_sd: f64,
}

impl QcParams {
    pub fn new(min_n_genes: u64) -> Self {
        QcParams {
            min_n_genes,
            min_n_counts: DEFAULT_MIN_N_COUNTS,
            mito_prefix: Box::from(DEFAULT_MITO_PREFIX),
            mito_num_sd: DEFAULT_MITO_NUM_SD,
        }
    }
}

/// Flag genes whose names, or the symbol part of `{id}_{symbol}`
/// names, start with `prefix`
pub fn mito_gene_mask(gene_names: &[Box<str>], prefix: &str) -> Vec<bool> {
    gene_names
        .iter()
        .map(|g| {
            g.starts_with(prefix)
                || g.split_once('_')
                    .is_some_and(|(_, symbol)| symbol.starts_with(prefix))
        })
        .collect()
}

/// Per-cell QC metrics
#[derive(Clone, Debug, PartialEq)]
pub struct QcMetrics {
    pub n_counts: Vec<f64>,
    pub n_genes: Vec<u64>,
    pub mito_counts: Vec<f64>,
    pub fraction_mito: Vec<f64>,
}

impl QcMetrics {
    /// Compute the metrics of every cell
    /// * `matrix` - cell x gene counts
    /// * `mito_mask` - mitochondrial genes
    pub fn compute(matrix: &CellMatrix, mito_mask: &[bool]) -> anyhow::Result<Self> {
        let stat = SparseRowStatistics::from_csr(matrix.counts(), Some(mito_mask))?;

        let n_counts = stat.sum().to_vec();
        let n_genes = stat.count_nonzeros().to_vec();
        let mito_counts = stat.masked_sum().to_vec();

        // additive smoothing keeps empty cells finite
        let fraction_mito = mito_counts
            .iter()
            .zip(n_counts.iter())
            .map(|(&m, &t)| (1.0 + m) / (1.0 + t))
            .collect();

        Ok(QcMetrics {
            n_counts,
            n_genes,
            mito_counts,
            fraction_mito,
        })
    }

    pub fn num_cells(&self) -> usize {
        self.n_counts.len()
    }
}

/// Thresholds applied to the metrics
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct QcThresholds {
    pub min_n_genes: u64,
    pub min_n_counts: f64,
    pub max_fraction_mito: f64,
}

impl QcThresholds {
    /// Fixed thresholds from `params` and the mitochondrial cutoff
    /// from the distribution of `fraction_mito` in `metrics`
    pub fn derive(metrics: &QcMetrics, params: &QcParams) -> Self {
        let summary = VectorSummary::from_slice(&metrics.fraction_mito);
        QcThresholds {
            min_n_genes: params.min_n_genes,
            min_n_counts: params.min_n_counts,
            max_fraction_mito: summary.upper_bound(params.mito_num_sd),
        }
    }
}

/// Pass/fail flags per cell
#[derive(Clone, Debug, PartialEq)]
pub struct QcFlags {
    pub pass_n_genes: Vec<bool>,
    pub pass_n_counts: Vec<bool>,
    pub pass_fraction_mito: Vec<bool>,
    pub pass_all_qc: Vec<bool>,
}

impl QcFlags {
    /// Combine the three individual flags
    pub fn from_parts(
        pass_n_genes: Vec<bool>,
        pass_n_counts: Vec<bool>,
        pass_fraction_mito: Vec<bool>,
    ) -> Self {
        let pass_all_qc = pass_n_genes
            .iter()
            .zip(pass_n_counts.iter())
            .zip(pass_fraction_mito.iter())
            .map(|((&g, &c), &m)| g && c && m)
            .collect();

        QcFlags {
            pass_n_genes,
            pass_n_counts,
            pass_fraction_mito,
            pass_all_qc,
        }
    }

    pub fn num_cells(&self) -> usize {
        self.pass_all_qc.len()
    }

    /// Indices of the cells passing every threshold
    pub fn passing_cells(&self) -> Vec<usize> {
        self.pass_all_qc
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect()
    }
}

/// Evaluate the thresholds on each cell
pub fn flag_cells(metrics: &QcMetrics, thresholds: &QcThresholds) -> QcFlags {
    let pass_n_genes = metrics
        .n_genes
        .iter()
        .map(|&g| g >= thresholds.min_n_genes)
        .collect();

    let pass_n_counts = metrics
        .n_counts
        .iter()
        .map(|&c| c >= thresholds.min_n_counts)
        .collect();

    // a NaN cutoff (no cells) passes nothing
    let pass_fraction_mito = metrics
        .fraction_mito
        .iter()
        .map(|&f| f <= thresholds.max_fraction_mito)
        .collect();

    QcFlags::from_parts(pass_n_genes, pass_n_counts, pass_fraction_mito)
}

/// Counts of passing cells, reported after filtering
#[derive(Clone, Debug, Serialize)]
pub struct QcSummary {
    pub sample: Option<Box<str>>,
    pub num_cells: usize,
    pub num_pass_n_genes: usize,
    pub num_pass_n_counts: usize,
    pub num_pass_fraction_mito: usize,
    pub num_pass_all_qc: usize,
    pub fraction_pass_all_qc: f64,
    pub thresholds: QcThresholds,
}

impl QcSummary {
    pub fn new(flags: &QcFlags, thresholds: &QcThresholds, sample: Option<&str>) -> Self {
        fn ntrue(x: &[bool]) -> usize {
            x.iter().filter(|&&b| b).count()
        }

        let num_cells = flags.num_cells();
        let num_pass_all_qc = ntrue(&flags.pass_all_qc);

        QcSummary {
            sample: sample.map(Box::from),
            num_cells,
            num_pass_n_genes: ntrue(&flags.pass_n_genes),
            num_pass_n_counts: ntrue(&flags.pass_n_counts),
            num_pass_fraction_mito: ntrue(&flags.pass_fraction_mito),
            num_pass_all_qc,
            fraction_pass_all_qc: num_pass_all_qc as f64 / num_cells as f64,
            thresholds: *thresholds,
        }
    }

    pub fn log(&self) {
        let t = &self.thresholds;
        info!(
            "Filtering cells based on QC metrics: n_genes >= {}, n_counts >= {}, fraction_mito <= {}",
            t.min_n_genes, t.min_n_counts, t.max_fraction_mito
        );
        info!("Number of cells before filtering: {}", self.num_cells);
        info!(
            "Number of cells passing each threshold: n_genes {}, n_counts {}, fraction_mito {}",
            self.num_pass_n_genes, self.num_pass_n_counts, self.num_pass_fraction_mito
        );
        info!(
            "Number of cells passing all QC thresholds: {}",
            self.num_pass_all_qc
        );
        info!(
            "Fraction of cells passing all QC thresholds: {}",
            self.fraction_pass_all_qc
        );
    }

    /// Write the summary as pretty-printed JSON
    pub fn to_json<P: AsRef<Path>>(&self, file: P) -> anyhow::Result<()> {
        let mut buf = open_buf_writer(file)?;
        serde_json::to_writer_pretty(&mut buf, self)?;
        writeln!(buf)?;
        buf.flush()?;
        Ok(())
    }
}

/// Every input cell with its metrics, thresholds and flags
pub struct QcAnnotation {
    /// the input annotated in `obs` and `var`
    pub annotated: CellMatrix,
    pub metrics: QcMetrics,
    pub thresholds: QcThresholds,
    pub flags: QcFlags,
}

/// Compute metrics, derive thresholds and flag cells without
/// removing any of them.
///
/// Columns added to `obs`: `n_counts`, `n_genes`, `fraction_mito`,
/// `pass_n_genes`, `pass_n_counts`, `pass_fraction_mito`,
/// `pass_all_qc`; to `var`: `mito`. Existing columns with these
/// names are replaced.
pub fn annotate_metrics(matrix: &CellMatrix, params: &QcParams) -> anyhow::Result<QcAnnotation> {
    let mito_mask = mito_gene_mask(matrix.gene_names(), &params.mito_prefix);
    let num_mito = mito_mask.iter().filter(|&&x| x).count();
    if num_mito == 0 && !mito_mask.is_empty() {
        warn!(
            "no gene name starts with `{}`; every fraction_mito is 1 / (1 + n_counts)",
            params.mito_prefix
        );
    }
    info!(
        "{} mitochondrial genes out of {} (prefix `{}`)",
        num_mito,
        mito_mask.len(),
        params.mito_prefix
    );

    let metrics = QcMetrics::compute(matrix, &mito_mask)?;
    let thresholds = QcThresholds::derive(&metrics, params);
    let flags = flag_cells(&metrics, &thresholds);

    let mut annotated = matrix.clone();
    annotated.insert_var(MITO_KEY, AnnotationColumn::Flag(mito_mask))?;

    let obs_columns = [
        (N_COUNTS_KEY, AnnotationColumn::Real(metrics.n_counts.clone())),
        (N_GENES_KEY, AnnotationColumn::Count(metrics.n_genes.clone())),
        (
            FRACTION_MITO_KEY,
            AnnotationColumn::Real(metrics.fraction_mito.clone()),
        ),
        (
            PASS_N_GENES_KEY,
            AnnotationColumn::Flag(flags.pass_n_genes.clone()),
        ),
        (
            PASS_N_COUNTS_KEY,
            AnnotationColumn::Flag(flags.pass_n_counts.clone()),
        ),
        (
            PASS_FRACTION_MITO_KEY,
            AnnotationColumn::Flag(flags.pass_fraction_mito.clone()),
        ),
        (PASS_ALL_QC_KEY, AnnotationColumn::Flag(flags.pass_all_qc.clone())),
    ];

    for (name, column) in obs_columns {
        annotated.insert_obs(name, column)?;
    }

    Ok(QcAnnotation {
        annotated,
        metrics,
        thresholds,
        flags,
    })
}

/// Result of the QC filter
pub struct QcOutcome {
    /// every input cell, annotated with metrics and flags
    pub annotated: CellMatrix,
    /// the cells passing all thresholds, with the same annotation
    pub filtered: CellMatrix,
    pub metrics: QcMetrics,
    pub flags: QcFlags,
    pub thresholds: QcThresholds,
    pub summary: QcSummary,
}

/// Annotate every cell and keep those passing all thresholds, in
/// their original order. An empty result is not an error.
pub fn run_qc(matrix: &CellMatrix, params: &QcParams) -> anyhow::Result<QcOutcome> {
    let QcAnnotation {
        annotated,
        metrics,
        thresholds,
        flags,
    } = annotate_metrics(matrix, params)?;

    let filtered = annotated.subset_cells(&flags.passing_cells())?;

    let sample = annotated
        .obs()
        .texts(SAMPLE_KEY)
        .and_then(|x| x.first())
        .map(|x| &**x);
    let summary = QcSummary::new(&flags, &thresholds, sample);

    Ok(QcOutcome {
        annotated,
        filtered,
        metrics,
        flags,
        thresholds,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;

    fn names(prefix: &str, n: usize) -> Vec<Box<str>> {
        (0..n)
            .map(|i| format!("{}{}", prefix, i).into_boxed_str())
            .collect()
    }

    #[test]
    fn mito_prefix_is_case_sensitive() {
        let genes: Vec<Box<str>> = vec![
            "mt-Co1".into(),
            "MT-CO1".into(),
            "Gapdh".into(),
            "Mt-nd1".into(),
            "mt-Nd1".into(),
        ];
        assert_eq!(
            mito_gene_mask(&genes, "mt-"),
            vec![true, false, false, false, true]
        );
        assert_eq!(
            mito_gene_mask(&genes, "MT-"),
            vec![false, true, false, false, false]
        );
    }

    #[test]
    fn mito_prefix_matches_the_symbol_of_id_symbol_names() {
        let genes: Vec<Box<str>> = vec![
            "ENSMUSG00000064351_mt-Co1".into(),
            "ENSMUSG00000057666_Gapdh".into(),
            "ENSG00000198804_MT-CO1".into(),
            "mt-Nd1".into(),
            "ENSMUSG00000064351".into(),
        ];
        assert_eq!(
            mito_gene_mask(&genes, "mt-"),
            vec![true, false, false, true, false]
        );
        assert_eq!(
            mito_gene_mask(&genes, "MT-"),
            vec![false, false, true, false, false]
        );
    }

    #[test]
    fn metrics_of_a_small_matrix() -> anyhow::Result<()> {
        // genes: g0, g1, mt-a, mt-b
        let dense = DMatrix::<f32>::from_row_slice(
            3,
            4,
            &[
                10., 0., 5., 5., //
                0., 0., 0., 0., //
                3., 4., 0., 1., //
            ],
        );
        let genes: Vec<Box<str>> = vec!["g0".into(), "g1".into(), "mt-a".into(), "mt-b".into()];
        let m = CellMatrix::from_dense(&dense, names("c", 3), genes)?;

        let mask = mito_gene_mask(m.gene_names(), DEFAULT_MITO_PREFIX);
        let metrics = QcMetrics::compute(&m, &mask)?;

        assert_eq!(metrics.n_counts, vec![20.0, 0.0, 8.0]);
        assert_eq!(metrics.n_genes, vec![3, 0, 3]);
        assert_eq!(metrics.mito_counts, vec![10.0, 0.0, 1.0]);
        assert_abs_diff_eq!(metrics.fraction_mito[0], 11.0 / 21.0);
        assert_abs_diff_eq!(metrics.fraction_mito[1], 1.0);
        assert_abs_diff_eq!(metrics.fraction_mito[2], 2.0 / 9.0);
        Ok(())
    }

    #[test]
    fn flags_follow_thresholds() {
        let metrics = QcMetrics {
            n_counts: vec![1000.0, 999.0, 5000.0],
            n_genes: vec![200, 500, 199],
            mito_counts: vec![0.0; 3],
            fraction_mito: vec![0.05, 0.10, 0.11],
        };
        let thresholds = QcThresholds {
            min_n_genes: 200,
            min_n_counts: 1000.0,
            max_fraction_mito: 0.10,
        };

        let flags = flag_cells(&metrics, &thresholds);
        assert_eq!(flags.pass_n_genes, vec![true, true, false]);
        assert_eq!(flags.pass_n_counts, vec![true, false, true]);
        assert_eq!(flags.pass_fraction_mito, vec![true, true, false]);
        assert_eq!(flags.pass_all_qc, vec![true, false, false]);
        assert_eq!(flags.passing_cells(), vec![0]);
    }

    #[test]
    fn summary_counts() {
        let flags = QcFlags::from_parts(
            vec![true, true, false, true],
            vec![true, false, false, true],
            vec![true, true, true, false],
        );
        let thresholds = QcThresholds {
            min_n_genes: 1,
            min_n_counts: 1.0,
            max_fraction_mito: 0.5,
        };
        let summary = QcSummary::new(&flags, &thresholds, Some("s1"));
        assert_eq!(summary.num_cells, 4);
        assert_eq!(summary.num_pass_n_genes, 3);
        assert_eq!(summary.num_pass_n_counts, 2);
        assert_eq!(summary.num_pass_fraction_mito, 3);
        assert_eq!(summary.num_pass_all_qc, 1);
        assert_abs_diff_eq!(summary.fraction_pass_all_qc, 0.25);
        assert_eq!(summary.sample.as_deref(), Some("s1"));
    }
}
