use crate::annotation::{AnnotationColumn, AnnotationTable};
use crate::cell_matrix::CellMatrix;
use crate::qc::SAMPLE_KEY;

use anyhow::Context;
use log::info;
use matrix_util::common_io::{
    basename_without, extension, read_name_words, swap_suffix, write_lines,
};
use matrix_util::mtx_io::{read_mtx_triplets, write_mtx_triplets};
use matrix_util::parquet::{write_parquet_table, ParquetColumn};
use std::path::{Path, PathBuf};

pub const MTX_SUFFIXES: [&str; 2] = [".mtx.gz", ".mtx"];
pub const CELL_INDEX_NAME: &str = "cell";
pub const GENE_INDEX_NAME: &str = "gene";

/// `ENSG00000198804 MT-CO1 Gene Expression` -> `ENSG00000198804_MT-CO1`
pub const MAX_NAME_WORDS: usize = 2;
pub const NAME_DELIM: &str = "_";

/// Where to find a count matrix and its row and column names
#[derive(Clone, Debug)]
pub struct MatrixFiles {
    pub mtx: PathBuf,
    /// names of the rows; derived from `mtx` if missing
    pub rows: Option<PathBuf>,
    /// names of the columns; derived from `mtx` if missing
    pub cols: Option<PathBuf>,
    /// rows are genes and columns are cells
    pub genes_by_cells: bool,
    /// value of the `sample` column; the stem of `mtx` if missing
    pub sample: Option<Box<str>>,
}

impl MatrixFiles {
    pub fn new<P: AsRef<Path>>(mtx: P) -> Self {
        MatrixFiles {
            mtx: mtx.as_ref().to_path_buf(),
            rows: None,
            cols: None,
            genes_by_cells: false,
            sample: None,
        }
    }

    /// `x.mtx.gz` -> `x.rows.gz` or `x.rows`, whichever exists
    fn names_file(&self, given: &Option<PathBuf>, what: &str) -> anyhow::Result<PathBuf> {
        if let Some(f) = given {
            return Ok(f.clone());
        }

        let candidates = [format!(".{}.gz", what), format!(".{}", what)]
            .iter()
            .map(|s| swap_suffix(&self.mtx, &MTX_SUFFIXES, s))
            .collect::<anyhow::Result<Vec<_>>>()?;

        candidates
            .iter()
            .find(|f| f.exists())
            .cloned()
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "no {} names for {}: tried {}",
                    what,
                    self.mtx.display(),
                    candidates[0].display()
                )
            })
    }

    pub fn rows_file(&self) -> anyhow::Result<PathBuf> {
        self.names_file(&self.rows, "rows")
    }

    pub fn cols_file(&self) -> anyhow::Result<PathBuf> {
        self.names_file(&self.cols, "cols")
    }

    pub fn sample_name(&self) -> anyhow::Result<Box<str>> {
        match &self.sample {
            Some(s) => Ok(s.clone()),
            None => basename_without(&self.mtx, &MTX_SUFFIXES),
        }
    }
}

/// Read a cell x gene matrix from MatrixMarket and names files.
///
/// Every cell is labelled with the sample name in the `sample`
/// column of `obs`.
pub fn read_cell_matrix(files: &MatrixFiles) -> anyhow::Result<CellMatrix> {
    let mtx = read_mtx_triplets(&files.mtx)?;

    let rows_file = files.rows_file()?;
    let cols_file = files.cols_file()?;
    let row_names = read_name_words(&rows_file, MAX_NAME_WORDS, NAME_DELIM)?;
    let col_names = read_name_words(&cols_file, MAX_NAME_WORDS, NAME_DELIM)?;

    if row_names.len() != mtx.nrows || col_names.len() != mtx.ncols {
        anyhow::bail!(
            "{} x {} matrix in {}, but {} row names in {} and {} column names in {}",
            mtx.nrows,
            mtx.ncols,
            files.mtx.display(),
            row_names.len(),
            rows_file.display(),
            col_names.len(),
            cols_file.display()
        );
    }

    let (triplets, cell_names, gene_names) = if files.genes_by_cells {
        let triplets: Vec<_> = mtx.triplets.iter().map(|&(g, c, x)| (c, g, x)).collect();
        (triplets, col_names, row_names)
    } else {
        (mtx.triplets, row_names, col_names)
    };

    let mut out = CellMatrix::from_triplets(&triplets, cell_names, gene_names)
        .with_context(|| format!("invalid matrix in {}", files.mtx.display()))?;

    let sample = files.sample_name()?;
    out.insert_obs(
        SAMPLE_KEY,
        AnnotationColumn::Text(vec![sample.clone(); out.num_cells()]),
    )?;

    info!(
        "read {} cells x {} genes ({} non-zeros) from {} [sample: {}]",
        out.num_cells(),
        out.num_genes(),
        out.counts().nnz(),
        files.mtx.display(),
        sample
    );
    Ok(out)
}

/// Output files sharing a prefix
pub struct OutputFiles {
    pub mtx: Box<str>,
    pub rows: Box<str>,
    pub cols: Box<str>,
    pub obs: Box<str>,
    pub var: Box<str>,
}

impl OutputFiles {
    pub fn from_prefix(prefix: &str) -> Self {
        OutputFiles {
            mtx: format!("{}.mtx.gz", prefix).into_boxed_str(),
            rows: format!("{}.rows.gz", prefix).into_boxed_str(),
            cols: format!("{}.cols.gz", prefix).into_boxed_str(),
            obs: format!("{}.obs.tsv.gz", prefix).into_boxed_str(),
            var: format!("{}.var.tsv.gz", prefix).into_boxed_str(),
        }
    }
}

/// Write the counts, names and annotation of `matrix` under `prefix`
/// * `genes_by_cells` - write the counts transposed, genes as rows
pub fn write_cell_matrix(
    matrix: &CellMatrix,
    prefix: &str,
    genes_by_cells: bool,
) -> anyhow::Result<OutputFiles> {
    let out = OutputFiles::from_prefix(prefix);

    let triplets = matrix.to_triplets();
    if genes_by_cells {
        let transposed: Vec<_> = triplets.iter().map(|&(c, g, x)| (g, c, x)).collect();
        write_mtx_triplets(
            &transposed,
            matrix.num_genes(),
            matrix.num_cells(),
            &*out.mtx,
        )?;
        write_lines(matrix.gene_names(), &*out.rows)?;
        write_lines(matrix.cell_names(), &*out.cols)?;
    } else {
        write_mtx_triplets(
            &triplets,
            matrix.num_cells(),
            matrix.num_genes(),
            &*out.mtx,
        )?;
        write_lines(matrix.cell_names(), &*out.rows)?;
        write_lines(matrix.gene_names(), &*out.cols)?;
    }

    write_annotation(
        &*out.obs,
        matrix.obs(),
        CELL_INDEX_NAME,
        matrix.cell_names(),
    )?;
    write_annotation(
        &*out.var,
        matrix.var(),
        GENE_INDEX_NAME,
        matrix.gene_names(),
    )?;

    info!(
        "wrote {} cells x {} genes: {}, {}, {}",
        matrix.num_cells(),
        matrix.num_genes(),
        out.mtx,
        out.rows,
        out.cols
    );
    Ok(out)
}

/// Write an annotation table with its row names as the first column:
/// parquet for `.parquet`, tab-separated text otherwise (gzipped
/// for `.gz`)
pub fn write_annotation<P: AsRef<Path>>(
    file: P,
    table: &AnnotationTable,
    index_name: &str,
    row_names: &[Box<str>],
) -> anyhow::Result<()> {
    if row_names.len() != table.nrows() {
        anyhow::bail!(
            "{} row names for {} annotation rows",
            row_names.len(),
            table.nrows()
        );
    }

    let file = file.as_ref();
    match extension(file).as_deref() {
        Some("parquet") => {
            let mut columns = vec![(index_name, ParquetColumn::Text(row_names))];
            columns.extend(table.iter().map(|(k, v)| (k, v.as_parquet())));
            write_parquet_table(file, &columns)?;
        }
        _ => {
            write_lines(&table.to_lines(index_name, row_names), file)?;
        }
    }
    info!("wrote annotation: {}", file.display());
    Ok(())
}
