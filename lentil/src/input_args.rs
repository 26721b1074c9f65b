use crate::common::*;

#[derive(Args, Debug)]
pub struct InputArgs {
    #[arg(
        short = 'i',
        long = "input",
        required = true,
        help = "Count matrix in MatrixMarket format (`.mtx` or `.mtx.gz`)",
        long_help = "Count matrix in MatrixMarket coordinate format. \n\
		     By default rows are cells and columns are genes. \n\
		     Example: pbmc.mtx.gz"
    )]
    mtx_file: Box<str>,

    #[arg(
        long = "rows",
        help = "Row names file",
        long_help = "Names of the rows, one per line (first two words joined by `_`). \n\
		     Default: `x.rows.gz` or `x.rows` next to `x.mtx.gz`"
    )]
    row_file: Option<Box<str>>,

    #[arg(
        long = "cols",
        help = "Column names file",
        long_help = "Names of the columns, one per line (first two words joined by `_`). \n\
		     Default: `x.cols.gz` or `x.cols` next to `x.mtx.gz`"
    )]
    col_file: Option<Box<str>>,

    #[arg(
        long = "genes-by-cells",
        default_value_t = false,
        help = "Rows are genes and columns are cells",
        long_help = "Read the matrix transposed: rows are genes and columns are cells, \n\
		     as in 10x Genomics `matrix.mtx.gz` files. \n\
		     Outputs keep the same orientation."
    )]
    genes_by_cells: bool,

    #[arg(
        long,
        help = "Sample name",
        long_help = "Value of the `sample` column of the cell annotation. \n\
		     Default: the input file name without `.mtx(.gz)`"
    )]
    sample: Option<Box<str>>,
}

impl InputArgs {
    pub fn matrix_files(&self) -> MatrixFiles {
        MatrixFiles {
            mtx: PathBuf::from(&*self.mtx_file),
            rows: self.row_file.as_deref().map(PathBuf::from),
            cols: self.col_file.as_deref().map(PathBuf::from),
            genes_by_cells: self.genes_by_cells,
            sample: self.sample.clone(),
        }
    }

    pub fn genes_by_cells(&self) -> bool {
        self.genes_by_cells
    }
}

#[derive(Args, Debug)]
pub struct QcArgs {
    #[arg(
        long = "min-num-genes",
        required = true,
        help = "Minimum number of detected genes per cell",
        long_help = "Cells with fewer genes of non-zero count fail `pass_n_genes`."
    )]
    min_n_genes: u64,

    #[arg(
        long = "min-num-counts",
        default_value_t = DEFAULT_MIN_N_COUNTS,
        help = "Minimum total count per cell",
        long_help = "Cells with a smaller total count fail `pass_n_counts`."
    )]
    min_n_counts: f64,

    #[arg(
        long = "mito-prefix",
        default_value = DEFAULT_MITO_PREFIX,
        help = "Prefix of mitochondrial gene names",
        long_help = "Case-sensitive prefix of mitochondrial gene names. \n\
		     Use `MT-` for human gene symbols."
    )]
    mito_prefix: Box<str>,

    #[arg(
        long = "mito-num-sd",
        default_value_t = DEFAULT_MITO_NUM_SD,
        help = "#standard deviations above the mean `fraction_mito`",
        long_help = "Cells with `fraction_mito` above mean + k * sd \n\
		     of all cells fail `pass_fraction_mito`."
    )]
    mito_num_sd: f64,
}

impl QcArgs {
    pub fn params(&self) -> QcParams {
        QcParams {
            min_n_genes: self.min_n_genes,
            min_n_counts: self.min_n_counts,
            mito_prefix: self.mito_prefix.clone(),
            mito_num_sd: self.mito_num_sd,
        }
    }
}
