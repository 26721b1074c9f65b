use crate::common::*;
use crate::input_args::*;

#[derive(Args, Debug)]
pub struct MetricsArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    qc: QcArgs,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        help = "Output table of QC metrics and flags",
        long_help = "One row per cell with the sample, n_counts, n_genes, fraction_mito \n\
		     and the pass flags. \n\
		     Parquet for `.parquet`, tab-separated otherwise (`.tsv` or `.tsv.gz`)"
    )]
    output: Box<str>,

    #[arg(
        long = "summary",
        help = "QC summary in JSON",
        long_help = "Write the thresholds and the number of cells passing each of them."
    )]
    summary: Option<Box<str>>,

    #[arg(
        long,
        short,
        help = "verbosity",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    pub(crate) verbose: bool,
}

pub fn run_metrics(args: &MetricsArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let data = read_cell_matrix(&args.input.matrix_files())?;

    let qc = annotate_metrics(&data, &args.qc.params())?;

    let annotated = &qc.annotated;
    write_annotation(
        &*args.output,
        annotated.obs(),
        CELL_INDEX_NAME,
        annotated.cell_names(),
    )?;

    let sample = annotated
        .obs()
        .texts(SAMPLE_KEY)
        .and_then(|x| x.first())
        .map(|x| &**x);

    let summary = QcSummary::new(&qc.flags, &qc.thresholds, sample);
    summary.log();

    if let Some(file) = args.summary.as_deref() {
        summary.to_json(file)?;
        info!("wrote summary: {}", file);
    }

    info!("done");
    Ok(())
}
