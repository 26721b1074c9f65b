use crate::common::*;
use crate::input_args::*;

use lentil::qc_plot::{plot_qc_distributions, plot_qc_scatter, qc_plot_title};

#[derive(Args, Debug)]
pub struct FilterArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    qc: QcArgs,

    #[arg(
        short = 'o',
        long = "output",
        required = true,
        help = "Output file prefix",
        long_help = "Prefix of the filtered outputs: \n\
		     {out}.mtx.gz, {out}.rows.gz, {out}.cols.gz, \n\
		     {out}.obs.tsv.gz (cell annotation) and {out}.var.tsv.gz (gene annotation)"
    )]
    output: Box<str>,

    #[arg(
        long = "qc-table",
        help = "QC metrics and flags of all cells",
        long_help = "Write metrics and flags of every input cell, \n\
		     including those filtered out. \n\
		     Parquet for `.parquet`, tab-separated otherwise (`.tsv` or `.tsv.gz`)"
    )]
    qc_table: Option<Box<str>>,

    #[arg(
        long = "summary",
        help = "QC summary in JSON",
        long_help = "Write the thresholds and the number of cells passing each of them."
    )]
    summary: Option<Box<str>>,

    #[arg(
        long = "qc-violin-plot",
        help = "Distributions of the QC metrics (SVG)",
        long_help = "Histograms of n_genes, n_counts and fraction_mito \n\
		     with thresholds, before filtering."
    )]
    qc_violin_plot: Option<Box<str>>,

    #[arg(
        long = "scatter-plot",
        help = "Pairwise QC metrics (SVG)",
        long_help = "Scatter plots of n_counts vs n_genes, fraction_mito vs n_genes \n\
		     and fraction_mito vs n_counts with thresholds, before filtering."
    )]
    scatter_plot: Option<Box<str>>,

    #[arg(
        long,
        short,
        help = "verbosity",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    pub(crate) verbose: bool,
}

pub fn run_filter(args: &FilterArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let files = args.input.matrix_files();
    let data = read_cell_matrix(&files)?;

    let params = args.qc.params();
    let outcome = run_qc(&data, &params)?;
    outcome.summary.log();

    if outcome.filtered.num_cells() == 0 {
        warn!("no cells passed the QC thresholds");
    }

    write_cell_matrix(
        &outcome.filtered,
        &args.output,
        args.input.genes_by_cells(),
    )?;

    if let Some(file) = args.qc_table.as_deref() {
        let annotated = &outcome.annotated;
        write_annotation(
            file,
            annotated.obs(),
            CELL_INDEX_NAME,
            annotated.cell_names(),
        )?;
    }

    if let Some(file) = args.summary.as_deref() {
        outcome.summary.to_json(file)?;
        info!("wrote summary: {}", file);
    }

    let title = qc_plot_title(&files.sample_name()?);

    if let Some(file) = args.qc_violin_plot.as_deref() {
        plot_qc_distributions(file, &outcome.metrics, &outcome.thresholds, &title)?;
    }

    if let Some(file) = args.scatter_plot.as_deref() {
        plot_qc_scatter(
            file,
            &outcome.metrics,
            &outcome.thresholds,
            &outcome.flags.pass_all_qc,
            &title,
        )?;
    }

    info!("done");
    Ok(())
}
