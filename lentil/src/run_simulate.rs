use crate::common::*;

use lentil::simulate::*;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(
        short = 'o',
        long = "output",
        required = true,
        help = "Output file prefix",
        long_help = "Prefix of the simulated outputs: \n\
		     {out}.mtx.gz, {out}.rows.gz, {out}.cols.gz, \n\
		     {out}.obs.tsv.gz (with the latent `sim_state`) and {out}.var.tsv.gz"
    )]
    output: Box<str>,

    #[arg(long, default_value_t = 1000, help = "number of cells")]
    cells: usize,

    #[arg(long, default_value_t = 2000, help = "number of genes")]
    genes: usize,

    #[arg(
        long = "mito-genes",
        default_value_t = 13,
        help = "number of mitochondrial genes",
        long_help = "Number of mitochondrial genes, named with the `mt-` prefix."
    )]
    mito_genes: usize,

    #[arg(long, default_value_t = 5000.0, help = "expected total count per cell")]
    depth: f64,

    #[arg(
        long = "empty-depth",
        default_value_t = 100.0,
        help = "expected total count per empty droplet"
    )]
    empty_depth: f64,

    #[arg(
        long = "mito-rate",
        default_value_t = 0.03,
        help = "mitochondrial share of counts in intact cells"
    )]
    mito_rate: f64,

    #[arg(
        long = "damaged-mito-rate",
        default_value_t = 0.5,
        help = "mitochondrial share of counts in damaged cells"
    )]
    damaged_mito_rate: f64,

    #[arg(
        long = "frac-damaged",
        default_value_t = 0.1,
        help = "fraction of damaged cells"
    )]
    frac_damaged: f64,

    #[arg(
        long = "frac-empty",
        default_value_t = 0.1,
        help = "fraction of empty droplets"
    )]
    frac_empty: f64,

    #[arg(
        long = "depth-shape",
        default_value_t = 10.0,
        help = "shape of cell size factors",
        long_help = "Shape parameter of the Gamma distribution of cell size factors (mean 1). \n\
		     Smaller values give more variable library sizes."
    )]
    depth_shape: f64,

    #[arg(
        long = "genes-by-cells",
        default_value_t = false,
        help = "Write genes as rows and cells as columns"
    )]
    genes_by_cells: bool,

    #[arg(long, default_value_t = 42, help = "random seed")]
    rseed: u64,

    #[arg(
        long,
        short,
        help = "verbosity",
        long_help = "Enable verbose output `RUST_LOG=info`"
    )]
    pub(crate) verbose: bool,
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let sim_args = SimArgs {
        cells: args.cells,
        genes: args.genes,
        mito_genes: args.mito_genes,
        depth: args.depth,
        empty_depth: args.empty_depth,
        mito_rate: args.mito_rate,
        damaged_mito_rate: args.damaged_mito_rate,
        frac_damaged: args.frac_damaged,
        frac_empty: args.frac_empty,
        depth_shape: args.depth_shape,
        rseed: args.rseed,
    };

    let sim = simulate_cells(&sim_args)?;
    write_cell_matrix(&sim, &args.output, args.genes_by_cells)?;

    info!("done");
    Ok(())
}
