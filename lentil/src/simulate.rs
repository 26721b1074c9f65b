use crate::annotation::AnnotationColumn;
use crate::cell_matrix::CellMatrix;
use crate::qc::DEFAULT_MITO_PREFIX;

use indicatif::ParallelProgressIterator;
use log::info;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Poisson, Uniform};
use rayon::prelude::*;

pub const SIM_STATE_KEY: &str = "sim_state";

/// Simulation parameters
#[derive(Clone, Debug)]
pub struct SimArgs {
    pub cells: usize,
    pub genes: usize,
    /// the last `mito_genes` genes are mitochondrial
    pub mito_genes: usize,
    /// expected total count of an intact cell
    pub depth: f64,
    /// expected total count of an empty droplet
    pub empty_depth: f64,
    /// share of the counts from mitochondrial genes in intact cells
    pub mito_rate: f64,
    /// share of the counts from mitochondrial genes in damaged cells
    pub damaged_mito_rate: f64,
    pub frac_damaged: f64,
    pub frac_empty: f64,
    /// shape of the gamma-distributed cell size factors
    pub depth_shape: f64,
    pub rseed: u64,
}

impl Default for SimArgs {
    fn default() -> Self {
        SimArgs {
            cells: 500,
            genes: 1000,
            mito_genes: 13,
            depth: 5000.0,
            empty_depth: 100.0,
            mito_rate: 0.03,
            damaged_mito_rate: 0.5,
            frac_damaged: 0.1,
            frac_empty: 0.1,
            depth_shape: 10.0,
            rseed: 42,
        }
    }
}

/// Latent state of a simulated cell
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Healthy,
    Damaged,
    Empty,
}

impl CellState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellState::Healthy => "healthy",
            CellState::Damaged => "damaged",
            CellState::Empty => "empty",
        }
    }
}

fn check_args(args: &SimArgs) -> anyhow::Result<()> {
    if args.mito_genes >= args.genes {
        anyhow::bail!(
            "need at least one non-mitochondrial gene: {} mito out of {}",
            args.mito_genes,
            args.genes
        );
    }

    for (name, p) in [
        ("mito_rate", args.mito_rate),
        ("damaged_mito_rate", args.damaged_mito_rate),
        ("frac_damaged", args.frac_damaged),
        ("frac_empty", args.frac_empty),
    ] {
        if !(0.0..=1.0).contains(&p) {
            anyhow::bail!("{} must be in [0, 1], got {}", name, p);
        }
    }

    if args.frac_damaged + args.frac_empty > 1.0 {
        anyhow::bail!("frac_damaged + frac_empty must not exceed 1");
    }

    if !(args.depth > 0.0 && args.empty_depth > 0.0 && args.depth_shape > 0.0) {
        anyhow::bail!("depth, empty_depth and depth_shape must be positive");
    }
    Ok(())
}

/// Normalized gamma-distributed expression profile
fn sample_profile(n: usize, rng: &mut rand::rngs::StdRng) -> anyhow::Result<Vec<f64>> {
    let rgamma = Gamma::new(0.5, 1.0)?;
    let w: Vec<f64> = (0..n).map(|_| rgamma.sample(rng) + 1e-4).collect();
    let tot: f64 = w.iter().sum();
    Ok(w.into_iter().map(|x| x / tot).collect())
}

/// Simulate a cell x gene count matrix with intact cells, damaged
/// cells leaking nuclear transcripts, and nearly empty droplets.
///
/// ```text
/// s(j)    ~ Gamma(shape, 1/shape)
/// Y(j,g)  ~ Poisson( depth(state(j)) * s(j) * [ (1 - r) * w(g) or r * m(g) ] )
/// ```
///
/// where `w` and `m` are nuclear and mitochondrial profiles and `r`
/// the mitochondrial share of the cell's state. Each cell's latent
/// state is kept in the `sim_state` column of `obs`.
pub fn simulate_cells(args: &SimArgs) -> anyhow::Result<CellMatrix> {
    check_args(args)?;

    let nn = args.cells;
    let dd = args.genes;
    let d_nuc = dd - args.mito_genes;

    let mut rng = rand::rngs::StdRng::seed_from_u64(args.rseed);

    let nuclear = sample_profile(d_nuc, &mut rng)?;
    let mito = sample_profile(args.mito_genes, &mut rng)?;

    let runif = Uniform::new(0.0, 1.0)?;
    let states: Vec<CellState> = (0..nn)
        .map(|_| {
            let u: f64 = runif.sample(&mut rng);
            if u < args.frac_empty {
                CellState::Empty
            } else if u < args.frac_empty + args.frac_damaged {
                CellState::Damaged
            } else {
                CellState::Healthy
            }
        })
        .collect();

    let rsize = Gamma::new(args.depth_shape, 1.0 / args.depth_shape)?;
    let eps = 1e-8;

    let mut triplets = states
        .par_iter()
        .enumerate()
        .progress_count(nn as u64)
        .map(|(j, &state)| {
            let mut rng = rand::rngs::StdRng::seed_from_u64(args.rseed + 1 + j as u64);

            let (depth, rate) = match state {
                CellState::Healthy => (args.depth, args.mito_rate),
                CellState::Damaged => (args.depth, args.damaged_mito_rate),
                CellState::Empty => (args.empty_depth, args.mito_rate),
            };
            let size = depth * rsize.sample(&mut rng);

            let lambda = nuclear
                .iter()
                .map(|&w| size * (1.0 - rate) * w)
                .chain(mito.iter().map(|&m| size * rate * m));

            lambda
                .enumerate()
                .filter_map(|(g, l)| {
                    let rpois = Poisson::new(l.max(eps)).ok()?;
                    let y: f64 = rpois.sample(&mut rng);
                    (y > 0.5).then_some((j, g, y as f32))
                })
                .collect::<Vec<_>>()
        })
        .flatten()
        .collect::<Vec<_>>();

    triplets.sort_by_key(|&(j, g, _)| (j, g));

    info!(
        "sampled {} cells x {} genes with {} non-zero elements",
        nn,
        dd,
        triplets.len()
    );

    let cell_names = (0..nn)
        .map(|j| format!("cell{}", j).into_boxed_str())
        .collect();

    let gene_names = (0..d_nuc)
        .map(|g| format!("gene{}", g))
        .chain((0..args.mito_genes).map(|g| format!("{}gene{}", DEFAULT_MITO_PREFIX, g)))
        .map(String::into_boxed_str)
        .collect();

    let mut out = CellMatrix::from_triplets(&triplets, cell_names, gene_names)?;
    out.insert_obs(
        SIM_STATE_KEY,
        AnnotationColumn::Text(states.iter().map(|s| Box::from(s.as_str())).collect()),
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_names_and_states() -> anyhow::Result<()> {
        let args = SimArgs {
            cells: 50,
            genes: 40,
            mito_genes: 4,
            ..SimArgs::default()
        };
        let sim = simulate_cells(&args)?;

        assert_eq!(sim.num_cells(), 50);
        assert_eq!(sim.num_genes(), 40);
        let nmito = sim
            .gene_names()
            .iter()
            .filter(|g| g.starts_with(DEFAULT_MITO_PREFIX))
            .count();
        assert_eq!(nmito, 4);

        let states = sim.obs().texts(SIM_STATE_KEY).unwrap();
        assert_eq!(states.len(), 50);
        assert!(states
            .iter()
            .all(|s| ["healthy", "damaged", "empty"].contains(&&**s)));
        Ok(())
    }

    #[test]
    fn same_seed_same_counts() -> anyhow::Result<()> {
        let args = SimArgs {
            cells: 30,
            genes: 20,
            mito_genes: 2,
            ..SimArgs::default()
        };
        let a = simulate_cells(&args)?;
        let b = simulate_cells(&args)?;
        assert_eq!(a.to_triplets(), b.to_triplets());

        let c = simulate_cells(&SimArgs { rseed: 7, ..args })?;
        assert_ne!(a.to_triplets(), c.to_triplets());
        Ok(())
    }

    #[test]
    fn rejects_bad_args() {
        let bad = [
            SimArgs {
                genes: 5,
                mito_genes: 5,
                ..SimArgs::default()
            },
            SimArgs {
                frac_damaged: 0.7,
                frac_empty: 0.7,
                ..SimArgs::default()
            },
            SimArgs {
                mito_rate: 1.5,
                ..SimArgs::default()
            },
            SimArgs {
                depth: 0.0,
                ..SimArgs::default()
            },
        ];
        for args in bad {
            assert!(simulate_cells(&args).is_err());
        }
    }
}
