use approx::assert_abs_diff_eq;
use lentil::annotation::AnnotationColumn;
use lentil::cell_matrix::CellMatrix;
use lentil::qc::*;
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};

const NUM_NUCLEAR: usize = 98;

fn gene_names() -> Vec<Box<str>> {
    (0..NUM_NUCLEAR)
        .map(|g| format!("Gene{}", g))
        .chain(["mt-Co1".to_string(), "mt-Nd1".to_string()])
        .map(String::into_boxed_str)
        .collect()
}

fn cell_names(n: usize) -> Vec<Box<str>> {
    (0..n)
        .map(|i| format!("cell{}", i).into_boxed_str())
        .collect()
}

/// Spread `n` counts over `k` genes as evenly as possible
fn spread(n: usize, k: usize) -> Vec<f32> {
    (0..k)
        .map(|i| (n / k + usize::from(i < n % k)) as f32)
        .collect()
}

/// One row per (total, mito) pair over 98 nuclear and 2 mito genes
fn build_cells(totals_and_mito: &[(usize, usize)]) -> CellMatrix {
    let ncells = totals_and_mito.len();
    let ngenes = NUM_NUCLEAR + 2;
    let mut dense = DMatrix::<f32>::zeros(ncells, ngenes);
    for (i, &(total, mito)) in totals_and_mito.iter().enumerate() {
        let row: Vec<f32> = spread(total - mito, NUM_NUCLEAR)
            .into_iter()
            .chain(spread(mito, 2))
            .collect();
        for (j, &x) in row.iter().enumerate() {
            dense[(i, j)] = x;
        }
    }
    CellMatrix::from_dense(&dense, cell_names(ncells), gene_names()).unwrap()
}

fn five_cells() -> CellMatrix {
    build_cells(&[(2000, 40), (1500, 30), (10, 0), (3000, 60), (500, 10)])
}

fn names_of(m: &CellMatrix) -> Vec<&str> {
    m.cell_names().iter().map(|x| &**x).collect()
}

#[test]
fn five_cell_example_keeps_good_cells_in_order() -> anyhow::Result<()> {
    let data = five_cells();
    let outcome = run_qc(&data, &QcParams::new(50))?;

    assert_eq!(
        outcome.metrics.n_counts,
        vec![2000.0, 1500.0, 10.0, 3000.0, 500.0]
    );
    assert_eq!(outcome.metrics.n_genes, vec![100, 100, 10, 100, 100]);

    let flags = &outcome.flags;
    assert_eq!(flags.pass_n_genes, vec![true, true, false, true, true]);
    assert_eq!(flags.pass_n_counts, vec![true, true, false, true, false]);
    assert_eq!(flags.pass_all_qc, vec![true, true, false, true, false]);

    assert_eq!(names_of(&outcome.filtered), vec!["cell0", "cell1", "cell3"]);
    assert_eq!(outcome.filtered.num_genes(), data.num_genes());
    assert_eq!(outcome.filtered.get(2, 0), 30.0);

    // the input is left as it was
    assert_eq!(data.num_cells(), 5);
    assert_eq!(data.obs().ncols(), 0);
    Ok(())
}

#[test]
fn mitochondrial_outlier_is_removed() -> anyhow::Result<()> {
    let mut cells = vec![(2000, 40); 19];
    cells.insert(7, (2000, 1000));
    let data = build_cells(&cells);

    let outcome = run_qc(&data, &QcParams::new(50))?;

    let failed: Vec<usize> = outcome
        .flags
        .pass_fraction_mito
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| (!p).then_some(i))
        .collect();
    assert_eq!(failed, vec![7]);
    assert_eq!(outcome.filtered.num_cells(), 19);
    assert!(!names_of(&outcome.filtered).contains(&"cell7"));
    Ok(())
}

#[test]
fn threshold_is_mean_plus_two_population_sd() -> anyhow::Result<()> {
    let data = five_cells();
    let outcome = run_qc(&data, &QcParams::new(50))?;

    let x = &outcome.metrics.fraction_mito;
    let n = x.len() as f64;
    let mean = x.iter().sum::<f64>() / n;
    let var = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    assert_abs_diff_eq!(
        outcome.thresholds.max_fraction_mito,
        mean + 2.0 * var.sqrt(),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(x[0], 41.0 / 2001.0, epsilon = 1e-12);
    assert_abs_diff_eq!(x[2], 1.0 / 11.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn lone_deviant_among_five_sits_on_the_threshold() {
    // the largest population z-score among 5 cells is sqrt(4) = 2
    let metrics = QcMetrics {
        n_counts: vec![2000.0; 5],
        n_genes: vec![100; 5],
        mito_counts: vec![0.0; 5],
        fraction_mito: vec![0.0625, 0.0625, 0.0625, 0.0625, 0.6875],
    };
    let thresholds = QcThresholds::derive(&metrics, &QcParams::new(50));
    assert_eq!(thresholds.max_fraction_mito, 0.6875);

    let flags = flag_cells(&metrics, &thresholds);
    assert!(flags.pass_fraction_mito.iter().all(|&x| x));

    let stricter = QcThresholds {
        max_fraction_mito: thresholds.max_fraction_mito - 1e-9,
        ..thresholds
    };
    let flags = flag_cells(&metrics, &stricter);
    assert_eq!(flags.pass_fraction_mito, [true, true, true, true, false]);
}

#[test]
fn fraction_mito_is_in_unit_interval() -> anyhow::Result<()> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(17);
    let dense = DMatrix::<f32>::from_fn(40, NUM_NUCLEAR + 2, |i, _| {
        if i % 5 == 0 {
            0.0
        } else if rng.random_bool(0.3) {
            rng.random_range(1..20) as f32
        } else {
            0.0
        }
    });
    let data = CellMatrix::from_dense(&dense, cell_names(40), gene_names())?;

    let mask = mito_gene_mask(data.gene_names(), DEFAULT_MITO_PREFIX);
    let metrics = QcMetrics::compute(&data, &mask)?;

    for (i, &f) in metrics.fraction_mito.iter().enumerate() {
        assert!(f > 0.0 && f <= 1.0, "cell {}: {}", i, f);
        if i % 5 == 0 {
            assert_eq!(f, 1.0);
            assert_eq!(metrics.n_genes[i], 0);
        }
    }
    Ok(())
}

#[test]
fn pass_all_is_the_conjunction() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let n = 500;

    let metrics = QcMetrics {
        n_counts: (0..n).map(|_| rng.random_range(0.0..3000.0)).collect(),
        n_genes: (0..n).map(|_| rng.random_range(0..1000)).collect(),
        mito_counts: vec![0.0; n],
        fraction_mito: (0..n).map(|_| rng.random_range(0.0..1.0)).collect(),
    };
    let thresholds = QcThresholds {
        min_n_genes: 500,
        min_n_counts: 1500.0,
        max_fraction_mito: 0.5,
    };

    let flags = flag_cells(&metrics, &thresholds);
    for i in 0..n {
        let expected = metrics.n_genes[i] >= 500
            && metrics.n_counts[i] >= 1500.0
            && metrics.fraction_mito[i] <= 0.5;
        assert_eq!(flags.pass_all_qc[i], expected);
        assert_eq!(
            flags.pass_all_qc[i],
            flags.pass_n_genes[i] && flags.pass_n_counts[i] && flags.pass_fraction_mito[i]
        );
    }

    // every combination shows up
    for combo in 0..8 {
        let found = (0..n).any(|i| {
            let bits = usize::from(flags.pass_n_genes[i])
                | usize::from(flags.pass_n_counts[i]) << 1
                | usize::from(flags.pass_fraction_mito[i]) << 2;
            bits == combo
        });
        assert!(found, "combination {} missing", combo);
    }
}

#[test]
fn output_is_an_annotated_subset() -> anyhow::Result<()> {
    let data = five_cells();
    let outcome = run_qc(&data, &QcParams::new(50))?;

    let input_names = names_of(&data);
    let filtered = &outcome.filtered;
    assert!(filtered.num_cells() <= data.num_cells());
    assert!(names_of(filtered).iter().all(|x| input_names.contains(x)));

    let obs = filtered.obs();
    assert_eq!(
        obs.names(),
        vec![
            N_COUNTS_KEY,
            N_GENES_KEY,
            FRACTION_MITO_KEY,
            PASS_N_GENES_KEY,
            PASS_N_COUNTS_KEY,
            PASS_FRACTION_MITO_KEY,
            PASS_ALL_QC_KEY
        ]
    );
    assert!(obs.flags(PASS_ALL_QC_KEY).unwrap().iter().all(|&x| x));
    assert_eq!(obs.reals(N_COUNTS_KEY).unwrap(), &[2000.0, 1500.0, 3000.0]);

    let mito = filtered.var().flags(MITO_KEY).unwrap();
    assert_eq!(mito.iter().filter(|&&x| x).count(), 2);

    assert_eq!(outcome.annotated.num_cells(), 5);
    assert_eq!(
        outcome.annotated.obs().flags(PASS_ALL_QC_KEY).unwrap(),
        &outcome.flags.pass_all_qc[..]
    );
    Ok(())
}

#[test]
fn filtering_twice_keeps_the_same_cells() -> anyhow::Result<()> {
    let params = QcParams::new(50);
    let once = run_qc(&five_cells(), &params)?.filtered;
    let twice = run_qc(&once, &params)?.filtered;
    assert_eq!(names_of(&once), names_of(&twice));
    assert_eq!(once.to_triplets(), twice.to_triplets());
    Ok(())
}

#[test]
fn all_cells_failing_is_not_an_error() -> anyhow::Result<()> {
    let data = five_cells();
    let outcome = run_qc(&data, &QcParams::new(10_000))?;
    assert_eq!(outcome.filtered.num_cells(), 0);
    assert_eq!(outcome.filtered.num_genes(), data.num_genes());
    assert_eq!(outcome.summary.num_pass_all_qc, 0);
    assert_eq!(outcome.summary.fraction_pass_all_qc, 0.0);
    Ok(())
}

#[test]
fn empty_input_is_not_an_error() -> anyhow::Result<()> {
    let dense = DMatrix::<f32>::zeros(0, NUM_NUCLEAR + 2);
    let data = CellMatrix::from_dense(&dense, vec![], gene_names())?;

    let outcome = run_qc(&data, &QcParams::new(1))?;
    assert!(outcome.thresholds.max_fraction_mito.is_nan());
    assert_eq!(outcome.filtered.num_cells(), 0);
    assert_eq!(outcome.filtered.num_genes(), NUM_NUCLEAR + 2);
    assert_eq!(outcome.summary.num_cells, 0);
    Ok(())
}

#[test]
fn custom_prefix_and_sample_name() -> anyhow::Result<()> {
    let mut data = five_cells();
    data.insert_obs(
        SAMPLE_KEY,
        AnnotationColumn::Text(vec![Box::from("pbmc"); 5]),
    )?;

    let params = QcParams {
        mito_prefix: Box::from("MT-"),
        ..QcParams::new(50)
    };
    let outcome = run_qc(&data, &params)?;

    // no gene matches, so every cell has fraction 1 / (1 + n_counts)
    assert!(outcome
        .annotated
        .var()
        .flags(MITO_KEY)
        .unwrap()
        .iter()
        .all(|&x| !x));
    assert_abs_diff_eq!(outcome.metrics.fraction_mito[0], 1.0 / 2001.0);
    assert_eq!(outcome.summary.sample.as_deref(), Some("pbmc"));
    assert_eq!(outcome.filtered.obs().texts(SAMPLE_KEY).unwrap().len(), 3);
    Ok(())
}

#[test]
fn summary_as_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("summary").join("qc.json");

    let outcome = run_qc(&five_cells(), &QcParams::new(50))?;
    outcome.summary.to_json(&file)?;

    let text = std::fs::read_to_string(&file)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;
    assert_eq!(json["num_cells"], 5);
    assert_eq!(json["num_pass_all_qc"], 3);
    assert_eq!(json["thresholds"]["min_n_genes"], 50);
    assert_eq!(json["thresholds"]["min_n_counts"], 1000.0);
    Ok(())
}
