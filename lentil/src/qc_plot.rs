//! Diagnostic figures of the QC metrics, written as SVG

use crate::qc::{QcMetrics, QcThresholds};

use log::info;
use matrix_util::common_io::mkdir;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const NUM_BINS: usize = 50;
const PANEL_WIDTH: u32 = 500;
const PANEL_HEIGHT: u32 = 450;

/// A metric with its threshold, `NaN` if there is none to draw
struct Panel {
    label: &'static str,
    values: Vec<f64>,
    threshold: f64,
}

fn metric_panels(metrics: &QcMetrics, thresholds: &QcThresholds) -> [Panel; 3] {
    [
        Panel {
            label: "n_genes",
            values: metrics.n_genes.iter().map(|&x| x as f64).collect(),
            threshold: thresholds.min_n_genes as f64,
        },
        Panel {
            label: "n_counts",
            values: metrics.n_counts.clone(),
            threshold: thresholds.min_n_counts,
        },
        Panel {
            label: "fraction_mito",
            values: metrics.fraction_mito.clone(),
            threshold: thresholds.max_fraction_mito,
        },
    ]
}

type SvgChart<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Figure title of a sample's QC plots
pub fn qc_plot_title(sample: &str) -> String {
    format!("QC metrics for {}", sample)
}

/// Padded plotting range covering the finite values and threshold
fn axis_range(values: &[f64], threshold: f64) -> (f64, f64) {
    let (lb, ub) = values
        .iter()
        .chain(std::iter::once(&threshold))
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lb, ub), &x| {
            (lb.min(x), ub.max(x))
        });

    if !lb.is_finite() || !ub.is_finite() {
        return (0.0, 1.0);
    }

    let pad = if ub - lb > 0.0 {
        0.05 * (ub - lb)
    } else {
        0.5_f64.max(lb.abs() * 0.05)
    };
    (lb - pad, ub + pad)
}

/// Equal-width bin counts over `[lb, ub)`; the last bin includes `ub`
fn histogram(values: &[f64], lb: f64, ub: f64, nbins: usize) -> Vec<usize> {
    let mut counts = vec![0; nbins];
    let width = (ub - lb) / nbins as f64;
    for &x in values.iter().filter(|x| x.is_finite()) {
        if x < lb || x > ub {
            continue;
        }
        let b = (((x - lb) / width) as usize).min(nbins - 1);
        counts[b] += 1;
    }
    counts
}

fn draw_vline(
    chart: &mut SvgChart<'_, '_>,
    x: f64,
    (ymin, ymax): (f64, f64),
) -> anyhow::Result<()> {
    if x.is_finite() {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x, ymin), (x, ymax)],
                RED.stroke_width(2),
            )))
            .map_err(|e| anyhow::anyhow!("failed to draw threshold: {}", e))?;
    }
    Ok(())
}

fn draw_hline(
    chart: &mut SvgChart<'_, '_>,
    y: f64,
    (xmin, xmax): (f64, f64),
) -> anyhow::Result<()> {
    if y.is_finite() {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(xmin, y), (xmax, y)],
                RED.stroke_width(2),
            )))
            .map_err(|e| anyhow::anyhow!("failed to draw threshold: {}", e))?;
    }
    Ok(())
}

fn draw_histogram(area: &DrawingArea<SVGBackend<'_>, Shift>, panel: &Panel) -> anyhow::Result<()> {
    let (xmin, xmax) = axis_range(&panel.values, panel.threshold);
    let counts = histogram(&panel.values, xmin, xmax, NUM_BINS);
    let ymax = counts.iter().copied().max().unwrap_or(0).max(1) as f64 * 1.1;
    let width = (xmax - xmin) / NUM_BINS as f64;

    let mut chart = ChartBuilder::on(area)
        .caption(panel.label, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xmin..xmax, 0.0..ymax)
        .map_err(|e| anyhow::anyhow!("failed to build chart: {}", e))?;

    chart
        .configure_mesh()
        .x_desc(panel.label)
        .y_desc("cells")
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw mesh: {}", e))?;

    let bars = counts
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0)
        .map(|(b, &c)| {
            let x0 = xmin + b as f64 * width;
            Rectangle::new([(x0, 0.0), (x0 + width, c as f64)], BLUE.mix(0.6).filled())
        });

    chart
        .draw_series(bars)
        .map_err(|e| anyhow::anyhow!("failed to draw bars: {}", e))?;

    draw_vline(&mut chart, panel.threshold, (0.0, ymax))
}

/// Histograms of `n_genes`, `n_counts` and `fraction_mito`, side by
/// side, each with its threshold as a vertical line
pub fn plot_qc_distributions<P: AsRef<Path>>(
    path: P,
    metrics: &QcMetrics,
    thresholds: &QcThresholds,
    title: &str,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    mkdir(path)?;

    let root = SVGBackend::new(path, (3 * PANEL_WIDTH, PANEL_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to fill {}: {}", path.display(), e))?;
    let root = root
        .titled(title, ("sans-serif", 24))
        .map_err(|e| anyhow::anyhow!("failed to add title: {}", e))?;

    let panels = root.split_evenly((1, 3));
    for (area, panel) in panels.iter().zip(metric_panels(metrics, thresholds).iter()) {
        draw_histogram(area, panel)?;
    }

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
    info!("wrote {}", path.display());
    Ok(())
}

fn draw_scatter(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    xx: &Panel,
    yy: &Panel,
    pass: &[bool],
) -> anyhow::Result<()> {
    let (xmin, xmax) = axis_range(&xx.values, xx.threshold);
    let (ymin, ymax) = axis_range(&yy.values, yy.threshold);

    let mut chart = ChartBuilder::on(area)
        .caption(format!("{} vs {}", yy.label, xx.label), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xmin..xmax, ymin..ymax)
        .map_err(|e| anyhow::anyhow!("failed to build chart: {}", e))?;

    chart
        .configure_mesh()
        .x_desc(xx.label)
        .y_desc(yy.label)
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw mesh: {}", e))?;

    let points = xx
        .values
        .iter()
        .zip(yy.values.iter())
        .zip(pass.iter())
        .filter(|((x, y), _)| x.is_finite() && y.is_finite());

    chart
        .draw_series(points.map(|((&x, &y), &ok)| {
            let color = if ok { BLUE.mix(0.5) } else { BLACK.mix(0.3) };
            Circle::new((x, y), 2, color.filled())
        }))
        .map_err(|e| anyhow::anyhow!("failed to draw points: {}", e))?;

    draw_vline(&mut chart, xx.threshold, (ymin, ymax))?;
    draw_hline(&mut chart, yy.threshold, (xmin, xmax))
}

/// Pairwise scatter plots of the metrics, with thresholds overlaid
/// and cells passing all of them highlighted:
/// `n_counts` vs `n_genes`, `fraction_mito` vs `n_genes`,
/// `fraction_mito` vs `n_counts`
pub fn plot_qc_scatter<P: AsRef<Path>>(
    path: P,
    metrics: &QcMetrics,
    thresholds: &QcThresholds,
    pass_all_qc: &[bool],
    title: &str,
) -> anyhow::Result<()> {
    if pass_all_qc.len() != metrics.num_cells() {
        anyhow::bail!(
            "{} flags for {} cells",
            pass_all_qc.len(),
            metrics.num_cells()
        );
    }

    let path = path.as_ref();
    mkdir(path)?;

    let root = SVGBackend::new(path, (3 * PANEL_WIDTH, PANEL_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to fill {}: {}", path.display(), e))?;
    let root = root
        .titled(title, ("sans-serif", 24))
        .map_err(|e| anyhow::anyhow!("failed to add title: {}", e))?;

    let [genes, counts, mito] = metric_panels(metrics, thresholds);
    let pairs = [(&genes, &counts), (&genes, &mito), (&counts, &mito)];

    let panels = root.split_evenly((1, 3));
    for (area, (xx, yy)) in panels.iter().zip(pairs) {
        draw_scatter(area, xx, yy, pass_all_qc)?;
    }

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
    info!("wrote {}", path.display());
    Ok(())
}
