pub mod annotation; // typed obs/var columns
pub mod cell_matrix; // cell x gene counts with names
pub mod cell_matrix_io; // mtx + names files in and out
pub mod qc; // per-cell metrics, thresholds and filtering
pub mod qc_plot; // SVG diagnostics
pub mod simulate;
