#![allow(unused)]

pub use matrix_util::common_io as io;

pub use clap::{ArgAction, Args, Parser, Subcommand};

pub use log::{info, warn};
pub use std::path::{Path, PathBuf};

pub use lentil::cell_matrix::CellMatrix;
pub use lentil::cell_matrix_io::*;
pub use lentil::qc::*;
