use crate::common_io::*;
use anyhow::Context;
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::path::Path;

/// Sparse triplets with the shape declared in a MatrixMarket header
pub struct MtxTriplets {
    pub nrows: usize,
    pub ncols: usize,
    /// (row, col, value) with 0-based indices, in file order
    pub triplets: Vec<(usize, usize, f32)>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum MtxField {
    Real,
    Integer,
    Pattern,
}

fn parse_banner(line: &str) -> anyhow::Result<MtxField> {
    let words: Vec<String> = line
        .split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect();

    if words.len() < 4 || words[0] != "%%matrixmarket" || words[1] != "matrix" {
        anyhow::bail!("not a MatrixMarket banner: {}", line);
    }

    if words[2] != "coordinate" {
        anyhow::bail!("only coordinate matrices are supported, found {}", words[2]);
    }

    if let Some(sym) = words.get(4) {
        if sym != "general" {
            anyhow::bail!("only general matrices are supported, found {}", sym);
        }
    }

    match words[3].as_str() {
        "real" | "double" => Ok(MtxField::Real),
        "integer" => Ok(MtxField::Integer),
        "pattern" => Ok(MtxField::Pattern),
        other => anyhow::bail!("unsupported MatrixMarket field: {}", other),
    }
}

/// Write the triplets into a MatrixMarket file with 1-based indices
/// * `triplets` - (row, col, value) with 0-based indices
/// * `nrow` - number of rows
/// * `ncol` - number of columns
/// * `mtx_file` - the output file (e.g., "matrix.mtx.gz")
pub fn write_mtx_triplets<P: AsRef<Path>>(
    triplets: &[(usize, usize, f32)],
    nrow: usize,
    ncol: usize,
    mtx_file: P,
) -> anyhow::Result<()> {
    let mut buf = open_buf_writer(mtx_file.as_ref())?;

    writeln!(buf, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(buf, "{}\t{}\t{}", nrow, ncol, triplets.len())?;

    for (row, col, val) in triplets {
        writeln!(buf, "{}\t{}\t{}", row + 1, col + 1, val)?;
    }

    buf.flush()?;
    Ok(())
}

/// Read a MatrixMarket coordinate file. Any malformed line, an
/// out-of-range index, or a mismatch with the declared number of
/// non-zero elements is an error.
/// * `mtx_file` - path to the matrix market file (gzipped or not)
pub fn read_mtx_triplets<P: AsRef<Path>>(mtx_file: P) -> anyhow::Result<MtxTriplets> {
    let mtx_file = mtx_file.as_ref();
    let mut lines = open_buf_reader(mtx_file)?
        .lines()
        .collect::<Result<Vec<String>, _>>()
        .with_context(|| format!("failed to read {}", mtx_file.display()))?
        .into_iter();

    let banner = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty mtx file: {}", mtx_file.display()))?;
    let field = parse_banner(&banner)?;

    let mut body = lines.filter(|x| !x.starts_with('%') && !x.trim().is_empty());

    let header = body
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing size line in {}", mtx_file.display()))?;

    let shape = header
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse mtx header: {}", header))?;

    if shape.len() != 3 {
        anyhow::bail!("expected `nrow ncol nnz`, found: {}", header);
    }
    let (nrows, ncols, nnz) = (shape[0], shape[1], shape[2]);

    let data_lines: Vec<String> = body.collect();

    // Parsing takes more time, so split them into parallel jobs
    let triplets = data_lines
        .par_iter()
        .map(|line| parse_row_col_val(line, field, nrows, ncols))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if triplets.len() != nnz {
        anyhow::bail!(
            "{} declares {} elements, but {} were found",
            mtx_file.display(),
            nnz,
            triplets.len()
        );
    }

    Ok(MtxTriplets {
        nrows,
        ncols,
        triplets,
    })
}

fn parse_row_col_val(
    line: &str,
    field: MtxField,
    nrows: usize,
    ncols: usize,
) -> anyhow::Result<(usize, usize, f32)> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let expected = if field == MtxField::Pattern { 2 } else { 3 };
    if words.len() != expected {
        anyhow::bail!("expected {} fields: {}", expected, line);
    }

    let row = words[0]
        .parse::<usize>()
        .with_context(|| format!("bad row index: {}", line))?;
    let col = words[1]
        .parse::<usize>()
        .with_context(|| format!("bad column index: {}", line))?;

    if row == 0 || row > nrows || col == 0 || col > ncols {
        anyhow::bail!("index out of range ({} x {}): {}", nrows, ncols, line);
    }

    let val = match field {
        MtxField::Pattern => 1.0,
        _ => words[2]
            .parse::<f32>()
            .with_context(|| format!("bad value: {}", line))?,
    };

    // convert 1-based to 0-based
    Ok((row - 1, col - 1, val))
}
