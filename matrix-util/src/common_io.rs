use anyhow::Context;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
///
pub fn open_buf_reader<P: AsRef<Path>>(input_file: P) -> anyhow::Result<Box<dyn BufRead>> {
    let path = input_file.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    match path.extension().and_then(|x| x.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer. The parent
/// directory is created if it does not exist yet.
/// * `output_file` - file name--either gzipped or not, or `stdout`/`stderr`
///
pub fn open_buf_writer<P: AsRef<Path>>(output_file: P) -> anyhow::Result<Box<dyn Write>> {
    let path = output_file.as_ref();

    // we can simply override with stdout
    match path.to_str() {
        Some(x) if x.eq_ignore_ascii_case("stdout") => {
            return Ok(Box::new(BufWriter::new(std::io::stdout())));
        }
        Some(x) if x.eq_ignore_ascii_case("stderr") => {
            return Ok(Box::new(BufWriter::new(std::io::stderr())));
        }
        _ => {}
    }

    mkdir(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    match path.extension().and_then(|x| x.to_str()) {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Read every line of the input_file into memory
/// * `input_file` - file name--either gzipped or not
///
pub fn read_lines<P: AsRef<Path>>(input_file: P) -> anyhow::Result<Vec<Box<str>>> {
    let buf = open_buf_reader(input_file.as_ref())?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

///
/// Read non-empty lines as names, joining up to `max_words`
/// whitespace-separated words of each line with `delim` (e.g., a
/// 10x feature line `ENSG00000198804\tMT-CO1\tGene Expression` with
/// `max_words = 2` and `delim = "_"` gives `ENSG00000198804_MT-CO1`)
/// * `input_file` - file name--either gzipped or not
/// * `max_words` - number of leading words to keep
/// * `delim` - separator of the kept words
///
pub fn read_name_words<P: AsRef<Path>>(
    input_file: P,
    max_words: usize,
    delim: &str,
) -> anyhow::Result<Vec<Box<str>>> {
    Ok(read_lines(input_file)?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_whitespace()
                .take(max_words)
                .collect::<Vec<_>>()
                .join(delim)
                .into_boxed_str()
        })
        .collect())
}

///
/// Write every line into the output_file
/// * `lines` - anything that can be displayed line by line
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T, P>(lines: &[T], output_file: P) -> anyhow::Result<()>
where
    T: std::fmt::Display,
    P: AsRef<Path>,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(anyhow::anyhow!("unexpected error: {}", e));
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Create the parent directory of a file if needed
/// * `file` - file name
///
pub fn mkdir<P: AsRef<Path>>(file: P) -> anyhow::Result<()> {
    if let Some(dir) = file.as_ref().parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
    }
    Ok(())
}

///
/// Take the file name and strip the first matching suffix
/// * `file` - file name
/// * `suffixes` - candidates, e.g., `[".mtx.gz", ".mtx"]`
///
pub fn basename_without<P: AsRef<Path>>(file: P, suffixes: &[&str]) -> anyhow::Result<Box<str>> {
    let name = file
        .as_ref()
        .file_name()
        .and_then(|x| x.to_str())
        .ok_or_else(|| anyhow::anyhow!("no file name: {}", file.as_ref().display()))?;

    let stem = suffixes
        .iter()
        .find_map(|s| name.strip_suffix(s))
        .unwrap_or(name);

    Ok(Box::from(stem))
}

///
/// Replace a matching suffix of a file name, or append the
/// replacement if nothing matches
/// * `file` - file name
/// * `suffixes` - candidates to strip
/// * `replacement` - new suffix
///
pub fn swap_suffix<P: AsRef<Path>>(
    file: P,
    suffixes: &[&str],
    replacement: &str,
) -> anyhow::Result<PathBuf> {
    let file = file.as_ref();
    let stem = basename_without(file, suffixes)?;
    let name = format!("{}{}", stem, replacement);
    Ok(match file.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    })
}

///
/// Take the extension of a file, looking through a trailing `.gz`
/// * `file` - file name
///
pub fn extension<P: AsRef<Path>>(file: P) -> Option<Box<str>> {
    let path = file.as_ref();
    let ext = path.extension()?.to_str()?;
    if ext == "gz" {
        let inner = Path::new(path.file_stem()?);
        return inner.extension()?.to_str().map(Box::from);
    }
    Some(Box::from(ext))
}

///
/// Create a temporary directory and suggest a file name
/// * `suffix` - suffix of the file name
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}

///
/// Remove a file or a directory if it exists
/// * `file` - file name
///
pub fn remove_file<P: AsRef<Path>>(file: P) -> anyhow::Result<()> {
    let path = file.as_ref();
    if path.exists() {
        if path.is_file() {
            std::fs::remove_file(path)?;
        } else {
            std::fs::remove_dir_all(path)?;
        }
    }
    Ok(())
}
