use matrix_util::parquet::ParquetColumn;

/// A typed column of per-cell or per-gene annotation
#[derive(Clone, Debug, PartialEq)]
pub enum AnnotationColumn {
    Text(Vec<Box<str>>),
    Real(Vec<f64>),
    Count(Vec<u64>),
    Flag(Vec<bool>),
}

impl AnnotationColumn {
    pub fn len(&self) -> usize {
        match self {
            AnnotationColumn::Text(x) => x.len(),
            AnnotationColumn::Real(x) => x.len(),
            AnnotationColumn::Count(x) => x.len(),
            AnnotationColumn::Flag(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the elements at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        fn pick<T: Clone>(x: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| x[i].clone()).collect()
        }

        match self {
            AnnotationColumn::Text(x) => AnnotationColumn::Text(pick(x, indices)),
            AnnotationColumn::Real(x) => AnnotationColumn::Real(pick(x, indices)),
            AnnotationColumn::Count(x) => AnnotationColumn::Count(pick(x, indices)),
            AnnotationColumn::Flag(x) => AnnotationColumn::Flag(pick(x, indices)),
        }
    }

    /// Text representation of the `i`-th element
    pub fn format_value(&self, i: usize) -> String {
        match self {
            AnnotationColumn::Text(x) => x[i].to_string(),
            AnnotationColumn::Real(x) => x[i].to_string(),
            AnnotationColumn::Count(x) => x[i].to_string(),
            AnnotationColumn::Flag(x) => x[i].to_string(),
        }
    }

    pub fn as_parquet(&self) -> ParquetColumn<'_> {
        match self {
            AnnotationColumn::Text(x) => ParquetColumn::Text(x),
            AnnotationColumn::Real(x) => ParquetColumn::Real(x),
            AnnotationColumn::Count(x) => ParquetColumn::Count(x),
            AnnotationColumn::Flag(x) => ParquetColumn::Flag(x),
        }
    }
}

/// Ordered, named columns sharing the same number of rows.
///
/// Rows are aligned with either the cells (`obs`) or the genes
/// (`var`) of a `CellMatrix`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationTable {
    nrows: usize,
    columns: Vec<(Box<str>, AnnotationColumn)>,
}

impl AnnotationTable {
    pub fn new(nrows: usize) -> Self {
        AnnotationTable {
            nrows,
            columns: vec![],
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(k, _)| &**k).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationColumn)> {
        self.columns.iter().map(|(k, v)| (&**k, v))
    }

    /// Add a column, or replace the existing one with the same name
    pub fn insert(&mut self, name: &str, column: AnnotationColumn) -> anyhow::Result<()> {
        if column.len() != self.nrows {
            anyhow::bail!(
                "annotation `{}` has {} elements, expected {}",
                name,
                column.len(),
                self.nrows
            );
        }

        match self.columns.iter_mut().find(|(k, _)| &**k == name) {
            Some((_, existing)) => *existing = column,
            None => self.columns.push((Box::from(name), column)),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationColumn> {
        self.columns
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| v)
    }

    pub fn flags(&self, name: &str) -> Option<&[bool]> {
        match self.get(name)? {
            AnnotationColumn::Flag(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    pub fn reals(&self, name: &str) -> Option<&[f64]> {
        match self.get(name)? {
            AnnotationColumn::Real(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    pub fn texts(&self, name: &str) -> Option<&[Box<str>]> {
        match self.get(name)? {
            AnnotationColumn::Text(x) => Some(x.as_slice()),
            _ => None,
        }
    }

    /// A new table with the rows at `indices`
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        AnnotationTable {
            nrows: indices.len(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v.select(indices)))
                .collect(),
        }
    }

    /// Tab-separated lines with a header, one line per row
    /// * `index_name` - header of the first column
    /// * `row_names` - first column
    pub fn to_lines(&self, index_name: &str, row_names: &[Box<str>]) -> Vec<Box<str>> {
        let mut out = Vec::with_capacity(self.nrows + 1);

        let mut header = vec![index_name];
        header.extend(self.names());
        out.push(header.join("\t").into_boxed_str());

        for (i, name) in row_names.iter().enumerate().take(self.nrows) {
            let mut words = vec![name.to_string()];
            words.extend(self.columns.iter().map(|(_, v)| v.format_value(i)));
            out.push(words.join("\t").into_boxed_str());
        }
        out
    }
}
