use crate::common_io::mkdir;
use parquet::basic::{Compression, ConvertedType, Repetition, Type as ParquetType, ZstdLevel};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::schema::types::Type;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// A borrowed column of a table to be written
pub enum ParquetColumn<'a> {
    Text(&'a [Box<str>]),
    Real(&'a [f64]),
    Count(&'a [u64]),
    Flag(&'a [bool]),
}

impl ParquetColumn<'_> {
    pub fn len(&self) -> usize {
        match self {
            ParquetColumn::Text(x) => x.len(),
            ParquetColumn::Real(x) => x.len(),
            ParquetColumn::Count(x) => x.len(),
            ParquetColumn::Flag(x) => x.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn field(&self, name: &str) -> anyhow::Result<Arc<Type>> {
        let builder = match self {
            ParquetColumn::Text(_) => {
                Type::primitive_type_builder(name, ParquetType::BYTE_ARRAY)
                    .with_converted_type(ConvertedType::UTF8)
            }
            ParquetColumn::Real(_) => Type::primitive_type_builder(name, ParquetType::DOUBLE),
            ParquetColumn::Count(_) => Type::primitive_type_builder(name, ParquetType::INT64),
            ParquetColumn::Flag(_) => Type::primitive_type_builder(name, ParquetType::BOOLEAN),
        };
        Ok(Arc::new(builder.with_repetition(Repetition::REQUIRED).build()?))
    }

    fn write(
        &self,
        row_group_writer: &mut SerializedRowGroupWriter<'_, File>,
    ) -> anyhow::Result<()> {
        let mut column_writer = row_group_writer
            .next_column()?
            .ok_or_else(|| anyhow::anyhow!("no more columns in the schema"))?;

        match self {
            ParquetColumn::Text(x) => {
                let values: Vec<ByteArray> =
                    x.iter().map(|s| ByteArray::from(s.as_bytes())).collect();
                column_writer
                    .typed::<ByteArrayType>()
                    .write_batch(&values, None, None)?;
            }
            ParquetColumn::Real(x) => {
                column_writer
                    .typed::<DoubleType>()
                    .write_batch(x, None, None)?;
            }
            ParquetColumn::Count(x) => {
                let values: Vec<i64> = x.iter().map(|&v| v as i64).collect();
                column_writer
                    .typed::<Int64Type>()
                    .write_batch(&values, None, None)?;
            }
            ParquetColumn::Flag(x) => {
                column_writer
                    .typed::<BoolType>()
                    .write_batch(x, None, None)?;
            }
        }

        column_writer.close()?;
        Ok(())
    }
}

/// Write named columns of equal length into a single row group
///
/// * `file_path`: output file path
/// * `columns`: (name, column) in the output order
///
pub fn write_parquet_table<P: AsRef<Path>>(
    file_path: P,
    columns: &[(&str, ParquetColumn)],
) -> anyhow::Result<()> {
    let nrows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);

    for (name, column) in columns {
        if column.len() != nrows {
            anyhow::bail!(
                "column `{}` has {} rows, expected {}",
                name,
                column.len(),
                nrows
            );
        }
    }

    let fields = columns
        .iter()
        .map(|(name, column)| column.field(name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let schema = Arc::new(
        Type::group_type_builder("table")
            .with_fields(fields)
            .build()?,
    );

    let zstd_level = ZstdLevel::try_new(5)?;
    let writer_properties = Arc::new(
        WriterProperties::builder()
            .set_compression(Compression::ZSTD(zstd_level))
            .build(),
    );

    mkdir(file_path.as_ref())?;
    let file = File::create(file_path.as_ref())?;
    let mut writer = SerializedFileWriter::new(file, schema, writer_properties)?;
    let mut row_group_writer = writer.next_row_group()?;

    for (_, column) in columns {
        column.write(&mut row_group_writer)?;
    }

    row_group_writer.close()?;
    writer.close()?;
    Ok(())
}

/// get field names and the number of rows by peeking into `file_path`
pub fn peek_parquet_fields<P: AsRef<Path>>(file_path: P) -> anyhow::Result<(Vec<Box<str>>, usize)> {
    let file = File::open(file_path.as_ref())?;
    let reader = SerializedFileReader::new(file)?;
    let metadata = reader.metadata().file_metadata();

    let names = metadata
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string().into_boxed_str())
        .collect();

    Ok((names, metadata.num_rows() as usize))
}
