// src/table.rs

use arrow::{
    array::{new_null_array, Array, ArrayRef, StringArray},
    compute::{cast, concat_batches},
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema, SchemaRef},
    error::ArrowError,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use std::{io::Cursor, sync::Arc};

const CSV_BATCH_SIZE: usize = 8_192;

/// A flat table of string cells, one arrow column per source column.
///
/// Every column is nullable `Utf8`; numeric interpretation is left to
/// [`crate::records`]. Looking up a column the table does not have yields a
/// missing cell rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    batch: RecordBatch,
}

fn utf8_schema(names: impl IntoIterator<Item = String>) -> Schema {
    Schema::new(
        names
            .into_iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

impl RawTable {
    /// Wrap a batch, casting any non-string column to `Utf8`.
    pub fn from_batch(batch: RecordBatch) -> Result<Self, ArrowError> {
        let schema = batch.schema();
        if schema.fields().iter().all(|f| f.data_type() == &DataType::Utf8) {
            return Ok(Self { batch });
        }

        let utf8 = Arc::new(utf8_schema(schema.fields().iter().map(|f| f.name().clone())));
        let columns = batch
            .columns()
            .iter()
            .map(|col| cast(col, &DataType::Utf8))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = RecordBatch::try_new_with_options(
            utf8,
            columns,
            &RecordBatchOptions::new().with_row_count(Some(batch.num_rows())),
        )?;
        Ok(Self { batch })
    }

    /// Parse CSV text with a header line. Bytes that are not valid UTF-8 are
    /// replaced rather than rejected, and short rows are padded with nulls.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, ArrowError> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&*text);

        let (header, _) = Format::default()
            .with_header(true)
            .infer_schema(Cursor::new(text.as_bytes()), Some(0))?;
        if header.fields().is_empty() {
            return Err(ArrowError::CsvError("missing header line".to_string()));
        }
        let schema: SchemaRef = Arc::new(utf8_schema(
            header.fields().iter().map(|f| f.name().trim().to_string()),
        ));

        let reader = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_truncated_rows(true)
            .with_batch_size(CSV_BATCH_SIZE)
            .build(Cursor::new(text.as_bytes()))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            batch: concat_batches(&schema, &batches)?,
        })
    }

    /// Build a table from literal rows; `None` is a missing cell.
    pub fn from_rows<S: AsRef<str>>(
        columns: &[S],
        rows: &[Vec<Option<&str>>],
    ) -> Result<Self, ArrowError> {
        let schema = Arc::new(utf8_schema(columns.iter().map(|c| c.as_ref().to_string())));
        let arrays = (0..columns.len())
            .map(|i| {
                Arc::new(
                    rows.iter()
                        .map(|row| row.get(i).copied().flatten())
                        .collect::<StringArray>(),
                ) as ArrayRef
            })
            .collect();
        let batch = RecordBatch::try_new_with_options(
            schema,
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(rows.len())),
        )?;
        Ok(Self { batch })
    }

    /// Concatenate tables in order. Columns are the union of all inputs, in
    /// first-seen order; a table lacking a column contributes nulls to it.
    /// A single table is returned untouched.
    pub fn concat(tables: Vec<RawTable>) -> Result<Option<RawTable>, ArrowError> {
        if tables.len() <= 1 {
            return Ok(tables.into_iter().next());
        }

        let mut names: Vec<String> = Vec::new();
        for table in &tables {
            for field in table.batch.schema_ref().fields() {
                if !names.contains(field.name()) {
                    names.push(field.name().clone());
                }
            }
        }
        let schema: SchemaRef = Arc::new(utf8_schema(names));

        let aligned = tables
            .iter()
            .map(|t| t.aligned_to(&schema))
            .collect::<Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &aligned)?;
        Ok(Some(Self { batch }))
    }

    fn aligned_to(&self, schema: &SchemaRef) -> Result<RecordBatch, ArrowError> {
        let rows = self.num_rows();
        let columns = schema
            .fields()
            .iter()
            .map(|field| match self.batch.schema_ref().index_of(field.name()) {
                Ok(i) => Arc::clone(self.batch.column(i)),
                Err(_) => new_null_array(&DataType::Utf8, rows),
            })
            .collect();
        RecordBatch::try_new_with_options(
            Arc::clone(schema),
            columns,
            &RecordBatchOptions::new().with_row_count(Some(rows)),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&StringArray> {
        let idx = self.batch.schema_ref().index_of(name).ok()?;
        self.batch.column(idx).as_any().downcast_ref::<StringArray>()
    }

    /// Cell at (`row`, `name`); `None` for nulls, unknown columns and
    /// out-of-range rows.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let col = self.column(name)?;
        (row < col.len() && col.is_valid(row)).then(|| col.value(row))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        (0..self.num_rows()).map(move |index| RowRef { table: self, index })
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a RawTable,
    index: usize,
}

impl<'a> RowRef<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table.value(self.index, column)
    }
}
