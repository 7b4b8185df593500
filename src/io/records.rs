//! Parquet encoding of node records
//!
//! One row per record. Histogram buckets are flattened into count/size column
//! pairs so the file can be queried directly with DuckDB or pandas.

use crate::models::{NodeKind, NodeRecord, SizeBucket, SizeClass, SizeHistogram, Totals};
use arrow_array::{Array, ArrayRef, RecordBatch, StringArray, UInt64Array};
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;
use std::sync::Arc;

const BUCKET_COLUMNS: [(&str, &str); 5] = [
    ("s_file_count", "s_file_size"),
    ("m_file_count", "m_file_size"),
    ("l_file_count", "l_file_size"),
    ("xl_file_count", "xl_file_size"),
    ("xxl_file_count", "xxl_file_size"),
];

/// Return the Arrow schema shared by record writers and readers.
#[must_use]
pub fn records_schema() -> Arc<Schema> {
    let mut fields = vec![
        Field::new("id", DataType::UInt64, false),
        Field::new("parent_id", DataType::UInt64, false),
        Field::new("path", DataType::Utf8, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("self_size", DataType::UInt64, false),
        Field::new("link_target", DataType::Utf8, true),
        Field::new("total_size", DataType::UInt64, false),
        Field::new("file_count", DataType::UInt64, false),
        Field::new("symlink_count", DataType::UInt64, false),
    ];
    for (count_col, size_col) in BUCKET_COLUMNS {
        fields.push(Field::new(count_col, DataType::UInt64, false));
        fields.push(Field::new(size_col, DataType::UInt64, false));
    }
    Arc::new(Schema::new(fields))
}

pub fn create_records_batch(schema: &Arc<Schema>, records: &[NodeRecord]) -> Result<RecordBatch> {
    let mut columns: Vec<ArrayRef> = vec![
        u64_column(records, |r| r.id),
        u64_column(records, |r| r.parent_id),
        Arc::new(StringArray::from(
            records.iter().map(|r| r.path.as_str()).collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records.iter().map(|r| r.kind.as_str()).collect::<Vec<_>>(),
        )),
        u64_column(records, |r| r.self_size),
        Arc::new(StringArray::from(
            records
                .iter()
                .map(|r| r.link_target.as_deref())
                .collect::<Vec<_>>(),
        )),
        u64_column(records, |r| r.totals.total_size),
        u64_column(records, |r| r.totals.file_count),
        u64_column(records, |r| r.totals.symlink_count),
    ];

    for class in SizeClass::ALL {
        columns.push(u64_column(records, |r| r.totals.histogram.bucket(class).count));
        columns.push(u64_column(records, |r| r.totals.histogram.bucket(class).bytes));
    }

    RecordBatch::try_new(schema.clone(), columns).map_err(Error::other)
}

/// Read every record from a Parquet file written by `ParquetSink`.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<NodeRecord>> {
    let file = File::open(path)?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    let reader = builder
        .build()
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
        for row in 0..batch.num_rows() {
            records.push(extract_record(&batch, row)?);
        }
    }

    Ok(records)
}

fn u64_column(records: &[NodeRecord], f: impl Fn(&NodeRecord) -> u64) -> ArrayRef {
    Arc::new(UInt64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn extract_record(batch: &RecordBatch, row: usize) -> Result<NodeRecord> {
    let kind_label = get_string_value(batch, "kind", row)?
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Missing kind"))?;
    let kind = NodeKind::from_label(&kind_label).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Unknown kind: {kind_label}"),
        )
    })?;

    let mut buckets = [SizeBucket::default(); 5];
    for (bucket, (count_col, size_col)) in buckets.iter_mut().zip(BUCKET_COLUMNS) {
        bucket.count = get_u64_value(batch, count_col, row)?;
        bucket.bytes = get_u64_value(batch, size_col, row)?;
    }

    Ok(NodeRecord {
        id: get_u64_value(batch, "id", row)?,
        parent_id: get_u64_value(batch, "parent_id", row)?,
        path: get_string_value(batch, "path", row)?
            .ok_or_else(|| Error::new(ErrorKind::InvalidData, "Missing path"))?,
        kind,
        self_size: get_u64_value(batch, "self_size", row)?,
        link_target: get_string_value(batch, "link_target", row)?,
        totals: Totals {
            total_size: get_u64_value(batch, "total_size", row)?,
            file_count: get_u64_value(batch, "file_count", row)?,
            symlink_count: get_u64_value(batch, "symlink_count", row)?,
            histogram: SizeHistogram::from_buckets(buckets),
        },
    })
}

fn get_string_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<String>> {
    let col = batch.column_by_name(col_name).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Missing column: {col_name}"),
        )
    })?;

    let array = col.as_any().downcast_ref::<StringArray>().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid type for: {col_name}"),
        )
    })?;

    if array.is_null(row) {
        Ok(None)
    } else {
        Ok(Some(array.value(row).to_string()))
    }
}

fn get_u64_value(batch: &RecordBatch, col_name: &str, row: usize) -> Result<u64> {
    let col = batch.column_by_name(col_name).ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Missing column: {col_name}"),
        )
    })?;

    let array = col.as_any().downcast_ref::<UInt64Array>().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid type for: {col_name}"),
        )
    })?;

    if array.is_null(row) {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("Null value in: {col_name}"),
        ));
    }
    Ok(array.value(row))
}
