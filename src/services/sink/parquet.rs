//! Streaming Parquet sink that writes each batch as one record batch.

use super::{RecordSink, SinkFinish};
use crate::io::records::{create_records_batch, records_schema};
use crate::models::NodeRecord;
use crate::{Error, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ParquetSink {
    writer: Option<ArrowWriter<File>>,
    schema: Arc<arrow_schema::Schema>,
    persisted: u64,
    batches: u64,
    output_path: PathBuf,
}

impl ParquetSink {
    /// Create a new sink targeting the provided output path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path_ref)?;
        let schema = records_schema();
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))
            .map_err(|e| Error::Sink(format!("cannot open Parquet writer: {e}")))?;

        Ok(Self {
            writer: Some(writer),
            schema,
            persisted: 0,
            batches: 0,
            output_path: path_ref.to_path_buf(),
        })
    }
}

impl RecordSink for ParquetSink {
    fn write_batch(&mut self, batch: &[NodeRecord]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let record_batch = create_records_batch(&self.schema, batch)
            .map_err(|e| Error::Persistence(format!("cannot encode batch: {e}")))?;

        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::Persistence("Parquet writer already closed before write".to_string())
        })?;
        writer
            .write(&record_batch)
            .map_err(|e| Error::Persistence(format!("cannot write batch: {e}")))?;

        self.persisted = self.persisted.saturating_add(batch.len() as u64);
        self.batches = self.batches.saturating_add(1);
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<SinkFinish> {
        let writer = self.writer.take().ok_or_else(|| {
            Error::Persistence(format!(
                "Parquet writer for {} already closed",
                self.output_path.display()
            ))
        })?;

        writer
            .close()
            .map_err(|e| Error::Persistence(format!("cannot close Parquet file: {e}")))?;

        log::debug!(
            "Closed Parquet output {} ({} records)",
            self.output_path.display(),
            self.persisted
        );

        Ok(SinkFinish::new(Vec::new(), self.persisted, self.batches, false))
    }
}
