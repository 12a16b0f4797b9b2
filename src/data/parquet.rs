//! Parquet encoding for ticks and subscription audits

use super::{AuditAction, AuditRecord, TickRecord};
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

fn timestamp_field() -> Field {
    Field::new(
        "timestamp",
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        false,
    )
}

fn timestamp_column(values: impl Iterator<Item = DateTime<Utc>>) -> ArrayRef {
    let micros: Vec<i64> = values.map(|ts| ts.timestamp_micros()).collect();
    Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
}

fn string_column<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn downcast<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    index: usize,
    name: &str,
) -> anyhow::Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| anyhow::anyhow!("Invalid {} column", name))
}

fn read_timestamp(column: &TimestampMicrosecondArray, row: usize) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(column.value(row))
        .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))
}

/// A record type that can be written to and read from Parquet
pub trait ParquetRecord: Sized + Send + 'static {
    /// File name prefix for this record kind
    const PREFIX: &'static str;

    /// Arrow schema for the record
    fn schema() -> Schema;

    /// Encode records as schema-ordered columns
    fn to_columns(records: &[Self]) -> Vec<ArrayRef>;

    /// Decode one record batch
    fn from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<Self>>;
}

impl ParquetRecord for TickRecord {
    const PREFIX: &'static str = "ticks";

    fn schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            Field::new("symbol", DataType::Utf8, false),
            // Decimals stored as text to keep full precision
            Field::new("price", DataType::Utf8, false),
            Field::new("volume", DataType::Utf8, false),
        ])
    }

    fn to_columns(records: &[Self]) -> Vec<ArrayRef> {
        let prices: Vec<String> = records.iter().map(|t| t.price.to_string()).collect();
        let volumes: Vec<String> = records.iter().map(|t| t.volume.to_string()).collect();

        vec![
            timestamp_column(records.iter().map(|t| t.timestamp)),
            string_column(records.iter().map(|t| t.symbol.as_str())),
            string_column(prices.iter().map(|s| s.as_str())),
            string_column(volumes.iter().map(|s| s.as_str())),
        ]
    }

    fn from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<Self>> {
        let timestamps = downcast::<TimestampMicrosecondArray>(batch, 0, "timestamp")?;
        let symbols = downcast::<StringArray>(batch, 1, "symbol")?;
        let prices = downcast::<StringArray>(batch, 2, "price")?;
        let volumes = downcast::<StringArray>(batch, 3, "volume")?;

        (0..batch.num_rows())
            .map(|i| -> anyhow::Result<TickRecord> {
                Ok(TickRecord {
                    timestamp: read_timestamp(timestamps, i)?,
                    symbol: symbols.value(i).to_string(),
                    price: Decimal::from_str(prices.value(i))?,
                    volume: Decimal::from_str(volumes.value(i))?,
                })
            })
            .collect()
    }
}

impl ParquetRecord for AuditRecord {
    const PREFIX: &'static str = "audits";

    fn schema() -> Schema {
        Schema::new(vec![
            timestamp_field(),
            Field::new("user_id", DataType::Utf8, false),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("action", DataType::Utf8, false),
        ])
    }

    fn to_columns(records: &[Self]) -> Vec<ArrayRef> {
        vec![
            timestamp_column(records.iter().map(|a| a.timestamp)),
            string_column(records.iter().map(|a| a.user_id.as_str())),
            string_column(records.iter().map(|a| a.symbol.as_str())),
            string_column(records.iter().map(|a| a.action.as_str())),
        ]
    }

    fn from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<Self>> {
        let timestamps = downcast::<TimestampMicrosecondArray>(batch, 0, "timestamp")?;
        let users = downcast::<StringArray>(batch, 1, "user_id")?;
        let symbols = downcast::<StringArray>(batch, 2, "symbol")?;
        let actions = downcast::<StringArray>(batch, 3, "action")?;

        (0..batch.num_rows())
            .map(|i| -> anyhow::Result<AuditRecord> {
                Ok(AuditRecord {
                    timestamp: read_timestamp(timestamps, i)?,
                    user_id: users.value(i).to_string(),
                    symbol: symbols.value(i).to_string(),
                    action: AuditAction::from_str(actions.value(i))?,
                })
            })
            .collect()
    }
}

/// Writes one Parquet file per flush into an output directory
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    output_dir: PathBuf,
    sequence: u64,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            sequence: 0,
        }
    }

    /// Ensure output directory exists
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// File path for a given prefix, timestamp and sequence number
    pub fn file_path(&self, prefix: &str, timestamp: DateTime<Utc>, sequence: u64) -> PathBuf {
        let filename = format!(
            "{}_{}_{:06}.parquet",
            prefix,
            timestamp.format("%Y%m%d_%H%M%S"),
            sequence
        );
        self.output_dir.join(filename)
    }

    /// Allocate the path for the next flush
    pub fn next_path(&mut self, prefix: &str, timestamp: DateTime<Utc>) -> PathBuf {
        self.sequence += 1;
        self.file_path(prefix, timestamp, self.sequence)
    }

    /// Write records to a Parquet file. Empty input writes nothing.
    pub fn write<R: ParquetRecord>(&self, path: &Path, records: &[R]) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;

        let schema = Arc::new(R::schema());
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        let batch = RecordBatch::try_new(schema, R::to_columns(records))?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, count = records.len(), kind = R::PREFIX, "Wrote Parquet file");

        Ok(())
    }
}

/// Reader for one Parquet file
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    /// Create a new reader for a Parquet file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read every record in the file
    pub fn read<R: ParquetRecord>(&self) -> anyhow::Result<Vec<R>> {
        let file = File::open(&self.path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut records = Vec::new();
        for batch in reader {
            records.extend(R::from_batch(&batch?)?);
        }
        Ok(records)
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
