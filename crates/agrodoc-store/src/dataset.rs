//! Synthetic dataset snapshots: a CSV table via Arrow and a JSON record list.
//!
//! The CSV reader is tolerant: column order does not matter, extra columns are
//! ignored, and missing statistics columns read as zero. Only `text` and
//! `is_valid` are required.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use agrodoc_core::schema::CORPUS_FEATURES;
use agrodoc_core::{CorpusStatistics, SyntheticSample, dataset};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::StoreError;

/// Columns always read as text regardless of what inference guesses.
const TEXT_COLUMNS: [&str; 4] = [
    dataset::ID,
    dataset::TEXT,
    dataset::DOCUMENT_TYPE,
    dataset::GENERATED_AT,
];

// ── Writing ──

/// Build one RecordBatch holding every sample.
pub fn samples_to_batch(samples: &[SyntheticSample]) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(dataset::synthetic_sample_schema());

    let strings = |f: fn(&SyntheticSample) -> &str| -> ArrayRef {
        Arc::new(StringArray::from_iter_values(samples.iter().map(f)))
    };
    let ints = |f: fn(&CorpusStatistics) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(samples.iter().map(|s| f(&s.stats))))
    };
    let floats = |f: fn(&CorpusStatistics) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from_iter_values(samples.iter().map(|s| f(&s.stats))))
    };

    let columns: Vec<ArrayRef> = vec![
        strings(|s| s.id.as_str()),
        strings(|s| s.text.as_str()),
        Arc::new(BooleanArray::from(
            samples.iter().map(|s| s.is_valid).collect::<Vec<_>>(),
        )),
        strings(|s| s.document_type.as_str()),
        strings(|s| s.generated_at.as_str()),
        ints(|s| s.legal_terms_count),
        ints(|s| s.has_dates),
        ints(|s| s.text_length),
        ints(|s| s.number_count),
        ints(|s| s.special_chars_count),
        floats(|s| s.legal_density),
        ints(|s| s.keywords_present),
        ints(|s| s.has_coordinates),
        floats(|s| s.uppercase_ratio),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write samples as a CSV table with a header row.
pub fn write_dataset_csv(samples: &[SyntheticSample], path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let batch = samples_to_batch(samples)?;
    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(&batch)?;
    info!(path = %path.display(), rows = samples.len(), "wrote dataset CSV");
    Ok(())
}

/// Write samples as a pretty-printed JSON array of records.
pub fn write_dataset_json(samples: &[SyntheticSample], path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, samples)?;
    out.flush()?;
    info!(path = %path.display(), rows = samples.len(), "wrote dataset JSON");
    Ok(())
}

// ── Reading ──

/// Read a dataset CSV written by [`write_dataset_csv`] or by another tool
/// with the same column names.
pub fn read_dataset_csv(path: &Path) -> Result<Vec<SyntheticSample>, StoreError> {
    if !path.is_file() {
        return Err(StoreError::DatasetNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path)?;
    let (inferred, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, None)?;
    file.seek(SeekFrom::Start(0))?;

    // Keep inferred types for everything except the free-text columns, which
    // could otherwise be mistaken for numbers or timestamps.
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| {
            if TEXT_COLUMNS.contains(&f.name().as_str()) {
                Field::new(f.name(), DataType::Utf8, true)
            } else {
                f.as_ref().clone().with_nullable(true)
            }
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema)
        .with_header(true)
        .build(file)?;

    let mut samples = Vec::new();
    for batch in reader {
        let batch = batch?;
        samples.extend(batch_to_samples(&batch, samples.len())?);
    }

    info!(path = %path.display(), rows = samples.len(), "read dataset CSV");
    Ok(samples)
}

fn batch_to_samples(
    batch: &RecordBatch,
    row_offset: usize,
) -> Result<Vec<SyntheticSample>, StoreError> {
    let text = required_strings(batch, dataset::TEXT)?;
    let is_valid = required_booleans(batch, dataset::IS_VALID)?;
    let id = optional_strings(batch, dataset::ID)?;
    let document_type = optional_strings(batch, dataset::DOCUMENT_TYPE)?;
    let generated_at = optional_strings(batch, dataset::GENERATED_AT)?;

    let stats: Vec<Option<Float64Array>> = CORPUS_FEATURES
        .iter()
        .map(|name| optional_floats(batch, name))
        .collect::<Result<_, _>>()?;
    let stat = |col: usize, row: usize| -> f64 {
        match &stats[col] {
            Some(arr) if !arr.is_null(row) => arr.value(row),
            _ => 0.0,
        }
    };

    let mut out = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let absolute = row_offset + row;
        if is_valid.is_null(row) {
            return Err(StoreError::NullValue {
                column: dataset::IS_VALID,
                row: absolute,
            });
        }
        let string_at = |arr: &Option<StringArray>| -> String {
            match arr {
                Some(a) if !a.is_null(row) => a.value(row).to_string(),
                _ => String::new(),
            }
        };

        out.push(SyntheticSample {
            id: match &id {
                Some(a) if !a.is_null(row) => a.value(row).to_string(),
                _ => format!("doc_{:04}", absolute + 1),
            },
            // Empty CSV fields read back as null.
            text: if text.is_null(row) {
                String::new()
            } else {
                text.value(row).to_string()
            },
            is_valid: is_valid.value(row),
            document_type: string_at(&document_type),
            generated_at: string_at(&generated_at),
            stats: CorpusStatistics {
                legal_terms_count: stat(0, row).round() as i64,
                has_dates: stat(1, row).round() as i64,
                text_length: stat(2, row).round() as i64,
                number_count: stat(3, row).round() as i64,
                special_chars_count: stat(4, row).round() as i64,
                legal_density: stat(5, row),
                keywords_present: stat(6, row).round() as i64,
                has_coordinates: stat(7, row).round() as i64,
                uppercase_ratio: stat(8, row),
            },
        });
    }
    Ok(out)
}

// ── Column helpers ──

fn cast_column(
    batch: &RecordBatch,
    name: &str,
    to: &DataType,
) -> Result<Option<ArrayRef>, StoreError> {
    match batch.column_by_name(name) {
        Some(col) => Ok(Some(cast(col, to)?)),
        None => Ok(None),
    }
}

fn required_strings(batch: &RecordBatch, name: &'static str) -> Result<StringArray, StoreError> {
    optional_strings(batch, name)?.ok_or(StoreError::MissingColumn(name))
}

fn optional_strings(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>, StoreError> {
    Ok(cast_column(batch, name, &DataType::Utf8)?.and_then(|arr| {
        arr.as_any().downcast_ref::<StringArray>().cloned()
    }))
}

fn required_booleans(
    batch: &RecordBatch,
    name: &'static str,
) -> Result<BooleanArray, StoreError> {
    cast_column(batch, name, &DataType::Boolean)?
        .and_then(|arr| arr.as_any().downcast_ref::<BooleanArray>().cloned())
        .ok_or(StoreError::MissingColumn(name))
}

fn optional_floats(batch: &RecordBatch, name: &str) -> Result<Option<Float64Array>, StoreError> {
    Ok(cast_column(batch, name, &DataType::Float64)?.and_then(|arr| {
        arr.as_any().downcast_ref::<Float64Array>().cloned()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize, text: &str, is_valid: bool) -> SyntheticSample {
        SyntheticSample {
            id: format!("doc_{:04}", i),
            text: text.to_string(),
            is_valid,
            document_type: if is_valid {
                "escritura_publica".into()
            } else {
                "invalid".into()
            },
            generated_at: "2026-03-01T12:00:00.000000+00:00".into(),
            stats: CorpusStatistics {
                legal_terms_count: 3,
                has_dates: 1,
                text_length: text.chars().count() as i64,
                number_count: 2,
                special_chars_count: 4,
                legal_density: 0.125,
                keywords_present: 2,
                has_coordinates: 0,
                uppercase_ratio: 0.5,
            },
        }
    }

    #[test]
    fn csv_roundtrip_preserves_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("synthetic_data.csv");
        let samples = vec![
            sample(1, "ESCRITURA PÚBLICA DE COMPRA E VENDA", true),
            sample(2, "Receita de bolo: farinha, ovos, açúcar", false),
            sample(3, "Matrícula nº 12.345\nCartório de Registro\n\"Fazenda\"", true),
        ];
        write_dataset_csv(&samples, &path).unwrap();

        let loaded = read_dataset_csv(&path).unwrap();
        assert_eq!(loaded, samples);
    }

    #[test]
    fn read_missing_file() {
        let err = read_dataset_csv(Path::new("/nonexistent/synthetic_data.csv")).unwrap_err();
        assert!(matches!(err, StoreError::DatasetNotFound(_)));
    }

    #[test]
    fn read_tolerates_missing_statistics_and_extra_columns() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("minimal.csv");
        std::fs::write(
            &path,
            "source,is_valid,text\nmanual,True,escritura de imóvel rural\nmanual,False,nota fiscal\n",
        )
        .unwrap();

        let loaded = read_dataset_csv(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].is_valid);
        assert!(!loaded[1].is_valid);
        assert_eq!(loaded[1].text, "nota fiscal");
        assert_eq!(loaded[0].id, "doc_0001");
        assert_eq!(loaded[0].stats, CorpusStatistics::default());
    }

    #[test]
    fn read_requires_label_column() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nolabel.csv");
        std::fs::write(&path, "id,text\ndoc_0001,escritura\n").unwrap();
        let err = read_dataset_csv(&path).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn("is_valid")));
    }

    #[test]
    fn json_snapshot_is_record_list() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("synthetic_data.json");
        let samples = vec![sample(1, "escritura", true), sample(2, "cardápio", false)];
        write_dataset_json(&samples, &path).unwrap();

        let parsed: Vec<SyntheticSample> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, samples);
    }

    #[test]
    fn batch_has_one_row_per_sample() {
        let samples = vec![sample(1, "a", true), sample(2, "b", false)];
        let batch = samples_to_batch(&samples).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 14);
    }
}
