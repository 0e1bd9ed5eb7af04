//! Terminal rendering for classifier output, face lists, and query columns.

use aiwire_connectors::Face;
use aiwire_core::LabelProbabilities;
use aiwire_store::{ColumnReader, StoreError};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::ValueEnum;

/// Print a probability distribution as a ranked Arrow table.
pub fn print_probabilities(probs: &LabelProbabilities) -> anyhow::Result<()> {
    let batch = probs.to_record_batch()?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

pub fn print_faces(faces: &[Face]) {
    if faces.is_empty() {
        println!("No faces detected.");
        return;
    }
    for (i, face) in faces.iter().enumerate() {
        let r = &face.rectangle;
        println!("Face {}", i + 1);
        println!("  {:<10} {}", "gender", face.gender);
        println!("  {:<10} {}", "age", face.age);
        println!(
            "  {:<10} left={} top={} width={} height={}",
            "box", r.left, r.top, r.width, r.height
        );
    }
}

pub fn print_batches(batches: &[RecordBatch]) -> anyhow::Result<()> {
    println!("{}", pretty_format_batches(batches)?);
    Ok(())
}

/// Rust type to read a single column as.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColumnKind {
    String,
    Int,
    Float,
    Bool,
    List,
}

/// Print one column, one line per row, reading cells through [`ColumnReader`].
pub fn print_column(
    batches: &[RecordBatch],
    column: &str,
    kind: ColumnKind,
) -> Result<(), StoreError> {
    for batch in batches {
        for row in 0..batch.num_rows() {
            println!("{}", format_cell(batch, row, column, kind)?);
        }
    }
    Ok(())
}

pub fn format_cell(
    batch: &RecordBatch,
    row: usize,
    column: &str,
    kind: ColumnKind,
) -> Result<String, StoreError> {
    let cell = match kind {
        ColumnKind::String => batch.get_value::<String>(row, column)?,
        ColumnKind::Int => batch.get_value::<i64>(row, column)?.map(|v| v.to_string()),
        ColumnKind::Float => batch.get_value::<f64>(row, column)?.map(|v| v.to_string()),
        ColumnKind::Bool => batch.get_value::<bool>(row, column)?.map(|v| v.to_string()),
        ColumnKind::List => batch
            .get_value::<Vec<String>>(row, column)?
            .map(|v| v.join(", ")),
    };
    Ok(cell.unwrap_or_else(|| "NULL".to_string()))
}
