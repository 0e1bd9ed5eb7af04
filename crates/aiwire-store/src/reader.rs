//! Typed, null-aware column access for Arrow record batches.
//!
//! `batch.get_value::<i64>(row, "year")` returns `Ok(None)` for SQL NULL,
//! and a [`StoreError`] for a missing column, an out-of-range row, or a
//! column whose Arrow type cannot be read as the requested Rust type.

use arrow::array::{
    Array, BooleanArray, Decimal128Array, Float32Array, Float64Array, Int8Array, Int16Array, Int32Array,
    Int64Array, LargeListArray, LargeStringArray, ListArray, StringArray, StringViewArray,
    UInt8Array, UInt16Array, UInt32Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;

use crate::StoreError;

/// A Rust type that can be read out of an Arrow column cell.
pub trait FromColumn: Sized {
    /// Human-readable type name used in mismatch errors.
    const EXPECTED: &'static str;

    /// Whether columns of `data_type` can be read as `Self`.
    fn accepts(data_type: &DataType) -> bool;

    /// Read a non-null cell. Only called when [`accepts`](Self::accepts) holds.
    fn read(col: &dyn Array, row: usize) -> Option<Self>;
}

/// Extension trait for typed cell retrieval.
pub trait ColumnReader {
    /// Read `column` at `row`. NULL cells yield `Ok(None)`.
    fn get_value<T: FromColumn>(&self, row: usize, column: &str) -> Result<Option<T>, StoreError>;

    /// Like [`get_value`](Self::get_value) but NULL becomes `T::default()`.
    fn get_value_or_default<T: FromColumn + Default>(
        &self,
        row: usize,
        column: &str,
    ) -> Result<T, StoreError> {
        Ok(self.get_value(row, column)?.unwrap_or_default())
    }

    /// Like [`get_value`](Self::get_value) but NULL becomes `fallback`.
    fn get_value_or<T: FromColumn>(
        &self,
        row: usize,
        column: &str,
        fallback: T,
    ) -> Result<T, StoreError> {
        Ok(self.get_value(row, column)?.unwrap_or(fallback))
    }
}

impl ColumnReader for RecordBatch {
    fn get_value<T: FromColumn>(&self, row: usize, column: &str) -> Result<Option<T>, StoreError> {
        let col = self
            .column_by_name(column)
            .ok_or_else(|| StoreError::ColumnNotFound(column.to_string()))?;

        if row >= self.num_rows() {
            return Err(StoreError::RowOutOfBounds {
                row,
                rows: self.num_rows(),
            });
        }

        let data_type = col.data_type();
        if *data_type == DataType::Null {
            return Ok(None);
        }
        let mismatch = || StoreError::TypeMismatch {
            column: column.to_string(),
            expected: T::EXPECTED,
            actual: data_type.to_string(),
        };
        if !T::accepts(data_type) {
            return Err(mismatch());
        }
        if col.is_null(row) {
            return Ok(None);
        }
        T::read(col.as_ref(), row).map(Some).ok_or_else(mismatch)
    }
}

// ── Implementations ──

/// Try each listed array type in turn and convert the cell with `as $target`.
macro_rules! read_numeric {
    ($col:expr, $row:expr, $target:ty, [$($arr:ty),+ $(,)?]) => {{
        let any = $col.as_any();
        None::<$target>
            $(.or_else(|| any.downcast_ref::<$arr>().map(|a| a.value($row) as $target)))+
    }};
}

impl FromColumn for i64 {
    const EXPECTED: &'static str = "i64";

    fn accepts(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::Decimal128(_, 0)
        )
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        read_numeric!(
            col,
            row,
            i64,
            [Int64Array, Int32Array, Int16Array, Int8Array, UInt32Array, UInt16Array, UInt8Array]
        )
        // HUGEINT arrives as Decimal128(38, 0); values outside i64 are a mismatch.
        .or_else(|| decimal_at(col, row).and_then(|(v, _)| i64::try_from(v).ok()))
    }
}

impl FromColumn for i32 {
    const EXPECTED: &'static str = "i32";

    fn accepts(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::UInt8 | DataType::UInt16
        )
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        read_numeric!(col, row, i32, [Int32Array, Int16Array, Int8Array, UInt16Array, UInt8Array])
    }
}

impl FromColumn for f64 {
    const EXPECTED: &'static str = "f64";

    fn accepts(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Float32 | DataType::Float64 | DataType::Decimal128(_, _)
        )
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        read_numeric!(col, row, f64, [Float64Array, Float32Array])
            .or_else(|| {
                decimal_at(col, row).map(|(v, scale)| v as f64 / 10f64.powi(i32::from(scale)))
            })
    }
}

impl FromColumn for f32 {
    const EXPECTED: &'static str = "f32";

    fn accepts(data_type: &DataType) -> bool {
        matches!(data_type, DataType::Float32)
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        read_numeric!(col, row, f32, [Float32Array])
    }
}

impl FromColumn for bool {
    const EXPECTED: &'static str = "bool";

    fn accepts(data_type: &DataType) -> bool {
        matches!(data_type, DataType::Boolean)
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        col.as_any()
            .downcast_ref::<BooleanArray>()
            .map(|a| a.value(row))
    }
}

impl FromColumn for String {
    const EXPECTED: &'static str = "string";

    fn accepts(data_type: &DataType) -> bool {
        matches!(
            data_type,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
        )
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        string_at(col, row)
    }
}

impl FromColumn for Vec<String> {
    const EXPECTED: &'static str = "list<string>";

    fn accepts(data_type: &DataType) -> bool {
        match data_type {
            DataType::List(f) | DataType::LargeList(f) => String::accepts(f.data_type()),
            _ => false,
        }
    }

    fn read(col: &dyn Array, row: usize) -> Option<Self> {
        if let Some(list) = col.as_any().downcast_ref::<ListArray>() {
            return Some(strings_from_array(list.value(row).as_ref()));
        }
        if let Some(list) = col.as_any().downcast_ref::<LargeListArray>() {
            return Some(strings_from_array(list.value(row).as_ref()));
        }
        None
    }
}

/// Extract a string value from Utf8, LargeUtf8 or Utf8View arrays.
fn string_at(col: &dyn Array, row: usize) -> Option<String> {
    let any = col.as_any();
    any.downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            any.downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
        .or_else(|| {
            any.downcast_ref::<StringViewArray>()
                .map(|arr| arr.value(row).to_string())
        })
}

/// Unscaled value and scale of a Decimal128 cell.
fn decimal_at(col: &dyn Array, row: usize) -> Option<(i128, i8)> {
    col.as_any()
        .downcast_ref::<Decimal128Array>()
        .map(|a| (a.value(row), a.scale()))
}

fn strings_from_array(arr: &dyn Array) -> Vec<String> {
    (0..arr.len())
        .filter(|&i| !arr.is_null(i))
        .filter_map(|i| string_at(arr, i))
        .collect()
}
