/// Arrow schema definitions for classifier output.
pub mod prediction {
    use arrow::datatypes::{DataType, Field, Schema};

    /// Schema for a ranked label → probability table.
    pub fn prediction_schema() -> Schema {
        Schema::new(vec![
            Field::new("rank", DataType::UInt32, false),
            Field::new("label", DataType::Utf8, false),
            Field::new("probability", DataType::Float32, false),
        ])
    }
}

pub use prediction::prediction_schema;
