//! In-memory column data

use crate::checker::ColumnTypes;
use crate::types::DataType;
use crate::value::Value;
use std::collections::BTreeMap;

/// Values of the columns an expression may read.
pub trait ColumnSource {
    /// Name of the table the columns belong to, used in explanation locations.
    fn table_name(&self) -> &str;

    fn column_value(&self, column: &str, row: usize) -> Option<Value>;

    fn column_values(&self, column: &str) -> Option<Vec<Value>>;
}

#[derive(Debug, Clone)]
struct Column {
    data_type: DataType,
    values: Vec<Value>,
}

/// A table held in memory: named, typed columns of values.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    name: String,
    columns: BTreeMap<String, Column>,
}

impl TableData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    pub fn with_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        values: Vec<Value>,
    ) -> Self {
        self.columns
            .insert(name.into(), Column { data_type, values });
        self
    }

    pub fn row_count(&self) -> usize {
        self.columns
            .values()
            .map(|c| c.values.len())
            .max()
            .unwrap_or(0)
    }
}

impl ColumnTypes for TableData {
    fn column_type(&self, name: &str) -> Option<DataType> {
        self.columns.get(name).map(|c| c.data_type.clone())
    }
}

impl ColumnSource for TableData {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn column_value(&self, column: &str, row: usize) -> Option<Value> {
        self.columns.get(column)?.values.get(row).cloned()
    }

    fn column_values(&self, column: &str) -> Option<Vec<Value>> {
        self.columns.get(column).map(|c| c.values.clone())
    }
}
