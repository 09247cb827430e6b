//! In-memory tabular records.
//!
//! A [`Table`] is an index column plus ordered data columns, all of the
//! same length. Stores only need two things from it: selecting row
//! positions where a column equals a value, and slicing by those positions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::topology::Gpi;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Time(NaiveDateTime),
    Text(String),
}

impl Value {
    /// Interpret this value as a grid point index.
    pub fn as_gpi(&self) -> Option<Gpi> {
        match self {
            Value::Int(v) if *v >= 0 => Some(*v as Gpi),
            Value::Float(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as Gpi),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Time(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&self, positions: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            values: positions.iter().map(|&p| self.values[p].clone()).collect(),
        }
    }
}

/// Tabular record set with a designated index column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    index: Column,
    columns: Vec<Column>,
}

impl Table {
    /// Create a table from its index column.
    pub fn new(index_name: impl Into<String>, index: Vec<Value>) -> Self {
        Self {
            index: Column::new(index_name, index),
            columns: Vec::new(),
        }
    }

    /// Add a data column. Its length must match the index.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        self.push_column(Column::new(name, values))?;
        Ok(self)
    }

    /// Append a data column in place.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.index.len() {
            return Err(DatasetError::schema_mismatch(format!(
                "column '{}' has {} rows, index has {}",
                column.name,
                column.len(),
                self.index.len()
            )));
        }
        if self.column_position(&column.name).is_some() {
            return Err(DatasetError::schema_mismatch(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True for a table with no rows and no columns, i.e. nothing stored yet.
    pub fn is_blank(&self) -> bool {
        self.is_empty() && self.columns.is_empty()
    }

    pub fn index(&self) -> &Column {
        &self.index
    }

    pub fn index_name(&self) -> &str {
        &self.index.name
    }

    pub fn set_index_name(&mut self, name: impl Into<String>) {
        self.index.name = name.into();
    }

    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.set_index_name(name);
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Look up a column by name. The index column matches too.
    pub fn column(&self, name: &str) -> Option<&Column> {
        if self.index.name == name {
            return Some(&self.index);
        }
        self.column_position(name).map(|p| &self.columns[p])
    }

    /// Values of the given row, index first.
    pub fn row(&self, position: usize) -> Option<Vec<&Value>> {
        if position >= self.len() {
            return None;
        }
        let mut row = Vec::with_capacity(self.columns.len() + 1);
        row.push(&self.index.values[position]);
        row.extend(self.columns.iter().map(|c| &c.values[position]));
        Some(row)
    }

    /// Row positions where `column` equals `value`, in storage order.
    ///
    /// A table with no rows yields no positions even if the column is absent.
    pub fn positions_eq(&self, column: &str, value: &Value) -> Result<Vec<usize>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let column = self
            .column(column)
            .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;
        Ok(column
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| *v == value)
            .map(|(i, _)| i)
            .collect())
    }

    /// Rows whose `column` holds the grid point index `gpi`.
    ///
    /// Values compare numerically, so a whole float such as `1.0` selects
    /// grid point 1.
    pub fn select_gpi(&self, column: &str, gpi: Gpi) -> Result<Table> {
        if self.is_empty() {
            return Ok(self.take(&[]));
        }
        let column = self
            .column(column)
            .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))?;
        let positions: Vec<usize> = column
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.as_gpi() == Some(gpi))
            .map(|(i, _)| i)
            .collect();
        Ok(self.take(&positions))
    }

    /// New table with the rows at `positions`, in the given order.
    pub fn take(&self, positions: &[usize]) -> Table {
        Table {
            index: self.index.take(positions),
            columns: self.columns.iter().map(|c| c.take(positions)).collect(),
        }
    }

    /// Append the rows of `other`. Data column names must match in order.
    ///
    /// A blank table adopts `other` wholesale.
    pub fn extend(&mut self, other: Table) -> Result<()> {
        if self.is_blank() {
            *self = other;
            return Ok(());
        }
        if other.is_blank() {
            return Ok(());
        }
        let ours = self.column_names();
        let theirs = other.column_names();
        if ours != theirs {
            return Err(DatasetError::schema_mismatch(format!(
                "expected columns {:?}, got {:?}",
                ours, theirs
            )));
        }
        self.index.values.extend(other.index.values);
        for (mine, incoming) in self.columns.iter_mut().zip(other.columns) {
            mine.values.extend(incoming.values);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new("gpi", vec![3.into(), 1.into(), 3.into(), 2.into()])
            .with_column("data", vec![10.0.into(), 11.0.into(), 12.0.into(), 13.0.into()])
            .unwrap()
    }

    #[test]
    fn test_column_length_must_match_index() {
        let result = Table::new("gpi", vec![1.into()]).with_column("data", vec![]);
        assert!(matches!(result, Err(DatasetError::SchemaMismatch(_))));
    }

    #[test]
    fn test_positions_eq_matches_index_and_columns() {
        let table = sample();
        assert_eq!(table.positions_eq("gpi", &Value::Int(3)).unwrap(), vec![0, 2]);
        assert_eq!(table.positions_eq("data", &Value::Float(13.0)).unwrap(), vec![3]);
        assert!(table.positions_eq("gpi", &Value::Int(9)).unwrap().is_empty());
    }

    #[test]
    fn test_positions_eq_missing_column() {
        let table = sample();
        assert!(matches!(
            table.positions_eq("nope", &Value::Int(1)),
            Err(DatasetError::MissingColumn(_))
        ));
        assert!(Table::default().positions_eq("nope", &Value::Int(1)).unwrap().is_empty());
    }

    #[test]
    fn test_select_gpi_keeps_order() {
        let subset = sample().select_gpi("gpi", 3).unwrap();
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.column("data").unwrap().values, vec![Value::Float(10.0), Value::Float(12.0)]);
    }

    #[test]
    fn test_select_gpi_matches_whole_floats() {
        let table = Table::new("date", vec![0.into(), 1.into(), 2.into()])
            .with_column("gpi", vec![1.0.into(), 2.0.into(), 1.5.into()])
            .unwrap();
        let subset = table.select_gpi("gpi", 1).unwrap();
        assert_eq!(subset.index().values, vec![Value::Int(0)]);
        assert!(table.select_gpi("gpi", 3).unwrap().is_empty());
        assert!(matches!(
            table.select_gpi("cell", 1),
            Err(DatasetError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_extend() {
        let mut table = Table::default();
        table.extend(sample()).unwrap();
        table.extend(sample()).unwrap();
        assert_eq!(table.len(), 8);

        let other = Table::new("gpi", vec![1.into()])
            .with_column("other", vec![Value::Null])
            .unwrap();
        assert!(table.extend(other).is_err());
    }

    #[test]
    fn test_as_gpi() {
        assert_eq!(Value::Int(7).as_gpi(), Some(7));
        assert_eq!(Value::Float(7.0).as_gpi(), Some(7));
        assert_eq!(Value::Int(-1).as_gpi(), None);
        assert_eq!(Value::Text("7".into()).as_gpi(), None);
    }
}
