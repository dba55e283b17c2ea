use std::collections::HashMap;

use thiserror::Error;

use crate::value::Value;

/// Element type inferred for a column from its non-missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Text,
    Bool,
    Date,
    /// Every position is missing.
    Missing,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("duplicate column name `{name}`")]
    DuplicateColumn { name: String },
    #[error("column `{column}` has {got} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
    #[error("row {row} has {got} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
}

/// A named, dense column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Infer the element type: a single non-missing type wins, a mix of types
    /// degrades to [`ColumnType::Text`], an all-missing column reports
    /// [`ColumnType::Missing`].
    pub fn inferred_type(&self) -> ColumnType {
        let mut seen: Option<ColumnType> = None;
        for value in &self.values {
            let ty = match value {
                Value::Number(_) => ColumnType::Number,
                Value::Text(s) if crate::date::parse_date(s).is_some() => ColumnType::Date,
                Value::Text(_) => ColumnType::Text,
                Value::Bool(_) => ColumnType::Bool,
                Value::Date(_) => ColumnType::Date,
                Value::Blank | Value::Error(_) => continue,
            };
            match seen {
                None => seen = Some(ty),
                Some(prev) if prev == ty => {}
                Some(_) => return ColumnType::Text,
            }
        }
        seen.unwrap_or(ColumnType::Missing)
    }
}

/// A rectangular, read-only dataset: ordered rows over named columns.
///
/// Column lookups are case-sensitive. Row order is preserved from ingestion
/// through evaluation and aggregation.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if column.len() != row_count {
                return Err(DatasetError::ColumnLengthMismatch {
                    column: column.name().to_string(),
                    expected: row_count,
                    got: column.len(),
                });
            }
            if index.insert(column.name().to_string(), i).is_some() {
                return Err(DatasetError::DuplicateColumn {
                    name: column.name().to_string(),
                });
            }
        }
        Ok(Self {
            columns,
            index,
            row_count,
        })
    }

    pub fn builder<I, S>(column_names: I) -> Result<DatasetBuilder, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DatasetBuilder::new(column_names)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Case-sensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Row-wise ingestion for hosts that read record-oriented sources.
#[derive(Debug)]
pub struct DatasetBuilder {
    names: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl DatasetBuilder {
    fn new<I, S>(column_names: I) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = column_names.into_iter().map(Into::into).collect();
        let mut seen = HashMap::with_capacity(names.len());
        for name in &names {
            if seen.insert(name.clone(), ()).is_some() {
                return Err(DatasetError::DuplicateColumn { name: name.clone() });
            }
        }
        Ok(Self {
            names,
            rows: Vec::new(),
        })
    }

    pub fn push_row<I>(&mut self, row: I) -> Result<(), DatasetError>
    where
        I: IntoIterator<Item = Value>,
    {
        let row: Vec<Value> = row.into_iter().collect();
        if row.len() != self.names.len() {
            return Err(DatasetError::RaggedRow {
                row: self.rows.len(),
                expected: self.names.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn finish(self) -> Dataset {
        let row_count = self.rows.len();
        let mut columns: Vec<Vec<Value>> = self
            .names
            .iter()
            .map(|_| Vec::with_capacity(row_count))
            .collect();
        for row in self.rows {
            for (slot, value) in columns.iter_mut().zip(row) {
                slot.push(value);
            }
        }
        let columns = self
            .names
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect();

        // Column lengths and name uniqueness were enforced during ingestion.
        Dataset::new(columns).expect("builder invariants")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut builder = Dataset::builder(["Name", "Score"]).unwrap();
        builder
            .push_row([Value::from("Ada"), Value::from(10.0)])
            .unwrap();
        builder
            .push_row([Value::from("Grace"), Value::Blank])
            .unwrap();
        builder.finish()
    }

    #[test]
    fn builder_transposes_rows_into_columns() {
        let ds = sample();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(
            ds.column("Score").unwrap().values(),
            &[Value::Number(10.0), Value::Blank]
        );
    }

    #[test]
    fn column_lookup_is_case_sensitive() {
        let ds = sample();
        assert!(ds.column("Name").is_some());
        assert!(ds.column("name").is_none());
    }

    #[test]
    fn duplicate_column_names_are_rejected() {
        let err = Dataset::builder(["A", "A"]).unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn { name: "A".into() });
    }

    #[test]
    fn type_inference() {
        let numbers = Column::new("n", vec![Value::Number(1.0), Value::Blank]);
        assert_eq!(numbers.inferred_type(), ColumnType::Number);

        let dates = Column::new("d", vec![Value::from("2024-01-01"), Value::Blank]);
        assert_eq!(dates.inferred_type(), ColumnType::Date);

        let mixed = Column::new("m", vec![Value::Number(1.0), Value::from("x")]);
        assert_eq!(mixed.inferred_type(), ColumnType::Text);

        let empty = Column::new("e", vec![Value::Blank, Value::Blank]);
        assert_eq!(empty.inferred_type(), ColumnType::Missing);
    }
}
