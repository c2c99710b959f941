use crate::core::{Column, DbError, Result, Row, Schema, Value};
use im::Vector;

#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    schema: Schema,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema: Schema::new(columns),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A table backed by a persistent vector, so cloning a table (and the
/// catalog holding it) for a transaction snapshot is O(1).
#[derive(Debug, Clone)]
pub struct Table {
    schema: TableSchema,
    rows: Vector<Row>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vector::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn scan(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn insert(&mut self, row: Row) -> Result<()> {
        let row = self.validate_row(row)?;
        self.rows.push_back(row);
        Ok(())
    }

    /// Rewrite every row for which `update` returns a replacement.
    ///
    /// All replacements are validated before any is applied, so a failing
    /// row leaves the table untouched.
    pub fn update_rows<F>(&mut self, mut update: F) -> Result<usize>
    where
        F: FnMut(&Row) -> Result<Option<Row>>,
    {
        let mut replacements = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            if let Some(new_row) = update(row)? {
                replacements.push((idx, self.validate_row(new_row)?));
            }
        }

        let affected = replacements.len();
        for (idx, row) in replacements {
            self.rows.set(idx, row);
        }
        Ok(affected)
    }

    pub fn delete_rows<F>(&mut self, mut predicate: F) -> Result<usize>
    where
        F: FnMut(&Row) -> Result<bool>,
    {
        let mut kept = Vector::new();
        let mut deleted = 0;
        for row in self.rows.iter() {
            if predicate(row)? {
                deleted += 1;
            } else {
                kept.push_back(row.clone());
            }
        }
        self.rows = kept;
        Ok(deleted)
    }

    /// Append a column; existing rows get NULL in it.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.schema.schema.find_column_index(&column.name).is_some() {
            return Err(DbError::ColumnExists(column.name, self.name().to_string()));
        }
        if !column.nullable && !self.rows.is_empty() {
            return Err(DbError::ConstraintViolation(format!(
                "Cannot add NOT NULL column '{}' to non-empty table '{}'",
                column.name,
                self.name()
            )));
        }

        self.schema.schema.push(column);
        self.rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.push(Value::Null);
                row
            })
            .collect();
        Ok(())
    }

    fn validate_row(&self, row: Row) -> Result<Row> {
        let columns = self.schema.schema.columns();
        if row.len() != columns.len() {
            return Err(DbError::ExecutionError(format!(
                "Table '{}' has {} columns but {} values were supplied",
                self.name(),
                columns.len(),
                row.len()
            )));
        }

        columns
            .iter()
            .zip(row)
            .map(|(column, value)| column.accept(value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    fn person_table() -> Table {
        Table::new(TableSchema::new(
            "person",
            vec![
                Column::new("PersonId", DataType::Integer),
                Column::new("Firstname", DataType::Text),
            ],
        ))
    }

    #[test]
    fn test_insert_validates_arity_and_types() {
        let mut table = person_table();
        table.insert(vec![Value::Integer(1), Value::from("John")]).unwrap();
        assert!(table.insert(vec![Value::Integer(2)]).is_err());
        assert!(table.insert(vec![Value::from("x"), Value::from("y")]).is_err());
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_add_column_backfills_null() {
        let mut table = person_table();
        table.insert(vec![Value::Integer(1), Value::from("John")]).unwrap();
        table.add_column(Column::new("Mobile", DataType::Text)).unwrap();

        let row = table.scan().next().unwrap();
        assert_eq!(row.len(), 3);
        assert!(row[2].is_null());

        let duplicate = table.add_column(Column::new("mobile", DataType::Text));
        assert!(matches!(duplicate, Err(DbError::ColumnExists(..))));
    }

    #[test]
    fn test_failed_update_leaves_rows_untouched() {
        let mut table = person_table();
        table.insert(vec![Value::Integer(1), Value::from("John")]).unwrap();
        table.insert(vec![Value::Integer(2), Value::from("Jane")]).unwrap();

        let result = table.update_rows(|row| {
            if row[0] == Value::Integer(2) {
                Ok(Some(vec![Value::from("bad"), row[1].clone()]))
            } else {
                Ok(Some(vec![Value::Integer(10), row[1].clone()]))
            }
        });

        assert!(result.is_err());
        let ids: Vec<_> = table.scan().map(|r| r[0].clone()).collect();
        assert_eq!(ids, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_snapshot_clone_is_independent() {
        let mut table = person_table();
        table.insert(vec![Value::Integer(1), Value::from("John")]).unwrap();

        let snapshot = table.clone();
        table.delete_rows(|_| Ok(true)).unwrap();

        assert_eq!(table.row_count(), 0);
        assert_eq!(snapshot.row_count(), 1);
    }
}
