use super::{DbError, Result, Value};
use std::fmt;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    /// Convert a literal into this column type, applying the same implicit
    /// casts the comparison rules allow (numeric text into numeric columns).
    pub fn coerce(&self, value: Value) -> Result<Value> {
        let coerced = match (self, value) {
            (_, Value::Null) => Value::Null,

            (Self::Integer, Value::Integer(i)) => Value::Integer(i),
            (Self::Float, Value::Float(f)) => Value::Float(f),
            (Self::Float, Value::Integer(i)) => Value::Float(i as f64),
            (Self::Text, Value::Text(s)) => Value::Text(s),
            (Self::Boolean, Value::Boolean(b)) => Value::Boolean(b),

            (Self::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => return Err(self.mismatch(&Value::Text(s))),
            },
            (Self::Float, Value::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => return Err(self.mismatch(&Value::Text(s))),
            },
            (Self::Boolean, Value::Text(s)) if s.eq_ignore_ascii_case("true") => Value::Boolean(true),
            (Self::Boolean, Value::Text(s)) if s.eq_ignore_ascii_case("false") => Value::Boolean(false),

            (_, other) => return Err(self.mismatch(&other)),
        };
        Ok(coerced)
    }

    fn mismatch(&self, value: &Value) -> DbError {
        DbError::TypeMismatch(format!(
            "expected {}, got {} ({})",
            self,
            value.type_name(),
            value
        ))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "INTEGER"),
            Self::Float => write!(f, "FLOAT"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Coerce and validate a value destined for this column.
    pub fn accept(&self, value: Value) -> Result<Value> {
        let value = self.data_type.coerce(value).map_err(|e| match e {
            DbError::TypeMismatch(msg) => {
                DbError::TypeMismatch(format!("column '{}': {}", self.name, msg))
            }
            other => other,
        })?;

        if value.is_null() && !self.nullable {
            return Err(DbError::ConstraintViolation(format!(
                "Column '{}' cannot be NULL",
                self.name
            )));
        }

        Ok(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column lookup is case-insensitive, matching unquoted SQL identifiers.
    pub fn find_column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.find_column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub(crate) fn push(&mut self, column: Column) {
        self.columns.push(column);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numeric_text() {
        assert_eq!(DataType::Integer.coerce(Value::from("42")).unwrap(), Value::Integer(42));
        assert_eq!(DataType::Float.coerce(Value::Integer(2)).unwrap(), Value::Float(2.0));
        assert!(DataType::Integer.coerce(Value::from("forty-two")).is_err());
    }

    #[test]
    fn test_text_column_is_strict() {
        assert!(DataType::Text.coerce(Value::Integer(1)).is_err());
        assert_eq!(DataType::Text.coerce(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_not_null_rejects_null() {
        let col = Column::new("id", DataType::Integer).not_null();
        assert!(matches!(col.accept(Value::Null), Err(DbError::ConstraintViolation(_))));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let schema = Schema::new(vec![Column::new("PersonId", DataType::Integer)]);
        assert_eq!(schema.find_column_index("personid"), Some(0));
        assert_eq!(schema.find_column_index("PERSONID"), Some(0));
        assert!(schema.get_column("lastname").is_none());
    }
}
