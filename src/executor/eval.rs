use crate::core::{DbError, Result, Row, Schema, Value};
use crate::parser::ast::{BinaryOp, Expr};
use std::cmp::Ordering;

/// Evaluate `expr` against one row of a table with `schema`.
///
/// Comparisons involving NULL yield NULL, and `AND`/`OR` follow SQL
/// three-valued logic.
pub fn evaluate(expr: &Expr, schema: &Schema, row: &Row, table: &str) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(name) => {
            let idx = schema
                .find_column_index(name)
                .ok_or_else(|| DbError::ColumnNotFound(name.clone(), table.to_string()))?;
            row.get(idx).cloned().ok_or_else(|| {
                DbError::ExecutionError(format!("Column '{}' cannot be referenced here", name))
            })
        }
        Expr::Not(inner) => Ok(match evaluate(inner, schema, row, table)? {
            Value::Boolean(b) => Value::Boolean(!b),
            Value::Null => Value::Null,
            other => {
                return Err(DbError::TypeMismatch(format!(
                    "NOT expects BOOLEAN, got {}",
                    other.type_name()
                )));
            }
        }),
        Expr::IsNull { expr, negated } => {
            let is_null = evaluate(expr, schema, row, table)?.is_null();
            Ok(Value::Boolean(is_null != *negated))
        }
        Expr::BinaryOp { left, op, right } => {
            let left = evaluate(left, schema, row, table)?;
            let right = evaluate(right, schema, row, table)?;
            match op {
                BinaryOp::And => logical(&left, &right, true),
                BinaryOp::Or => logical(&left, &right, false),
                _ => Ok(compare(&left, *op, &right)),
            }
        }
    }
}

/// Evaluate an optional WHERE clause; absent means every row matches.
pub fn matches(selection: Option<&Expr>, schema: &Schema, row: &Row, table: &str) -> Result<bool> {
    match selection {
        Some(expr) => Ok(evaluate(expr, schema, row, table)?.is_true()),
        None => Ok(true),
    }
}

fn compare(left: &Value, op: BinaryOp, right: &Value) -> Value {
    let Some(ordering) = left.compare(right) else {
        return Value::Null;
    };
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        BinaryOp::And | BinaryOp::Or => return Value::Null,
    };
    Value::Boolean(result)
}

fn logical(left: &Value, right: &Value, is_and: bool) -> Result<Value> {
    let as_tristate = |value: &Value| match value {
        Value::Boolean(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(DbError::TypeMismatch(format!(
            "{} expects BOOLEAN operands, got {}",
            if is_and { "AND" } else { "OR" },
            other.type_name()
        ))),
    };

    let result = match (as_tristate(left)?, as_tristate(right)?, is_and) {
        (Some(false), _, true) | (_, Some(false), true) => Some(false),
        (Some(true), Some(true), true) => Some(true),
        (Some(true), _, false) | (_, Some(true), false) => Some(true),
        (Some(false), Some(false), false) => Some(false),
        _ => None,
    };
    Ok(result.map(Value::Boolean).unwrap_or(Value::Null))
}
