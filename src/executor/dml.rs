use super::Executor;
use super::eval::{evaluate, matches};
use crate::core::{DbError, Result, Row, Value};
use crate::parser::ast::Statement;
use crate::result::QueryResult;
use crate::storage::Catalog;

pub struct InsertExecutor;

impl Executor for InsertExecutor {
    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Insert(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::Insert(insert) = stmt else {
            unreachable!();
        };

        let table = catalog.get_table_mut(&insert.table_name)?;
        let schema = table.schema().schema().clone();

        // Positions of the supplied values within a full row.
        let positions: Vec<usize> = match &insert.columns {
            Some(columns) => columns
                .iter()
                .map(|name| {
                    schema
                        .find_column_index(name)
                        .ok_or_else(|| DbError::ColumnNotFound(name.clone(), insert.table_name.clone()))
                })
                .collect::<Result<_>>()?,
            None => (0..schema.column_count()).collect(),
        };

        let empty_row: Row = Vec::new();
        let mut rows = Vec::with_capacity(insert.values.len());
        for values in &insert.values {
            if values.len() != positions.len() {
                return Err(DbError::ExecutionError(format!(
                    "INSERT into '{}' expects {} values, got {}",
                    insert.table_name,
                    positions.len(),
                    values.len()
                )));
            }

            let mut row = vec![Value::Null; schema.column_count()];
            for (expr, &pos) in values.iter().zip(&positions) {
                row[pos] = evaluate(expr, &schema, &empty_row, &insert.table_name)?;
            }
            rows.push(row);
        }

        let inserted = rows.len();
        for row in rows {
            table.insert(row)?;
        }
        Ok(QueryResult::affected(inserted))
    }
}

pub struct UpdateExecutor;

impl Executor for UpdateExecutor {
    fn name(&self) -> &'static str {
        "UPDATE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Update(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::Update(update) = stmt else {
            unreachable!();
        };

        let table = catalog.get_table_mut(&update.table_name)?;
        let schema = table.schema().schema().clone();

        let targets: Vec<usize> = update
            .assignments
            .iter()
            .map(|a| {
                schema
                    .find_column_index(&a.column)
                    .ok_or_else(|| DbError::ColumnNotFound(a.column.clone(), update.table_name.clone()))
            })
            .collect::<Result<_>>()?;

        let affected = table.update_rows(|row| {
            if !matches(update.selection.as_ref(), &schema, row, &update.table_name)? {
                return Ok(None);
            }
            let mut new_row = row.clone();
            for (assignment, &idx) in update.assignments.iter().zip(&targets) {
                new_row[idx] = evaluate(&assignment.value, &schema, row, &update.table_name)?;
            }
            Ok(Some(new_row))
        })?;

        Ok(QueryResult::affected(affected))
    }
}

pub struct DeleteExecutor;

impl Executor for DeleteExecutor {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Delete(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::Delete(delete) = stmt else {
            unreachable!();
        };

        let table = catalog.get_table_mut(&delete.table_name)?;
        let schema = table.schema().schema().clone();
        let deleted = table.delete_rows(|row| {
            matches(delete.selection.as_ref(), &schema, row, &delete.table_name)
        })?;

        Ok(QueryResult::affected(deleted))
    }
}
