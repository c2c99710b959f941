use super::Executor;
use super::eval::matches;
use crate::core::{DbError, Result};
use crate::parser::ast::{SelectItem, Statement};
use crate::result::QueryResult;
use crate::storage::Catalog;

pub struct QueryExecutor;

impl Executor for QueryExecutor {
    fn name(&self) -> &'static str {
        "QUERY"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::Query(_))
    }

    fn is_mutating(&self) -> bool {
        false
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::Query(query) = stmt else {
            unreachable!();
        };

        let table = catalog.get_table(&query.table_name)?;
        let schema = table.schema().schema();

        let mut projection = Vec::new();
        for item in &query.projection {
            match item {
                SelectItem::Wildcard => projection.extend(0..schema.column_count()),
                SelectItem::Column(name) => projection.push(
                    schema
                        .find_column_index(name)
                        .ok_or_else(|| DbError::ColumnNotFound(name.clone(), query.table_name.clone()))?,
                ),
            }
        }

        let columns = projection
            .iter()
            .map(|&idx| schema.columns()[idx].name.clone())
            .collect();

        let mut rows = Vec::new();
        for row in table.scan() {
            if matches(query.selection.as_ref(), schema, row, &query.table_name)? {
                rows.push(projection.iter().map(|&idx| row[idx].clone()).collect());
            }
        }

        Ok(QueryResult::new(columns, rows))
    }
}
