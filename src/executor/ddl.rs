use super::Executor;
use crate::core::{Column, DbError, Result};
use crate::parser::ast::{AlterTableOperation, ColumnDef, Statement};
use crate::result::QueryResult;
use crate::storage::{Catalog, TableSchema};

pub struct CreateTableExecutor;

impl Executor for CreateTableExecutor {
    fn name(&self) -> &'static str {
        "CREATE_TABLE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::CreateTable(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::CreateTable(create) = stmt else {
            unreachable!();
        };

        if create.if_not_exists && catalog.table_exists(&create.table_name) {
            return Ok(QueryResult::empty());
        }

        let mut columns: Vec<Column> = Vec::with_capacity(create.columns.len());
        for def in &create.columns {
            if columns.iter().any(|c| c.name.eq_ignore_ascii_case(&def.name)) {
                return Err(DbError::ColumnExists(def.name.clone(), create.table_name.clone()));
            }
            columns.push(to_column(def));
        }

        catalog.create_table(TableSchema::new(create.table_name.clone(), columns))?;
        Ok(QueryResult::empty())
    }
}

pub struct DropTableExecutor;

impl Executor for DropTableExecutor {
    fn name(&self) -> &'static str {
        "DROP_TABLE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::DropTable(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::DropTable(drop) = stmt else {
            unreachable!();
        };

        match catalog.drop_table(&drop.table_name) {
            Ok(_) => Ok(QueryResult::empty()),
            Err(DbError::TableNotFound(_)) if drop.if_exists => Ok(QueryResult::empty()),
            Err(e) => Err(e),
        }
    }
}

pub struct AlterTableExecutor;

impl Executor for AlterTableExecutor {
    fn name(&self) -> &'static str {
        "ALTER_TABLE"
    }

    fn can_handle(&self, stmt: &Statement) -> bool {
        matches!(stmt, Statement::AlterTable(_))
    }

    fn execute(&self, stmt: &Statement, catalog: &mut Catalog) -> Result<QueryResult> {
        let Statement::AlterTable(alter) = stmt else {
            unreachable!();
        };

        let table = catalog.get_table_mut(&alter.table_name)?;
        match &alter.operation {
            AlterTableOperation::AddColumn {
                column,
                if_not_exists,
            } => {
                let exists = table.schema().schema().get_column(&column.name).is_some();
                if !(exists && *if_not_exists) {
                    table.add_column(to_column(column))?;
                }
            }
        }
        Ok(QueryResult::empty())
    }
}

fn to_column(def: &ColumnDef) -> Column {
    let column = Column::new(def.name.clone(), def.data_type.clone());
    if def.nullable { column } else { column.not_null() }
}
