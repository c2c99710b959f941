use super::ast::*;
use crate::core::{DataType, DbError, Result, Value};
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Converts `sqlparser` statements into the store's statement AST.
///
/// Only the subset bootstrap scripts need is accepted: DDL on single tables,
/// single-table DML and plain SELECTs with a WHERE clause.
pub struct SqlParserAdapter {
    dialect: PostgreSqlDialect,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>> {
        let external_stmts = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| DbError::ParseError(e.to_string()))?;

        external_stmts
            .into_iter()
            .map(|stmt| self.convert_statement(stmt))
            .collect()
    }

    fn convert_statement(&self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::CreateTable(create) => {
                Ok(Statement::CreateTable(self.convert_create_table(create)?))
            }
            sql_ast::Statement::AlterTable { name, operations, .. } => {
                let mut operations = operations.into_iter();
                match (operations.next(), operations.next()) {
                    (Some(operation), None) => {
                        Ok(Statement::AlterTable(self.convert_alter_table(name, operation)?))
                    }
                    _ => Err(DbError::UnsupportedOperation(
                        "Only single ALTER TABLE operation supported".into(),
                    )),
                }
            }
            sql_ast::Statement::Drop {
                object_type,
                names,
                if_exists,
                ..
            } => {
                if let sql_ast::ObjectType::Table = object_type {
                    Ok(Statement::DropTable(self.convert_drop_table(names, if_exists)?))
                } else {
                    Err(DbError::UnsupportedOperation(format!(
                        "Only DROP TABLE supported, got: {:?}",
                        object_type
                    )))
                }
            }
            sql_ast::Statement::Insert(insert) => Ok(Statement::Insert(self.convert_insert(insert)?)),
            sql_ast::Statement::Query(query) => Ok(Statement::Query(self.convert_query(*query)?)),
            sql_ast::Statement::Delete(delete) => Ok(Statement::Delete(self.convert_delete(delete)?)),
            sql_ast::Statement::Update {
                table,
                assignments,
                selection,
                ..
            } => Ok(Statement::Update(self.convert_update(table, assignments, selection)?)),
            _ => Err(DbError::UnsupportedOperation(format!(
                "Statement type not supported: {}",
                stmt
            ))),
        }
    }

    fn convert_create_table(&self, create: sql_ast::CreateTable) -> Result<CreateTableStmt> {
        let table_name = extract_table_name(&create.name)?;
        let columns = create
            .columns
            .into_iter()
            .map(|col| self.convert_column_def(col))
            .collect::<Result<Vec<_>>>()?;

        Ok(CreateTableStmt {
            table_name,
            columns,
            if_not_exists: create.if_not_exists,
        })
    }

    fn convert_drop_table(&self, names: Vec<sql_ast::ObjectName>, if_exists: bool) -> Result<DropTableStmt> {
        let [name] = names.as_slice() else {
            return Err(DbError::UnsupportedOperation(
                "Only single table DROP supported".into(),
            ));
        };

        Ok(DropTableStmt {
            table_name: extract_table_name(name)?,
            if_exists,
        })
    }

    fn convert_alter_table(
        &self,
        name: sql_ast::ObjectName,
        operation: sql_ast::AlterTableOperation,
    ) -> Result<AlterTableStmt> {
        let table_name = extract_table_name(&name)?;
        let operation = match operation {
            sql_ast::AlterTableOperation::AddColumn {
                column_def,
                if_not_exists,
                ..
            } => AlterTableOperation::AddColumn {
                column: self.convert_column_def(column_def)?,
                if_not_exists,
            },
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "Unsupported ALTER TABLE operation: {}",
                    other
                )));
            }
        };

        Ok(AlterTableStmt {
            table_name,
            operation,
        })
    }

    fn convert_column_def(&self, col: sql_ast::ColumnDef) -> Result<ColumnDef> {
        let data_type = convert_data_type(&col.data_type)?;
        let nullable = !col
            .options
            .iter()
            .any(|opt| matches!(opt.option, sql_ast::ColumnOption::NotNull));

        Ok(ColumnDef {
            name: col.name.value,
            data_type,
            nullable,
        })
    }

    fn convert_insert(&self, insert: sql_ast::Insert) -> Result<InsertStmt> {
        let table_name = unquote(&insert.table.to_string());

        let columns = if insert.columns.is_empty() {
            None
        } else {
            Some(insert.columns.into_iter().map(|id| id.value).collect())
        };

        let Some(source) = insert.source else {
            return Err(DbError::UnsupportedOperation(
                "INSERT requires a VALUES clause".into(),
            ));
        };

        let sql_ast::SetExpr::Values(vals) = *source.body else {
            return Err(DbError::UnsupportedOperation(
                "Only VALUES clause supported".into(),
            ));
        };

        let values = vals
            .rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|expr| self.convert_expr(expr))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InsertStmt {
            table_name,
            columns,
            values,
        })
    }

    fn convert_update(
        &self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> Result<UpdateStmt> {
        let table_name = table_factor_name(&table.relation, "UPDATE")?;

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match assign.target {
                    sql_ast::AssignmentTarget::ColumnName(col_name) if col_name.0.len() == 1 => {
                        unquote(&col_name.0[0].to_string())
                    }
                    _ => {
                        return Err(DbError::UnsupportedOperation(
                            "Only simple column names supported in UPDATE".into(),
                        ));
                    }
                };

                Ok(Assignment {
                    column,
                    value: self.convert_expr(assign.value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = selection.map(|expr| self.convert_expr(expr)).transpose()?;

        Ok(UpdateStmt {
            table_name,
            assignments,
            selection,
        })
    }

    fn convert_delete(&self, delete: sql_ast::Delete) -> Result<DeleteStmt> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let Some(table) = tables.first() else {
            return Err(DbError::ParseError("DELETE requires a table name".into()));
        };
        let table_name = table_factor_name(&table.relation, "DELETE")?;

        let selection = delete
            .selection
            .map(|expr| self.convert_expr(expr))
            .transpose()?;

        Ok(DeleteStmt {
            table_name,
            selection,
        })
    }

    fn convert_query(&self, query: sql_ast::Query) -> Result<QueryStmt> {
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::UnsupportedOperation(
                "Only SELECT queries supported".into(),
            ));
        };
        let select = *select;

        let [table] = select.from.as_slice() else {
            return Err(DbError::UnsupportedOperation(
                "SELECT must read from exactly one table".into(),
            ));
        };
        if !table.joins.is_empty() {
            return Err(DbError::UnsupportedOperation("JOIN is not supported".into()));
        }
        let table_name = table_factor_name(&table.relation, "SELECT")?;

        let projection = select
            .projection
            .into_iter()
            .map(|item| match item {
                sql_ast::SelectItem::Wildcard(_) => Ok(SelectItem::Wildcard),
                sql_ast::SelectItem::UnnamedExpr(sql_ast::Expr::Identifier(ident)) => {
                    Ok(SelectItem::Column(ident.value))
                }
                other => Err(DbError::UnsupportedOperation(format!(
                    "Unsupported select item: {}",
                    other
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = select
            .selection
            .map(|expr| self.convert_expr(expr))
            .transpose()?;

        Ok(QueryStmt {
            projection,
            table_name,
            selection,
        })
    }

    fn convert_expr(&self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::CompoundIdentifier(idents) => idents
                .last()
                .map(|ident| Expr::Column(ident.value.clone()))
                .ok_or_else(|| DbError::ParseError("Empty identifier".into())),
            sql_ast::Expr::Value(val) => Ok(Expr::Literal(convert_value(&val.value)?)),
            sql_ast::Expr::Nested(inner) => self.convert_expr(*inner),
            sql_ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: true,
            }),
            sql_ast::Expr::UnaryOp { op, expr } => match op {
                sql_ast::UnaryOperator::Not => Ok(Expr::Not(Box::new(self.convert_expr(*expr)?))),
                sql_ast::UnaryOperator::Minus => match self.convert_expr(*expr)? {
                    Expr::Literal(Value::Integer(i)) => Ok(Expr::Literal(Value::Integer(-i))),
                    Expr::Literal(Value::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                    _ => Err(DbError::UnsupportedOperation(
                        "Unary minus only applies to numeric literals".into(),
                    )),
                },
                sql_ast::UnaryOperator::Plus => self.convert_expr(*expr),
                other => Err(DbError::UnsupportedOperation(format!(
                    "Unsupported unary operator: {}",
                    other
                ))),
            },
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let op = match op {
                    sql_ast::BinaryOperator::Eq => BinaryOp::Eq,
                    sql_ast::BinaryOperator::NotEq => BinaryOp::NotEq,
                    sql_ast::BinaryOperator::Lt => BinaryOp::Lt,
                    sql_ast::BinaryOperator::LtEq => BinaryOp::LtEq,
                    sql_ast::BinaryOperator::Gt => BinaryOp::Gt,
                    sql_ast::BinaryOperator::GtEq => BinaryOp::GtEq,
                    sql_ast::BinaryOperator::And => BinaryOp::And,
                    sql_ast::BinaryOperator::Or => BinaryOp::Or,
                    other => {
                        return Err(DbError::UnsupportedOperation(format!(
                            "Unsupported operator: {}",
                            other
                        )));
                    }
                };
                Ok(Expr::BinaryOp {
                    left: Box::new(self.convert_expr(*left)?),
                    op,
                    right: Box::new(self.convert_expr(*right)?),
                })
            }
            other => Err(DbError::UnsupportedOperation(format!(
                "Unsupported expression: {}",
                other
            ))),
        }
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_value(val: &sql_ast::Value) -> Result<Value> {
    match val {
        sql_ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Integer(i))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Float(f))
            } else {
                Err(DbError::TypeMismatch(format!("Invalid number: {}", n)))
            }
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
            Ok(Value::Text(s.clone()))
        }
        sql_ast::Value::Boolean(b) => Ok(Value::Boolean(*b)),
        sql_ast::Value::Null => Ok(Value::Null),
        _ => Err(DbError::UnsupportedOperation(format!(
            "Unsupported value: {}",
            val
        ))),
    }
}

fn convert_data_type(dt: &sql_ast::DataType) -> Result<DataType> {
    match dt {
        sql_ast::DataType::Int(_)
        | sql_ast::DataType::Integer(_)
        | sql_ast::DataType::BigInt(_)
        | sql_ast::DataType::SmallInt(_) => Ok(DataType::Integer),

        sql_ast::DataType::Float(_) | sql_ast::DataType::Double(_) | sql_ast::DataType::Real => {
            Ok(DataType::Float)
        }

        sql_ast::DataType::Text
        | sql_ast::DataType::Varchar(_)
        | sql_ast::DataType::Char(_)
        | sql_ast::DataType::String(_) => Ok(DataType::Text),

        sql_ast::DataType::Boolean | sql_ast::DataType::Bool => Ok(DataType::Boolean),

        _ => Err(DbError::TypeMismatch(format!("Unsupported data type: {}", dt))),
    }
}

fn table_factor_name(factor: &sql_ast::TableFactor, context: &str) -> Result<String> {
    match factor {
        sql_ast::TableFactor::Table { name, .. } => extract_table_name(name),
        _ => Err(DbError::UnsupportedOperation(format!(
            "Complex table references not supported in {}",
            context
        ))),
    }
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|part| unquote(&part.to_string()))
        .ok_or_else(|| DbError::ParseError("Invalid table name".into()))
}

fn unquote(ident: &str) -> String {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ident)
        .to_string()
}
