use crate::core::{Row, Value};
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows touched by INSERT/UPDATE/DELETE; zero for DDL and queries.
    pub rows_affected: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    pub fn affected(rows_affected: usize) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Value of `column` (case-insensitive) in row `row`.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(idx)
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "{} row(s) affected", self.rows_affected);
        }

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(value.to_string().len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        writeln!(f, "{}", header.join(" | "))?;

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        writeln!(f, "{}", separator)?;

        for row in &self.rows {
            let row_str: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, val)| format!("{:width$}", val.to_string(), width = widths[i]))
                .collect();
            writeln!(f, "{}", row_str.join(" | "))?;
        }

        writeln!(f, "({} row(s))", self.rows.len())
    }
}
