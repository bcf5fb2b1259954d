//! Tabular view of a record batch
//!
//! Each record's top-level fields become columns; nested objects and arrays
//! stay structured inside their cell.

use serde::Serialize;
use serde_json::{Map, Value};

/// Records flattened into named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Builds a table from serializable records
    ///
    /// Columns are the union of all records' top-level keys in first-seen
    /// order. A record lacking a column gets `null` in that cell. Records that
    /// do not serialize to an object land in a single `value` column.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, serde_json::Error> {
        let objects = records
            .iter()
            .map(|record| {
                serde_json::to_value(record).map(|value| match value {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = objects
            .into_iter()
            .map(|mut object| {
                columns
                    .iter()
                    .map(|column| object.remove(column).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cell at `row` in the named column
    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Formats the table as a markdown table
    ///
    /// Strings are written as-is, `null` as an empty cell, and anything else
    /// (numbers, nested objects, arrays) as compact JSON.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        if self.columns.is_empty() {
            return md;
        }

        md.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        md.push_str(&format!(
            "|{}\n",
            self.columns.iter().map(|_| "---|").collect::<String>()
        ));

        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(markdown_cell).collect();
            md.push_str(&format!("| {} |\n", cells.join(" | ")));
        }

        md
    }
}

fn markdown_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.replace('|', "\\|").replace('\n', " ")
}
