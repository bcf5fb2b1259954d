//! Output formatting for fetched records
//!
//! A batch's compacted records can be returned in three shapes:
//! - `dict`: the bare record when exactly one came back, otherwise the list
//! - `list`: always the list, even for a single record
//! - `dataframe`: a [`Table`] with one column per top-level field
//!
//! `dict` is a convenience, not a type guarantee; callers must handle both
//! the single and list variants of [`Output`].

mod table;

pub use table::Table;

use crate::{ConfigError, SintaError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Caller-selected result shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Dict,
    List,
    Table,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    /// Parses a format name; unknown names are a configuration error
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dict" => Ok(Self::Dict),
            "list" => Ok(Self::List),
            "dataframe" | "table" => Ok(Self::Table),
            _ => Err(ConfigError::UnknownOutputFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dict => "dict",
            Self::List => "list",
            Self::Table => "dataframe",
        };
        f.write_str(name)
    }
}

/// A formatted batch result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output<T> {
    /// Exactly one record, unwrapped (`dict` only)
    Single(T),
    /// Zero or more records
    List(Vec<T>),
    /// Records flattened into columns
    Table(Table),
}

impl<T> Output<T> {
    /// Number of records represented
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(records) => records.len(),
            Self::Table(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the records as a list, unless they were flattened into a table
    pub fn into_records(self) -> Option<Vec<T>> {
        match self {
            Self::Single(record) => Some(vec![record]),
            Self::List(records) => Some(records),
            Self::Table(_) => None,
        }
    }
}

impl<T: Serialize> Output<T> {
    /// Renders the output for a terminal: JSON for records, markdown for tables
    pub fn render(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Table(table) => Ok(table.to_markdown()),
            other => serde_json::to_string_pretty(other),
        }
    }
}

/// Shapes a compacted record list according to `format`
///
/// # Returns
///
/// * `Ok(Output)` - The shaped records
/// * `Err(SintaError::Json)` - A record could not be flattened for a table
pub fn format_output<T: Serialize>(
    records: Vec<T>,
    format: OutputFormat,
) -> Result<Output<T>, SintaError> {
    Ok(match format {
        OutputFormat::Dict if records.len() == 1 => {
            let mut records = records;
            match records.pop() {
                Some(record) => Output::Single(record),
                None => Output::List(records),
            }
        }
        OutputFormat::Dict | OutputFormat::List => Output::List(records),
        OutputFormat::Table => Output::Table(Table::from_records(&records)?),
    })
}
