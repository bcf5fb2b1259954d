//! Record extraction from fetched directory pages
//!
//! Each extractor is a pure function from page HTML to one record. They read
//! fixed structural positions (nth element of a list, table cells, named
//! attributes), so any layout change on the directory side shows up here as
//! an [`ExtractError`] rather than a panic. The dispatcher treats that error
//! like a network failure: the identifier contributes no record.

mod affiliation;
mod author;
mod department;

pub use affiliation::{extract_affiliation, parse_affiliation_summary};
pub use author::extract_author;
pub use department::{extract_department, parse_department_listing, ListingPage};

use scraper::{ElementRef, Html, Selector};
use serde_json::{Number, Value};
use thiserror::Error;

/// Errors raised when a page does not have the expected shape
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector: {0}")]
    Selector(&'static str),

    #[error("Missing element: {0}")]
    MissingElement(&'static str),

    #[error("Missing attribute '{attr}' on {selector}")]
    MissingAttribute {
        selector: &'static str,
        attr: &'static str,
    },

    #[error("Expected at least {expected} elements for {selector}, found {found}")]
    TooFewElements {
        selector: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Malformed {field}: '{value}'")]
    Malformed { field: &'static str, value: String },
}

/// Coerces numeric-looking cell text to a JSON number
///
/// Thousands separators are dropped before parsing. Anything that is not a
/// finite integer or float stays a (trimmed) string.
///
/// # Example
///
/// ```
/// use sinta_harvest::extract::cast;
/// use serde_json::json;
///
/// assert_eq!(cast(" 1,234 "), json!(1234));
/// assert_eq!(cast("3.5"), json!(3.5));
/// assert_eq!(cast("n/a"), json!("n/a"));
/// ```
pub fn cast(text: &str) -> Value {
    let trimmed = text.trim();
    let compact: String = trimmed.chars().filter(|c| *c != ',').collect();

    if let Ok(n) = compact.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = compact.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(trimmed.to_string())
}

pub(crate) fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css))
}

/// Collected, trimmed text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub(crate) fn attr_of(
    element: ElementRef<'_>,
    css: &'static str,
    attr: &'static str,
) -> Result<String, ExtractError> {
    element
        .value()
        .attr(attr)
        .map(|v| v.trim().to_string())
        .ok_or(ExtractError::MissingAttribute {
            selector: css,
            attr,
        })
}

/// First match for `css` anywhere in the document
pub(crate) fn first<'a>(
    document: &'a Html,
    css: &'static str,
) -> Result<ElementRef<'a>, ExtractError> {
    let sel = selector(css)?;
    let found = document.select(&sel).next();
    found.ok_or(ExtractError::MissingElement(css))
}

/// First match for `css` inside `scope`
pub(crate) fn first_in<'a>(
    scope: ElementRef<'a>,
    css: &'static str,
) -> Result<ElementRef<'a>, ExtractError> {
    let sel = selector(css)?;
    let found = scope.select(&sel).next();
    found.ok_or(ExtractError::MissingElement(css))
}

/// Optional first match for `css` inside `scope`
pub(crate) fn find_in<'a>(
    scope: ElementRef<'a>,
    css: &'static str,
) -> Result<Option<ElementRef<'a>>, ExtractError> {
    let sel = selector(css)?;
    let found = scope.select(&sel).next();
    Ok(found)
}

/// All matches for `css`, requiring at least `expected` of them
pub(crate) fn at_least<'a>(
    document: &'a Html,
    css: &'static str,
    expected: usize,
) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    let sel = selector(css)?;
    let found: Vec<_> = document.select(&sel).collect();
    if found.len() < expected {
        return Err(ExtractError::TooFewElements {
            selector: css,
            expected,
            found: found.len(),
        });
    }
    Ok(found)
}
