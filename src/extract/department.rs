use crate::cache::{AffiliationSummary, EnumerationEntry};
use crate::endpoints::{last_segment, parent_segment};
use crate::extract::affiliation::summary_from;
use crate::extract::{attr_of, cast, find_in, first, selector, text_of, ExtractError};
use crate::record::{AffiliationRef, DepartmentRecord};
use scraper::{ElementRef, Html};

const DEPT_NAME: &str = ".univ-name > h3";
const DEPT_LOCATION: &str = ".affil-loc";
const DEPT_AFFILIATION: &str = ".meta-profile > a";

const LISTING_ROWS: &str = ".content-list-no-filter .d-item";
const ROW_NAME: &str = ".tbl-content-name a";
const ROW_CODE: &str = ".tbl-content-meta-num";
const ROW_LEVEL: &str = ".col-lg-1.tbl-content-meta.mb-2";

/// One page of an affiliation's department listing
#[derive(Debug, Clone)]
pub struct ListingPage {
    /// Number of listing rows on the page, including rows that were skipped
    pub row_count: usize,

    /// The affiliation header block; absent on pages without rows
    pub affiliation: Option<AffiliationSummary>,

    /// Department rows that passed the row filter
    pub entries: Vec<EnumerationEntry>,
}

impl ListingPage {
    /// A page with no listing rows marks the end of the listing
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Extracts a department profile page into a [`DepartmentRecord`]
///
/// # Arguments
///
/// * `html` - The fetched page body
/// * `department_hash` - The hashed department id the page was fetched for
/// * `url` - The page URL
pub fn extract_department(
    html: &str,
    department_hash: &str,
    url: &str,
) -> Result<DepartmentRecord, ExtractError> {
    let document = Html::parse_document(html);

    let name = text_of(first(&document, DEPT_NAME)?);
    let location = text_of(first(&document, DEPT_LOCATION)?);

    let link = first(&document, DEPT_AFFILIATION)?;
    let affiliation_url = attr_of(link, DEPT_AFFILIATION, "href")?;
    let affiliation = AffiliationRef {
        id: cast(last_segment(&affiliation_url).unwrap_or_default()),
        name: text_of(link),
        url: affiliation_url,
    };

    Ok(DepartmentRecord {
        id: department_hash.to_string(),
        name,
        location,
        url: url.to_string(),
        affiliation,
    })
}

/// Parses one page of an affiliation's department listing
///
/// Only rows whose name link points at a department page are kept; the
/// "Authors" shortcut links that share the row layout are skipped. Every kept
/// entry carries the page's affiliation header.
pub fn parse_department_listing(html: &str) -> Result<ListingPage, ExtractError> {
    let document = Html::parse_document(html);

    let row_sel = selector(LISTING_ROWS)?;
    let rows: Vec<ElementRef<'_>> = document.select(&row_sel).collect();
    if rows.is_empty() {
        return Ok(ListingPage {
            row_count: 0,
            affiliation: None,
            entries: Vec::new(),
        });
    }

    let affiliation = summary_from(&document)?;
    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(entry) = listing_entry(*row, &affiliation)? {
            entries.push(entry);
        }
    }

    Ok(ListingPage {
        row_count: rows.len(),
        affiliation: Some(affiliation),
        entries,
    })
}

fn listing_entry(
    row: ElementRef<'_>,
    affiliation: &AffiliationSummary,
) -> Result<Option<EnumerationEntry>, ExtractError> {
    let (Some(name_tag), Some(code_tag)) = (find_in(row, ROW_NAME)?, find_in(row, ROW_CODE)?) else {
        return Ok(None);
    };

    let href = name_tag.value().attr("href").unwrap_or_default();
    let name = text_of(name_tag);
    if !href.contains("department") || name.contains("Authors") {
        return Ok(None);
    }

    let level = find_in(row, ROW_LEVEL)?
        .map(text_of)
        .ok_or(ExtractError::MissingElement(ROW_LEVEL))?;

    let url = href.trim().to_lowercase();
    let department_id_hash = last_segment(&url)
        .ok_or_else(|| ExtractError::Malformed {
            field: "department url",
            value: url.clone(),
        })?
        .to_string();
    let univ_id_hash = parent_segment(&url)
        .ok_or_else(|| ExtractError::Malformed {
            field: "department url",
            value: url.clone(),
        })?
        .to_string();

    Ok(Some(EnumerationEntry {
        department_id: text_of(code_tag),
        full_name: format!("{} ({})", name, level),
        name,
        level,
        url,
        department_id_hash,
        univ_id_hash,
        affiliation: affiliation.clone(),
    }))
}
