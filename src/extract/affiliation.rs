use crate::cache::AffiliationSummary;
use crate::extract::{attr_of, first, first_in, text_of, ExtractError};
use crate::record::AffiliationRecord;
use scraper::Html;

const UNIV_NAME: &str = ".univ-name";
const UNIV_LINK: &str = "h3 a";
const ABBREV: &str = ".affil-abbrev";
const LOCATION: &str = ".affil-loc";
const CODES: &str = ".affil-code";

/// Extracts an affiliation profile page into an [`AffiliationRecord`]
pub fn extract_affiliation(
    html: &str,
    affiliation_id: &str,
    url: &str,
) -> Result<AffiliationRecord, ExtractError> {
    let summary = parse_affiliation_summary(html)?;
    Ok(AffiliationRecord {
        id: affiliation_id.to_string(),
        code: summary.code,
        name: summary.name,
        univ_abbrev: summary.univ_abbrev,
        location: summary.location,
        url: url.to_string(),
    })
}

/// Parses the `.univ-name` header block shared by affiliation pages
pub fn parse_affiliation_summary(html: &str) -> Result<AffiliationSummary, ExtractError> {
    let document = Html::parse_document(html);
    summary_from(&document)
}

/// Reads the header block from an already-parsed document
///
/// The code line reads like `ID : 404 | CODE : 001002`; the id is the third
/// whitespace-separated token and the code the seventh.
pub(crate) fn summary_from(document: &Html) -> Result<AffiliationSummary, ExtractError> {
    let block = first(document, UNIV_NAME)?;
    let link = first_in(block, UNIV_LINK)?;

    let codes = text_of(first_in(block, CODES)?);
    let tokens: Vec<&str> = codes.split_whitespace().collect();
    let (id, code) = match (tokens.get(2), tokens.get(6)) {
        (Some(id), Some(code)) => (id.to_string(), code.to_string()),
        _ => {
            return Err(ExtractError::Malformed {
                field: "affiliation code",
                value: codes,
            })
        }
    };

    Ok(AffiliationSummary {
        id,
        code,
        name: text_of(link),
        univ_abbrev: text_of(first_in(block, ABBREV)?),
        url: attr_of(link, UNIV_LINK, "href")?,
        location: text_of(first_in(block, LOCATION)?),
    })
}
