use crate::endpoints::{last_segment, query_param};
use crate::extract::{at_least, attr_of, cast, first, selector, text_of, ExtractError};
use crate::record::{AffiliationRef, AuthorRecord, IndexerStats, Scores};
use scraper::{ElementRef, Html};

const NAME: &str = "h3 > a";
const META_PROFILE: &str = ".meta-profile a";
const SUBJECTS: &str = ".subject-list a";
const SCORES: &str = ".stat-profile .pr-num";
const STAT_ROWS: &str = ".stat-table > tbody > tr";
const AVATAR: &str = r#"img[alt="avatar"]"#;

/// Extracts an author profile page into an [`AuthorRecord`]
///
/// # Layout
///
/// | Field | Source |
/// |-------|--------|
/// | name | first `h3 > a` |
/// | affiliation | first `.meta-profile a` (text, href, id from last path segment) |
/// | department | second `.meta-profile a` |
/// | subjects | every `.subject-list a` |
/// | score | first four `.stat-profile .pr-num` |
/// | statistics | six `.stat-table` body rows, cells 1..=3 (Scopus, Scholar, WoS) |
/// | image_url | `img[alt=avatar]` src, optional |
///
/// # Arguments
///
/// * `html` - The fetched page body
/// * `author_id` - The identifier the page was fetched for
/// * `url` - The page URL
pub fn extract_author(html: &str, author_id: &str, url: &str) -> Result<AuthorRecord, ExtractError> {
    let document = Html::parse_document(html);

    let name = text_of(first(&document, NAME)?);

    let profile = at_least(&document, META_PROFILE, 2)?;
    let affiliation_url = attr_of(profile[0], META_PROFILE, "href")?;
    let affiliation = AffiliationRef {
        id: cast(last_segment(&affiliation_url).unwrap_or_default()),
        name: text_of(profile[0]),
        url: affiliation_url,
    };
    let department = text_of(profile[1]);

    let subject_sel = selector(SUBJECTS)?;
    let subjects = document.select(&subject_sel).map(text_of).collect();

    let scores = at_least(&document, SCORES, 4)?;
    let score = Scores {
        overall: cast(&text_of(scores[0])),
        three_years: cast(&text_of(scores[1])),
        affiliation: cast(&text_of(scores[2])),
        affiliation_3_years: cast(&text_of(scores[3])),
    };

    let rows = at_least(&document, STAT_ROWS, 6)?;
    let stat = |row: usize| indexer_stats(rows[row]);

    let image_url = match first(&document, AVATAR) {
        Ok(img) => img.value().attr("src").map(|s| s.trim().to_string()),
        Err(_) => None,
    };
    let google_scholar_id = image_url.as_deref().and_then(|src| query_param(src, "user"));

    Ok(AuthorRecord {
        id: author_id.to_string(),
        name,
        url: url.to_string(),
        affiliation,
        department,
        subjects,
        score,
        image_url,
        google_scholar_id,
        articles: stat(0)?,
        citations: stat(1)?,
        cited_docs: stat(2)?,
        h_index: stat(3)?,
        i10_index: stat(4)?,
        g_index: stat(5)?,
    })
}

/// Reads the Scopus, Scholar and WoS cells of one statistics row
fn indexer_stats(row: ElementRef<'_>) -> Result<IndexerStats, ExtractError> {
    let cell_sel = selector("td")?;
    let cells: Vec<_> = row.select(&cell_sel).collect();
    if cells.len() < 4 {
        return Err(ExtractError::TooFewElements {
            selector: "td",
            expected: 4,
            found: cells.len(),
        });
    }
    Ok(IndexerStats {
        scopus: cast(&text_of(cells[1])),
        scholar: cast(&text_of(cells[2])),
        wos: cast(&text_of(cells[3])),
    })
}
