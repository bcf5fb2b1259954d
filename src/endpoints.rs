//! URL construction for directory pages
//!
//! Every page URL is the configured base domain plus a fixed path shape and
//! the caller's identifiers as path segments. Segments are pushed through
//! `Url::path_segments_mut`, so identifiers are percent-encoded rather than
//! spliced into the path as raw text.

use crate::{UrlError, UrlResult};
use url::Url;

/// Builds page URLs for one directory deployment
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Creates endpoints rooted at `domain`
    ///
    /// # Returns
    ///
    /// * `Ok(Endpoints)` - The domain is an absolute http(s) URL
    /// * `Err(UrlError)` - The domain could not be used as a base
    pub fn new(domain: &str) -> UrlResult<Self> {
        let base = Url::parse(domain).map_err(|e| UrlError::Parse(format!("{}: {}", domain, e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base.scheme().to_string()));
        }
        if base.host_str().is_none() {
            return Err(UrlError::MissingDomain);
        }
        if base.cannot_be_a_base() {
            return Err(UrlError::Malformed(domain.to_string()));
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{domain}/authors/profile/{author_id}`
    pub fn author_profile(&self, author_id: &str) -> UrlResult<Url> {
        self.join(&["authors", "profile", author_id])
    }

    /// `{domain}/affiliations/profile/{affiliation_id}`
    pub fn affiliation_profile(&self, affiliation_id: &str) -> UrlResult<Url> {
        self.join(&["affiliations", "profile", affiliation_id])
    }

    /// `{domain}/departments/profile/{affiliation_id}/{univ_hash}/{department_hash}`
    pub fn department_profile(
        &self,
        affiliation_id: &str,
        univ_hash: &str,
        department_hash: &str,
    ) -> UrlResult<Url> {
        self.join(&[
            "departments",
            "profile",
            affiliation_id,
            univ_hash,
            department_hash,
        ])
    }

    /// `{domain}/affiliations/departments/{affiliation_id}/{affiliation_code}?page={page}`
    pub fn department_listing(
        &self,
        affiliation_id: &str,
        affiliation_code: &str,
        page: u32,
    ) -> UrlResult<Url> {
        let mut url = self.join(&["affiliations", "departments", affiliation_id, affiliation_code])?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        Ok(url)
    }

    fn join(&self, segments: &[&str]) -> UrlResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| UrlError::Malformed(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Returns the first value of a query parameter, if the URL parses and has one
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Returns the last non-empty path segment of a URL-ish string
///
/// Works on relative hrefs too, since listing pages are not consistent about
/// emitting absolute links.
pub fn last_segment(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next()?;
    path.trim_end_matches('/').rsplit('/').next().filter(|s| !s.is_empty())
}

/// Returns the second-to-last non-empty path segment
pub fn parent_segment(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next()?;
    let mut segments = path.trim_end_matches('/').rsplit('/');
    segments.next()?;
    segments.next().filter(|s| !s.is_empty())
}
