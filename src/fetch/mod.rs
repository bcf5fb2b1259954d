//! Fetching layer
//!
//! This module contains:
//! - The HTTP fetcher used by every worker and by the listing crawl
//! - The concurrent dispatcher that fans a batch out to workers and compacts
//!   their results

mod dispatcher;
mod fetcher;

pub use dispatcher::{BatchReport, Dispatcher, ItemFailure};
pub use fetcher::{build_http_client, FetchError, Fetcher};
