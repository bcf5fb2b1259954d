//! Configuration module for Sinta-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Configuration is passed explicitly into the client; nothing here is global.
//!
//! # Example
//!
//! ```no_run
//! use sinta_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sinta.toml")).unwrap();
//! println!("Fetching from: {}", config.source.domain);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheBackend, CacheConfig, Config, CrawlConfig, FetcherConfig, SourceConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
