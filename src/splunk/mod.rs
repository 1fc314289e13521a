//! Splunk Module - Search backend protocol and execution policy

pub mod client;
pub mod executor;
pub mod types;

pub use client::{Connector, SearchService, SplunkConnector, SplunkService};
pub use executor::{normalize_query, use_fast_path, SearchExecutor, DEFAULT_INDEXES};
pub use types::*;
