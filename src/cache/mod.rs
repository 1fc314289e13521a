pub mod context_cache;

pub use context_cache::*;
