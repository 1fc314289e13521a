/// Configuration management
pub mod production;

pub use production::*;
