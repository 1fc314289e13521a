//! # Natural Language to SPL Engine
//!
//! Converts natural-language questions into Splunk SPL, runs them against a
//! Splunk deployment and returns structured results.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nl_spl_engine::{AppConfig, SplQueryEngine};
//!
//! # async fn run() -> nl_spl_engine::EngineResult<()> {
//! let config = AppConfig::from_env();
//! let engine = SplQueryEngine::from_config(&config)?;
//!
//! let response = engine
//!     .run_natural_language("Show me error logs from the last hour", 50)
//!     .await;
//! println!("{} -> {} results", response.spl_query, response.result_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Translation**: OpenAI chat completions with tolerant response parsing
//! - **Two execution strategies**: oneshot searches with a search-job fallback
//! - **Context cache**: index list cached for five minutes to steer prompts
//! - **Surfaces**: axum HTTP API and an interactive REPL

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod llm;
pub mod logging;
pub mod splunk;
pub mod validators;
pub mod web;

// Public API
pub use cache::{ContextCache, EnvironmentContext};
pub use config::AppConfig;
pub use engine::{HealthStatus, OverallStatus, QueryResponse, SplQueryEngine};
pub use error::{EngineError, EngineResult};
pub use history::{QueryHistory, QueryKind};
pub use llm::{CompletionClient, SplTranslator};
pub use splunk::{Connector, SearchExecutor, SearchService};
