//! LLM Module - Natural language to SPL translation

pub mod openai_client;
pub mod spl_translator;

pub use openai_client::{CompletionClient, CompletionRequest, OpenAiClient};
pub use spl_translator::{Confidence, EnhancementResult, SplTranslator, TranslationResult};
