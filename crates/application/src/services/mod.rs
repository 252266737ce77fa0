//! Application services - Use case implementations

mod memoizing_client;
mod text_analysis;

#[cfg(test)]
pub(crate) mod test_support;

pub use memoizing_client::{
    CacheStats, DEFAULT_REQUEST_TIMEOUT, MemoizedResponse, MemoizingConfig,
    PersistentMemoizingClient,
};
pub use text_analysis::{
    AnalysisConfig, AnalysisReport, Sentiment, SentimentResult, TaskSettings,
    TextAnalysisService, TranslationResult,
};
