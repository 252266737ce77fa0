//! Text analysis use case
//!
//! Runs sentiment classification and English to Hindi translation over the
//! same transcript. Both tasks go through the shared memoizing client, so a
//! repeated transcript costs no remote calls.

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use domain::{DomainError, GenerationOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::memoizing_client::PersistentMemoizingClient;
use crate::error::ApplicationError;

const SENTIMENT_SYSTEM_PROMPT: &str = "You classify the sentiment of text. \
    Reply with a JSON object and nothing else.";

const TRANSLATION_SYSTEM_PROMPT: &str = "You translate English into natural, fluent Hindi \
    written in Devanagari script. Reply with a JSON object and nothing else.";

/// Sampling settings for one analysis task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl TaskSettings {
    fn options(self, system_prompt: &str) -> GenerationOptions {
        GenerationOptions::new()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_system_prompt(system_prompt)
            .json()
    }
}

/// Per-task settings and execution mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sentiment")]
    pub sentiment: TaskSettings,

    #[serde(default = "default_translation")]
    pub translation: TaskSettings,

    /// Run both tasks concurrently
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

const fn default_sentiment() -> TaskSettings {
    TaskSettings {
        temperature: 0.3,
        max_tokens: 150,
    }
}

const fn default_translation() -> TaskSettings {
    TaskSettings {
        temperature: 0.5,
        max_tokens: 1000,
    }
}

const fn default_parallel() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sentiment: default_sentiment(),
            translation: default_translation(),
            parallel: default_parallel(),
        }
    }
}

/// Sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        };
        f.write_str(label)
    }
}

/// Sentiment classification of a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Model's explanation of the label
    pub confidence: Option<String>,
    pub key_phrases: Vec<String>,
}

/// Hindi translation of a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    pub original_text: String,
}

/// Combined output of [`TextAnalysisService::analyze`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub sentiment: SentimentResult,
    pub translation: TranslationResult,
    /// Wall-clock time for both tasks
    pub elapsed: Duration,
    /// Whether the sentiment and translation replies came from the cache
    pub cached: (bool, bool),
}

#[derive(Debug, Deserialize)]
struct SentimentReply {
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    key_phrases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TranslationReply {
    translated_text: String,
}

/// Sentiment and translation over a shared memoizing client
pub struct TextAnalysisService {
    client: Arc<PersistentMemoizingClient>,
    model: String,
    config: AnalysisConfig,
}

impl fmt::Debug for TextAnalysisService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextAnalysisService")
            .field("model", &self.model)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TextAnalysisService {
    /// Create a service that runs both tasks against `model`
    pub fn new(
        client: Arc<PersistentMemoizingClient>,
        model: impl Into<String>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            config,
        }
    }

    /// Classify the sentiment of `text`
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn analyze_sentiment(
        &self,
        text: &str,
    ) -> Result<(SentimentResult, bool), ApplicationError> {
        let prompt = format!(
            "Classify the sentiment of the text below as \"Positive\", \"Negative\" or \"Neutral\".\n\n\
             Text: \"{text}\"\n\n\
             Answer with this JSON shape:\n\
             {{\"sentiment\": \"Positive|Negative|Neutral\", \
             \"confidence\": \"one sentence on why\", \
             \"key_phrases\": [\"phrase\", \"...\"]}}"
        );
        let response = self
            .client
            .get_response(
                &prompt,
                &self.model,
                Some(self.config.sentiment.options(SENTIMENT_SYSTEM_PROMPT)),
            )
            .await?;

        let reply: SentimentReply = parse_reply(&response.output.text)?;
        let sentiment = match reply.sentiment.as_deref() {
            None => Sentiment::Neutral,
            Some(label) => Sentiment::parse(label).ok_or_else(|| {
                ApplicationError::InvalidReply(format!("unknown sentiment label '{label}'"))
            })?,
        };

        debug!(%sentiment, cached = response.was_cached, "Sentiment analysis complete");
        Ok((
            SentimentResult {
                sentiment,
                confidence: reply.confidence,
                key_phrases: reply.key_phrases,
            },
            response.was_cached,
        ))
    }

    /// Translate English `text` to Hindi
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn translate_to_hindi(
        &self,
        text: &str,
    ) -> Result<(TranslationResult, bool), ApplicationError> {
        let prompt = format!(
            "Translate the English text below into Hindi, keeping its meaning and tone.\n\n\
             English text: \"{text}\"\n\n\
             Answer with this JSON shape:\n\
             {{\"translated_text\": \"the Hindi translation\"}}"
        );
        let response = self
            .client
            .get_response(
                &prompt,
                &self.model,
                Some(self.config.translation.options(TRANSLATION_SYSTEM_PROMPT)),
            )
            .await?;

        let reply: TranslationReply = parse_reply(&response.output.text)?;
        debug!(cached = response.was_cached, "Translation complete");
        Ok((
            TranslationResult {
                translated_text: reply.translated_text,
                original_text: text.to_string(),
            },
            response.was_cached,
        ))
    }

    /// Run sentiment and translation using the configured execution mode
    pub async fn analyze(&self, text: &str) -> Result<AnalysisReport, ApplicationError> {
        self.analyze_with(text, self.config.parallel).await
    }

    /// Run sentiment and translation, concurrently when `parallel` is set
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn analyze_with(
        &self,
        text: &str,
        parallel: bool,
    ) -> Result<AnalysisReport, ApplicationError> {
        if text.trim().is_empty() {
            return Err(DomainError::EmptyPrompt.into());
        }

        let started = Instant::now();
        let ((sentiment, sentiment_cached), (translation, translation_cached)) = if parallel {
            tokio::try_join!(self.analyze_sentiment(text), self.translate_to_hindi(text))?
        } else {
            let sentiment = self.analyze_sentiment(text).await?;
            let translation = self.translate_to_hindi(text).await?;
            (sentiment, translation)
        };
        let elapsed = started.elapsed();

        info!(
            parallel,
            elapsed_ms = elapsed.as_millis(),
            sentiment = %sentiment.sentiment,
            "Text analysis complete"
        );

        Ok(AnalysisReport {
            sentiment,
            translation,
            elapsed,
            cached: (sentiment_cached, translation_cached),
        })
    }
}

/// Parse a JSON reply, tolerating prose or code fences around the object
fn parse_reply<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, ApplicationError> {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str(body).map_err(|e| ApplicationError::InvalidReply(e.to_string()))
}
