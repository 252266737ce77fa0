//! Ollama `/api/generate` client implementation

use std::time::Duration;

use async_trait::async_trait;
use domain::{GenerationOutput, GenerationRequest, ResponseFormat, TokenUsage};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::ports::InferenceEngine;

/// Inference engine for Ollama's native API
pub struct OllamaInferenceEngine {
    client: Client,
    config: InferenceConfig,
}

impl std::fmt::Debug for OllamaInferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaInferenceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OllamaInferenceEngine {
    /// Create a new Ollama inference engine
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| InferenceError::ConnectionFailed(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            model = %config.default_model,
            "Initialized Ollama inference engine"
        );

        Ok(Self { client, config })
    }

    /// Create with the local default configuration
    pub fn with_defaults() -> Result<Self, InferenceError> {
        Self::new(InferenceConfig::ollama_local())
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/{}",
            self.config.trimmed_base_url(),
            endpoint.trim_start_matches('/')
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    fn to_wire(request: &GenerationRequest) -> OllamaGenerateRequest<'_> {
        let o = &request.options;
        let options = OllamaOptions {
            temperature: o.temperature,
            top_p: o.top_p,
            num_predict: o.max_tokens,
            seed: o.seed,
        };
        OllamaGenerateRequest {
            model: request.model.as_str(),
            prompt: request.prompt.as_str(),
            system: o.system_prompt.as_deref(),
            stream: false,
            format: match o.response_format {
                ResponseFormat::Json => Some("json"),
                ResponseFormat::Text => None,
            },
            options: (!options.is_empty()).then_some(options),
        }
    }
}

/// Ollama-format generate request
#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl OllamaOptions {
    const fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.num_predict.is_none()
            && self.seed.is_none()
    }
}

/// Ollama-format generate response
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[async_trait]
impl InferenceEngine for OllamaInferenceEngine {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, InferenceError> {
        let body = Self::to_wire(request);

        debug!(prompt_chars = request.prompt.char_count(), "Sending generate request to Ollama");

        let response = self
            .authorize(self.client.post(self.api_url("generate")))
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&e, self.config.timeout_ms))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Ollama generate request failed");
            return Err(InferenceError::from_status(
                status,
                &text,
                request.model.as_str(),
            ));
        }

        let ollama_response: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        let usage = match (ollama_response.prompt_eval_count, ollama_response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage::new(prompt, completion)),
            _ => None,
        };

        debug!(tokens = ?usage, "Ollama generation completed");

        Ok(GenerationOutput {
            text: ollama_response.response,
            model: ollama_response.model,
            usage,
        })
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<bool, InferenceError> {
        let response = self
            .authorize(self.client.get(self.api_url("tags")))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) if e.is_timeout() || e.is_connect() => Ok(false),
            Err(e) => Err(InferenceError::RequestFailed(e.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let response = self
            .authorize(self.client.get(self.api_url("tags")))
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&e, self.config.timeout_ms))?;

        if !response.status().is_success() {
            return Err(InferenceError::ServerError(response.status().to_string()));
        }

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;

        Ok(models_response
            .models
            .into_iter()
            .map(|m| m.name)
            .collect())
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use domain::GenerationOptions;

    use super::*;

    fn request(options: GenerationOptions) -> GenerationRequest {
        GenerationRequest::parse("Capital of India?", "llama3.2:3b", options).unwrap()
    }

    #[test]
    fn config_creates_correct_urls() {
        let engine = OllamaInferenceEngine::new(InferenceConfig::default()).unwrap();

        assert_eq!(
            engine.api_url("generate"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(engine.api_url("/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn default_model_is_llama() {
        let engine = OllamaInferenceEngine::with_defaults().unwrap();
        assert_eq!(engine.default_model(), "llama3.2:3b");
        assert_eq!(engine.name(), "ollama");
    }

    #[test]
    fn wire_request_omits_unset_options() {
        let req = request(GenerationOptions::default());
        let json = serde_json::to_value(OllamaInferenceEngine::to_wire(&req)).unwrap();
        assert_eq!(json["model"], "llama3.2:3b");
        assert_eq!(json["prompt"], "Capital of India?");
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
        assert!(json.get("system").is_none());
        assert!(json.get("format").is_none());
    }

    #[test]
    fn wire_request_maps_options() {
        let req = request(
            GenerationOptions::new()
                .with_temperature(0.3)
                .with_max_tokens(150)
                .with_seed(9)
                .with_system_prompt("Be brief")
                .json(),
        );
        let json = serde_json::to_value(OllamaInferenceEngine::to_wire(&req)).unwrap();
        assert_eq!(json["options"]["num_predict"], 150);
        assert_eq!(json["options"]["seed"], 9);
        assert!(json["options"].get("top_p").is_none());
        assert_eq!(json["system"], "Be brief");
        assert_eq!(json["format"], "json");
    }

    #[test]
    fn debug_does_not_leak_key() {
        let engine = OllamaInferenceEngine::new(InferenceConfig::ollama_cloud(
            secrecy::SecretString::from("cloud-key"),
        ))
        .unwrap();
        let debug = format!("{engine:?}");
        assert!(debug.contains("OllamaInferenceEngine"));
        assert!(!debug.contains("cloud-key"));
    }
}
