//! Hand-written engine and store doubles shared by service tests

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use ai_core::{InferenceEngine, InferenceError};
use async_trait::async_trait;
use domain::{GenerationOutput, GenerationRequest, TokenUsage};
use parking_lot::Mutex;

use crate::{
    error::ApplicationError,
    ports::{CacheSnapshot, CacheStorePort},
};

type Responder = Arc<dyn Fn(&GenerationRequest) -> String + Send + Sync>;

/// Per-request delay and optional failure, decided before the reply
type Script =
    Arc<dyn Fn(&GenerationRequest) -> (Duration, Option<InferenceError>) + Send + Sync>;

/// Engine that answers locally and counts calls
pub struct StubEngine {
    calls: AtomicU32,
    delay: Option<Duration>,
    usage: Option<TokenUsage>,
    reply: Mutex<Option<String>>,
    failure: Mutex<Option<InferenceError>>,
    responder: Option<Responder>,
    script: Option<Script>,
}

impl std::fmt::Debug for StubEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubEngine")
            .field("calls", &self.calls)
            .finish_non_exhaustive()
    }
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            delay: None,
            usage: None,
            reply: Mutex::new(None),
            failure: Mutex::new(None),
            responder: None,
            script: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl Fn(&GenerationRequest) -> String + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(responder));
        self
    }

    pub fn with_script(
        mut self,
        script: impl Fn(&GenerationRequest) -> (Duration, Option<InferenceError>)
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.script = Some(Arc::new(script));
        self
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock() = Some(reply.to_string());
    }

    pub fn fail_with(&self, error: Option<InferenceError>) {
        *self.failure.lock() = error;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceEngine for StubEngine {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.failure.lock().take() {
            return Err(error);
        }
        if let Some(script) = &self.script {
            let (delay, failure) = script(request);
            tokio::time::sleep(delay).await;
            if let Some(error) = failure {
                return Err(error);
            }
        }

        let text = match (&self.responder, self.reply.lock().clone()) {
            (_, Some(reply)) => reply,
            (Some(responder), None) => responder(request),
            (None, None) => format!("echo: {}", request.prompt),
        };
        let mut output = GenerationOutput::new(text, request.model.as_str());
        if let Some(usage) = self.usage {
            output = output.with_usage(usage);
        }
        Ok(output)
    }

    async fn health_check(&self) -> Result<bool, InferenceError> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        Ok(vec!["model-a".to_string()])
    }

    fn default_model(&self) -> &str {
        "model-a"
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// In-memory store that records every save
#[derive(Debug, Default)]
pub struct MemoryStore {
    persisted: Mutex<Option<CacheSnapshot>>,
    saves: AtomicU32,
    save_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn with_snapshot(snapshot: CacheSnapshot) -> Self {
        Self {
            persisted: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Make every save take `delay`, like a slow disk
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    pub fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn persisted(&self) -> Option<CacheSnapshot> {
        self.persisted.lock().clone()
    }
}

#[async_trait]
impl CacheStorePort for MemoryStore {
    async fn load(&self) -> Result<Option<CacheSnapshot>, ApplicationError> {
        Ok(self.persisted.lock().clone())
    }

    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), ApplicationError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        *self.persisted.lock() = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApplicationError> {
        *self.persisted.lock() = Some(CacheSnapshot::new());
        Ok(())
    }

    fn location(&self) -> String {
        "memory://test".to_string()
    }

    async fn size_bytes(&self) -> Option<u64> {
        None
    }
}
