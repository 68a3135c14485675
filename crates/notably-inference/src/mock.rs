//! Mock generation backend for deterministic testing.
//!
//! Replies are resolved in this order: a queued scripted reply whose marker
//! occurs in the prompt, a fixed response whose marker occurs in the prompt,
//! then the default response. Every call is logged for assertions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notably_inference::mock::{MockGenerationBackend, MockReply};
//!
//! # async fn demo() {
//! let backend = MockGenerationBackend::new()
//!     .with_fixed_response("- point one")
//!     .with_script("", vec![MockReply::network("connection reset")]);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use notably_core::{Error, GenerationBackend, Result};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Network(String),
    Timeout(String),
    Api(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    fn into_result(self) -> Result<String> {
        match self {
            MockReply::Text(text) => Ok(text),
            MockReply::Network(msg) => Err(Error::Request(msg)),
            MockReply::Timeout(msg) => Err(Error::Timeout(msg)),
            MockReply::Api(msg) => Err(Error::Inference(msg)),
        }
    }
}

/// Logged call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub timestamp: std::time::Instant,
}

#[derive(Debug, Clone)]
struct MockConfig {
    model: String,
    default_response: String,
    fixed_responses: Vec<(String, String)>,
    latency_ms: u64,
    failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            model: "mock-gen".to_string(),
            default_response: "Mock response".to_string(),
            fixed_responses: Vec::new(),
            latency_ms: 0,
            failure_rate: 0.0,
        }
    }
}

/// Mock generation backend for testing.
#[derive(Clone)]
pub struct MockGenerationBackend {
    config: Arc<MockConfig>,
    scripts: Arc<Mutex<Vec<(String, VecDeque<MockReply>)>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockGenerationBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            scripts: Arc::new(Mutex::new(Vec::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the default response for generation requests.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Respond with `response` whenever the prompt contains `marker`.
    pub fn with_response_for(
        mut self,
        marker: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_responses
            .push((marker.into(), response.into()));
        self
    }

    /// Queue replies consumed, in order, by prompts containing `marker`.
    /// An empty marker matches every prompt.
    pub fn with_script(self, marker: impl Into<String>, replies: Vec<MockReply>) -> Self {
        self.lock_scripts()
            .push((marker.into(), replies.into_iter().collect()));
        self
    }

    /// Fail the next `times` prompts containing `marker` with a network error.
    pub fn failing_times(self, marker: impl Into<String>, times: usize) -> Self {
        let replies = (0..times)
            .map(|i| MockReply::network(format!("connection reset (attempt {})", i + 1)))
            .collect();
        self.with_script(marker, replies)
    }

    /// Set the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).model = model.into();
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Set failure rate (0.0 - 1.0) for testing error handling.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.lock_calls().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.lock_calls().clear()
    }

    /// Get number of generation calls.
    pub fn generate_call_count(&self) -> usize {
        self.lock_calls().len()
    }

    /// Get number of generation calls whose prompt contains `marker`.
    pub fn calls_matching(&self, marker: &str) -> usize {
        self.lock_calls()
            .iter()
            .filter(|c| c.prompt.contains(marker))
            .count()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_scripts(&self) -> MutexGuard<'_, Vec<(String, VecDeque<MockReply>)>> {
        self.scripts.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn log_call(&self, prompt: &str) {
        self.lock_calls().push(MockCall {
            prompt: prompt.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        if self.config.failure_rate > 0.0 {
            rand::thread_rng().gen::<f64>() < self.config.failure_rate
        } else {
            false
        }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn next_scripted(&self, prompt: &str) -> Option<MockReply> {
        self.lock_scripts()
            .iter_mut()
            .find(|(marker, queue)| !queue.is_empty() && prompt.contains(marker.as_str()))
            .and_then(|(_, queue)| queue.pop_front())
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.log_call(prompt);
        self.simulate_latency().await;

        if let Some(reply) = self.next_scripted(prompt) {
            return reply.into_result();
        }

        if self.should_fail() {
            return Err(Error::Inference("Simulated API failure for testing".to_string()));
        }

        if let Some((_, response)) = self
            .config
            .fixed_responses
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
        {
            return Ok(response.clone());
        }

        Ok(self.config.default_response.clone())
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
