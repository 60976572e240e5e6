//! Scripted mock oracle for deterministic testing.
//!
//! Implements one-shot generation, streaming and speech so that extraction
//! and chat code can be tested without a network.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lunai_inference::mock::MockOracle;
//!
//! #[tokio::test]
//! async fn test_with_mock_oracle() {
//!     let oracle = MockOracle::new().with_fixed_response(r#"{"summary":"ok"}"#);
//!     oracle.push_fragments(["Hello", " there", "!"]);
//!     // hand `Arc::new(oracle.clone())` to the code under test
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use lunai_core::{
    Error, GenerationBackend, OracleRequest, Result, SpeechBackend, StreamingGeneration,
    TokenStream,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted reply, consumed by the next call.
#[derive(Debug, Clone)]
enum MockReply {
    /// Whole reply text (streamed as a single fragment).
    Text(String),
    /// Streamed fragments, optionally followed by a mid-stream error.
    Fragments {
        fragments: Vec<String>,
        then_error: Option<String>,
    },
    /// The call itself fails with a transport error.
    Failure(String),
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
    speech_audio: Vec<u8>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_response: "Mock response".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
            // 4 frames of PCM16 silence
            speech_audio: vec![0; 8],
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    /// The full request for generation calls.
    pub request: Option<OracleRequest>,
    /// Text input for speech calls.
    pub input: String,
    pub timestamp: std::time::Instant,
}

/// Mock oracle for testing.
#[derive(Clone)]
pub struct MockOracle {
    config: Arc<MockConfig>,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockOracle {
    /// Create a new mock oracle with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            script: Arc::new(Mutex::new(VecDeque::new())),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply used when nothing is scripted.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
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

    /// PCM16 bytes returned by speech synthesis.
    pub fn with_speech_audio(mut self, audio: Vec<u8>) -> Self {
        Arc::make_mut(&mut self.config).speech_audio = audio;
        self
    }

    /// Queue a whole reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        lock(&self.script).push_back(MockReply::Text(text.into()));
    }

    /// Queue a streamed reply.
    pub fn push_fragments<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.script).push_back(MockReply::Fragments {
            fragments: fragments.into_iter().map(Into::into).collect(),
            then_error: None,
        });
    }

    /// Queue a stream that yields `fragments` and then fails.
    pub fn push_stream_failure<I, S>(&self, fragments: I, message: impl Into<String>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.script).push_back(MockReply::Fragments {
            fragments: fragments.into_iter().map(Into::into).collect(),
            then_error: Some(message.into()),
        });
    }

    /// Queue a call that fails before producing anything.
    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.script).push_back(MockReply::Failure(message.into()));
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        lock(&self.call_log).clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        lock(&self.call_log).clear()
    }

    /// Total number of calls of any kind.
    pub fn call_count(&self) -> usize {
        lock(&self.call_log).len()
    }

    /// Number of calls for one operation ("generate", "stream", "synthesize").
    pub fn count(&self, operation: &str) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// The most recent generation or stream request.
    pub fn last_request(&self) -> Option<OracleRequest> {
        lock(&self.call_log)
            .iter()
            .rev()
            .find_map(|c| c.request.clone())
    }

    fn log_call(&self, operation: &str, request: Option<OracleRequest>, input: &str) {
        lock(&self.call_log).push(MockCall {
            operation: operation.to_string(),
            request,
            input: input.to_string(),
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

    fn next_reply(&self) -> MockReply {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text(self.config.default_response.clone()))
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockOracle {
    async fn generate(&self, request: OracleRequest) -> Result<String> {
        self.log_call("generate", Some(request), "");
        self.simulate_latency().await;

        if self.should_fail() {
            return Err(Error::Transport("Simulated failure for testing".to_string()));
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(text),
            MockReply::Fragments {
                fragments,
                then_error: None,
            } => Ok(fragments.concat()),
            MockReply::Fragments {
                then_error: Some(message),
                ..
            }
            | MockReply::Failure(message) => Err(Error::Transport(message)),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl StreamingGeneration for MockOracle {
    async fn generate_stream(&self, request: OracleRequest) -> Result<TokenStream> {
        self.log_call("stream", Some(request), "");
        self.simulate_latency().await;

        if self.should_fail() {
            return Err(Error::Transport("Simulated failure for testing".to_string()));
        }

        let items: Vec<Result<String>> = match self.next_reply() {
            MockReply::Text(text) => vec![Ok(text)],
            MockReply::Fragments {
                fragments,
                then_error,
            } => fragments
                .into_iter()
                .map(Ok)
                .chain(then_error.map(|m| Err(Error::Transport(m))))
                .collect(),
            MockReply::Failure(message) => return Err(Error::Transport(message)),
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }
}

#[async_trait]
impl SpeechBackend for MockOracle {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.log_call("synthesize", None, text);
        self.simulate_latency().await;

        if self.should_fail() {
            return Err(Error::Transport("Simulated failure for testing".to_string()));
        }
        if let Some(MockReply::Failure(message)) = lock(&self.script).front().cloned() {
            lock(&self.script).pop_front();
            return Err(Error::Transport(message));
        }
        Ok(self.config.speech_audio.clone())
    }

    fn sample_rate(&self) -> u32 {
        lunai_core::defaults::TTS_SAMPLE_RATE
    }

    fn channels(&self) -> u16 {
        lunai_core::defaults::TTS_CHANNELS
    }
}
