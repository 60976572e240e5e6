//! Multi-turn chat session.
//!
//! A session owns its turn history, the model binding for the current mode,
//! the pending input buffer and at most one recording sub-session. Methods
//! take `&self` so a text reply and a recording can progress concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, instrument, trace, warn};

use lunai_core::{
    defaults, Attachment, AudioSink, CaptureDevice, ChatContent, ChatMode, ChatTurn, Error,
    LiveAudioBackend, OracleRequest, Result, SpeechBackend, StreamingGeneration, TurnId,
};
use lunai_inference::{GeminiBackend, GeminiConfig};

use crate::events::{SessionError, SessionEvent};
use crate::recording::AudioSubSession;
use crate::speech;

/// First assistant turn shown in every new session.
pub const GREETING: &str =
    "Hello! I'm LUNai. My only interest is your child's best interest. How can I help you focus on that today?";

/// Text of an assistant turn whose reply produced nothing.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error.";

/// System instruction for chat in both modes.
pub const CHAT_SYSTEM_INSTRUCTION: &str = "You are LUNai, a child-focused AI assistant. Your only interest is the child's best interest. Every response must prioritize the child's well-being, emotional safety, and stability. Guide the user toward collaborative, non-confrontational solutions.";

/// Chat models and cadence.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model for standard mode.
    pub chat_model: String,
    /// Model for extended-reasoning mode.
    pub reasoning_model: String,
    pub system_instruction: String,
    /// How often buffered microphone audio is forwarded while recording.
    pub chunk_interval: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            chat_model: defaults::CHAT_MODEL.to_string(),
            reasoning_model: defaults::REASONING_MODEL.to_string(),
            system_instruction: CHAT_SYSTEM_INSTRUCTION.to_string(),
            chunk_interval: Duration::from_millis(defaults::AUDIO_CHUNK_INTERVAL_MS),
        }
    }
}

impl ChatConfig {
    /// Chat models from a Gemini configuration.
    pub fn from_gemini(config: &GeminiConfig) -> Self {
        Self {
            chat_model: config.chat_model.clone(),
            reasoning_model: config.reasoning_model.clone(),
            ..Default::default()
        }
    }

    /// Set the audio forwarding cadence.
    pub fn with_chunk_interval(mut self, interval: Duration) -> Self {
        self.chunk_interval = interval;
        self
    }

    fn model_for(&self, mode: ChatMode) -> &str {
        match mode {
            ChatMode::Standard => &self.chat_model,
            ChatMode::ExtendedReasoning => &self.reasoning_model,
        }
    }
}

/// Model, parameters and history window backing subsequent submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBinding {
    pub mode: ChatMode,
    pub model: String,
    pub system_instruction: String,
    pub thinking_budget: Option<u32>,
    /// Index of the first turn this binding sends as history.
    pub history_start: usize,
}

struct ChatState {
    turns: Vec<ChatTurn>,
    mode: ChatMode,
    binding: Option<ModelBinding>,
    last_error: Option<SessionError>,
}

/// State reachable from the session and from its recording watcher.
struct Shared {
    state: Mutex<ChatState>,
    recording: AtomicBool,
    sub_session: tokio::sync::Mutex<Option<AudioSubSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn record_error(&self, err: &Error) {
        let error = SessionError::from(err);
        self.state().last_error = Some(error.clone());
        self.emit(SessionEvent::Error(error));
    }

    fn update_turn(&self, turn_id: TurnId, apply: impl FnOnce(&mut ChatTurn)) {
        {
            let mut state = self.state();
            if let Some(turn) = state.turns.iter_mut().rev().find(|t| t.id == turn_id) {
                apply(turn);
            }
        }
        self.emit(SessionEvent::TurnUpdated(turn_id));
    }

    fn recording_ended(&self) {
        self.recording.store(false, Ordering::Release);
        self.emit(SessionEvent::RecordingStopped);
    }
}

/// An assistant turn waiting for its first fragment. Dropped before one
/// arrives (stream failure, empty stream, or the caller abandoning the
/// future) it leaves the fallback text and marks the turn failed.
struct PendingReply<'a> {
    shared: &'a Shared,
    turn_id: TurnId,
    received: bool,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if !self.received {
            self.shared.update_turn(self.turn_id, |turn| {
                turn.text = FALLBACK_REPLY.to_string();
                turn.failed = true;
            });
        }
    }
}

/// Clears the in-flight flag however `submit_turn` exits.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A conversational session.
pub struct ChatSession {
    oracle: Arc<dyn StreamingGeneration>,
    speech: Option<Arc<dyn SpeechBackend>>,
    sink: Option<Arc<dyn AudioSink>>,
    live: Option<Arc<dyn LiveAudioBackend>>,
    capture: Option<Arc<dyn CaptureDevice>>,
    config: ChatConfig,
    shared: Arc<Shared>,
    awaiting_reply: AtomicBool,
    pending_input: Arc<watch::Sender<String>>,
}

impl ChatSession {
    /// Create a session over a streaming oracle. The history starts with the
    /// greeting turn.
    pub fn new(oracle: Arc<dyn StreamingGeneration>, config: ChatConfig) -> Self {
        let (pending_tx, _) = watch::channel(String::new());
        let (events, _) = broadcast::channel(defaults::SESSION_EVENT_CAPACITY);

        Self {
            oracle,
            speech: None,
            sink: None,
            live: None,
            capture: None,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(ChatState {
                    turns: vec![ChatTurn::assistant(GREETING)],
                    mode: ChatMode::default(),
                    binding: None,
                    last_error: None,
                }),
                recording: AtomicBool::new(false),
                sub_session: tokio::sync::Mutex::new(None),
                events,
            }),
            awaiting_reply: AtomicBool::new(false),
            pending_input: Arc::new(pending_tx),
        }
    }

    /// Session backed by Gemini for chat, speech and live transcription.
    /// Devices are platform specific and attached separately.
    pub fn with_gemini(backend: Arc<GeminiBackend>) -> Self {
        let config = ChatConfig::from_gemini(backend.config());
        let live: Arc<dyn LiveAudioBackend> = Arc::new(backend.live());
        let speech: Arc<dyn SpeechBackend> = backend.clone();
        let mut session = Self::new(backend, config);
        session.speech = Some(speech);
        session.live = Some(live);
        session
    }

    /// Enable text-to-speech.
    pub fn with_speech(mut self, speech: Arc<dyn SpeechBackend>, sink: Arc<dyn AudioSink>) -> Self {
        self.speech = Some(speech);
        self.sink = Some(sink);
        self
    }

    /// Attach a playback device.
    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Enable voice input.
    pub fn with_audio(
        mut self,
        live: Arc<dyn LiveAudioBackend>,
        capture: Arc<dyn CaptureDevice>,
    ) -> Self {
        self.live = Some(live);
        self.capture = Some(capture);
        self
    }

    /// Attach a microphone.
    pub fn with_capture(mut self, capture: Arc<dyn CaptureDevice>) -> Self {
        self.capture = Some(capture);
        self
    }

    fn state(&self) -> MutexGuard<'_, ChatState> {
        self.shared.state()
    }

    fn emit(&self, event: SessionEvent) {
        self.shared.emit(event);
    }

    fn record_error(&self, err: &Error) {
        self.shared.record_error(err);
    }

    fn new_binding(&self, mode: ChatMode, history_start: usize) -> ModelBinding {
        ModelBinding {
            mode,
            model: self.config.model_for(mode).to_string(),
            system_instruction: self.config.system_instruction.clone(),
            thinking_budget: mode.thinking_budget(),
            history_start,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Watch the pending input buffer.
    pub fn watch_pending_input(&self) -> watch::Receiver<String> {
        self.pending_input.subscribe()
    }

    /// Snapshot of the turn history.
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.state().turns.clone()
    }

    pub fn mode(&self) -> ChatMode {
        self.state().mode
    }

    /// The current model binding, if one has been created.
    pub fn binding(&self) -> Option<ModelBinding> {
        self.state().binding.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.state().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.state().last_error = None;
    }

    pub fn pending_input(&self) -> String {
        self.pending_input.borrow().clone()
    }

    pub fn set_pending_input(&self, text: impl Into<String>) {
        let text = text.into();
        self.pending_input.send_replace(text.clone());
        self.emit(SessionEvent::InputChanged(text));
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.load(Ordering::Acquire)
    }

    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::Acquire)
    }

    // =========================================================================
    // TEXT CHANNEL
    // =========================================================================

    /// Switch between standard and extended reasoning.
    ///
    /// A different mode replaces the binding at once; later submissions send
    /// only turns from this point on. Prior turns are left as they are.
    pub fn set_mode(&self, mode: ChatMode) {
        {
            let mut state = self.state();
            if state.mode == mode {
                return;
            }
            let binding = self.new_binding(mode, state.turns.len());
            state.mode = mode;
            state.binding = Some(binding);
        }
        info!(
            subsystem = "session",
            component = "chat",
            mode = %mode,
            model = self.config.model_for(mode),
            "Chat mode changed"
        );
        self.emit(SessionEvent::ModeChanged(mode));
    }

    /// Submit a user turn and stream the reply into a new assistant turn.
    ///
    /// Returns the assistant turn's id. On failure that turn still exists:
    /// it keeps any partial text, or carries [`FALLBACK_REPLY`] and is
    /// marked failed when nothing arrived.
    #[instrument(
        skip(self, text, image),
        fields(subsystem = "session", component = "chat", op = "submit_turn")
    )]
    pub async fn submit_turn(&self, text: &str, image: Option<Attachment>) -> Result<TurnId> {
        if text.trim().is_empty() && image.is_none() {
            return Err(Error::InvalidInput(
                "Please enter a message or attach an image.".to_string(),
            ));
        }
        let _in_flight = InFlight::acquire(&self.awaiting_reply).ok_or_else(|| {
            Error::InvalidInput("Please wait for the current reply to finish.".to_string())
        })?;

        self.set_pending_input(String::new());

        let user_turn = ChatTurn::user(text, image);
        let user_id = user_turn.id;
        let assistant_turn = ChatTurn::assistant("");
        let assistant_id = assistant_turn.id;

        let request = {
            let mut state = self.state();
            let (mode, history_start) = (state.mode, state.turns.len());
            let binding = state
                .binding
                .get_or_insert_with(|| self.new_binding(mode, history_start))
                .clone();
            state.turns.push(user_turn);
            let request = build_request(&binding, &state.turns);
            state.turns.push(assistant_turn);
            request
        };
        self.emit(SessionEvent::TurnAppended(user_id));
        self.emit(SessionEvent::TurnAppended(assistant_id));

        debug!(
            turn_id = %assistant_id,
            model = %request.model,
            history = request.contents.len(),
            prompt_len = request.prompt_len(),
            "Requesting streamed reply"
        );

        let start = Instant::now();
        let mut pending = PendingReply {
            shared: &self.shared,
            turn_id: assistant_id,
            received: false,
        };
        let (fragments, failure) = self.stream_reply(request, &mut pending).await;
        drop(pending);

        let failure = if fragments == 0 {
            Some(failure.unwrap_or_else(|| {
                Error::Transport("The reply ended without any text.".to_string())
            }))
        } else {
            failure
        };

        match failure {
            None => {
                debug!(
                    turn_id = %assistant_id,
                    fragment_count = fragments,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Reply complete"
                );
                Ok(assistant_id)
            }
            Some(e) => {
                warn!(
                    turn_id = %assistant_id,
                    fragment_count = fragments,
                    error = %e,
                    "Reply failed"
                );
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Apply fragments to the assistant turn in arrival order. Returns the
    /// fragment count and the error that ended the stream, if any.
    async fn stream_reply(
        &self,
        request: OracleRequest,
        pending: &mut PendingReply<'_>,
    ) -> (usize, Option<Error>) {
        let mut stream = match self.oracle.generate_stream(request).await {
            Ok(stream) => stream,
            Err(e) => return (0, Some(e)),
        };

        let mut fragments = 0;
        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    fragments += 1;
                    pending.received = true;
                    trace!(fragment_len = fragment.len(), "Reply fragment");
                    self.shared
                        .update_turn(pending.turn_id, |turn| turn.text.push_str(&fragment));
                }
                Err(e) => return (fragments, Some(e)),
            }
        }
        (fragments, None)
    }

    // =========================================================================
    // AUDIO
    // =========================================================================

    /// Start voice input. Transcripts replace the pending input as they arrive.
    #[instrument(skip(self), fields(subsystem = "session", component = "recording", op = "start"))]
    pub async fn start_recording(&self) -> Result<()> {
        let result = self.try_start_recording().await;
        if let Err(ref e) = result {
            self.record_error(e);
        }
        result
    }

    async fn try_start_recording(&self) -> Result<()> {
        let (Some(capture), Some(live)) = (self.capture.as_ref(), self.live.as_ref()) else {
            return Err(Error::Resource(
                "Voice input is not available on this device.".to_string(),
            ));
        };

        // Held through setup so a concurrent start fails instead of queueing
        let mut slot = self
            .shared
            .sub_session
            .try_lock()
            .map_err(|_| Error::Resource("Recording is already in progress.".to_string()))?;
        if slot.is_some() {
            return Err(Error::Resource("Recording is already in progress.".to_string()));
        }

        let mut sub_session = AudioSubSession::start(
            capture.as_ref(),
            live.as_ref(),
            self.pending_input.clone(),
            self.shared.events.clone(),
            self.config.chunk_interval,
        )
        .await?;

        if let Some(failure) = sub_session.take_failure() {
            tokio::spawn(watch_recording(
                Arc::downgrade(&self.shared),
                sub_session.id(),
                failure,
            ));
        }
        *slot = Some(sub_session);
        self.shared.recording.store(true, Ordering::Release);
        self.emit(SessionEvent::RecordingStarted);
        Ok(())
    }

    /// Stop voice input. The microphone is released even when closing the
    /// live channel fails; that failure is returned afterwards.
    #[instrument(skip(self), fields(subsystem = "session", component = "recording", op = "stop"))]
    pub async fn stop_recording(&self) -> Result<()> {
        let sub_session = self.shared.sub_session.lock().await.take();
        let Some(sub_session) = sub_session else {
            return Ok(());
        };

        let result = sub_session.stop().await;
        self.shared.recording_ended();

        if let Err(ref e) = result {
            self.record_error(e);
        }
        result
    }

    // =========================================================================
    // SPEECH
    // =========================================================================

    /// Read `text` aloud. Never touches the turn history.
    pub async fn text_to_speech(&self, text: &str) -> Result<()> {
        let result = match (self.speech.as_ref(), self.sink.as_ref()) {
            (Some(speech), Some(sink)) => speech::speak(speech.as_ref(), sink.as_ref(), text)
                .await
                .map(|_| ()),
            _ => Err(Error::Config("Speech output is not configured.".to_string())),
        };
        if let Err(ref e) = result {
            self.record_error(e);
        }
        result
    }
}

/// Tear down a recording that failed on its own: release the microphone,
/// close the channel, return to idle and surface the error.
async fn watch_recording(shared: Weak<Shared>, id: u64, failure: oneshot::Receiver<Error>) {
    // Resolves with an error when the recording is stopped or dropped first
    let Ok(err) = failure.await else {
        return;
    };
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let sub_session = {
        let mut slot = shared.sub_session.lock().await;
        match slot.as_ref() {
            Some(current) if current.id() == id => slot.take(),
            _ => None,
        }
    };
    let Some(sub_session) = sub_session else {
        return;
    };

    warn!(
        subsystem = "session",
        component = "recording",
        error = %err,
        "Recording ended unexpectedly"
    );
    if let Err(e) = sub_session.stop().await {
        debug!(error = %e, "Live channel close after failure");
    }
    shared.recording_ended();
    shared.record_error(&err);
}

/// Oracle request for the current binding: every turn since the binding was
/// created, minus failed exchanges and turns with nothing to send. A failed
/// reply takes the user turn it answered out with it.
fn build_request(binding: &ModelBinding, turns: &[ChatTurn]) -> OracleRequest {
    let window = &turns[binding.history_start.min(turns.len())..];
    let contents = window
        .iter()
        .enumerate()
        .filter(|(i, turn)| !turn.failed && !window.get(i + 1).is_some_and(|next| next.failed))
        .map(|(_, turn)| ChatContent {
            role: turn.role,
            parts: turn.parts(),
        })
        .filter(|content| !content.parts.is_empty())
        .collect();

    OracleRequest {
        model: binding.model.clone(),
        system_instruction: binding.system_instruction.clone(),
        contents,
        response_schema: None,
        thinking_budget: binding.thinking_budget,
    }
}
