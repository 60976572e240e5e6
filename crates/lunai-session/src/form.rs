//! Generic extraction screen state.
//!
//! One `ExtractionForm<T>` per screen, parameterised by its intent, replaces
//! the request/loading/result/error bookkeeping each screen would otherwise
//! repeat.

use serde::de::DeserializeOwned;
use tracing::debug;

use lunai_core::{ContentPart, Error};
use lunai_inference::{ExtractionClient, ExtractionIntent};

/// Where a form is in its request cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum FormState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed {
        /// Inline message for the user.
        message: String,
        /// Raw oracle reply when the failure was a schema violation.
        raw: Option<String>,
    },
}

impl<T> FormState<T> {
    fn from_error(err: &Error) -> Self {
        FormState::Failed {
            message: err.user_message(),
            raw: err.raw_response().map(str::to_string),
        }
    }
}

/// Request/response state for one extraction screen.
#[derive(Debug)]
pub struct ExtractionForm<T> {
    intent: &'static ExtractionIntent,
    state: FormState<T>,
}

impl<T: DeserializeOwned> ExtractionForm<T> {
    pub fn new(intent: &'static ExtractionIntent) -> Self {
        Self {
            intent,
            state: FormState::Idle,
        }
    }

    pub fn intent(&self) -> &'static ExtractionIntent {
        self.intent
    }

    pub fn state(&self) -> &FormState<T> {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FormState::Loading)
    }

    /// The parsed result, once ready.
    pub fn result(&self) -> Option<&T> {
        match &self.state {
            FormState::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Run one extraction over caller-built parts.
    pub async fn submit(&mut self, client: &ExtractionClient, parts: Vec<ContentPart>) -> &FormState<T> {
        self.state = FormState::Loading;
        debug!(intent = %self.intent.name(), parts = parts.len(), "Form submitted");

        self.state = match client.extract::<T>(self.intent, parts).await {
            Ok(value) => FormState::Ready(value),
            Err(e) => FormState::from_error(&e),
        };
        &self.state
    }

    /// Render the intent's template from field values and submit it as text.
    ///
    /// Media intents still need their binary part; use [`Self::submit`].
    pub async fn submit_fields(
        &mut self,
        client: &ExtractionClient,
        values: &[(&str, &str)],
    ) -> &FormState<T> {
        let text = match self.intent.render(values) {
            Ok(text) => text,
            Err(e) => {
                self.state = FormState::from_error(&e);
                return &self.state;
            }
        };
        self.submit(client, vec![ContentPart::text(text)]).await
    }

    /// Back to idle, discarding any result or error.
    pub fn reset(&mut self) {
        self.state = FormState::Idle;
    }
}
