//! The assembly controller: orchestrates one streaming exchange at a time
//! and materializes the reply message chunk by chunk.
//!
//! Per-send state machine: `Idle -> AwaitingFirstChunk -> Streaming -> Idle`.
//! There is no error state; failed exchanges arrive as content (see
//! `client`) and merge back to `Idle` like any other termination.

use futures_util::StreamExt;

use crate::backend::ChatBackend;
use crate::client::SseChatClient;
use crate::config::ChatConfig;
use crate::logging;
use crate::models::{ChatMessage, ReplyEvent, UserProfile};
use crate::profile::{self, ProfileStore};
use crate::session::SessionStore;
use crate::storage::FileStorage;

/// Result of a submit attempt. Only `Completed` consumed the input; for the
/// rejected outcomes the caller keeps the user's typed draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange ran to its terminal event.
    Completed,
    /// Blank input, nothing to do.
    EmptyInput,
    /// An exchange is already in flight; at most one runs at a time.
    Busy,
    /// No usable identity; the caller should surface the profile entry UI.
    IdentityRequired,
}

/// UI-state flags exposed to the render sink. Display-only; the UI never
/// mutates the log directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiState {
    /// True from submission until the first chunk arrives.
    pub loading: bool,
    /// True while the reply message is growing.
    pub streaming: bool,
    /// Id of the message currently being grown, if one exists yet.
    pub target_message_id: Option<String>,
}

enum Phase {
    Idle,
    AwaitingFirstChunk,
    Streaming { target: String },
}

/// The chat session engine.
pub struct ChatEngine {
    store: SessionStore,
    backend: Box<dyn ChatBackend>,
    profile: Option<UserProfile>,
    phase: Phase,
}

impl ChatEngine {
    pub fn new(
        store: SessionStore,
        backend: Box<dyn ChatBackend>,
        profile: Option<UserProfile>,
    ) -> Self {
        logging::info(format!("Chat engine using backend: {}", backend.provider_name()));
        Self {
            store,
            backend,
            profile,
            phase: Phase::Idle,
        }
    }

    /// Wire up the engine from configuration: file-backed records under the
    /// data directory, the persisted profile, and the SSE client.
    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Self {
        let profile = ProfileStore::new(Box::new(FileStorage::new(&config.data_dir))).load();
        let display_name = profile.as_ref().map(|p| p.display_name.as_str());
        let store = SessionStore::open(
            Box::new(FileStorage::new(&config.data_dir)),
            display_name,
        );
        Self::new(store, Box::new(SseChatClient::new(config)), profile)
    }

    // === Render sink ===

    /// The live conversation log, in display order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    #[must_use]
    pub fn ui_state(&self) -> UiState {
        match &self.phase {
            Phase::Idle => UiState::default(),
            Phase::AwaitingFirstChunk => UiState {
                loading: true,
                ..UiState::default()
            },
            Phase::Streaming { target } => UiState {
                streaming: true,
                target_message_id: Some(target.clone()),
                ..UiState::default()
            },
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Replace the identity wholesale (editing the profile replaces the
    /// value; persistence is the profile store's job).
    pub fn set_profile(&mut self, profile: Option<UserProfile>) {
        self.profile = profile;
    }

    // === Commands ===

    /// Submit user input and drain the resulting exchange to its terminal
    /// event. Rejected submissions leave the log and input untouched.
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        self.send_with(input, |_, _| {}).await
    }

    /// Like [`send`](Self::send), but invokes `on_update` after every log or
    /// flag mutation so the render sink can redraw mid-stream.
    pub async fn send_with<F>(&mut self, input: &str, mut on_update: F) -> SendOutcome
    where
        F: FnMut(&[ChatMessage], UiState),
    {
        if input.trim().is_empty() {
            return SendOutcome::EmptyInput;
        }
        if !matches!(self.phase, Phase::Idle) {
            return SendOutcome::Busy;
        }
        if !profile::can_send(self.profile.as_ref()) {
            return SendOutcome::IdentityRequired;
        }
        let display_name = self
            .profile
            .as_ref()
            .map(|p| p.display_name.clone())
            .unwrap_or_default();

        // Snapshot the history before the user message lands in the log:
        // the remote expects the new text separate from its context.
        let history = self.store.messages().to_vec();
        self.store.append(ChatMessage::user(input));
        self.phase = Phase::AwaitingFirstChunk;
        on_update(self.store.messages(), self.ui_state());

        let mut stream = self
            .backend
            .stream_reply(&history, input, &display_name)
            .await;
        while let Some(event) = stream.next().await {
            let keep_going = self.apply(event);
            on_update(self.store.messages(), self.ui_state());
            if !keep_going {
                break;
            }
        }

        // A stream that ends without a terminal event still merges to Idle.
        self.phase = Phase::Idle;
        SendOutcome::Completed
    }

    /// Empty the log and its persisted record. Only available while idle;
    /// the welcome message is re-seeded on the next load, not here.
    pub fn clear_history(&mut self) -> bool {
        if !matches!(self.phase, Phase::Idle) {
            return false;
        }
        self.store.clear();
        true
    }

    // === Chunk loop ===

    /// Fold one stream event into the session. Returns false once the
    /// exchange is over and remaining events should be discarded.
    fn apply(&mut self, event: ReplyEvent) -> bool {
        match event {
            ReplyEvent::Chunk(text) => match &self.phase {
                Phase::AwaitingFirstChunk => {
                    let message = ChatMessage::assistant(text);
                    let target = message.id.clone();
                    self.store.append(message);
                    self.phase = Phase::Streaming { target };
                    true
                }
                Phase::Streaming { target } => {
                    let target = target.clone();
                    match self.store.append_to_last(&target, &text) {
                        Ok(()) => true,
                        Err(e) => {
                            // Stale stream target means a logic bug upstream;
                            // abort this exchange, keep the log intact.
                            logging::error(format!("Aborting exchange: {e}"));
                            self.phase = Phase::Idle;
                            false
                        }
                    }
                }
                Phase::Idle => false,
            },
            ReplyEvent::Done => {
                self.phase = Phase::Idle;
                false
            }
            ReplyEvent::Failed(reason) => {
                logging::warn(format!("Exchange ended early: {reason}"));
                self.phase = Phase::Idle;
                false
            }
        }
    }
}
