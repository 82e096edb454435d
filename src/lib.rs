//! Chat session engine for the StudyWithMe assistant widget.
//!
//! The embedding UI supplies a user identity and renders the conversation
//! log; this crate owns everything in between: the persisted ordered message
//! log, the identity gate, the streaming exchange with the remote model, the
//! chunk-assembly state machine, and the safe text formatter.

pub mod backend;
pub mod client;
pub mod config;
pub mod engine;
pub mod format;
mod logging;
pub mod models;
pub mod profile;
pub mod prompts;
pub mod session;
pub mod storage;
mod utils;

pub use backend::{ChatBackend, ReplyStream};
pub use client::{FAILURE_REPLY, MISSING_KEY_REPLY, SseChatClient};
pub use config::ChatConfig;
pub use engine::{ChatEngine, SendOutcome, UiState};
pub use format::{Node, format};
pub use models::{ChatMessage, ReplyEvent, Role, UserProfile};
pub use profile::{ProfileStore, can_send};
pub use session::{SessionStore, StoreError};
pub use storage::{FileStorage, MemoryStorage, Storage};
