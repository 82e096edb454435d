//! The seam between the chat engine and a remote model provider.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::models::{ChatMessage, ReplyEvent};

/// Lazy, finite, non-restartable sequence of reply events. Consumed
/// cooperatively: one event handled fully before the next is polled.
pub type ReplyStream = Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>;

/// A provider that can run one streaming exchange with the remote model.
///
/// Implementations must preserve chunk order and exact chunk bytes, and must
/// convert their own failures into content: any error yields a user-facing
/// apology chunk before the terminal event, so callers never see a distinct
/// error path. No internal retry; callers re-invoke with the same history if
/// they want one.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Provider label for logs.
    fn provider_name(&self) -> &'static str;

    /// Open one exchange. `history` excludes the not-yet-created reply;
    /// `new_text` is the raw user input (caller guarantees non-empty).
    async fn stream_reply(
        &self,
        history: &[ChatMessage],
        new_text: &str,
        display_name: &str,
    ) -> ReplyStream;
}
