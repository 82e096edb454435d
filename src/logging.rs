//! Thin logging wrappers so call sites stay terse.
//!
//! The crate only emits `tracing` events; installing a subscriber is the
//! embedding application's job.

pub fn info(msg: impl AsRef<str>) {
    tracing::info!(target: "studybot_chat", "{}", msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    tracing::warn!(target: "studybot_chat", "{}", msg.as_ref());
}

pub fn error(msg: impl AsRef<str>) {
    tracing::error!(target: "studybot_chat", "{}", msg.as_ref());
}
