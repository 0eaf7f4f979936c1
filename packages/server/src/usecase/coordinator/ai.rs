//! Single-flight AI dispatch.
//!
//! At most one completion is in flight per room. The request runs on a
//! spawned task and its result comes back as `RoomEvent::CompletionFinished`,
//! so the room keeps serving events meanwhile. The busy flag is cleared when
//! that event is handled, whatever the outcome, including a panicking client.

use std::{panic::AssertUnwindSafe, sync::Arc};

use futures_util::FutureExt;

use crate::domain::{Artifact, ChatEntry, CompletionError, ConnectionId, DisplayName};

use super::{CompletionPurpose, RoomCoordinator, RoomEvent};

const BASE_INSTRUCTION: &str = "You are an AI assistant taking part in a shared chat room. \
    Several people read your answers, so be concise and refer to people by name when useful.";

pub(super) const THINKING_NOTICE: &str = "AI is thinking...";
pub(super) const BUSY_NOTICE: &str = "AI is busy with another request, please wait.";

impl RoomCoordinator {
    /// Start a completion unless one is already running.
    ///
    /// While busy the requester alone is told to wait; nothing is queued.
    pub(super) fn dispatch_completion(
        &mut self,
        requester: ConnectionId,
        user_prompt: String,
        purpose: CompletionPurpose,
    ) {
        if self.ai_busy {
            self.notify(&requester, BUSY_NOTICE);
            return;
        }
        self.ai_busy = true;
        self.broadcast_notice(THINKING_NOTICE);

        let system_prompt = self.system_prompt();
        let client = Arc::clone(&self.services.completion);
        let mailbox = self.mailbox.clone();
        let room = self.room.clone();
        tokio::spawn(async move {
            // A panicking client still reports back, so the busy flag is released
            let result = AssertUnwindSafe(async {
                client.complete(&system_prompt, &user_prompt).await
            })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!("AI client panicked in room '{}'", room);
                Err(CompletionError::Crashed)
            });
            if mailbox
                .send(RoomEvent::CompletionFinished { purpose, result })
                .is_err()
            {
                tracing::warn!("Room '{}' closed before the AI reply arrived", room);
            }
        });
    }

    /// Base instruction, pinned memory and the most recent history, oldest first
    pub(super) fn system_prompt(&self) -> String {
        let mut prompt = String::from(BASE_INSTRUCTION);
        prompt.push_str("\n\n");
        prompt.push_str(&self.pinned.format());
        prompt.push_str("\n\nRecent conversation:\n");
        let recent = self.history.recent(self.services.config.ai_context_entries);
        let mut any = false;
        for entry in recent {
            prompt.push_str(&format!("{}: {}\n", entry.user, entry.text));
            any = true;
        }
        if !any {
            prompt.push_str("(no messages yet)\n");
        }
        prompt
    }

    pub(super) fn on_completion_finished(
        &mut self,
        purpose: CompletionPurpose,
        result: Result<String, CompletionError>,
    ) {
        self.ai_busy = false;

        let text = result.and_then(|text| {
            let text = text.trim();
            if text.is_empty() {
                Err(CompletionError::EmptyResponse)
            } else {
                Ok(text.to_string())
            }
        });
        let text = match text {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("AI request failed in room '{}': {}", self.room, e);
                self.broadcast_notice(&format!("AI error: {e}"));
                return;
            }
        };

        match purpose {
            CompletionPurpose::ChatReply => {
                let entry = ChatEntry {
                    user: DisplayName::ai().into_string(),
                    text,
                    ts: self.now(),
                };
                self.append_and_broadcast(entry);
            }
            CompletionPurpose::Artifact {
                artifact_type,
                title,
                created_by,
            } => {
                let artifact = Artifact::new(artifact_type, title, text, self.now(), created_by);
                self.store_artifact(artifact);
            }
        }
    }
}
