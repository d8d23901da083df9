use crate::chat::input::{Draft, VoiceCapture};
use crate::chat::resolver::{ResolveError, ResponseResolver};
use crate::chat::transcript::Transcript;
use crate::session::store::{DeleteOutcome, SessionStore};
use crate::session::{Conversation, Message, Role};
use std::sync::Arc;

pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";
pub const VOICE_UNSUPPORTED_NOTICE: &str =
    "Speech recognition is not supported on this platform.";

pub const QUICK_PROMPTS: &[&str] = &[
    "Explain Newton's laws of motion",
    "What is quantum mechanics?",
    "How does special relativity work?",
    "Explain the laws of thermodynamics",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    /// The prompt is recorded and waits to be handed to the resolver.
    Sending,
    /// The resolver has the prompt.
    Responding,
}

/// A prompt waiting on the resolver. The reply goes to `conversation_id`
/// even if the user has switched conversations in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResponse {
    pub request_id: u64,
    pub conversation_id: String,
    pub prompt: String,
}

pub struct ChatController {
    store: SessionStore,
    resolver: Arc<dyn ResponseResolver>,
    active_id: Option<String>,
    transcript: Transcript,
    draft: Draft,
    phase: ChatPhase,
    pending: Option<PendingResponse>,
    next_request_id: u64,
    notice: Option<String>,
}

impl ChatController {
    pub fn new(store: SessionStore, resolver: Arc<dyn ResponseResolver>) -> Self {
        Self {
            store,
            resolver,
            active_id: None,
            transcript: Transcript::default(),
            draft: Draft::default(),
            phase: ChatPhase::Idle,
            pending: None,
            next_request_id: 1,
            notice: None,
        }
    }

    /// Activates the most recent conversation, creating one on an empty store.
    pub fn start(&mut self) {
        match self.store.most_recent().map(|c| c.id.clone()) {
            Some(id) => {
                self.switch_conversation(&id);
            }
            None => {
                self.new_conversation();
            }
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.store.conversations()
    }

    #[cfg(test)]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id
            .as_deref()
            .and_then(|id| self.store.find_by_id(id))
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == ChatPhase::Idle
    }

    pub fn resolver(&self) -> Arc<dyn ResponseResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn new_conversation(&mut self) -> String {
        let id = self.store.create();
        tracing::info!(conversation_id = %id, "created conversation");
        self.activate(id.clone());
        id
    }

    /// Returns `false` when `id` is unknown; the current view is kept.
    pub fn switch_conversation(&mut self, id: &str) -> bool {
        if self.store.find_by_id(id).is_none() {
            return false;
        }
        self.activate(id.to_string());
        true
    }

    pub fn delete_conversation(&mut self, id: &str) {
        let DeleteOutcome::Deleted { next_active } = self.store.delete(id) else {
            return;
        };
        tracing::info!(conversation_id = %id, "deleted conversation");

        if self.active_id.as_deref() != Some(id) {
            return;
        }
        match next_active {
            Some(next) => self.activate(next),
            None => {
                self.new_conversation();
            }
        }
    }

    /// Validates and records a prompt. Returns the request the caller must
    /// resolve and hand back to [`Self::finish_response`], or `None` when the
    /// input is blank or a response is already outstanding.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingResponse> {
        let prompt = text.trim();
        if prompt.is_empty() || !self.is_idle() {
            return None;
        }

        if self.active_conversation().is_none() {
            self.new_conversation();
        }
        let conversation_id = self.active_id.clone()?;

        self.store.append(&conversation_id, prompt, Role::User);
        if let Some(message) = self.last_message(&conversation_id) {
            self.transcript.push_message(&message);
        }

        let pending = PendingResponse {
            request_id: self.next_request_id,
            conversation_id,
            prompt: prompt.to_string(),
        };
        self.next_request_id += 1;
        self.pending = Some(pending.clone());
        self.phase = ChatPhase::Sending;
        self.transcript.set_typing(true);

        Some(pending)
    }

    /// Records that the resolver was invoked for `request_id`. Returns `false`
    /// unless that request is outstanding and still in [`ChatPhase::Sending`].
    pub fn mark_responding(&mut self, request_id: u64) -> bool {
        let outstanding = self
            .pending
            .as_ref()
            .is_some_and(|p| p.request_id == request_id);
        if !outstanding || self.phase != ChatPhase::Sending {
            return false;
        }
        self.phase = ChatPhase::Responding;
        tracing::debug!(request_id, "awaiting response");
        true
    }

    /// Submits the composer text, clearing it only if the prompt was accepted.
    pub fn submit_draft(&mut self) -> Option<PendingResponse> {
        let text = self.draft.text().to_string();
        let pending = self.begin_submit(&text)?;
        self.draft.clear();
        Some(pending)
    }

    pub fn submit_quick_prompt(&mut self, prompt: &str) -> Option<PendingResponse> {
        if !self.is_idle() {
            return None;
        }
        self.draft.set(prompt);
        self.submit_draft()
    }

    /// Applies a resolver result. Results for anything but the outstanding
    /// request are dropped and `false` is returned.
    pub fn finish_response(
        &mut self,
        request_id: u64,
        result: Result<String, ResolveError>,
    ) -> bool {
        let Some(pending) = self.pending.take_if(|p| p.request_id == request_id) else {
            tracing::debug!(request_id, "ignoring stale response");
            return false;
        };
        let is_active = self.active_id.as_deref() == Some(pending.conversation_id.as_str());

        match result {
            Ok(reply) => {
                self.store
                    .append(&pending.conversation_id, reply, Role::Assistant);
                if is_active {
                    if let Some(message) = self.last_message(&pending.conversation_id) {
                        self.transcript.push_message(&message);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(request_id, "response failed: {err}");
                if is_active {
                    self.transcript.push_error(ERROR_MESSAGE);
                }
            }
        }

        self.transcript.set_typing(false);
        self.phase = ChatPhase::Idle;
        true
    }

    /// Runs a whole submission on the current task.
    #[cfg(test)]
    pub async fn submit(&mut self, text: &str) -> bool {
        let Some(pending) = self.begin_submit(text) else {
            return false;
        };
        self.mark_responding(pending.request_id);
        let result = self.resolver.resolve(&pending.prompt).await;
        self.finish_response(pending.request_id, result)
    }

    pub fn start_voice_input(&mut self, capture: &mut dyn VoiceCapture) {
        if !capture.is_supported() {
            self.notice = Some(VOICE_UNSUPPORTED_NOTICE.to_string());
            return;
        }
        match capture.start() {
            Ok(()) => self.draft.set_recording(true),
            Err(err) => self.draft.voice_failed(&err),
        }
    }

    /// Feeds a finished recognition result into the draft.
    pub fn poll_voice(&mut self, capture: &mut dyn VoiceCapture) {
        if !self.draft.is_recording() {
            return;
        }
        match capture.poll_transcript() {
            Some(Ok(transcript)) => self.draft.apply_transcript(&transcript),
            Some(Err(err)) => self.draft.voice_failed(&err),
            None => {}
        }
    }

    pub fn attach_file(&mut self, name: &str, size_bytes: u64) {
        self.draft.attach(name, size_bytes);
    }

    fn activate(&mut self, id: String) {
        self.active_id = Some(id);
        self.render_active();
    }

    fn render_active(&mut self) {
        self.transcript.clear();
        let Some(messages) = self.active_conversation().map(|c| c.messages.clone()) else {
            return;
        };
        if messages.is_empty() {
            self.transcript.show_welcome(QUICK_PROMPTS);
        } else {
            for message in &messages {
                self.transcript.push_message(message);
            }
        }

        let awaiting_here = self
            .pending
            .as_ref()
            .is_some_and(|p| Some(p.conversation_id.as_str()) == self.active_id.as_deref());
        self.transcript.set_typing(awaiting_here);
    }

    fn last_message(&self, conversation_id: &str) -> Option<Message> {
        self.store
            .find_by_id(conversation_id)
            .and_then(|c| c.messages.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::input::{NoVoiceCapture, VoiceError};
    use crate::chat::resolver::KeywordResolver;
    use crate::chat::transcript::TranscriptEntry;
    use crate::session::storage::{MemoryStorage, Storage};
    use crate::session::store;
    use async_trait::async_trait;

    struct FailingResolver;

    #[async_trait]
    impl ResponseResolver for FailingResolver {
        async fn resolve(&self, _prompt: &str) -> Result<String, ResolveError> {
            Err(ResolveError::Backend("offline".to_string()))
        }
    }

    fn controller_with(resolver: Arc<dyn ResponseResolver>) -> (ChatController, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = SessionStore::open(Box::new(storage.clone()));
        let mut controller = ChatController::new(store, resolver);
        controller.start();
        (controller, storage)
    }

    fn controller() -> (ChatController, MemoryStorage) {
        controller_with(Arc::new(KeywordResolver::new()))
    }

    #[test]
    fn start_on_empty_store_creates_conversation_with_welcome() {
        let (controller, _) = controller();
        assert_eq!(controller.conversations().len(), 1);
        assert!(controller.active_id().is_some());
        assert!(controller.transcript().shows_welcome());
    }

    #[test]
    fn start_activates_most_recent_existing_conversation() {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::open(Box::new(storage.clone()));
        store.create();
        let newest = store.create();

        let mut controller = ChatController::new(store, Arc::new(KeywordResolver::new()));
        controller.start();
        assert_eq!(controller.active_id(), Some(newest.as_str()));
        assert_eq!(controller.conversations().len(), 2);
    }

    #[test]
    fn start_over_newer_schema_keeps_the_original_record() {
        let mut storage = MemoryStorage::new();
        let newer = r#"{"schemaVersion": 2, "conversations": [{"id": "keep-me", "title": "Kept", "messages": [], "createdAt": "2024-03-01T09:59:58.000Z"}]}"#;
        storage
            .write(store::CONVERSATIONS_KEY, newer)
            .expect("write should succeed");

        let session_store = SessionStore::open(Box::new(storage.clone()));
        let mut controller = ChatController::new(session_store, Arc::new(KeywordResolver::new()));
        controller.start();

        assert_eq!(controller.conversations().len(), 1);
        assert_ne!(controller.active_id(), Some("keep-me"));
        assert_eq!(
            storage
                .read(&store::backup_key(2))
                .expect("read should succeed")
                .as_deref(),
            Some(newer)
        );
    }

    #[tokio::test]
    async fn quantum_question_scenario() {
        let (mut controller, storage) = controller();

        assert!(controller.submit("What is quantum mechanics?").await);

        let conversation = controller
            .active_conversation()
            .expect("active conversation should exist");
        assert_eq!(conversation.title, "What is quantum mechanics?");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[1].role, Role::Assistant);
        assert_eq!(
            conversation.messages[1].content,
            KeywordResolver::new().lookup("quantum")
        );
        assert_eq!(controller.transcript().message_count(), 2);
        assert!(controller.is_idle());

        let persisted = store::load(&storage);
        assert_eq!(persisted[0].messages.len(), 2);
    }

    #[test]
    fn blank_input_is_ignored() {
        let (mut controller, _) = controller();
        assert!(controller.begin_submit("   \n").is_none());
        assert!(controller.is_idle());
        assert!(controller.transcript().shows_welcome());
    }

    #[test]
    fn second_submission_is_rejected_while_responding() {
        let (mut controller, _) = controller();
        let first = controller
            .begin_submit("What is momentum?")
            .expect("first submission should be accepted");
        assert_eq!(controller.phase(), ChatPhase::Sending);
        assert!(controller.transcript().is_typing());

        assert!(controller.begin_submit("And energy?").is_none());
        assert_eq!(
            controller
                .active_conversation()
                .expect("active conversation should exist")
                .messages
                .len(),
            1
        );

        assert!(controller.finish_response(first.request_id, Ok("p = mv".to_string())));
        assert!(controller.is_idle());
        assert!(controller.begin_submit("And energy?").is_some());
    }

    #[test]
    fn stale_response_is_ignored() {
        let (mut controller, _) = controller();
        let pending = controller
            .begin_submit("gravity")
            .expect("submission should be accepted");
        assert!(controller.mark_responding(pending.request_id));
        assert!(!controller.finish_response(pending.request_id + 1, Ok("late".to_string())));
        assert_eq!(controller.phase(), ChatPhase::Responding);
    }

    #[test]
    fn submission_is_sending_until_the_resolver_is_invoked() {
        let (mut controller, _) = controller();
        let pending = controller
            .begin_submit("What is torque?")
            .expect("submission should be accepted");
        assert_eq!(controller.phase(), ChatPhase::Sending);
        assert_eq!(
            controller
                .active_conversation()
                .expect("active conversation should exist")
                .messages
                .len(),
            1
        );

        assert!(!controller.mark_responding(pending.request_id + 1));
        assert_eq!(controller.phase(), ChatPhase::Sending);

        assert!(controller.mark_responding(pending.request_id));
        assert_eq!(controller.phase(), ChatPhase::Responding);
        assert!(!controller.mark_responding(pending.request_id));

        assert!(controller.finish_response(pending.request_id, Ok("r x F".to_string())));
        assert!(controller.is_idle());
        assert!(!controller.mark_responding(pending.request_id));
    }

    #[tokio::test]
    async fn resolver_failure_renders_error_without_persisting_it() {
        let (mut controller, storage) = controller_with(Arc::new(FailingResolver));

        assert!(controller.submit("Explain waves").await);

        assert!(controller.is_idle());
        assert!(matches!(
            controller.transcript().entries().last(),
            Some(TranscriptEntry::Error { text }) if text == ERROR_MESSAGE
        ));
        let persisted = store::load(&storage);
        assert_eq!(persisted[0].messages.len(), 1);
        assert_eq!(persisted[0].messages[0].role, Role::User);
    }

    #[test]
    fn reply_lands_in_origin_conversation_after_switch() {
        let (mut controller, _) = controller();
        let origin = controller
            .active_id()
            .expect("active conversation should exist")
            .to_string();
        let pending = controller
            .begin_submit("What is energy?")
            .expect("submission should be accepted");

        let other = controller.new_conversation();
        assert!(!controller.transcript().is_typing());
        controller.finish_response(pending.request_id, Ok("Energy is...".to_string()));

        let origin_conversation = controller
            .store()
            .find_by_id(&origin)
            .expect("origin should exist");
        assert_eq!(origin_conversation.messages.len(), 2);
        assert_eq!(controller.active_id(), Some(other.as_str()));
        assert!(controller.transcript().shows_welcome());
    }

    #[test]
    fn switch_renders_messages_in_order() {
        let (mut controller, _) = controller();
        let first = controller
            .active_id()
            .expect("active conversation should exist")
            .to_string();
        let pending = controller
            .begin_submit("**Bold** question")
            .expect("submission should be accepted");
        controller.finish_response(pending.request_id, Ok("Answer".to_string()));
        controller.new_conversation();

        assert!(controller.switch_conversation(&first));
        let roles: Vec<Role> = controller
            .transcript()
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Message { role, .. } => Some(*role),
                _ => None,
            })
            .collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn switch_to_unknown_conversation_keeps_current_one() {
        let (mut controller, _) = controller();
        let active = controller.active_id().map(str::to_string);
        assert!(!controller.switch_conversation("missing"));
        assert_eq!(controller.active_id().map(str::to_string), active);
    }

    #[test]
    fn deleting_active_conversation_activates_most_recent_remaining() {
        let (mut controller, _) = controller();
        let older = controller
            .active_id()
            .expect("active conversation should exist")
            .to_string();
        let newer = controller.new_conversation();

        controller.delete_conversation(&newer);
        assert_eq!(controller.active_id(), Some(older.as_str()));
        assert!(controller.store().find_by_id(&newer).is_none());
    }

    #[test]
    fn deleting_last_conversation_creates_a_fresh_one() {
        let (mut controller, _) = controller();
        let only = controller
            .active_id()
            .expect("active conversation should exist")
            .to_string();

        controller.delete_conversation(&only);
        assert_eq!(controller.conversations().len(), 1);
        let active = controller.active_id().expect("a conversation should be active");
        assert_ne!(active, only);
        assert!(controller.store().find_by_id(active).is_some());
    }

    #[test]
    fn deleting_inactive_conversation_keeps_active_one() {
        let (mut controller, _) = controller();
        let older = controller
            .active_id()
            .expect("active conversation should exist")
            .to_string();
        let newer = controller.new_conversation();

        controller.delete_conversation(&older);
        assert_eq!(controller.active_id(), Some(newer.as_str()));
        assert_eq!(controller.conversations().len(), 1);
    }

    #[test]
    fn quick_prompt_submits_like_typed_input() {
        let (mut controller, _) = controller();
        let pending = controller
            .submit_quick_prompt(QUICK_PROMPTS[0])
            .expect("quick prompt should submit");
        assert_eq!(pending.prompt, QUICK_PROMPTS[0]);
        assert!(controller.draft().text().is_empty());
        assert_eq!(
            controller
                .active_conversation()
                .expect("active conversation should exist")
                .title,
            crate::session::derive_title(QUICK_PROMPTS[0])
        );
    }

    #[test]
    fn rejected_draft_is_kept() {
        let (mut controller, _) = controller();
        controller
            .begin_submit("first")
            .expect("first submission should be accepted");
        controller.draft_mut().set("second");
        assert!(controller.submit_draft().is_none());
        assert_eq!(controller.draft().text(), "second");
    }

    #[test]
    fn unsupported_voice_input_raises_notice_only() {
        let (mut controller, _) = controller();
        controller.start_voice_input(&mut NoVoiceCapture);
        assert_eq!(controller.notice(), Some(VOICE_UNSUPPORTED_NOTICE));
        assert!(!controller.draft().is_recording());
        assert!(controller.transcript().shows_welcome());

        controller.dismiss_notice();
        assert!(controller.notice().is_none());
    }

    struct ScriptedVoice {
        fail: bool,
        result: Option<Result<String, VoiceError>>,
    }

    impl ScriptedVoice {
        fn hearing(transcript: &str) -> Self {
            Self {
                fail: false,
                result: Some(Ok(transcript.to_string())),
            }
        }
    }

    impl VoiceCapture for ScriptedVoice {
        fn is_supported(&self) -> bool {
            true
        }

        fn start(&mut self) -> Result<(), VoiceError> {
            if self.fail {
                Err(VoiceError::new("not-allowed"))
            } else {
                Ok(())
            }
        }

        fn poll_transcript(&mut self) -> Option<Result<String, VoiceError>> {
            self.result.take()
        }
    }

    #[test]
    fn voice_transcript_populates_draft() {
        let (mut controller, _) = controller();
        let mut voice = ScriptedVoice::hearing("what is a photon");
        controller.start_voice_input(&mut voice);
        assert!(controller.draft().is_recording());

        controller.poll_voice(&mut voice);
        assert!(!controller.draft().is_recording());
        assert_eq!(controller.draft().text(), "what is a photon");

        controller.poll_voice(&mut voice);
        assert_eq!(controller.draft().text(), "what is a photon");
    }

    #[test]
    fn voice_is_not_polled_while_idle() {
        let (mut controller, _) = controller();
        let mut voice = ScriptedVoice::hearing("ignored");
        controller.poll_voice(&mut voice);
        assert!(controller.draft().text().is_empty());
        assert!(voice.result.is_some());
    }

    #[test]
    fn voice_recognition_error_stops_recording_and_keeps_draft() {
        let (mut controller, _) = controller();
        controller.draft_mut().set("draft");
        let mut voice = ScriptedVoice {
            fail: false,
            result: Some(Err(VoiceError::new("no-speech"))),
        };
        controller.start_voice_input(&mut voice);
        controller.poll_voice(&mut voice);
        assert!(!controller.draft().is_recording());
        assert_eq!(controller.draft().text(), "draft");
        assert!(controller.notice().is_none());
    }

    #[test]
    fn voice_start_failure_is_not_a_chat_error() {
        let (mut controller, _) = controller();
        controller.start_voice_input(&mut ScriptedVoice {
            fail: true,
            result: None,
        });
        assert!(!controller.draft().is_recording());
        assert!(controller.notice().is_none());
        assert!(controller.transcript().shows_welcome());
    }

    #[test]
    fn attach_file_appends_placeholder_to_draft() {
        let (mut controller, _) = controller();
        controller.attach_file("notes.pdf", 300);
        assert_eq!(controller.draft().text(), "[Attached: notes.pdf (300 B)]");
    }
}
