//! Complete Chat use case.
//!
//! Executes one user-turn-to-assistant-turn cycle against a streaming
//! completion backend:
//!
//! 1. Resolve the conversation (find by id, or create and persist a new one)
//! 2. Append the user turn
//! 3. Issue a streaming completion request with the full turn history
//! 4. Accumulate increments, publishing the cumulative reply after each one
//! 5. Append the assistant turn and commit both appends with a single save
//!
//! The user and assistant turns of one cycle are durably recorded together
//! or not at all: a mid-stream failure leaves the store untouched for that
//! cycle, at the cost of the user message being resent on retry.

use crate::ports::completion_client::{
    CompletionError, CompletionRequest, StreamingCompletionClient,
};
use chatcast_domain::{
    Conversation, ConversationConfig, ConversationStore, DomainError, ModelProfile, Role,
    StoreError, StreamEvent, Turn,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that can occur during completion orchestration.
///
/// Each collaborator failure maps to a distinct variant with a stable prefix
/// identifying the phase that failed. None are retried internally.
#[derive(Error, Debug)]
pub enum CompleteChatError {
    #[error("Conversation lookup failed: {0}")]
    LookupFailed(StoreError),

    #[error("Invalid conversation config or content: {0}")]
    InvalidConfig(DomainError),

    #[error("Token budget exceeded: {0}")]
    TokenBudgetExceeded(DomainError),

    #[error("Completion request failed: {0}")]
    CompletionRequestFailed(CompletionError),

    #[error("Completion stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Conversation persistence failed: {0}")]
    PersistenceFailed(StoreError),

    #[error("Output channel closed by consumer")]
    OutputChannelClosed,

    #[error("Operation cancelled")]
    Cancelled,
}

/// Conversation-level parameters supplied when the referenced id is unknown.
///
/// Mirrors [`ConversationConfig`] plus the model profile and the initial
/// system message that seeds a new conversation.
#[derive(Debug, Clone)]
pub struct CompletionConfigInput {
    pub model: String,
    pub model_max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    pub n: u32,
    pub stop: Vec<String>,
    pub max_tokens: u32,
    pub initial_system_message: String,
}

impl CompletionConfigInput {
    fn to_config(&self) -> Result<ConversationConfig, DomainError> {
        Ok(ConversationConfig {
            model: ModelProfile::new(&self.model, self.model_max_tokens)?,
            temperature: self.temperature,
            top_p: self.top_p,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            n: self.n,
            stop: self.stop.clone(),
            max_tokens: self.max_tokens,
        })
    }
}

/// Input for the [`CompleteChatUseCase`].
///
/// `conversation_id: None` always creates a new conversation under a fresh
/// id; `Some(id)` resolves an existing conversation or creates one under the
/// supplied id if it is unknown.
#[derive(Debug, Clone)]
pub struct CompleteChatInput {
    pub conversation_id: Option<String>,
    pub owner_id: String,
    pub user_message: String,
    pub config: CompletionConfigInput,
}

/// One published record of the assistant's reply.
///
/// `content` is the full cumulative text so far, not the delta — downstream
/// consumers render the latest value as the current state of the reply. Each
/// record is an independent immutable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutput {
    pub conversation_id: String,
    pub owner_id: String,
    pub content: String,
}

/// Use case for one streaming chat completion cycle.
///
/// Publishes an intermediate [`CompletionOutput`] to the output channel for
/// every increment received, in order. Publication awaits channel capacity —
/// a slow consumer stalls the orchestrator, it never causes a dropped
/// increment. Exactly one `execute` call owns the channel handle for its
/// duration.
pub struct CompleteChatUseCase {
    store: Arc<dyn ConversationStore>,
    client: Arc<dyn StreamingCompletionClient>,
    output: mpsc::Sender<CompletionOutput>,
    cancellation_token: Option<CancellationToken>,
}

impl CompleteChatUseCase {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        client: Arc<dyn StreamingCompletionClient>,
        output: mpsc::Sender<CompletionOutput>,
    ) -> Self {
        Self {
            store,
            client,
            output,
            cancellation_token: None,
        }
    }

    /// Attach a cancellation token that aborts in-flight collaborator calls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Execute one user-turn-to-assistant-turn cycle.
    ///
    /// Returns the final cumulative reply. Already-published increments stay
    /// visible to the consumer even when a later phase fails.
    pub async fn execute(
        &self,
        input: CompleteChatInput,
    ) -> Result<CompletionOutput, CompleteChatError> {
        self.check_cancelled()?;
        let mut conversation = self.resolve_conversation(&input).await?;

        let user_turn = Turn::new(Role::User, &input.user_message, &conversation.config().model);
        conversation
            .add_turn(user_turn)
            .map_err(map_append_error)?;

        debug!(
            conversation_id = conversation.id(),
            turns = conversation.turns().len(),
            tokens_used = conversation.tokens_used(),
            "Issuing streaming completion request"
        );

        self.check_cancelled()?;
        let request = CompletionRequest::from_conversation(&conversation);
        let mut stream = self
            .client
            .stream_chat(request)
            .await
            .map_err(CompleteChatError::CompletionRequestFailed)?;

        let mut reply = String::new();
        loop {
            let event = match &self.cancellation_token {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => return Err(CompleteChatError::Cancelled),
                    event = stream.recv() => event,
                },
                None => stream.recv().await,
            };
            match event {
                Some(StreamEvent::Delta(chunk)) => {
                    reply.push_str(&chunk);
                    let update = CompletionOutput {
                        conversation_id: conversation.id().to_string(),
                        owner_id: conversation.owner_id().to_string(),
                        content: reply.clone(),
                    };
                    self.output
                        .send(update)
                        .await
                        .map_err(|_| CompleteChatError::OutputChannelClosed)?;
                }
                Some(StreamEvent::Completed) => break,
                Some(StreamEvent::Error(message)) => {
                    warn!(
                        conversation_id = conversation.id(),
                        "Completion stream failed mid-flight: {message}"
                    );
                    return Err(CompleteChatError::StreamInterrupted(message));
                }
                None => {
                    return Err(CompleteChatError::StreamInterrupted(
                        "stream closed before completion".to_string(),
                    ));
                }
            }
        }

        let assistant_turn = Turn::new(Role::Assistant, &reply, &conversation.config().model);
        conversation
            .add_turn(assistant_turn)
            .map_err(map_append_error)?;

        // One save commits the user and assistant appends together
        self.check_cancelled()?;
        self.store
            .save(&conversation)
            .await
            .map_err(CompleteChatError::PersistenceFailed)?;

        info!(
            conversation_id = conversation.id(),
            reply_bytes = reply.len(),
            "Completion cycle finished"
        );

        Ok(CompletionOutput {
            conversation_id: conversation.id().to_string(),
            owner_id: conversation.owner_id().to_string(),
            content: reply,
        })
    }

    /// Resolve the conversation the input references, creating and
    /// persisting a new one when the id is absent or unknown.
    ///
    /// Any lookup failure other than [`StoreError::NotFound`] is fatal to
    /// the call.
    async fn resolve_conversation(
        &self,
        input: &CompleteChatInput,
    ) -> Result<Conversation, CompleteChatError> {
        match &input.conversation_id {
            Some(id) => match self.store.find_by_id(id).await {
                Ok(conversation) => {
                    debug!(conversation_id = id.as_str(), "Resumed existing conversation");
                    Ok(conversation)
                }
                Err(StoreError::NotFound(_)) => self.create_conversation(input, id.clone()).await,
                Err(e) => Err(CompleteChatError::LookupFailed(e)),
            },
            None => {
                self.create_conversation(input, Uuid::new_v4().to_string())
                    .await
            }
        }
    }

    async fn create_conversation(
        &self,
        input: &CompleteChatInput,
        id: String,
    ) -> Result<Conversation, CompleteChatError> {
        let config = input
            .config
            .to_config()
            .map_err(CompleteChatError::InvalidConfig)?;
        let conversation = Conversation::new(
            id,
            &input.owner_id,
            config,
            &input.config.initial_system_message,
        )
        .map_err(CompleteChatError::InvalidConfig)?;

        self.store
            .create(&conversation)
            .await
            .map_err(CompleteChatError::PersistenceFailed)?;

        info!(
            conversation_id = conversation.id(),
            owner_id = conversation.owner_id(),
            model = conversation.config().model.name(),
            "Created new conversation"
        );
        Ok(conversation)
    }

    fn check_cancelled(&self) -> Result<(), CompleteChatError> {
        if let Some(token) = &self.cancellation_token
            && token.is_cancelled()
        {
            return Err(CompleteChatError::Cancelled);
        }
        Ok(())
    }
}

fn map_append_error(error: DomainError) -> CompleteChatError {
    if error.is_budget_exceeded() {
        CompleteChatError::TokenBudgetExceeded(error)
    } else {
        CompleteChatError::InvalidConfig(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::completion_client::CompletionStreamHandle;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ==================== Test Mocks ====================

    #[derive(Default)]
    struct MockStore {
        conversations: Mutex<HashMap<String, Conversation>>,
        create_calls: AtomicUsize,
        save_calls: AtomicUsize,
        fail_find: bool,
        fail_save: bool,
    }

    impl MockStore {
        fn with_conversation(conversation: Conversation) -> Self {
            let store = Self::default();
            store
                .conversations
                .lock()
                .unwrap()
                .insert(conversation.id().to_string(), conversation);
            store
        }

        fn get(&self, id: &str) -> Option<Conversation> {
            self.conversations.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl ConversationStore for MockStore {
        async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.conversations
                .lock()
                .unwrap()
                .insert(conversation.id().to_string(), conversation.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Conversation, StoreError> {
            if self.fail_find {
                return Err(StoreError::Backend("connection refused".to_string()));
            }
            self.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))
        }

        async fn save(&self, conversation: &Conversation) -> Result<u64, StoreError> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            let mut conversations = self.conversations.lock().unwrap();
            let mut saved = conversation.clone();
            saved.set_version(conversation.version() + 1);
            let version = saved.version();
            conversations.insert(saved.id().to_string(), saved);
            Ok(version)
        }
    }

    /// Scripted client: replays a fixed event sequence per request.
    struct MockClient {
        events: Mutex<Vec<StreamEvent>>,
        requests: Mutex<Vec<CompletionRequest>>,
        fail_establish: bool,
        /// Keep the stream open (no terminal event, channel never closed).
        hang_after_events: bool,
    }

    impl MockClient {
        fn new(events: Vec<StreamEvent>) -> Self {
            Self {
                events: Mutex::new(events),
                requests: Mutex::new(Vec::new()),
                fail_establish: false,
                hang_after_events: false,
            }
        }

        fn failing() -> Self {
            let mut client = Self::new(vec![]);
            client.fail_establish = true;
            client
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl StreamingCompletionClient for MockClient {
        async fn stream_chat(
            &self,
            request: CompletionRequest,
        ) -> Result<CompletionStreamHandle, CompletionError> {
            self.requests.lock().unwrap().push(request);
            if self.fail_establish {
                return Err(CompletionError::RequestFailed("HTTP 503".to_string()));
            }
            let events: Vec<StreamEvent> = self.events.lock().unwrap().clone();
            let (tx, rx) = mpsc::channel(8);
            let hang = self.hang_after_events;
            tokio::spawn(async move {
                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                if hang {
                    // Hold the sender open so the stream never terminates
                    std::future::pending::<()>().await;
                }
            });
            Ok(CompletionStreamHandle::new(rx))
        }
    }

    // ==================== Helpers ====================

    fn config_input() -> CompletionConfigInput {
        CompletionConfigInput {
            model: "gpt-4o-mini".to_string(),
            model_max_tokens: 4096,
            temperature: 0.7,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            n: 1,
            stop: vec![],
            max_tokens: 512,
            initial_system_message: "You are helpful.".to_string(),
        }
    }

    fn input(conversation_id: Option<&str>) -> CompleteChatInput {
        CompleteChatInput {
            conversation_id: conversation_id.map(str::to_string),
            owner_id: "owner-1".to_string(),
            user_message: "Say hello".to_string(),
            config: config_input(),
        }
    }

    fn hello_events() -> Vec<StreamEvent> {
        vec![
            StreamEvent::Delta("Hel".to_string()),
            StreamEvent::Delta("lo".to_string()),
            StreamEvent::Completed,
        ]
    }

    fn drain(receiver: &mut mpsc::Receiver<CompletionOutput>) -> Vec<CompletionOutput> {
        let mut outputs = Vec::new();
        while let Ok(output) = receiver.try_recv() {
            outputs.push(output);
        }
        outputs
    }

    fn use_case(
        store: Arc<MockStore>,
        client: Arc<MockClient>,
    ) -> (CompleteChatUseCase, mpsc::Receiver<CompletionOutput>) {
        let (tx, rx) = mpsc::channel(64);
        (CompleteChatUseCase::new(store, client, tx), rx)
    }

    fn existing_conversation(id: &str) -> Conversation {
        let config = CompletionConfigInput::to_config(&config_input()).unwrap();
        Conversation::new(id, "owner-1", config, "You are helpful.").unwrap()
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_unknown_id_creates_conversation_with_system_seed() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, mut rx) = use_case(store.clone(), client.clone());

        let output = use_case.execute(input(Some("conv-1"))).await.unwrap();

        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(output.conversation_id, "conv-1");
        assert_eq!(output.content, "Hello");

        let persisted = store.get("conv-1").unwrap();
        assert_eq!(persisted.turns()[0].role(), Role::System);
        assert_eq!(persisted.turns()[0].content(), "You are helpful.");

        let published: Vec<String> = drain(&mut rx).into_iter().map(|o| o.content).collect();
        assert_eq!(published, vec!["Hel".to_string(), "Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_known_id_skips_create_and_saves_once() {
        let store = Arc::new(MockStore::with_conversation(existing_conversation("conv-1")));
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client.clone());

        use_case.execute(input(Some("conv-1"))).await.unwrap();

        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_absent_id_generates_one() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client.clone());

        let output = use_case.execute(input(None)).await.unwrap();

        assert!(!output.conversation_id.is_empty());
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
        assert!(store.get(&output.conversation_id).is_some());
    }

    #[tokio::test]
    async fn test_final_save_contains_both_turns_of_the_cycle() {
        let store = Arc::new(MockStore::with_conversation(existing_conversation("conv-1")));
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client.clone());

        use_case.execute(input(Some("conv-1"))).await.unwrap();

        let persisted = store.get("conv-1").unwrap();
        let roles: Vec<Role> = persisted.turns().iter().map(|t| t.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(persisted.turns()[1].content(), "Say hello");
        assert_eq!(persisted.turns()[2].content(), "Hello");
    }

    #[tokio::test]
    async fn test_published_content_is_cumulative_and_monotonic() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(vec![
            StreamEvent::Delta("a".to_string()),
            StreamEvent::Delta("bc".to_string()),
            StreamEvent::Delta("d".to_string()),
            StreamEvent::Completed,
        ]));
        let (use_case, mut rx) = use_case(store, client);

        let output = use_case.execute(input(Some("conv-1"))).await.unwrap();
        let published = drain(&mut rx);

        let mut previous_len = 0;
        for record in &published {
            assert!(record.content.len() >= previous_len);
            previous_len = record.content.len();
        }
        assert_eq!(published.last().unwrap().content, output.content);
        assert_eq!(output.content, "abcd");
    }

    #[tokio::test]
    async fn test_lookup_failure_is_fatal_without_side_effects() {
        let mut store = MockStore::default();
        store.fail_find = true;
        let store = Arc::new(store);
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client.clone());

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::LookupFailed(_)));
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_user_message_exceeds_budget() {
        // Ceiling of 8 tokens: system seed costs 4, message below costs 12
        let mut cfg = config_input();
        cfg.model_max_tokens = 8;
        let mut request = input(Some("conv-1"));
        request.user_message = "this message is far too long to fit the budget".to_string();
        request.config = cfg;

        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client.clone());

        let err = use_case.execute(request).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::TokenBudgetExceeded(_)));
        assert_eq!(client.request_count(), 0);
        // The create happened (new conversation), but the cycle never saved
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.get("conv-1").unwrap().turns().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_establishment_failure() {
        let store = Arc::new(MockStore::with_conversation(existing_conversation("conv-1")));
        let client = Arc::new(MockClient::failing());
        let (use_case, _rx) = use_case(store.clone(), client);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::CompletionRequestFailed(_)));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mid_stream_error_leaves_store_untouched() {
        let store = Arc::new(MockStore::with_conversation(existing_conversation("conv-1")));
        let client = Arc::new(MockClient::new(vec![
            StreamEvent::Delta("par".to_string()),
            StreamEvent::Error("connection reset".to_string()),
        ]));
        let (use_case, mut rx) = use_case(store.clone(), client);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::StreamInterrupted(_)));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
        // The existing conversation still holds only its system seed
        assert_eq!(store.get("conv-1").unwrap().turns().len(), 1);
        // Increments published before the failure stay visible
        let published = drain(&mut rx);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].content, "par");
    }

    #[tokio::test]
    async fn test_stream_closed_without_end_marker_is_interrupted() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(vec![StreamEvent::Delta("x".to_string())]));
        let (use_case, _rx) = use_case(store.clone(), client);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::StreamInterrupted(_)));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_consumer_aborts_the_call() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (tx, rx) = mpsc::channel(64);
        let use_case = CompleteChatUseCase::new(store.clone(), client, tx);
        drop(rx);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::OutputChannelClosed));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_request_carries_full_history_and_config() {
        let store = Arc::new(MockStore::with_conversation(existing_conversation("conv-1")));
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store, client.clone());

        use_case.execute(input(Some("conv-1"))).await.unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert!(request.stream);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].role, Role::User);
        assert_eq!(request.messages[1].content, "Say hello");
    }

    #[tokio::test]
    async fn test_persistence_failure_on_save() {
        let mut store = MockStore::default();
        store.fail_save = true;
        let store = Arc::new(store);
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store, client);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();
        assert!(matches!(err, CompleteChatError::PersistenceFailed(_)));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_short_circuits() {
        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (tx, _rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        token.cancel();
        let use_case =
            CompleteChatUseCase::new(store.clone(), client.clone(), tx).with_cancellation(token);

        let err = use_case.execute(input(Some("conv-1"))).await.unwrap_err();

        assert!(matches!(err, CompleteChatError::Cancelled));
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_an_idle_stream() {
        let mut client = MockClient::new(vec![StreamEvent::Delta("He".to_string())]);
        client.hang_after_events = true;
        let store = Arc::new(MockStore::default());
        let client = Arc::new(client);
        let (tx, mut rx) = mpsc::channel(64);
        let token = CancellationToken::new();
        let use_case = CompleteChatUseCase::new(store.clone(), client, tx)
            .with_cancellation(token.clone());

        let handle = tokio::spawn(async move { use_case.execute(input(Some("conv-1"))).await });

        // Wait for the first increment, then cancel the stalled stream
        let first = rx.recv().await.unwrap();
        assert_eq!(first.content, "He");
        token.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, CompleteChatError::Cancelled));
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_on_distinct_ids_stay_isolated() {
        let store = Arc::new(MockStore::default());

        let client_a = Arc::new(MockClient::new(vec![
            StreamEvent::Delta("aaa".to_string()),
            StreamEvent::Completed,
        ]));
        let client_b = Arc::new(MockClient::new(vec![
            StreamEvent::Delta("bbb".to_string()),
            StreamEvent::Completed,
        ]));

        let (tx_a, mut rx_a) = mpsc::channel(64);
        let (tx_b, mut rx_b) = mpsc::channel(64);
        let use_case_a = CompleteChatUseCase::new(store.clone(), client_a, tx_a);
        let use_case_b = CompleteChatUseCase::new(store.clone(), client_b, tx_b);

        let (result_a, result_b) = tokio::join!(
            use_case_a.execute(input(Some("conv-a"))),
            use_case_b.execute(input(Some("conv-b"))),
        );
        let output_a = result_a.unwrap();
        let output_b = result_b.unwrap();

        assert_eq!(output_a.content, "aaa");
        assert_eq!(output_b.content, "bbb");

        let published_a = drain(&mut rx_a);
        let published_b = drain(&mut rx_b);
        assert!(published_a.iter().all(|o| o.conversation_id == "conv-a"));
        assert!(published_b.iter().all(|o| o.conversation_id == "conv-b"));

        assert_eq!(store.get("conv-a").unwrap().turns().len(), 3);
        assert_eq!(store.get("conv-b").unwrap().turns().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_config_on_creation() {
        let mut request = input(Some("conv-1"));
        request.config.n = 0;

        let store = Arc::new(MockStore::default());
        let client = Arc::new(MockClient::new(hello_events()));
        let (use_case, _rx) = use_case(store.clone(), client);

        let err = use_case.execute(request).await.unwrap_err();
        assert!(matches!(err, CompleteChatError::InvalidConfig(_)));
        assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    }
}
