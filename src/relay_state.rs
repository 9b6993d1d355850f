use crate::config::RelayConfig;
use crate::error::{RelayError, RequestError};
use crate::history::{ConversationStore, SessionId};
use crate::io_struct::{ImagePayload, Message};
use crate::providers::SharedProviderHandler;
use crate::providers::gemini::GeminiHandler;
use crate::providers::groq::GroqHandler;
use crate::providers::openrouter::OpenRouterHandler;
use crate::providers::xai::XaiHandler;
use crate::registry;
use crate::relay::{self, ChunkStream};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct RelayState {
    pub store: ConversationStore,
    pub log_interval: u64,
    handlers: Arc<HashMap<&'static str, SharedProviderHandler>>,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;
        let creds = &config.credentials;
        let mut handlers: HashMap<&'static str, SharedProviderHandler> = HashMap::new();
        handlers.insert(
            "llama-3.3-70b",
            Arc::new(GroqHandler::new(client.clone(), creds.groq.clone())),
        );
        handlers.insert(
            "xai-grok",
            Arc::new(XaiHandler::new(client.clone(), creds.xai.clone())),
        );
        handlers.insert(
            "gemini-2.0-flash-exp",
            Arc::new(GeminiHandler::new(client.clone(), creds.gemini.clone())),
        );
        handlers.insert(
            "learnlm",
            Arc::new(OpenRouterHandler::new(client, creds.openrouter.clone())),
        );
        let mut state = Self::with_handlers(
            ConversationStore::new(Some(config.max_history)),
            handlers,
        );
        state.log_interval = config.log_interval;
        Ok(state)
    }

    /// Build a state over an explicit handler table. Tests use this to
    /// substitute fakes for the remote providers.
    pub fn with_handlers(
        store: ConversationStore,
        handlers: HashMap<&'static str, SharedProviderHandler>,
    ) -> Self {
        RelayState {
            store,
            log_interval: 60,
            handlers: Arc::new(handlers),
        }
    }

    pub fn model_ids(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// One chat turn: validate, record the user message, call the resolved
    /// provider over the full history, record the reply, and hand the text
    /// to the relay. Validation happens before any store mutation; a failed
    /// provider call appends no assistant message. The session lock is held
    /// across the provider call so same-session turns serialize.
    pub async fn dispatch(
        &self,
        session_id: &SessionId,
        model_id: &str,
        user_text: &str,
        image: Option<ImagePayload>,
    ) -> Result<ChunkStream, RelayError> {
        if user_text.trim().is_empty() {
            return Err(RequestError::EmptyMessage.into());
        }
        let model = registry::find_model(model_id).ok_or_else(|| RequestError::UnknownModel {
            model: model_id.to_string(),
        })?;
        let handler = self
            .handlers
            .get(model.id)
            .ok_or_else(|| RequestError::UnknownModel {
                model: model_id.to_string(),
            })?
            .clone();
        if image.is_some() && !model.supports_images {
            return Err(RequestError::UnsupportedImage {
                model: model_id.to_string(),
            }
            .into());
        }

        let session = self.store.session(session_id);
        let mut messages = session.lock().await;
        self.store.append_locked(
            &mut messages,
            Message::user(user_text).with_image(image.clone()),
        );
        log::info!(
            "dispatching session={} model={} history={}",
            session_id,
            model.id,
            messages.len()
        );
        match handler.handle(&messages, image.as_ref()).await {
            Ok(text) => {
                self.store
                    .append_locked(&mut messages, Message::assistant(&text));
                Ok(relay::relay(text))
            }
            Err(err) => {
                log::error!(
                    "provider call failed for session={} model={}: {}",
                    session_id,
                    model.id,
                    err
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderCredentials;
    use crate::error::{ProviderError, ProviderResult};
    use crate::io_struct::Role;
    use crate::providers::ProviderHandler;
    use async_trait::async_trait;
    use futures::StreamExt;

    struct EchoHandler {
        reply: String,
    }

    #[async_trait]
    impl ProviderHandler for EchoHandler {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn handle(
            &self,
            _messages: &[Message],
            _image: Option<&ImagePayload>,
        ) -> ProviderResult<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl ProviderHandler for FailingHandler {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn handle(
            &self,
            _messages: &[Message],
            _image: Option<&ImagePayload>,
        ) -> ProviderResult<String> {
            Err(ProviderError::InvalidResponseShape {
                provider: self.name(),
            })
        }
    }

    fn echo_state(reply: &str) -> RelayState {
        let mut handlers: HashMap<&'static str, SharedProviderHandler> = HashMap::new();
        handlers.insert(
            "llama-3.3-70b",
            Arc::new(EchoHandler {
                reply: reply.to_string(),
            }),
        );
        handlers.insert(
            "gemini-2.0-flash-exp",
            Arc::new(EchoHandler {
                reply: reply.to_string(),
            }),
        );
        RelayState::with_handlers(ConversationStore::new(None), handlers)
    }

    fn failing_state() -> RelayState {
        let mut handlers: HashMap<&'static str, SharedProviderHandler> = HashMap::new();
        handlers.insert("llama-3.3-70b", Arc::new(FailingHandler) as SharedProviderHandler);
        RelayState::with_handlers(ConversationStore::new(None), handlers)
    }

    async fn collect(stream: ChunkStream) -> String {
        let chunks: Vec<bytes::Bytes> = stream.map(|r| r.unwrap()).collect().await;
        String::from_utf8(chunks.concat()).unwrap()
    }

    #[test]
    fn test_handler_table_matches_registry_both_ways() {
        let config = RelayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            timeout: 1,
            log_interval: 60,
            max_history: 200,
            credentials: ProviderCredentials::default(),
        };
        let state = RelayState::new(&config).unwrap();
        let mut table_ids = state.model_ids();
        table_ids.sort_unstable();
        let mut registry_ids: Vec<&str> =
            registry::list_models().iter().map(|m| m.id).collect();
        registry_ids.sort_unstable();
        assert_eq!(table_ids, registry_ids);
    }

    #[tokio::test]
    async fn test_dispatch_appends_user_and_assistant_turns() {
        let state = echo_state("pong");
        let session = SessionId::from("s1");
        for turn in 1..=3 {
            let stream = state
                .dispatch(&session, "llama-3.3-70b", "ping", None)
                .await
                .unwrap();
            assert_eq!(collect(stream).await, "pong");
            let history = state.store.history(&session).await;
            assert_eq!(history.len(), 2 * turn);
        }
        let history = state.store.history(&session).await;
        for (i, message) in history.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role, expected);
        }
    }

    #[tokio::test]
    async fn test_dispatch_rejects_empty_message_without_mutation() {
        let state = echo_state("pong");
        let session = SessionId::from("s1");
        let result = state.dispatch(&session, "llama-3.3-70b", "   ", None).await;
        assert!(matches!(
            result,
            Err(RelayError::Request(RequestError::EmptyMessage))
        ));
        assert!(state.store.history(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_rejects_unknown_model() {
        let state = echo_state("pong");
        let session = SessionId::from("s1");
        let result = state.dispatch(&session, "gpt-9", "hi", None).await;
        assert!(matches!(
            result,
            Err(RelayError::Request(RequestError::UnknownModel { .. }))
        ));
        assert!(state.store.history(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_rejects_image_for_text_only_model_before_append() {
        let state = echo_state("pong");
        let session = SessionId::from("s1");
        let image = ImagePayload {
            data: vec![1, 2, 3],
            mime: "image/png".to_string(),
        };
        let result = state
            .dispatch(&session, "llama-3.3-70b", "look", Some(image))
            .await;
        assert!(matches!(
            result,
            Err(RelayError::Request(RequestError::UnsupportedImage { .. }))
        ));
        assert!(state.store.history(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_accepts_image_for_capable_model() {
        let state = echo_state("a cat");
        let session = SessionId::from("s1");
        let image = ImagePayload {
            data: vec![1, 2, 3],
            mime: "image/png".to_string(),
        };
        let stream = state
            .dispatch(&session, "gemini-2.0-flash-exp", "what is this?", Some(image.clone()))
            .await
            .unwrap();
        assert_eq!(collect(stream).await, "a cat");
        let history = state.store.history(&session).await;
        assert_eq!(history[0].image.as_ref(), Some(&image));
    }

    #[tokio::test]
    async fn test_failed_provider_call_leaves_only_user_message() {
        let state = failing_state();
        let session = SessionId::from("s1");
        let result = state.dispatch(&session, "llama-3.3-70b", "hi", None).await;
        assert!(matches!(result, Err(RelayError::Provider(_))));
        let history = state.store.history(&session).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_concurrent_dispatches_on_same_session_serialize() {
        let state = echo_state("pong");
        let session = SessionId::from("shared");
        let (a, b) = tokio::join!(
            state.dispatch(&session, "llama-3.3-70b", "first", None),
            state.dispatch(&session, "llama-3.3-70b", "second", None),
        );
        assert!(a.is_ok());
        assert!(b.is_ok());
        let history = state.store.history(&session).await;
        assert_eq!(history.len(), 4);
        // both turns landed as adjacent user/assistant pairs, in some order
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[2].role, Role::User);
        assert_eq!(history[3].role, Role::Assistant);
    }
}
