use super::{ChatProxy, Conversation, ConversationTurn};
use crate::error::SessionError;
use crate::normalize::{GeneratedImage, extract_image, normalize_answer};
use crate::retry::RetryPolicy;
use crate::upstream::{UpstreamOutcome, error_message};
use groundchat_schema::ImageProxyRequest;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Shown when the proxy could not produce an answer within the retry budget.
pub const GENERATION_FAILED_MESSAGE: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment.";

/// One conversation bound to a proxy.
///
/// `send` takes `&mut self`, so a session never has two generations in
/// flight. Callers sharing a session across tasks put it behind a
/// `tokio::sync::Mutex`, which queues the second send behind the first.
pub struct ChatSession<P> {
    proxy: Arc<P>,
    retry: RetryPolicy,
    conversation: Conversation,
    input_enabled: bool,
}

impl<P> ChatSession<P>
where
    P: ChatProxy + 'static,
{
    /// Probes the proxy once; input stays disabled if the probe fails.
    pub async fn connect(proxy: Arc<P>, retry: RetryPolicy) -> Self {
        let input_enabled = match proxy.probe().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Chat proxy probe failed; input disabled");
                false
            }
        };
        Self {
            proxy,
            retry,
            conversation: Conversation::new(),
            input_enabled,
        }
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Appends the user turn, asks the proxy for an answer and appends exactly
    /// one assistant turn, which is a fallback message when generation fails.
    pub async fn send(&mut self, text: &str) -> Result<&ConversationTurn, SessionError> {
        if !self.input_enabled {
            return Err(SessionError::ProxyUnavailable(
                "input is disabled until the proxy reports an API key".to_string(),
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.conversation.append(ConversationTurn::user(text));
        let request = self.conversation.to_request();

        let proxy = self.proxy.as_ref();
        let outcome = self
            .retry
            .run(
                "chat-session",
                || proxy.generate(&request),
                UpstreamOutcome::is_retryable,
            )
            .await;

        let reply = assistant_turn(&outcome);
        info!(
            turns = self.conversation.len() + 1,
            sources = reply.sources.len(),
            status = ?outcome.status(),
            "Assistant turn appended"
        );
        Ok(self.conversation.append(reply))
    }

    /// Starts an independent image generation for `prompt`. It runs under its
    /// own retry budget and never touches the conversation; failure yields `None`.
    pub fn illustrate(&self, prompt: impl Into<String>) -> JoinHandle<Option<GeneratedImage>> {
        let proxy = Arc::clone(&self.proxy);
        let retry = self.retry;
        let request = ImageProxyRequest::new(prompt);

        tokio::spawn(async move {
            let outcome = retry
                .run(
                    "chat-illustration",
                    || proxy.generate_image(&request),
                    UpstreamOutcome::is_retryable,
                )
                .await;

            let image = outcome.success_body().and_then(extract_image);
            if image.is_none() {
                warn!(status = ?outcome.status(), "Background image generation produced no image");
            }
            image
        })
    }
}

fn assistant_turn(outcome: &UpstreamOutcome) -> ConversationTurn {
    if let Some(body) = outcome.success_body() {
        let answer = normalize_answer(body);
        return ConversationTurn::assistant(answer.text, answer.sources);
    }

    match outcome {
        UpstreamOutcome::Reply { body, .. } if !outcome.is_retryable() => {
            let message = error_message(body).unwrap_or(GENERATION_FAILED_MESSAGE);
            ConversationTurn::assistant(message, Vec::new())
        }
        _ => ConversationTurn::assistant(GENERATION_FAILED_MESSAGE, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;
    use crate::normalize::MALFORMED_RESPONSE_MESSAGE;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use groundchat_schema::ChatProxyRequest;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted outcomes and records the requests it saw.
    #[derive(Default)]
    struct ScriptedProxy {
        probe_ok: bool,
        chat: Mutex<VecDeque<UpstreamOutcome>>,
        image: Mutex<VecDeque<UpstreamOutcome>>,
        seen: Mutex<Vec<ChatProxyRequest>>,
    }

    impl ScriptedProxy {
        fn new(chat: Vec<UpstreamOutcome>) -> Self {
            Self {
                probe_ok: true,
                chat: Mutex::new(chat.into()),
                ..Default::default()
            }
        }

        fn chat_calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatProxy for ScriptedProxy {
        async fn probe(&self) -> Result<(), SessionError> {
            if self.probe_ok {
                Ok(())
            } else {
                Err(SessionError::ProxyUnavailable("no key".to_string()))
            }
        }

        async fn generate(&self, request: &ChatProxyRequest) -> UpstreamOutcome {
            self.seen.lock().unwrap().push(request.clone());
            self.chat
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra chat call")
        }

        async fn generate_image(&self, _request: &ImageProxyRequest) -> UpstreamOutcome {
            self.image
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra image call")
        }
    }

    fn reply(status: u16, body: Value) -> UpstreamOutcome {
        UpstreamOutcome::Reply {
            status: StatusCode::from_u16(status).unwrap(),
            body,
        }
    }

    fn grounded_answer() -> Value {
        json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi there!"}]},
                "groundingMetadata": {"groundingAttributions": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://b.example"}}
                ]}
            }]
        })
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(5, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn successful_send_appends_one_assistant_turn() {
        let proxy = Arc::new(ScriptedProxy::new(vec![reply(200, grounded_answer())]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;
        assert!(session.input_enabled());

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, "Hi there!");
        let uris: Vec<_> = turn.sources.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris, vec!["https://a.example", "https://b.example"]);

        let turns = session.conversation().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text, "hello");

        let seen = proxy.seen.lock().unwrap();
        assert_eq!(
            serde_json::to_value(&seen[0]).unwrap(),
            json!({"contents": [{"role": "user", "parts": [{"text": "hello"}]}]})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn follow_up_sends_full_history() {
        let proxy = Arc::new(ScriptedProxy::new(vec![
            reply(200, grounded_answer()),
            reply(200, json!({"candidates": [{"content": {"parts": [{"text": "Sure."}]}}]})),
        ]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        session.send("hello").await.unwrap();
        session.send("more please").await.unwrap();

        let seen = proxy.seen.lock().unwrap();
        let roles: Vec<_> = seen[1]
            .contents
            .iter()
            .map(|c| c.role.as_deref().unwrap())
            .collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(session.conversation().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_twice_then_success_uses_three_calls() {
        let limited = json!({"error": {"code": 429, "message": "Resource has been exhausted"}});
        let proxy = Arc::new(ScriptedProxy::new(vec![
            reply(429, limited.clone()),
            reply(429, limited),
            reply(200, grounded_answer()),
        ]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.text, "Hi there!");
        assert_eq!(proxy.chat_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_append_fixed_error_turn() {
        let limited = reply(429, json!({"error": {"code": 429, "message": "Resource has been exhausted"}}));
        let proxy = Arc::new(ScriptedProxy::new(vec![limited; 5]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.text, GENERATION_FAILED_MESSAGE);
        assert!(turn.sources.is_empty());
        assert_eq!(proxy.chat_calls(), 5);
        assert_eq!(session.conversation().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_surfaces_upstream_message() {
        let proxy = Arc::new(ScriptedProxy::new(vec![reply(
            400,
            json!({"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}),
        )]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.text, "API key not valid.");
        assert_eq!(proxy.chat_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_proxy_degrades_to_error_turn() {
        let down = UpstreamOutcome::Unreachable {
            reason: "connection refused".to_string(),
        };
        let proxy = Arc::new(ScriptedProxy::new(vec![down; 5]));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.text, GENERATION_FAILED_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_success_degrades_to_fallback_text() {
        let proxy = Arc::new(ScriptedProxy::new(vec![reply(200, json!({"candidates": []}))]));
        let mut session = ChatSession::connect(proxy, policy()).await;

        let turn = session.send("hello").await.unwrap().clone();
        assert_eq!(turn.text, MALFORMED_RESPONSE_MESSAGE);
    }

    #[tokio::test]
    async fn failed_probe_disables_input() {
        let proxy = Arc::new(ScriptedProxy {
            probe_ok: false,
            ..Default::default()
        });
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        assert!(!session.input_enabled());
        assert!(matches!(
            session.send("hello").await,
            Err(SessionError::ProxyUnavailable(_))
        ));
        assert!(session.conversation().is_empty());
        assert_eq!(proxy.chat_calls(), 0);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_a_call() {
        let proxy = Arc::new(ScriptedProxy::new(Vec::new()));
        let mut session = ChatSession::connect(proxy.clone(), policy()).await;

        assert!(matches!(
            session.send("   ").await,
            Err(SessionError::EmptyMessage)
        ));
        assert!(session.conversation().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn illustration_runs_independently_of_conversation() {
        let proxy = Arc::new(ScriptedProxy::new(Vec::new()));
        proxy.image.lock().unwrap().extend([
            reply(429, json!({"error": {"message": "Quota exceeded"}})),
            reply(
                200,
                json!({"candidates": [{"content": {"parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
                ]}}]}),
            ),
        ]);
        let session = ChatSession::connect(proxy.clone(), policy()).await;

        let image = session.illustrate("a cat").await.unwrap();
        assert_eq!(
            image,
            Some(GeneratedImage {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            })
        );
        assert!(session.conversation().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_illustration_yields_none() {
        let proxy = Arc::new(ScriptedProxy::new(Vec::new()));
        proxy.image.lock().unwrap().push_back(reply(
            400,
            json!({"error": {"code": 400, "message": "prompt blocked"}}),
        ));
        let session = ChatSession::connect(proxy, policy()).await;

        assert_eq!(session.illustrate("a cat").await.unwrap(), None);
    }
}
