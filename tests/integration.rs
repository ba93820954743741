#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use health_scan_bot::{
    base::{
        prompts,
        types::{InboundEvent, Res, Void},
    },
    interaction::webhook_event::handle_event,
    service::{
        chat::{ChatClient, GenericChatClient},
        llm::{GenericLlmClient, LlmClient},
        session::SessionStore,
        store::AttachmentStore,
    },
};
use mockall::mock;
use serde_json::Value;
use tempfile::TempDir;

// Mocks.

// Mock chat client for testing.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        async fn start(&self) -> Void;
        async fn reply_message(&self, reply_token: &str, text: &str) -> Res<Value>;
        async fn get_message_content(&self, message_id: &str) -> Res<Vec<u8>>;
    }
}

// Recording LLM double: remembers each question and whether the request
// carried an image, so tests can assert the constructed variant.

struct StubLlm {
    calls: Mutex<Vec<(String, bool)>>,
    answer: Res<String>,
}

impl StubLlm {
    fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            answer: Ok(answer.to_string()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            answer: Err(anyhow::anyhow!("Anthropic returned 529: overloaded")),
        })
    }

    fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenericLlmClient for StubLlm {
    async fn ask(&self, question: &str, encoded_image: Option<&str>) -> Res<String> {
        self.calls.lock().unwrap().push((question.to_string(), encoded_image.is_some()));

        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(e) => Err(anyhow::anyhow!("{e}")),
        }
    }
}

// Helpers.

/// Fresh stores for one test: an empty in-memory session registry and an
/// attachment store rooted in a temp directory.
async fn setup_stores() -> (SessionStore, AttachmentStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = AttachmentStore::local(dir.path().join("uploads")).await.expect("Failed to create attachment store");

    (SessionStore::memory(), store, dir)
}

fn image_event(user_id: &str, message_id: &str) -> InboundEvent {
    InboundEvent::Image {
        user_id: user_id.to_string(),
        reply_token: "token".to_string(),
        message_id: message_id.to_string(),
    }
}

fn text_event(user_id: &str, text: &str) -> InboundEvent {
    InboundEvent::Text {
        user_id: user_id.to_string(),
        reply_token: "token".to_string(),
        text: text.to_string(),
    }
}

// Tests.

#[tokio::test]
async fn test_greeting_before_any_image_onboards_without_state() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::WELCOME_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let stub = StubLlm::answering("unused");
    let llm = LlmClient::new(stub.clone());
    let chat = ChatClient::new(Arc::new(chat));

    let result = handle_event(text_event("U1", "สวัสดี"), session.clone(), store, llm, chat).await.unwrap();

    assert!(result.is_some());
    assert!(!session.has_image("U1").await);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_question_without_image_never_calls_gateway() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::NO_IMAGE_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let stub = StubLlm::answering("unused");
    let llm = LlmClient::new(stub.clone());
    let chat = ChatClient::new(Arc::new(chat));

    handle_event(text_event("U1", "ค่าน้ำตาลเท่าไหร่?"), session, store, llm, chat).await.unwrap();

    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_image_receipt_then_clear_removes_state_and_file() {
    let (session, store, dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_get_message_content()
        .withf(|message_id| message_id == "msg1")
        .times(1)
        .returning(|_| Ok(b"fake jpeg bytes".to_vec()));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::IMAGE_RECEIVED_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::CLEARED_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let llm = LlmClient::new(StubLlm::answering("unused"));
    let chat = ChatClient::new(Arc::new(chat));

    handle_event(image_event("U1", "msg1"), session.clone(), store.clone(), llm.clone(), chat.clone()).await.unwrap();

    let stored = dir.path().join("uploads").join("msg1.jpg");
    assert!(session.has_image("U1").await);
    assert!(stored.exists());

    handle_event(text_event("U1", "clear"), session.clone(), store, llm, chat).await.unwrap();

    assert!(!session.has_image("U1").await);
    assert!(!stored.exists());
}

#[tokio::test]
async fn test_clear_without_prior_session_still_confirms() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::CLEARED_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let llm = LlmClient::new(StubLlm::answering("unused"));
    let chat = ChatClient::new(Arc::new(chat));

    let result = handle_event(text_event("never-seen", "เคลียร์"), session, store, llm, chat).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_question_with_image_uses_image_variant_and_wraps_answer() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_get_message_content().returning(|_| Ok(b"fake jpeg bytes".to_vec()));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::IMAGE_RECEIVED_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));
    chat.expect_reply_message()
        .withf(|_, text| text.starts_with("🤖 ") && text.ends_with(prompts::ANSWER_DISCLAIMER) && text.contains("95 mg/dL"))
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let stub = StubLlm::answering("ค่าน้ำตาลอยู่ที่ 95 mg/dL ซึ่งอยู่ในเกณฑ์ปกติ");
    let llm = LlmClient::new(stub.clone());
    let chat = ChatClient::new(Arc::new(chat));

    handle_event(image_event("U1", "msg1"), session.clone(), store.clone(), llm.clone(), chat.clone()).await.unwrap();
    handle_event(text_event("U1", "ค่าน้ำตาลเท่าไหร่?"), session, store, llm, chat).await.unwrap();

    // The image+text variant is mandatory once an image is on file.
    assert_eq!(stub.calls(), vec![("ค่าน้ำตาลเท่าไหร่?".to_string(), true)]);
}

#[tokio::test]
async fn test_provider_failure_replies_apology_without_failing_batch() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_get_message_content().returning(|_| Ok(b"fake jpeg bytes".to_vec()));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::IMAGE_RECEIVED_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::ANALYSIS_ERROR_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let llm = LlmClient::new(StubLlm::failing());
    let chat = ChatClient::new(Arc::new(chat));

    handle_event(image_event("U1", "msg1"), session.clone(), store.clone(), llm.clone(), chat.clone()).await.unwrap();

    let result = handle_event(text_event("U1", "แปลผลให้หน่อย"), session, store, llm, chat).await;

    // The gateway failure became a reply, not a batch failure.
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_image_download_failure_replies_fixed_error_without_mutating_session() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_get_message_content().times(1).returning(|_| Err(anyhow::anyhow!("LINE content download returned 404")));
    chat.expect_reply_message()
        .withf(|_, text| text == prompts::IMAGE_ERROR_MESSAGE)
        .times(1)
        .returning(|_, _| Ok(Value::Null));

    let llm = LlmClient::new(StubLlm::answering("unused"));
    let chat = ChatClient::new(Arc::new(chat));

    let result = handle_event(image_event("U1", "msg1"), session.clone(), store, llm, chat).await;

    assert!(result.is_ok());
    assert!(!session.has_image("U1").await);
}

#[tokio::test]
async fn test_unrecognized_event_produces_no_reply() {
    let (session, store, _dir) = setup_stores().await;

    // No expectations: any platform call panics the test.
    let llm = LlmClient::new(StubLlm::answering("unused"));
    let chat = ChatClient::new(Arc::new(MockChat::new()));

    let result = handle_event(InboundEvent::Other, session, store, llm, chat).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_reply_failure_escapes_to_fail_the_batch() {
    let (session, store, _dir) = setup_stores().await;

    let mut chat = MockChat::new();
    chat.expect_reply_message().times(1).returning(|_, _| Err(anyhow::anyhow!("LINE reply returned 400: invalid reply token")));

    let llm = LlmClient::new(StubLlm::answering("unused"));
    let chat = ChatClient::new(Arc::new(chat));

    let result = handle_event(text_event("U1", "hello"), session, store, llm, chat).await;

    assert!(result.is_err());
}
