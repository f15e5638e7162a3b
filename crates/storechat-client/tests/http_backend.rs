use mockito::Matcher;
use serde_json::json;
use storechat_client::{
    ChatBackend, ChatSession, ClientConfig, ClientError, HttpBackend, SendOutcome,
};
use storechat_core::{ChatTurnRequest, HistoryEntry, Role};

fn backend_for(server: &mockito::ServerGuard) -> HttpBackend {
    let config = ClientConfig::new(format!("{}/api", server.url()));
    HttpBackend::with_bearer(config, "test-token").unwrap()
}

#[tokio::test]
async fn test_open_turn_posts_message_and_history() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_header("authorization", "Bearer test-token")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "message": "What products do I have?",
            "chatHistory": [{ "role": "user", "content": "hello" }]
        })))
        .with_status(200)
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body("You have 12 products.")
        .create_async()
        .await;

    let backend = backend_for(&server);
    let request = ChatTurnRequest::new(
        "What products do I have?",
        vec![HistoryEntry {
            role: Role::User,
            content: "hello".to_string(),
        }],
    );
    let response = backend.open_turn(&request).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.text().await.unwrap(), "You have 12 products.");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_session_over_event_stream() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"content\":\"You have \"}\n\n",
        "data: {\"content\":\"12 products.\"}\n\n",
        "data: {\"intent\":\"find_best_selling_products\",\"remainingTokens\":\"988\"}\n\n",
        "data: [DONE]\n\n",
    );
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let session = ChatSession::new(backend_for(&server), 100);
    let outcome = session.send_message("What products do I have?").await;
    assert!(matches!(outcome, SendOutcome::Replied { .. }));

    let state = session.snapshot();
    assert_eq!(state.messages()[1].text, "You have 12 products.");
    assert_eq!(state.current_intent(), Some("find_best_selling_products"));
    assert_eq!(state.token_credits(), 988);
}

#[tokio::test]
async fn test_session_over_json_reply() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"Top seller: Blue Mug","intent":"find_best_selling_products","tokenCredits":41}"#)
        .create_async()
        .await;

    let session = ChatSession::new(backend_for(&server), 100);
    session.send_message("best sellers?").await;

    let state = session.snapshot();
    assert_eq!(state.messages()[1].text, "Top seller: Blue Mug");
    assert_eq!(state.token_credits(), 41);
}

#[tokio::test]
async fn test_payment_required_is_quota_signal() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(402)
        .with_body(r#"{"error":"Insufficient tokens"}"#)
        .expect(1)
        .create_async()
        .await;

    let session = ChatSession::new(backend_for(&server), 3);
    assert_eq!(session.send_message("hi").await, SendOutcome::QuotaExceeded);
    assert_eq!(session.snapshot().messages().len(), 1);
    assert!(!session.is_loading());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body(r#"{"error":"Failed to process chat message"}"#)
        .expect(1)
        .create_async()
        .await;

    let session = ChatSession::new(backend_for(&server), 100);
    let outcome = session.send_message("hi").await;
    assert!(matches!(outcome, SendOutcome::Failed { .. }));

    let state = session.snapshot();
    assert_eq!(state.messages()[1].text, "Failed to process chat message");
    assert!(state.messages()[1].is_error);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_credits() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/chat/tokens")
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"tokensRemaining":512}"#)
        .create_async()
        .await;

    let session = ChatSession::new(backend_for(&server), 100);
    assert_eq!(session.refresh_credits().await.unwrap(), Some(512));
    assert_eq!(session.snapshot().token_credits(), 512);
}

#[tokio::test]
async fn test_fetch_credits_unauthorized() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/chat/tokens")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;

    let backend = backend_for(&server);
    match backend.fetch_credits().await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "unauthorized");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend() {
    let config = ClientConfig::new("http://127.0.0.1:9/api");
    let session = ChatSession::new(HttpBackend::without_auth(config).unwrap(), 100);

    let outcome = session.send_message("hi").await;
    assert!(matches!(outcome, SendOutcome::Failed { .. }));
    let state = session.snapshot();
    assert!(state.messages()[1].is_error);
    assert!(!state.messages()[1].text.is_empty());
}
