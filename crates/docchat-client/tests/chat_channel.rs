//! Chat channel against a local websocket server.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use docchat_client::{ChatChannel, ClientError};
use docchat_core::{ChatRole, ChatSession, ConnectionState, OutboundQuestion, SessionOptions};

async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws/chat", listener.local_addr().unwrap());
    (listener, url)
}

#[tokio::test]
async fn test_question_round_trip() {
    let (listener, url) = local_listener().await;

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();

        let request = ws.next().await.unwrap().unwrap();
        let request: Value = serde_json::from_str(request.to_text().unwrap()).unwrap();

        let reply = json!({
            "answer": "It contains X.",
            "sources": [{ "content": "X details", "metadata": { "source": "a.pdf" } }]
        });
        ws.send(Message::Text(reply.to_string())).await.unwrap();

        let mut saw_close = false;
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                saw_close = true;
                break;
            }
        }
        (request, saw_close)
    });

    let (mut channel, mut frames) = ChatChannel::connect(&url).await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Open);

    let mut session = ChatSession::new(SessionOptions::default());
    session.connection_started().unwrap();
    session.connection_opened().unwrap();

    let question = session
        .send_question("What is in doc A?", &["docs/a.pdf".to_string()])
        .unwrap();
    channel.send_question(&question).await.unwrap();

    let raw = frames.next_frame().await.unwrap().unwrap();
    session.handle_frame(&raw);

    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[1].role, ChatRole::Assistant);
    assert_eq!(session.messages()[1].content, "It contains X.");
    assert_eq!(session.sources()[0].content, "X details");
    assert_eq!(session.sources()[0].origin(), Some("a.pdf"));
    assert!(!session.is_pending());

    assert!(channel.close().await.unwrap());
    assert!(!channel.close().await.unwrap());
    assert_eq!(channel.state(), ConnectionState::Closed);

    let (request, saw_close) = server.await.unwrap();
    assert_eq!(
        request,
        json!({
            "question": "What is in doc A?",
            "top_k": 5,
            "file_paths": ["docs/a.pdf"]
        })
    );
    assert!(saw_close);
}

#[tokio::test]
async fn test_remote_close_refuses_sends() {
    let (listener, url) = local_listener().await;

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.close(None).await.unwrap();
        // Drain until the client acknowledges the close.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (mut channel, mut frames) = ChatChannel::connect(&url).await.unwrap();
    assert!(frames.next_frame().await.is_none());
    channel.mark_remote_closed();

    let question = OutboundQuestion::new("anyone there?", Vec::new());
    let result = channel.send_question(&question).await;
    assert!(matches!(
        result,
        Err(ClientError::NotOpen(ConnectionState::Closed))
    ));
    assert!(!channel.close().await.unwrap());

    drop(frames);
    drop(channel);
    server.await.unwrap();
}

#[tokio::test]
async fn test_binary_frames_are_skipped() {
    let (listener, url) = local_listener().await;

    let server = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.send(Message::Binary(vec![0xff, 0xfe, b'{'])).await.unwrap();
        ws.send(Message::Text(json!({ "answer": "after binary" }).to_string()))
            .await
            .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (mut channel, mut frames) = ChatChannel::connect(&url).await.unwrap();
    let raw = frames.next_frame().await.unwrap().unwrap();
    assert_eq!(raw, json!({ "answer": "after binary" }).to_string());

    assert!(channel.close().await.unwrap());
    drop(frames);
    drop(channel);
    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_failure() {
    let (listener, url) = local_listener().await;
    drop(listener);

    let result = ChatChannel::connect(&url).await;
    assert!(matches!(result, Err(ClientError::Connection(_))));
}
