use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::AppState;
use crate::errors::AppError;
use crate::models::{WsChatRequest, WsEvent};
use crate::service::dashboard::ChatEvent;

/// GET `/ws/chat` — upgrades to a WebSocket for streaming chat.
pub async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn to_ws_event(document_id: &str, event: ChatEvent) -> WsEvent {
    match event {
        ChatEvent::Started { user_message, bot_message_id } => WsEvent::StreamStart {
            document_id: document_id.to_string(),
            user_message,
            bot_message_id,
        },
        ChatEvent::Chunk { message_id, content } => WsEvent::StreamChunk {
            document_id: document_id.to_string(),
            message_id,
            content,
        },
        ChatEvent::Finished { message_id, full_content } => WsEvent::StreamEnd {
            document_id: document_id.to_string(),
            message_id,
            full_content,
        },
    }
}

/// One frame from the client, reduced to what the handler acts on.
enum Incoming {
    Request(WsChatRequest),
    Invalid(String),
    Ignored,
    Closed,
}

fn classify(frame: Option<Result<Message, axum::Error>>) -> Incoming {
    match frame {
        Some(Ok(Message::Text(text))) => {
            match serde_json::from_str::<WsChatRequest>(text.as_str()) {
                Ok(request) => Incoming::Request(request),
                Err(e) => Incoming::Invalid(format!("Invalid request: {e}")),
            }
        }
        Some(Ok(Message::Close(_))) | None => Incoming::Closed,
        Some(Ok(_)) => Incoming::Ignored,
        Some(Err(e)) => {
            warn!("WebSocket receive error: {e}");
            Incoming::Closed
        }
    }
}

/// Handles a single WebSocket connection.
///
/// Protocol:
/// - Client sends JSON `{ "document_id": "...", "input": { "type": "text"|"shortcut", "value": ... } }`
/// - Server streams back:
///   1. `{ "type": "stream_start", "document_id", "user_message", "bot_message_id" }`
///   2. `{ "type": "stream_chunk", "document_id", "message_id", "content" }` (repeated)
///   3. `{ "type": "stream_end", "document_id", "message_id", "full_content" }`
///   or `{ "type": "rejected", "reason" }` when the send was ignored,
///   or `{ "type": "error", "message" }` for malformed requests.
///
/// Requests that arrive while a reply is streaming are rejected, never queued.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected");

    loop {
        let request = match classify(socket.recv().await) {
            Incoming::Request(request) => request,
            Incoming::Invalid(message) => {
                send_event(&mut socket, &WsEvent::Error { message }).await;
                continue;
            }
            Incoming::Ignored => continue,
            Incoming::Closed => break,
        };

        if !run_turn(&mut socket, &state, request).await {
            break;
        }
    }

    info!("WebSocket client disconnected");
}

/// Runs one turn on its own task and forwards its events. Returns `false`
/// once the client has gone away.
async fn run_turn(socket: &mut WebSocket, state: &AppState, request: WsChatRequest) -> bool {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsEvent>();
    let dashboard = state.dashboard.clone();
    let document_id = request.document_id.clone();

    let turn = tokio::spawn(async move {
        dashboard
            .send(&request.document_id, request.input, |event| {
                let _ = tx.send(to_ws_event(&request.document_id, event));
            })
            .await
    });

    let mut open = true;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => send_event(socket, &event).await,
                None => break,
            },
            frame = socket.recv(), if open => match classify(frame) {
                Incoming::Request(extra) => {
                    let busy = AppError::ResponsePending { document_id: document_id.clone() };
                    warn!("Chat send for {} ignored: {busy}", extra.document_id);
                    send_event(socket, &WsEvent::Rejected { reason: busy.to_string() }).await;
                }
                Incoming::Invalid(message) => {
                    send_event(socket, &WsEvent::Error { message }).await;
                }
                Incoming::Ignored => {}
                Incoming::Closed => open = false,
            },
        }
    }

    match turn.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_busy() || e.is_validation() => {
            warn!("Chat send for {document_id} ignored: {e}");
            send_event(socket, &WsEvent::Rejected { reason: e.to_string() }).await;
        }
        Ok(Err(e)) => {
            error!("Chat send for {document_id} failed: {e}");
            send_event(socket, &WsEvent::Error { message: e.to_string() }).await;
        }
        Err(e) => {
            error!("Chat task panicked: {e}");
            send_event(socket, &WsEvent::Error {
                message: "Internal error during streaming".to_string(),
            })
            .await;
        }
    }
    open
}

/// Helper: serialize a `WsEvent` and send it over the socket.
async fn send_event(socket: &mut WebSocket, event: &WsEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    use super::*;
    use crate::agent::testing::{GatedChat, ScriptedChat, ScriptedImages};
    use crate::agent::{AiGateway, ChatProvider};
    use crate::config::SessionScope;
    use crate::models::{ChatMessage, MessageAuthor};
    use crate::routes::router;
    use crate::service::dashboard::Dashboard;
    use crate::service::image_studio::ImageStudio;
    use crate::service::upload::UploadedFile;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Serves the router on an ephemeral port with one text document uploaded.
    async fn serve(chat: impl ChatProvider + 'static) -> (String, AppState, String) {
        let gateway = AiGateway::new(
            Arc::new(chat),
            Arc::new(ScriptedImages::empty()),
            SessionScope::PerDocument,
        );
        let state = AppState {
            dashboard: Dashboard::new(gateway.clone()),
            studio: ImageStudio::new(gateway),
        };
        let doc = state
            .dashboard
            .upload([UploadedFile {
                name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                data: Bytes::from_static(b"Hello world"),
            }])
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("ws://127.0.0.1:{}/ws/chat", addr.port()), state, doc.id)
    }

    async fn connect(url: &str) -> Client {
        let (ws, _) = tokio_tungstenite::connect_async(url).await.expect("WS connect failed");
        ws
    }

    async fn send_text(ws: &mut Client, document_id: &str, text: &str) {
        let request = json!({ "document_id": document_id, "input": { "type": "text", "value": text } });
        ws.send(tungstenite::Message::Text(request.to_string())).await.unwrap();
    }

    async fn next_event(ws: &mut Client) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("WS error");
        serde_json::from_str(&msg.into_text().expect("not text")).unwrap()
    }

    #[test]
    fn started_events_carry_the_document_id() {
        let event = to_ws_event(
            "doc-1",
            ChatEvent::Started {
                user_message: ChatMessage::new("1".into(), MessageAuthor::User, "hi"),
                bot_message_id: "2".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stream_start");
        assert_eq!(json["document_id"], "doc-1");
        assert_eq!(json["bot_message_id"], "2");
        assert_eq!(json["user_message"]["text"], "hi");
    }

    #[test]
    fn chunk_and_end_events_carry_the_document_id() {
        let chunk = to_ws_event("doc-1", ChatEvent::Chunk { message_id: "2".into(), content: "a".into() });
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["type"], "stream_chunk");
        assert_eq!(json["document_id"], "doc-1");

        let end = to_ws_event(
            "doc-1",
            ChatEvent::Finished { message_id: "2".into(), full_content: "all".into() },
        );
        let json = serde_json::to_value(&end).unwrap();
        assert_eq!(json["type"], "stream_end");
        assert_eq!(json["document_id"], "doc-1");
        assert_eq!(json["full_content"], "all");
    }

    #[tokio::test]
    async fn socket_streams_a_turn_in_order() {
        let (url, _state, doc_id) = serve(ScriptedChat::replying(&["Hel", "lo"])).await;
        let mut ws = connect(&url).await;

        send_text(&mut ws, &doc_id, "Summarize").await;

        let start = next_event(&mut ws).await;
        assert_eq!(start["type"], "stream_start");
        assert_eq!(start["user_message"]["text"], "Summarize");
        let bot_id = start["bot_message_id"].clone();

        for expected in ["Hel", "lo"] {
            let chunk = next_event(&mut ws).await;
            assert_eq!(chunk["type"], "stream_chunk");
            assert_eq!(chunk["message_id"], bot_id);
            assert_eq!(chunk["document_id"], doc_id.as_str());
            assert_eq!(chunk["content"], expected);
        }

        let end = next_event(&mut ws).await;
        assert_eq!(end["type"], "stream_end");
        assert_eq!(end["full_content"], "Hello");

        let _ = ws.close(None).await;
    }

    #[tokio::test]
    async fn second_send_on_the_same_socket_while_streaming_is_rejected() {
        let (chat, release) = GatedChat::gated();
        let (url, state, doc_id) = serve(chat).await;
        let mut ws = connect(&url).await;

        send_text(&mut ws, &doc_id, "first").await;
        assert_eq!(next_event(&mut ws).await["type"], "stream_start");

        send_text(&mut ws, &doc_id, "second").await;
        let rejected = next_event(&mut ws).await;
        assert_eq!(rejected["type"], "rejected");

        release.send("done".to_string()).unwrap();
        let chunk = next_event(&mut ws).await;
        assert_eq!(chunk["type"], "stream_chunk");
        assert_eq!(chunk["content"], "done");
        let end = next_event(&mut ws).await;
        assert_eq!(end["type"], "stream_end");
        assert_eq!(end["full_content"], "done");

        // Nothing was queued: no further turn follows.
        let quiet = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
        assert!(quiet.is_err(), "unexpected frame after the turn: {quiet:?}");

        let texts: Vec<String> = state
            .dashboard
            .chat(&doc_id)
            .unwrap()
            .messages
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], "first");
        assert_eq!(texts[2], "done");

        let _ = ws.close(None).await;
    }

    #[tokio::test]
    async fn bad_requests_are_answered_and_the_socket_stays_usable() {
        let (url, _state, doc_id) = serve(ScriptedChat::replying(&["ok"])).await;
        let mut ws = connect(&url).await;

        ws.send(tungstenite::Message::Text("not json".to_string())).await.unwrap();
        let invalid = next_event(&mut ws).await;
        assert_eq!(invalid["type"], "error");
        assert!(invalid["message"].as_str().unwrap().starts_with("Invalid request"));

        send_text(&mut ws, &doc_id, "   ").await;
        assert_eq!(next_event(&mut ws).await["type"], "rejected");

        send_text(&mut ws, "missing", "hello").await;
        let missing = next_event(&mut ws).await;
        assert_eq!(missing["type"], "error");
        assert!(missing["message"].as_str().unwrap().contains("missing"));

        send_text(&mut ws, &doc_id, "hello").await;
        assert_eq!(next_event(&mut ws).await["type"], "stream_start");
        assert_eq!(next_event(&mut ws).await["type"], "stream_chunk");
        assert_eq!(next_event(&mut ws).await["type"], "stream_end");

        let _ = ws.close(None).await;
    }
}
