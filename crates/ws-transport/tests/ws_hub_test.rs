//! End-to-end tests for the WebSocket hub against a loopback server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use chatline_hub_client::{HubCallbacks, HubConnection, HubError};
use chatline_protocol::{Envelope, Invocation, ServerEvent};
use chatline_ws_transport::{ReconnectPolicy, WsHub};

fn text(envelope: &Envelope) -> Message {
    Message::Text(serde_json::to_string(envelope).unwrap().into())
}

fn recording_callbacks() -> (
    HubCallbacks,
    mpsc::UnboundedReceiver<ServerEvent>,
    mpsc::UnboundedReceiver<&'static str>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();

    let tx_rc = lifecycle_tx.clone();
    let tx_rd = lifecycle_tx.clone();
    let tx_cl = lifecycle_tx;
    let callbacks = HubCallbacks {
        on_event: Box::new(move |event| {
            let _ = event_tx.send(event);
        }),
        on_reconnecting: Box::new(move || {
            let _ = tx_rc.send("reconnecting");
        }),
        on_reconnected: Box::new(move || {
            let _ = tx_rd.send("reconnected");
        }),
        on_close: Box::new(move || {
            let _ = tx_cl.send("close");
        }),
    };
    (callbacks, event_rx, lifecycle_rx)
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn push_event_invoke_and_acknowledge() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        // Push an event before the client invokes anything.
        let event = Envelope::event("ReceiveMessage", &("alice", "hi", "10:00")).unwrap();
        ws.send(text(&event)).await.unwrap();

        let mut invocations = Vec::new();
        while let Some(frame) = ws.next().await {
            let frame = match frame {
                Ok(f) => f,
                Err(_) => break,
            };
            match frame {
                Message::Text(body) => {
                    let envelope: Envelope = serde_json::from_str(&body).unwrap();
                    let id = envelope.id.clone().unwrap();
                    invocations.push(envelope.target.clone());
                    let ack = if invocations.len() == 1 {
                        Envelope::completion(id)
                    } else {
                        Envelope::completion_error(id, "room is full")
                    };
                    ws.send(text(&ack)).await.unwrap();
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        invocations
    });

    let hub = WsHub::new(format!("ws://{addr}/chat"));
    let (callbacks, mut events, _lifecycle) = recording_callbacks();
    hub.set_callbacks(callbacks);
    hub.start().await.unwrap();

    // The pushed event reaches the typed dispatch table.
    let event = recv(&mut events).await;
    assert!(matches!(
        event,
        ServerEvent::ReceiveMessage(m) if m.user == "alice" && m.message == "hi"
    ));

    // Acknowledged invocation resolves Ok.
    hub.invoke(Invocation::SendMessage("yo".into()))
        .await
        .unwrap();

    // Error acknowledgment surfaces as an invoke error.
    let err = hub
        .invoke(Invocation::SendMessage("again".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, HubError::Invoke(message) if message == "room is full"));

    hub.stop().await.unwrap();

    let invocations = tokio::time::timeout(Duration::from_secs(10), server)
        .await
        .expect("server task timed out")
        .unwrap();
    assert_eq!(invocations, vec!["SendMessage", "SendMessage"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_reconnects_after_socket_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: handshake, then drop immediately.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        // Second connection: stay up until the client closes.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(frame) = ws.next().await {
            if frame.is_err() || matches!(frame, Ok(Message::Close(_))) {
                break;
            }
        }
    });

    let hub = WsHub::with_policy(
        format!("ws://{addr}/chat"),
        ReconnectPolicy {
            delays: vec![Duration::ZERO, Duration::from_millis(50)],
        },
    );
    let (callbacks, _events, mut lifecycle) = recording_callbacks();
    hub.set_callbacks(callbacks);
    hub.start().await.unwrap();

    assert_eq!(recv(&mut lifecycle).await, "reconnecting");
    assert_eq!(recv(&mut lifecycle).await, "reconnected");

    hub.stop().await.unwrap();
    let _ = tokio::time::timeout(Duration::from_secs(10), server).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn exhausted_reconnect_schedule_reports_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);
        drop(listener); // No further accepts: reconnects must fail.
    });

    let hub = WsHub::with_policy(
        format!("ws://{addr}/chat"),
        ReconnectPolicy {
            delays: vec![Duration::ZERO],
        },
    );
    let (callbacks, _events, mut lifecycle) = recording_callbacks();
    hub.set_callbacks(callbacks);
    hub.start().await.unwrap();

    assert_eq!(recv(&mut lifecycle).await, "reconnecting");
    assert_eq!(recv(&mut lifecycle).await, "close");

    let _ = tokio::time::timeout(Duration::from_secs(10), server).await;
}
