//! WebSocket link to the WhatsApp Web sidecar.
//!
//! The link reconnects on its own with capped exponential backoff. Account
//! logins are remembered and replayed on every reconnect, and in-flight send
//! requests fail as soon as the link drops.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    drivelink_channels::{Error, Result},
    futures::{SinkExt, StreamExt},
    tokio::sync::{Mutex, mpsc, oneshot},
    tokio_tungstenite::{connect_async, tungstenite::Message},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::types::{GatewayMessage, SidecarMessage};

/// Where the sidecar listens unless configured otherwise.
pub const DEFAULT_SIDECAR_URL: &str = "ws://127.0.0.1:9877";

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// What the link reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidecarEvent {
    /// WebSocket connected and logins replayed.
    LinkUp,
    /// WebSocket lost; a reconnect is pending.
    LinkDown,
    Message(SidecarMessage),
}

pub type EventCallback = Arc<dyn Fn(SidecarEvent) + Send + Sync>;

#[derive(Debug)]
struct SendAck {
    success: bool,
    error: Option<String>,
}

#[derive(Default)]
struct Shared {
    /// Send requests waiting for their `send_result`, keyed by request ID.
    pending: Mutex<HashMap<String, oneshot::Sender<SendAck>>>,
    /// Serialized `login` frame per account, replayed after reconnects.
    sessions: Mutex<HashMap<String, String>>,
    connected: AtomicBool,
}

/// Cheaply cloneable handle to the sidecar link.
#[derive(Clone)]
pub struct SidecarHandle {
    write_tx: mpsc::UnboundedSender<String>,
    shared: Arc<Shared>,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl SidecarHandle {
    /// Start the link to `url` in the background and return immediately.
    pub fn spawn(url: String, request_timeout: Duration, on_event: EventCallback) -> Self {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        let cancel = CancellationToken::new();

        tokio::spawn(connection_loop(
            url,
            Arc::clone(&shared),
            on_event,
            write_rx,
            cancel.clone(),
        ));

        Self {
            write_tx,
            shared,
            request_timeout,
            cancel,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Log an account in, now if connected and again after every reconnect.
    pub async fn login(&self, account_id: &str, auth_dir: Option<PathBuf>) -> Result<()> {
        let frame = serde_json::to_string(&GatewayMessage::Login {
            account_id: account_id.to_string(),
            auth_dir,
        })?;
        self.shared
            .sessions
            .lock()
            .await
            .insert(account_id.to_string(), frame.clone());
        if self.is_connected() {
            self.send_raw(frame)?;
        }
        Ok(())
    }

    pub async fn logout(&self, account_id: &str) -> Result<()> {
        self.shared.sessions.lock().await.remove(account_id);
        if self.is_connected() {
            self.send(&GatewayMessage::Logout {
                account_id: account_id.to_string(),
            })?;
        }
        Ok(())
    }

    /// Send a frame built around a fresh request ID and wait for the
    /// sidecar's `send_result` for it.
    pub async fn request(
        &self,
        operation: &'static str,
        build: impl FnOnce(String) -> GatewayMessage,
    ) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::not_connected("whatsapp sidecar is not connected"));
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        let frame = build(request_id.clone());
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .await
            .insert(request_id.clone(), tx);

        if let Err(e) = self.send(&frame) {
            self.shared.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(ack)) if ack.success => Ok(()),
            Ok(Ok(ack)) => Err(Error::send_rejected(
                ack.error
                    .unwrap_or_else(|| "sidecar reported failure".to_string()),
            )),
            // Sender dropped: the link went down mid-request.
            Ok(Err(_)) => Err(Error::not_connected(
                "sidecar connection closed before the send completed",
            )),
            Err(_) => {
                self.shared.pending.lock().await.remove(&request_id);
                Err(Error::Timeout {
                    operation,
                    after: self.request_timeout,
                })
            },
        }
    }

    /// Stop the link task. Pending requests fail as disconnected.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn send(&self, message: &GatewayMessage) -> Result<()> {
        self.send_raw(serde_json::to_string(message)?)
    }

    fn send_raw(&self, frame: String) -> Result<()> {
        self.write_tx
            .send(frame)
            .map_err(|_| Error::not_connected("sidecar link task has stopped"))
    }
}

/// How a connected session ended.
enum LinkEnd {
    /// The sidecar closed the socket; reconnect.
    Remote,
    /// Every handle is gone; stop.
    Local,
}

async fn connection_loop(
    url: String,
    shared: Arc<Shared>,
    on_event: EventCallback,
    mut write_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    let mut backoff = INITIAL_BACKOFF;

    loop {
        info!(url = %url, "connecting to whatsapp sidecar");

        let result = tokio::select! {
            () = cancel.cancelled() => break,
            result = connect_and_run(&url, &shared, &on_event, &mut write_rx, &mut backoff) => {
                result
            },
        };

        let was_connected = shared.connected.swap(false, Ordering::SeqCst);
        shared.pending.lock().await.clear();
        if was_connected {
            on_event(SidecarEvent::LinkDown);
        }

        match result {
            Ok(LinkEnd::Local) => {
                debug!("all sidecar handles dropped, closing link");
                break;
            },
            Ok(LinkEnd::Remote) => debug!("sidecar closed the connection"),
            Err(e) => warn!(error = %e, "sidecar connection error"),
        }

        info!(delay_ms = backoff.as_millis(), "reconnecting to sidecar after delay");
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(backoff) => {},
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }

    shared.connected.store(false, Ordering::SeqCst);
    shared.pending.lock().await.clear();
    info!("whatsapp sidecar link stopped");
}

/// Single connection attempt: connect, replay logins, then forward frames.
async fn connect_and_run(
    url: &str,
    shared: &Shared,
    on_event: &EventCallback,
    write_rx: &mut mpsc::UnboundedReceiver<String>,
    backoff: &mut Duration,
) -> std::result::Result<LinkEnd, tokio_tungstenite::tungstenite::Error> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut ws_sink, mut ws_reader) = ws_stream.split();
    *backoff = INITIAL_BACKOFF;

    let logins: Vec<String> = shared.sessions.lock().await.values().cloned().collect();
    for frame in logins {
        ws_sink.send(Message::Text(frame.into())).await?;
    }
    shared.connected.store(true, Ordering::SeqCst);
    info!(url = %url, "connected to whatsapp sidecar");
    on_event(SidecarEvent::LinkUp);

    loop {
        tokio::select! {
            msg = ws_reader.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_frame(&text, shared, on_event).await,
                    Some(Ok(Message::Close(_))) | None => return Ok(LinkEnd::Remote),
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    },
                    Some(Ok(_)) => {},
                    Some(Err(e)) => return Err(e),
                }
            },
            frame = write_rx.recv() => {
                match frame {
                    Some(text) => ws_sink.send(Message::Text(text.into())).await?,
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        return Ok(LinkEnd::Local);
                    },
                }
            },
        }
    }
}

async fn handle_frame(text: &str, shared: &Shared, on_event: &EventCallback) {
    match serde_json::from_str::<SidecarMessage>(text) {
        Ok(SidecarMessage::SendResult {
            request_id,
            success,
            message_id,
            error,
        }) => {
            debug!(request_id, success, ?message_id, "send result");
            match shared.pending.lock().await.remove(&request_id) {
                Some(tx) => {
                    let _ = tx.send(SendAck { success, error });
                },
                None => debug!(request_id, "send result for unknown or expired request"),
            }
        },
        Ok(message) => on_event(SidecarEvent::Message(message)),
        Err(e) => debug!(error = %e, "ignoring unrecognised sidecar frame"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        tokio::net::TcpListener,
        tokio_tungstenite::{WebSocketStream, accept_async},
    };

    type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn accept(listener: &TcpListener) -> ServerSocket {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn next_json(ws: &mut ServerSocket) -> serde_json::Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Close(_) => panic!("client closed"),
                _ => {},
            }
        }
    }

    fn recording_callback() -> (EventCallback, mpsc::UnboundedReceiver<SidecarEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: EventCallback = Arc::new(move |event| {
            let _ = tx.send(event);
        });
        (callback, rx)
    }

    async fn wait_for(rx: &mut mpsc::UnboundedReceiver<SidecarEvent>, wanted: SidecarEvent) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(event) = rx.recv().await {
                if event == wanted {
                    return;
                }
            }
            panic!("event channel closed");
        })
        .await
        .expect("timed out waiting for event");
    }

    #[tokio::test]
    async fn request_resolves_on_matching_send_result() {
        let (listener, url) = listener().await;
        let (callback, mut events) = recording_callback();
        let handle = SidecarHandle::spawn(url, Duration::from_secs(5), callback);

        let mut server = accept(&listener).await;
        wait_for(&mut events, SidecarEvent::LinkUp).await;

        let client = handle.clone();
        let send = tokio::spawn(async move {
            client
                .request("send_text", |request_id| GatewayMessage::SendText {
                    request_id,
                    account_id: "main".into(),
                    to: "1@s.whatsapp.net".into(),
                    text: "hi".into(),
                })
                .await
        });

        let frame = next_json(&mut server).await;
        assert_eq!(frame["type"], "send_text");
        assert_eq!(frame["text"], "hi");
        let request_id = frame["request_id"].as_str().unwrap().to_string();

        // A result for some other request must not resolve ours.
        server
            .send(Message::Text(
                r#"{"type":"send_result","request_id":"other","success":false}"#.into(),
            ))
            .await
            .unwrap();
        server
            .send(Message::Text(
                serde_json::json!({
                    "type": "send_result",
                    "request_id": request_id,
                    "success": true
                })
                .to_string()
                .into(),
            ))
            .await
            .unwrap();

        send.await.unwrap().unwrap();
        handle.shutdown();
    }

    #[tokio::test]
    async fn failed_send_result_is_rejection() {
        let (listener, url) = listener().await;
        let (callback, mut events) = recording_callback();
        let handle = SidecarHandle::spawn(url, Duration::from_secs(5), callback);
        let mut server = accept(&listener).await;
        wait_for(&mut events, SidecarEvent::LinkUp).await;

        let client = handle.clone();
        let send = tokio::spawn(async move {
            client
                .request("send_document", |request_id| GatewayMessage::SendDocument {
                    request_id,
                    account_id: "main".into(),
                    to: "1@s.whatsapp.net".into(),
                    path: PathBuf::from("/tmp/a.part1"),
                    file_name: "a.part1".into(),
                    mime_type: "application/octet-stream".into(),
                    caption: None,
                })
                .await
        });

        let frame = next_json(&mut server).await;
        let request_id = frame["request_id"].as_str().unwrap().to_string();
        server
            .send(Message::Text(
                serde_json::json!({
                    "type": "send_result",
                    "request_id": request_id,
                    "success": false,
                    "error": "media too large"
                })
                .to_string()
                .into(),
            ))
            .await
            .unwrap();

        let err = send.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::SendRejected { ref message } if message == "media too large"));
        handle.shutdown();
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let (listener, url) = listener().await;
        let (callback, mut events) = recording_callback();
        let handle = SidecarHandle::spawn(url, Duration::from_millis(200), callback);
        let _server = accept(&listener).await;
        wait_for(&mut events, SidecarEvent::LinkUp).await;

        let err = handle
            .request("send_text", |request_id| GatewayMessage::SendText {
                request_id,
                account_id: "main".into(),
                to: "1@s.whatsapp.net".into(),
                text: "hi".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout {
            operation: "send_text",
            ..
        }));
        assert!(handle.shared.pending.lock().await.is_empty());
        handle.shutdown();
    }

    #[tokio::test]
    async fn request_while_disconnected_fails_fast() {
        let (callback, _events) = recording_callback();
        // Nothing listens on port 9 locally; the link keeps retrying.
        let handle =
            SidecarHandle::spawn("ws://127.0.0.1:9".into(), Duration::from_secs(5), callback);

        let err = handle
            .request("send_text", |request_id| GatewayMessage::SendText {
                request_id,
                account_id: "main".into(),
                to: "1@s.whatsapp.net".into(),
                text: "hi".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected { .. }));
        handle.shutdown();
    }

    #[tokio::test]
    async fn logins_are_replayed_after_reconnect() {
        let (listener, url) = listener().await;
        let (callback, mut events) = recording_callback();
        let handle = SidecarHandle::spawn(url, Duration::from_secs(5), callback);

        let mut first = accept(&listener).await;
        wait_for(&mut events, SidecarEvent::LinkUp).await;
        handle
            .login("main", Some(PathBuf::from("/auth/main")))
            .await
            .unwrap();
        let login = next_json(&mut first).await;
        assert_eq!(login["type"], "login");
        assert_eq!(login["account_id"], "main");

        first.close(None).await.unwrap();
        drop(first);
        wait_for(&mut events, SidecarEvent::LinkDown).await;

        let mut second = accept(&listener).await;
        let replayed = next_json(&mut second).await;
        assert_eq!(replayed, login);
        wait_for(&mut events, SidecarEvent::LinkUp).await;
        handle.shutdown();
    }

    #[tokio::test]
    async fn inbound_frames_reach_the_callback() {
        let (listener, url) = listener().await;
        let (callback, mut events) = recording_callback();
        let handle = SidecarHandle::spawn(url, Duration::from_secs(5), callback);
        let mut server = accept(&listener).await;
        wait_for(&mut events, SidecarEvent::LinkUp).await;

        server
            .send(Message::Text(r#"{"type":"presence_update"}"#.into()))
            .await
            .unwrap();
        server
            .send(Message::Text(
                r#"{"type":"qr","account_id":"main","qr":"2@abc"}"#.into(),
            ))
            .await
            .unwrap();

        wait_for(
            &mut events,
            SidecarEvent::Message(SidecarMessage::Qr {
                account_id: "main".into(),
                qr: "2@abc".into(),
            }),
        )
        .await;
        handle.shutdown();
    }
}
