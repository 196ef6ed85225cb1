//! Realtime channel client.
//!
//! The forum exposes its realtime surface as named requests and named
//! events over a single WebSocket. Outbound requests carry a sequence id
//! and are correlated with their acknowledgement by that id; inbound
//! frames without an id are server-pushed events, dispatched to the
//! registered handler for their name.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::{ClientRequestBuilder, Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use quorum_core::{
    ClientResult, RequestError, RequestResult, TransportError, TransportResult,
    retry_rate_limited,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<RequestResult<Value>>>>>;
type ConnectionSlot = Arc<tokio::sync::Mutex<Option<Channel>>>;

/// Interval between keepalive pings on an established channel.
const PING_INTERVAL: Duration = Duration::from_secs(25);

/// Capacity of the outbound frame queue.
const OUTBOUND_BUFFER: usize = 256;

/// Identity presented during the channel handshake.
///
/// The forum validates the `Origin` header against its own URL and ties
/// the realtime session to the HTTP login via the `Cookie` header, so the
/// handshake must carry the same identity as the HTTP session that logged
/// in. Produced by [`Session::channel_identity`](crate::session::Session::channel_identity).
#[derive(Debug, Clone)]
pub struct ChannelIdentity {
    /// Base forum URL (`http(s)` scheme; translated to `ws(s)` for the handshake).
    pub url: String,
    /// User agent string, matching the HTTP session's.
    pub user_agent: String,
    /// Serialized cookie header from the HTTP session. May be empty before login.
    pub cookie: String,
}

/// Lifecycle notifications broadcast by the channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The channel is (re-)established, either by a local handshake or by a
    /// server-pushed `connect` event.
    Connected,
    /// The channel is down. All pending requests have already been failed.
    Disconnected,
    /// A keepalive pong arrived, with the measured round-trip latency.
    Pong {
        /// Round trip time of the ping/pong exchange.
        latency: Duration,
    },
}

/// Future returned by an event handler's async phase.
pub type HandlerFuture = BoxFuture<'static, ClientResult<()>>;

/// Handler for a named server-pushed event.
///
/// Handling is split in two phases: the synchronous call validates the
/// payload shape and may reject it, and the returned future performs the
/// actual (possibly slow) work on a spawned task so the channel read loop
/// is never blocked by a handler.
pub trait EventHandler: Send + Sync {
    /// Accepts or rejects the event payload, returning the async phase.
    fn handle(&self, payload: Value) -> ClientResult<HandlerFuture>;
}

/// Single-slot registry of event handlers, keyed by event name.
///
/// Registering a handler for a name replaces any previous handler for that
/// name. This keeps routing deterministic when a component re-activates.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    slots: Mutex<HashMap<String, Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    fn set(&self, event: &str, handler: Arc<dyn EventHandler>) {
        let replaced = self.slots.lock().insert(event.to_string(), handler);
        if replaced.is_some() {
            debug!(event = %event, "Replaced existing event handler");
        } else {
            trace!(event = %event, "Registered event handler");
        }
    }

    fn clear(&self, event: &str) {
        self.slots.lock().remove(event);
        trace!(event = %event, "Removed event handler");
    }

    fn get(&self, event: &str) -> Option<Arc<dyn EventHandler>> {
        self.slots.lock().get(event).cloned()
    }
}

/// Handle to an established channel connection.
///
/// Cheap to clone; all clones share the connection. Dropping handles does
/// not close the channel, [`Channel::close`] does.
#[derive(Clone)]
pub struct Channel {
    outbound: mpsc::Sender<String>,
    pending: PendingMap,
    seq: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl Channel {
    /// Sends a named request and waits for its acknowledgement.
    ///
    /// The acknowledgement's `args` array is resolved by arity: zero
    /// values resolve to `Null`, one value resolves to that value, more
    /// resolve to the array itself. A reported error resolves to
    /// [`RequestError::Remote`]. If the channel drops before the
    /// acknowledgement arrives, the request fails with
    /// [`TransportError::NotConnected`].
    pub async fn request(&self, name: &str, args: Vec<Value>) -> RequestResult<Value> {
        let id = self.seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        // Register before sending so a fast response always finds a waiter.
        self.pending.lock().insert(id, tx);

        let frame = json!({"id": id, "name": name, "args": args}).to_string();
        debug!(id, name = %name, "Sending channel request");

        if self.outbound.send(frame).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(TransportError::NotConnected.into());
        }

        match rx.await {
            Ok(result) => result,
            // Sender dropped without a response: the connection went away.
            Err(_) => Err(TransportError::NotConnected.into()),
        }
    }

    /// Requests channel shutdown. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Whether this connection is still live.
    pub fn is_open(&self) -> bool {
        !self.shutdown.is_cancelled()
    }
}

/// Client owning the channel lifecycle: connect, request, dispatch, teardown.
///
/// [`connect`](ChannelClient::connect) is idempotent and race-free: the
/// connection slot lock is held across the whole handshake, so concurrent
/// callers coalesce onto one connection.
pub struct ChannelClient {
    connection: ConnectionSlot,
    handlers: Arc<HandlerRegistry>,
    events: broadcast::Sender<ChannelEvent>,
}

impl Default for ChannelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelClient {
    /// Creates a client with no active connection.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            connection: Arc::new(tokio::sync::Mutex::new(None)),
            handlers: Arc::new(HandlerRegistry::default()),
            events,
        }
    }

    /// Subscribes to channel lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Registers the handler for a named event, replacing any previous one.
    pub fn on(&self, event: &str, handler: Arc<dyn EventHandler>) {
        self.handlers.set(event, handler);
    }

    /// Removes the handler for a named event.
    pub fn off(&self, event: &str) {
        self.handlers.clear(event);
    }

    /// Whether a live connection is currently held.
    pub async fn is_connected(&self) -> bool {
        matches!(&*self.connection.lock().await, Some(channel) if channel.is_open())
    }

    /// Establishes the channel, or returns the existing live connection.
    pub async fn connect(&self, identity: &ChannelIdentity) -> TransportResult<Channel> {
        let mut slot = self.connection.lock().await;
        if let Some(channel) = slot.as_ref()
            && channel.is_open()
        {
            trace!("Channel already connected");
            return Ok(channel.clone());
        }

        let url = channel_url(&identity.url);
        let uri = Uri::from_str(&url).map_err(|e| TransportError::ConnectionFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let mut request = ClientRequestBuilder::new(uri)
            .with_header("Origin", identity.url.as_str())
            .with_header("User-Agent", identity.user_agent.as_str());
        if !identity.cookie.is_empty() {
            request = request.with_header("Cookie", identity.cookie.as_str());
        }

        info!(url = %url, "Connecting to forum channel");
        let (ws_stream, _response) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::ConnectionFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
        info!("Channel connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let channel = Channel {
            outbound: outbound_tx,
            pending: Arc::new(Mutex::new(HashMap::new())),
            seq: Arc::new(AtomicU64::new(1)),
            shutdown: CancellationToken::new(),
        };

        tokio::spawn(run_channel_loop(ChannelLoop {
            ws_stream,
            outbound_rx,
            pending: Arc::clone(&channel.pending),
            handlers: Arc::clone(&self.handlers),
            events: self.events.clone(),
            connection: Arc::clone(&self.connection),
            shutdown: channel.shutdown.clone(),
        }));

        let _ = self.events.send(ChannelEvent::Connected);
        *slot = Some(channel.clone());
        Ok(channel)
    }

    /// Sends a named request over the current connection.
    pub async fn request(&self, name: &str, args: Vec<Value>) -> RequestResult<Value> {
        let channel = self
            .connection
            .lock()
            .await
            .clone()
            .ok_or(TransportError::NotConnected)?;
        channel.request(name, args).await
    }

    /// Like [`request`](ChannelClient::request), but retries rate-limited
    /// rejections with the given delay between attempts.
    pub async fn request_with_retry(
        &self,
        delay: Duration,
        name: &str,
        args: Vec<Value>,
    ) -> RequestResult<Value> {
        retry_rate_limited(delay, || self.request(name, args.clone())).await
    }

    /// Closes the current connection, if any.
    pub async fn disconnect(&self) {
        if let Some(channel) = self.connection.lock().await.as_ref() {
            channel.close();
        }
    }
}

/// Translates the forum's base URL to its channel URL.
fn channel_url(base: &str) -> String {
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{base}")
    }
}

/// State moved into the spawned channel loop.
struct ChannelLoop {
    ws_stream: WsStream,
    outbound_rx: mpsc::Receiver<String>,
    pending: PendingMap,
    handlers: Arc<HandlerRegistry>,
    events: broadcast::Sender<ChannelEvent>,
    connection: ConnectionSlot,
    shutdown: CancellationToken,
}

async fn run_channel_loop(state: ChannelLoop) {
    let ChannelLoop {
        ws_stream,
        mut outbound_rx,
        pending,
        handlers,
        events,
        connection,
        shutdown,
    } = state;
    let (mut ws_tx, mut ws_rx): (WsSink, WsSource) = ws_stream.split();

    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it.
    ping.tick().await;
    let mut last_ping: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Channel shutting down");
                let _ = ws_tx.close().await;
                break;
            }

            _ = ping.tick() => {
                last_ping = Some(Instant::now());
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    warn!("Failed to send keepalive ping");
                    break;
                }
            }

            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "Failed to send channel frame");
                    break;
                }
            }

            msg = ws_rx.next() => {
                if !handle_channel_message(msg, &mut ws_tx, &mut last_ping, &pending, &handlers, &events).await {
                    break;
                }
            }
        }
    }

    teardown(&pending, &connection, &shutdown, &events).await;
}

/// Handles one inbound WebSocket message. Returns false to end the loop.
async fn handle_channel_message(
    msg: Option<Result<Message, WsError>>,
    ws_tx: &mut WsSink,
    last_ping: &mut Option<Instant>,
    pending: &PendingMap,
    handlers: &Arc<HandlerRegistry>,
    events: &broadcast::Sender<ChannelEvent>,
) -> bool {
    match msg {
        Some(Ok(Message::Text(text))) => {
            trace!(len = text.len(), "Received channel frame");
            handle_frame(&text, pending, handlers, events);
            true
        }
        Some(Ok(Message::Ping(data))) => {
            let _ = ws_tx.send(Message::Pong(data)).await;
            true
        }
        Some(Ok(Message::Pong(_))) => {
            if let Some(sent) = last_ping.take() {
                let latency = sent.elapsed();
                info!("Ping exchanged with {}ms latency", latency.as_millis());
                let _ = events.send(ChannelEvent::Pong { latency });
            }
            true
        }
        Some(Ok(Message::Close(_))) | None => {
            info!("Server closed channel");
            false
        }
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            warn!(error = %e, "Channel error");
            false
        }
    }
}

/// Fails outstanding requests, releases the connection slot, and announces
/// the disconnect.
async fn teardown(
    pending: &PendingMap,
    connection: &ConnectionSlot,
    shutdown: &CancellationToken,
    events: &broadcast::Sender<ChannelEvent>,
) {
    shutdown.cancel();

    let dropped = {
        let mut map = pending.lock();
        let count = map.len();
        map.clear();
        count
    };
    if dropped > 0 {
        debug!(count = dropped, "Cleared pending requests on disconnect");
    }

    // Only vacate the slot if it still holds this connection; a reconnect
    // may already have replaced it.
    let mut slot = connection.lock().await;
    if let Some(current) = slot.as_ref()
        && Arc::ptr_eq(&current.pending, pending)
    {
        *slot = None;
    }
    drop(slot);

    let _ = events.send(ChannelEvent::Disconnected);
    info!("Channel disconnected");
}

/// Routes one inbound text frame: acknowledgement, lifecycle event, or
/// named event.
fn handle_frame(
    text: &str,
    pending: &PendingMap,
    handlers: &Arc<HandlerRegistry>,
    events: &broadcast::Sender<ChannelEvent>,
) {
    let frame: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Discarding unparseable channel frame");
            return;
        }
    };

    if let Some(id) = frame.get("id").and_then(Value::as_u64) {
        let result = unpack_ack(&frame);
        match pending.lock().remove(&id) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => warn!(id, "Acknowledgement for unknown request id"),
        }
        return;
    }

    let Some(name) = frame.get("name").and_then(Value::as_str) else {
        warn!("Channel frame carried neither id nor name");
        return;
    };

    match name {
        "connect" => {
            let _ = events.send(ChannelEvent::Connected);
        }
        "disconnect" => {
            let _ = events.send(ChannelEvent::Disconnected);
        }
        _ => dispatch_event(name, &frame, handlers),
    }
}

fn dispatch_event(name: &str, frame: &Value, handlers: &Arc<HandlerRegistry>) {
    let Some(handler) = handlers.get(name) else {
        trace!(event = %name, "No handler registered for event");
        return;
    };
    let payload = frame
        .get("args")
        .and_then(|args| args.get(0))
        .cloned()
        .unwrap_or(Value::Null);
    match handler.handle(payload) {
        Ok(task) => {
            let event = name.to_string();
            tokio::spawn(async move {
                if let Err(e) = task.await {
                    warn!(event = %event, error = %e, "Event handler failed");
                }
            });
        }
        Err(e) => warn!(event = %name, error = %e, "Event handler rejected payload"),
    }
}

/// Unpacks an acknowledgement frame into the request's result.
fn unpack_ack(frame: &Value) -> RequestResult<Value> {
    match frame.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) => return Err(RequestError::remote(message.clone())),
        Some(err) => {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| err.to_string());
            return Err(RequestError::remote(message));
        }
    }

    let args = frame
        .get("args")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(match args.len() {
        0 => Value::Null,
        1 => args.into_iter().next().unwrap_or(Value::Null),
        _ => Value::Array(args),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::handshake::server::{
        Request as HsRequest, Response as HsResponse,
    };

    const WAIT: Duration = Duration::from_secs(5);

    struct TestServer {
        addr: String,
        handshakes: Arc<AtomicUsize>,
        push: mpsc::Sender<String>,
    }

    impl TestServer {
        fn identity(&self) -> ChannelIdentity {
            ChannelIdentity {
                url: format!("http://{}", self.addr),
                user_agent: "quorum-test".into(),
                cookie: "express.sid=abc123".into(),
            }
        }
    }

    /// Spawns a WebSocket server that acks `echo.*`/`fail.*` requests and
    /// forwards frames from the push queue to the connected client.
    async fn spawn_server() -> TestServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handshakes = Arc::new(AtomicUsize::new(0));
        let (push_tx, push_rx) = mpsc::channel::<String>(16);
        let push_rx = Arc::new(tokio::sync::Mutex::new(push_rx));

        let count = Arc::clone(&handshakes);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                count.fetch_add(1, Ordering::SeqCst);
                let push_rx = Arc::clone(&push_rx);
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    loop {
                        let mut push = push_rx.lock().await;
                        tokio::select! {
                            Some(frame) = push.recv() => {
                                drop(push);
                                if ws.send(Message::Text(frame.into())).await.is_err() {
                                    break;
                                }
                            }
                            msg = ws.next() => {
                                drop(push);
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        if !answer(&mut ws, &text).await {
                                            break;
                                        }
                                    }
                                    Some(Ok(Message::Close(_))) | None => break,
                                    Some(Ok(_)) => {}
                                    Some(Err(_)) => break,
                                }
                            }
                        }
                    }
                });
            }
        });

        TestServer {
            addr,
            handshakes,
            push: push_tx,
        }
    }

    async fn answer(
        ws: &mut WebSocketStream<TcpStream>,
        text: &str,
    ) -> bool {
        let frame: Value = serde_json::from_str(text).unwrap();
        let id = frame["id"].as_u64().unwrap();
        let args = frame["args"].clone();
        let reply = match frame["name"].as_str().unwrap() {
            "echo.none" => json!({"id": id, "args": []}),
            "echo.one" => json!({"id": id, "args": [args[0]]}),
            "echo.many" => json!({"id": id, "args": args}),
            "fail.string" => json!({"id": id, "error": "[[error:invalid-data]]"}),
            "fail.object" => json!({"id": id, "error": {"message": "no such room"}}),
            "server.close" => {
                let _ = ws.close(None).await;
                return false;
            }
            other => json!({"id": id, "error": format!("unknown request {other}")}),
        };
        ws.send(Message::Text(reply.to_string().into())).await.is_ok()
    }

    struct Recorder {
        tag: &'static str,
        tx: mpsc::UnboundedSender<(&'static str, Value)>,
    }

    impl EventHandler for Recorder {
        fn handle(&self, payload: Value) -> ClientResult<HandlerFuture> {
            let tx = self.tx.clone();
            let tag = self.tag;
            Ok(Box::pin(async move {
                let _ = tx.send((tag, payload));
                Ok(())
            }))
        }
    }

    #[tokio::test]
    async fn acks_resolve_by_arity() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        client.connect(&server.identity()).await.unwrap();

        let none = client.request("echo.none", vec![]).await.unwrap();
        assert_eq!(none, Value::Null);

        let one = client.request("echo.one", vec![json!({"uid": 4})]).await.unwrap();
        assert_eq!(one, json!({"uid": 4}));

        let many = client
            .request("echo.many", vec![json!(1), json!("two")])
            .await
            .unwrap();
        assert_eq!(many, json!([1, "two"]));
    }

    #[tokio::test]
    async fn remote_errors_are_unpacked() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        client.connect(&server.identity()).await.unwrap();

        let err = client.request("fail.string", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "[[error:invalid-data]]");

        let err = client.request("fail.object", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "no such room");
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        let first = client.connect(&server.identity()).await.unwrap();
        let second = client.connect(&server.identity()).await.unwrap();

        assert!(Arc::ptr_eq(&first.pending, &second.pending));
        assert_eq!(server.handshakes.load(Ordering::SeqCst), 1);
        assert!(client.is_connected().await);
    }

    #[tokio::test]
    async fn handshake_carries_identity_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let captured: Arc<Mutex<Option<(String, String, String)>>> =
            Arc::new(Mutex::new(None));

        let seen = Arc::clone(&captured);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = |req: &HsRequest, resp: HsResponse| {
                let header = |name: &str| {
                    req.headers()
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                *seen.lock() = Some((header("origin"), header("user-agent"), header("cookie")));
                Ok(resp)
            };
            let _ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .unwrap();
            // Keep the connection open until the test ends.
            tokio::time::sleep(WAIT).await;
        });

        let client = ChannelClient::new();
        let identity = ChannelIdentity {
            url: format!("http://{addr}"),
            user_agent: "quorum-test".into(),
            cookie: "express.sid=abc123".into(),
        };
        client.connect(&identity).await.unwrap();

        let (origin, agent, cookie) = captured.lock().clone().unwrap();
        assert_eq!(origin, format!("http://{addr}"));
        assert_eq!(agent, "quorum-test");
        assert_eq!(cookie, "express.sid=abc123");
    }

    #[tokio::test]
    async fn events_route_to_latest_handler() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        client.connect(&server.identity()).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on("event:new_notification", Arc::new(Recorder { tag: "first", tx: tx.clone() }));
        client.on("event:new_notification", Arc::new(Recorder { tag: "second", tx }));

        server
            .push
            .send(json!({"name": "event:new_notification", "args": [{"nid": 9}]}).to_string())
            .await
            .unwrap();

        let (tag, payload) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(tag, "second");
        assert_eq!(payload, json!({"nid": 9}));
    }

    #[tokio::test]
    async fn events_without_args_dispatch_null() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        client.connect(&server.identity()).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on("event:banned", Arc::new(Recorder { tag: "only", tx }));

        server
            .push
            .send(json!({"name": "event:banned"}).to_string())
            .await
            .unwrap();

        let (_, payload) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(payload, Value::Null);
    }

    #[tokio::test]
    async fn removed_handler_no_longer_fires() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        client.connect(&server.identity()).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        client.on("event:chats.receive", Arc::new(Recorder { tag: "gone", tx }));
        client.off("event:chats.receive");

        server
            .push
            .send(json!({"name": "event:chats.receive", "args": [{}]}).to_string())
            .await
            .unwrap();
        // Round-trip a request so the pushed event is definitely processed.
        client.request("echo.none", vec![]).await.unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_fails_pending_and_clears_connection() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        let mut events = client.subscribe();
        client.connect(&server.identity()).await.unwrap();
        assert!(matches!(
            timeout(WAIT, events.recv()).await.unwrap().unwrap(),
            ChannelEvent::Connected
        ));

        // The server closes without acking; the waiter must fail.
        let err = client.request("server.close", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Transport(TransportError::NotConnected)
        ));

        assert!(matches!(
            timeout(WAIT, events.recv()).await.unwrap().unwrap(),
            ChannelEvent::Disconnected
        ));
        assert!(!client.is_connected().await);

        let err = client.request("echo.none", vec![]).await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::Transport(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn reconnect_after_disconnect_makes_new_handshake() {
        let server = spawn_server().await;
        let client = ChannelClient::new();
        let mut events = client.subscribe();
        client.connect(&server.identity()).await.unwrap();
        let _ = client.request("server.close", vec![]).await;

        // Wait for the teardown to finish before reconnecting.
        loop {
            if matches!(
                timeout(WAIT, events.recv()).await.unwrap().unwrap(),
                ChannelEvent::Disconnected
            ) {
                break;
            }
        }

        client.connect(&server.identity()).await.unwrap();
        assert_eq!(server.handshakes.load(Ordering::SeqCst), 2);
        assert_eq!(
            client.request("echo.one", vec![json!("back")]).await.unwrap(),
            json!("back")
        );
    }

    #[test]
    fn channel_url_swaps_scheme() {
        assert_eq!(channel_url("https://forum.example.com"), "wss://forum.example.com");
        assert_eq!(channel_url("http://localhost:4567"), "ws://localhost:4567");
        assert_eq!(channel_url("localhost:4567"), "ws://localhost:4567");
    }

    #[test]
    fn unpack_ack_handles_error_shapes() {
        let ok = unpack_ack(&json!({"id": 1, "error": null, "args": [true]}));
        assert_eq!(ok.unwrap(), json!(true));

        let err = unpack_ack(&json!({"id": 1, "error": "plain"})).unwrap_err();
        assert_eq!(err.to_string(), "plain");

        let err = unpack_ack(&json!({"id": 1, "error": {"message": "wrapped"}})).unwrap_err();
        assert_eq!(err.to_string(), "wrapped");

        // Error objects without a message still surface something readable.
        let err = unpack_ack(&json!({"id": 1, "error": {"code": 7}})).unwrap_err();
        assert_eq!(err.to_string(), r#"{"code":7}"#);
    }
}
