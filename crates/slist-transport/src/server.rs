//! WebSocket transport server using Axum.
//!
//! Handles the HTTP upgrade to WebSocket, frame decoding, per-request
//! acknowledgement callbacks and notification fan-out.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::{Value, json};
use slist_protocol::{
    Ack, Notification, Notifications, ProtocolError, Request, RequestId, Response,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use crate::client::ClientConnection;
use crate::error::TransportError;

/// What the connection should do after a request has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep serving the connection.
    Continue,
    /// The request violated the protocol: close the connection without
    /// sending anything for it.
    Disconnect,
}

/// Trait implemented by the list server to handle incoming requests.
/// The transport calls this once per decoded request, each on its own task.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle one request. `ack` is `None` when the client sent no callback.
    fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
        ack: Option<Ack>,
    ) -> impl std::future::Future<Output = Disposition> + Send;
}

/// Transport server configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Maximum concurrent connections
    pub max_connections: Option<usize>,
    /// Browser origin allowed by CORS (none disables the layer)
    pub cors_origin: Option<String>,
    /// Log every frame at debug level
    pub verbose_logging: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            hostname: "127.0.0.1".into(),
            max_connections: Some(32),
            cors_origin: None,
            verbose_logging: false,
        }
    }
}

/// Shared state for the transport server.
struct AppState<H: RequestHandler> {
    handler: Arc<H>,
    config: TransportConfig,
    /// Broadcast channel for notifications (server → all clients)
    notification_tx: broadcast::Sender<String>,
    /// Live connections by client id
    clients: DashMap<String, ClientConnection>,
}

/// The transport server. Manages WebSocket connections and routes messages.
pub struct TransportServer {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl TransportServer {
    /// Start the transport server with a pre-existing broadcast channel, so
    /// the handler can publish change notifications to every client.
    pub async fn start_with_sender<H: RequestHandler>(
        config: TransportConfig,
        handler: Arc<H>,
        notification_tx: broadcast::Sender<String>,
    ) -> Result<Self, TransportError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let cors = config
            .cors_origin
            .as_deref()
            .map(cors_layer)
            .transpose()?;

        let state = Arc::new(AppState {
            handler,
            config: config.clone(),
            notification_tx,
            clients: DashMap::new(),
        });

        let mut app = Router::new()
            .route("/ws", get(ws_upgrade_handler::<H>))
            .route("/health", get(health_handler::<H>))
            .with_state(state);
        if let Some(cors) = cors {
            app = app.layer(cors);
        }

        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Shopping list transport listening on ws://{}:{}/ws", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
            {
                error!("Transport server failed: {e}");
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Shopping list transport stopped");
    }
}

fn cors_layer(origin: &str) -> Result<CorsLayer, TransportError> {
    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|_| TransportError::CorsOrigin(origin.to_string()))?;
    Ok(CorsLayer::new().allow_origin(origin).allow_methods(Any))
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn ws_upgrade_handler<H: RequestHandler>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    if let Some(max) = state.config.max_connections {
        let current = state.clients.len();
        if current >= max {
            warn!("Connection rejected: max connections reached ({max})");
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

async fn health_handler<H: RequestHandler>(
    State(state): State<Arc<AppState<H>>>,
) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "clients": state.clients.len(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket Connection Handler
// ─────────────────────────────────────────────────────────────────────────────

/// Work queued for the socket writer by request tasks.
enum Outbound {
    Frame(String),
    Close,
}

async fn handle_ws_connection<H: RequestHandler>(
    socket: WebSocket,
    state: Arc<AppState<H>>,
) {
    let client_id = uuid::Uuid::new_v4().to_string();
    state
        .clients
        .insert(client_id.clone(), ClientConnection::new(client_id.clone()));
    info!(client_id = %client_id, "Client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut notification_rx = state.notification_tx.subscribe();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    let mut in_flight: JoinSet<()> = JoinSet::new();

    send_welcome(&mut ws_tx, &client_id).await;

    loop {
        tokio::select! {
            // Queued work first, so a pending close wins over new frames
            biased;

            // Acknowledgements and control from request tasks
            Some(outbound) = out_rx.recv() => {
                match outbound {
                    Outbound::Frame(frame) => {
                        if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                            error!("Failed to send response to {client_id}: {e}");
                            break;
                        }
                    }
                    Outbound::Close => {
                        debug!(client_id = %client_id, "Closing connection after protocol violation");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            // Incoming WebSocket message
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(mut conn) = state.clients.get_mut(&client_id) {
                            conn.record_request();
                        }
                        if state.config.verbose_logging {
                            debug!(client_id = %client_id, frame = %text.as_str(), "Frame received");
                        }

                        match decode_request(text.as_str()) {
                            Ok(request) => {
                                dispatch(&mut in_flight, &state.handler, request, &out_tx);
                            }
                            Err(response) => {
                                if let Err(e) = ws_tx.send(Message::Text(response.to_frame().into())).await {
                                    error!("Failed to send response to {client_id}: {e}");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client disconnected: {client_id}");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {client_id}: {e}");
                        break;
                    }
                    _ => {}
                }
            }

            // Broadcast notifications to this client
            notification = notification_rx.recv() => {
                match notification {
                    Ok(msg) => {
                        if let Err(e) = ws_tx.send(Message::Text(msg.into())).await {
                            error!("Failed to broadcast to {client_id}: {e}");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client_id = %client_id, skipped, "Client lagging behind notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }

            // Reap finished request tasks
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(client_id = %client_id, "Request task panicked: {e}");
                    }
                }
            }
        }
    }

    // Nothing is resumed once the connection is gone
    in_flight.abort_all();

    if let Some((_, mut conn)) = state.clients.remove(&client_id) {
        conn.disconnect();
        debug!(client_id = %client_id, requests = conn.requests, "Connection closed");
    }
    info!("Client disconnected: {client_id} (total: {})", state.clients.len());
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

async fn send_welcome(ws_tx: &mut SplitSink<WebSocket, Message>, client_id: &str) {
    let welcome = Notification::new(
        Notifications::SERVER_CONNECTED,
        Some(json!({
            "clientId": client_id,
            "serverVersion": env!("CARGO_PKG_VERSION"),
        })),
    );
    if let Ok(text) = serde_json::to_string(&welcome) {
        let _ = ws_tx.send(Message::Text(text.into())).await;
    }
}

/// Decode one text frame. Malformed frames come back as a ready-to-send
/// error response.
pub(crate) fn decode_request(text: &str) -> Result<Request, Response> {
    let parsed: Value = serde_json::from_str(text)
        .map_err(|_| Response::error(None, ProtocolError::parse_error("Failed to parse JSON")))?;

    let id: Option<RequestId> = parsed
        .get("id")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());

    let request: Request = serde_json::from_value(parsed).map_err(|_| {
        Response::error(id.clone(), ProtocolError::invalid_request("Invalid JSON-RPC 2.0 request"))
    })?;

    if !request.is_valid() {
        return Err(Response::error(
            id,
            ProtocolError::invalid_request("Invalid JSON-RPC 2.0 request"),
        ));
    }

    Ok(request)
}

/// Run `request` on its own task so slow operations never hold up the
/// rest of the connection.
fn dispatch<H: RequestHandler>(
    in_flight: &mut JoinSet<()>,
    handler: &Arc<H>,
    request: Request,
    out_tx: &mpsc::UnboundedSender<Outbound>,
) {
    let handler = handler.clone();
    let ack = request.id.map(|id| {
        let tx = out_tx.clone();
        Ack::new(id, move |response: Response| {
            let _ = tx.send(Outbound::Frame(response.to_frame()));
        })
    });
    let control = out_tx.clone();
    let Request { method, params, .. } = request;

    in_flight.spawn(async move {
        if handler.handle_request(&method, params, ack).await == Disposition::Disconnect {
            let _ = control.send(Outbound::Close);
        }
    });
}
