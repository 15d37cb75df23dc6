//! Shopping list router. Turns operation requests into service calls and
//! service results into outcomes.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::RwLock;
use serde_json::{Value, json};
use slist_protocol::{Ack, Notification, Notifications, Operation, Outcome, ProtocolError};
use slist_services::{Item, ItemService, ServiceError};
use slist_transport::{Disposition, RequestHandler};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::params;

/// The list server. Owns the collection service and routes requests.
pub struct ListServer<S> {
    service: Arc<S>,
    state: RwLock<ServerState>,
    /// Notification sender (for broadcasting changes to clients)
    notification_tx: Option<broadcast::Sender<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Uninitialized,
    Running,
    Shutdown,
}

impl<S: ItemService + 'static> ListServer<S> {
    pub fn new(service: S) -> Self {
        Self::with_shared_service(Arc::new(service))
    }

    /// Build around a service that is also held elsewhere.
    pub fn with_shared_service(service: Arc<S>) -> Self {
        Self {
            service,
            state: RwLock::new(ServerState::Uninitialized),
            notification_tx: None,
        }
    }

    /// Set the notification sender for broadcasting.
    pub fn set_notification_sender(&mut self, tx: broadcast::Sender<String>) {
        self.notification_tx = Some(tx);
    }

    /// Start accepting requests.
    pub fn initialize(&self) {
        *self.state.write() = ServerState::Running;
        info!("Shopping list server initialized");
    }

    /// Stop accepting requests. Requests already running finish normally.
    pub fn shutdown(&self) {
        let mut state = self.state.write();
        if *state == ServerState::Shutdown {
            return;
        }
        *state = ServerState::Shutdown;
        info!("Shopping list server shut down");
    }

    pub fn is_running(&self) -> bool {
        *self.state.read() == ServerState::Running
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Broadcast a notification to all connected clients.
    pub fn emit_notification(&self, method: &str, params: Option<Value>) {
        if let Some(tx) = &self.notification_tx {
            let notification = Notification::new(method, params);
            if let Ok(json) = serde_json::to_string(&notification) {
                let _ = tx.send(json);
            }
        }
    }

    // ── Operations ──────────────────────────────────────────────────────

    async fn create(&self, params: Option<Value>) -> Outcome {
        let op = Operation::Create;
        let item_info = params::item_info(params);

        let report = self.service.validate_new_item(&item_info);
        if report.has_errors() {
            warn!(method = %op, reason = %report, "Rejected: invalid item");
            return Outcome::fail(report.to_value());
        }

        match self.service.create_item(item_info).await {
            Ok(item) => {
                let payload = item_payload(&item);
                self.emit_notification(Notifications::ITEM_DID_CREATE, Some(payload.clone()));
                succeed(op, payload)
            }
            Err(e) => settle_failure(op, None, e),
        }
    }

    async fn read(&self, params: Option<Value>) -> Outcome {
        let op = Operation::Read;
        let item_id = match params::item_id(params.as_ref()) {
            Ok(id) => id,
            Err(payload) => return reject_item_id(op, payload),
        };

        match self.service.find_item_by_id(&item_id).await {
            Ok(item) => succeed(op, item_payload(&item)),
            Err(e) => settle_failure(op, Some(&item_id), e),
        }
    }

    async fn update(&self, params: Option<Value>) -> Outcome {
        let op = Operation::Update;
        let item_id = match params::item_id(params.as_ref()) {
            Ok(id) => id,
            Err(payload) => return reject_item_id(op, payload),
        };
        let item_update = params::item_update(params.as_ref());

        let report = self.service.validate_item_update(&item_update);
        if report.has_errors() {
            warn!(method = %op, item_id = %item_id, reason = %report, "Rejected: invalid update");
            return Outcome::fail(report.to_value());
        }

        match self.service.update_item(&item_id, item_update).await {
            Ok(item) => {
                let payload = item_payload(&item);
                self.emit_notification(Notifications::ITEM_DID_UPDATE, Some(payload.clone()));
                succeed(op, payload)
            }
            Err(e) => settle_failure(op, Some(&item_id), e),
        }
    }

    async fn delete(&self, params: Option<Value>) -> Outcome {
        let op = Operation::Delete;
        let item_id = match params::item_id(params.as_ref()) {
            Ok(id) => id,
            Err(payload) => return reject_item_id(op, payload),
        };

        match self.service.delete_item(&item_id).await {
            Ok(item) => {
                self.emit_notification(
                    Notifications::ITEM_DID_DELETE,
                    Some(json!({ "itemId": item.id })),
                );
                succeed(op, json!({}))
            }
            Err(e) => settle_failure(op, Some(&item_id), e),
        }
    }

    /// Run one operation. A panic anywhere inside, whether in validation,
    /// while building the service call, or while it runs, becomes an
    /// `error` outcome.
    async fn run(&self, op: Operation, params: Option<Value>) -> Outcome {
        let operation = async {
            match op {
                Operation::Create => self.create(params).await,
                Operation::Read => self.read(params).await,
                Operation::Update => self.update(params).await,
                Operation::Delete => self.delete(params).await,
                Operation::List => self.list().await,
            }
        };

        match AssertUnwindSafe(operation).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(method = %op, error = %message, "Operation panicked");
                Outcome::error(message)
            }
        }
    }

    async fn list(&self) -> Outcome {
        let op = Operation::List;
        match self.service.find_all().await {
            Ok(items) => succeed(op, Value::Array(items.iter().map(item_payload).collect())),
            Err(e) => settle_failure(op, None, e),
        }
    }
}

impl<S: ItemService + 'static> RequestHandler for ListServer<S> {
    async fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
        ack: Option<Ack>,
    ) -> Disposition {
        let Some(op) = Operation::from_method(method) else {
            match ack {
                Some(ack) => {
                    warn!(method, "Unknown method");
                    ack.reject(ProtocolError::method_not_found(method));
                }
                None => debug!(method, "Ignoring unknown method without callback"),
            }
            return Disposition::Continue;
        };

        let shown = params.clone().unwrap_or_default();
        info!(method = %op, params = %shown, "Request received");

        let Some(ack) = ack else {
            debug!(method = %op, "Missing callback, disconnecting");
            return Disposition::Disconnect;
        };

        let state = *self.state.read();
        match state {
            ServerState::Running => {}
            ServerState::Uninitialized => {
                ack.reject(ProtocolError::not_initialized());
                return Disposition::Continue;
            }
            ServerState::Shutdown => {
                ack.reject(ProtocolError::shutting_down());
                return Disposition::Continue;
            }
        }

        ack.send(self.run(op, params).await);

        Disposition::Continue
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Wire shape of an item: exactly `id`, `title`, `completed`.
fn item_payload(item: &Item) -> Value {
    json!({
        "id": item.id,
        "title": item.title,
        "completed": item.completed,
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected error".to_string()
    }
}

fn succeed(op: Operation, payload: Value) -> Outcome {
    info!(method = %op, payload = %payload, "Success");
    Outcome::success(payload)
}

fn reject_item_id(op: Operation, payload: Value) -> Outcome {
    warn!(method = %op, reason = %payload, "Rejected: invalid item id");
    Outcome::fail(payload)
}

fn settle_failure(op: Operation, item_id: Option<&str>, err: ServiceError) -> Outcome {
    match err {
        ServiceError::Validation(report) => {
            warn!(method = %op, reason = %report, "Rejected: invalid payload");
            Outcome::fail(report.to_value())
        }
        ServiceError::NotFound { id } => {
            let id = item_id.unwrap_or(&id);
            warn!(method = %op, item_id = %id, "Rejected: item not found");
            Outcome::fail(params::item_not_found(id))
        }
        ServiceError::Unexpected(message) => {
            error!(method = %op, error = %message, "Unexpected failure");
            Outcome::error(message)
        }
    }
}
