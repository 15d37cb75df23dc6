//! Router tests: operation contracts, outcome translation and notifications,
//! driven through `RequestHandler::handle_request` exactly as the transport
//! calls it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use slist_protocol::{Ack, Methods, Outcome, ProtocolErrorCode, RequestId, Response};
use slist_server::ListServer;
use slist_services::{
    Item, ItemService, ObjectSchema, Schemas, ServiceError, ServiceResult, ShoppingListService,
    ValidationReport,
};
use slist_transport::{Disposition, RequestHandler};
use tokio::sync::{broadcast, oneshot};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn running_server() -> ListServer<ShoppingListService> {
    let server = ListServer::new(ShoppingListService::default());
    server.initialize();
    server
}

fn capture() -> (Ack, oneshot::Receiver<Response>) {
    let (tx, rx) = oneshot::channel();
    let ack = Ack::new(RequestId::Number(1), move |resp| {
        let _ = tx.send(resp);
    });
    (ack, rx)
}

async fn call<H: RequestHandler>(handler: &H, method: &str, params: Value) -> Outcome {
    let (ack, rx) = capture();
    let disposition = handler.handle_request(method, Some(params), Some(ack)).await;
    assert_eq!(disposition, Disposition::Continue);
    match rx.await.expect("request was not acknowledged") {
        Response::Success(s) => s.result,
        Response::Error(e) => panic!("unexpected error frame: {:?}", e.error),
    }
}

async fn create(server: &ListServer<ShoppingListService>, title: &str) -> Value {
    match call(server, Methods::ITEM_CREATE, json!([{ "title": title }])).await {
        Outcome::Success { payload } => payload,
        other => panic!("create failed: {other:?}"),
    }
}

fn fail_payload(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Fail { payload } => payload,
        other => panic!("expected fail, got {other:?}"),
    }
}

/// Service whose mutating and lookup calls misbehave on demand.
struct StubService {
    report: ValidationReport,
    panic: bool,
    mutations: AtomicUsize,
}

impl StubService {
    fn failing() -> Self {
        Self { report: ValidationReport::new(), panic: false, mutations: AtomicUsize::new(0) }
    }

    fn panicking() -> Self {
        Self { panic: true, ..Self::failing() }
    }

    fn rejecting(report: ValidationReport) -> Self {
        Self { report, ..Self::failing() }
    }

    fn misbehave<T>(&self) -> ServiceResult<T> {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("collection corrupted");
        }
        Err(ServiceError::unexpected("storage unavailable"))
    }
}

impl ItemService for StubService {
    async fn create_item(&self, _info: Value) -> ServiceResult<Item> {
        self.misbehave()
    }
    async fn find_item_by_id(&self, _id: &str) -> ServiceResult<Item> {
        self.misbehave()
    }
    async fn find_all(&self) -> ServiceResult<Vec<Item>> {
        self.misbehave()
    }
    async fn update_item(&self, _id: &str, _update: Value) -> ServiceResult<Item> {
        self.misbehave()
    }
    async fn delete_item(&self, _id: &str) -> ServiceResult<Item> {
        self.misbehave()
    }
    fn validate_new_item(&self, _info: &Value) -> ValidationReport {
        self.report.clone()
    }
    fn validate_item_update(&self, _update: &Value) -> ValidationReport {
        self.report.clone()
    }
}

fn stub_server(service: StubService) -> ListServer<StubService> {
    let server = ListServer::new(service);
    server.initialize();
    server
}

// ─────────────────────────────────────────────────────────────────────────────
// Create
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_returns_item_with_fresh_id() {
    let server = running_server();
    let outcome = call(&server, Methods::ITEM_CREATE, json!({"title": "milk", "completed": false})).await;

    let Outcome::Success { payload } = outcome else { panic!("expected success") };
    assert_eq!(payload["title"], "milk");
    assert_eq!(payload["completed"], false);
    assert_eq!(payload["id"].as_str().unwrap().len(), 36);
    assert_eq!(payload.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn create_defaults_completed_to_false() {
    let server = running_server();
    let item = create(&server, "eggs").await;
    assert_eq!(item["completed"], false);
}

#[tokio::test]
async fn create_with_empty_title_fails_without_mutation() {
    let server = running_server();
    let outcome = call(&server, Methods::ITEM_CREATE, json!({"title": ""})).await;

    let payload = fail_payload(outcome);
    assert!(!payload["title"].as_str().unwrap().is_empty());
    assert!(server.service().is_empty());
}

#[tokio::test]
async fn create_validation_failure_skips_service_call() {
    let server = stub_server(StubService::rejecting(ValidationReport::single("title", "too fancy")));
    let outcome = call(&server, Methods::ITEM_CREATE, json!({"title": "caviar"})).await;

    assert_eq!(fail_payload(outcome), json!({"title": "too fancy"}));
    assert_eq!(server.service().mutations.load(Ordering::SeqCst), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn read_returns_stored_item() {
    let server = running_server();
    let item = create(&server, "bread").await;

    let outcome = call(&server, Methods::ITEM_READ, json!({"itemId": item["id"]})).await;
    assert_eq!(outcome, Outcome::success(item));
}

#[tokio::test]
async fn read_with_empty_or_missing_id_fails() {
    let server = stub_server(StubService::failing());
    for params in [json!([""]), json!([null]), json!([]), json!({"itemId": ""})] {
        let payload = fail_payload(call(&server, Methods::ITEM_READ, params).await);
        assert!(!payload["itemId"].as_str().unwrap().is_empty());
    }
    assert_eq!(server.service().mutations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn read_unknown_id_fails_naming_the_id() {
    let server = running_server();
    let payload = fail_payload(call(&server, Methods::ITEM_READ, json!(["nope"])).await);
    assert_eq!(payload, json!({"itemId": "item with id=nope not found"}));
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_merges_fields() {
    let server = running_server();
    let item = create(&server, "apples").await;

    let outcome = call(
        &server,
        Methods::ITEM_UPDATE,
        json!([item["id"], {"completed": true}]),
    )
    .await;

    let Outcome::Success { payload } = outcome else { panic!("expected success") };
    assert_eq!(payload["id"], item["id"]);
    assert_eq!(payload["title"], "apples");
    assert_eq!(payload["completed"], true);
}

#[tokio::test]
async fn update_rejects_invalid_payload() {
    let server = running_server();
    let item = create(&server, "pears").await;

    let payload = fail_payload(
        call(&server, Methods::ITEM_UPDATE, json!({"itemId": item["id"], "itemUpdate": {"title": ""}})).await,
    );
    assert!(payload.get("title").is_some());

    let stored = call(&server, Methods::ITEM_READ, json!([item["id"]])).await;
    assert_eq!(stored, Outcome::success(item));
}

#[tokio::test]
async fn update_unknown_id_fails() {
    let server = running_server();
    let payload = fail_payload(call(&server, Methods::ITEM_UPDATE, json!(["ghost", {"title": "x"}])).await);
    assert!(payload["itemId"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn update_without_callback_disconnects_and_changes_nothing() {
    let server = running_server();
    let item = create(&server, "rice").await;

    let disposition = server
        .handle_request(Methods::ITEM_UPDATE, Some(json!([item["id"], {"title": "beans"}])), None)
        .await;
    assert_eq!(disposition, Disposition::Disconnect);

    let stored = call(&server, Methods::ITEM_READ, json!([item["id"]])).await;
    assert_eq!(stored, Outcome::success(item));
}

// ─────────────────────────────────────────────────────────────────────────────
// Delete & list
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_returns_empty_payload_and_keeps_order() {
    let server = running_server();
    let a = create(&server, "a").await;
    let b = create(&server, "b").await;
    let c = create(&server, "c").await;

    let outcome = call(&server, Methods::ITEM_DELETE, json!([b["id"]])).await;
    assert_eq!(outcome, Outcome::success(json!({})));

    let list = call(&server, Methods::ITEM_LIST, json!([])).await;
    assert_eq!(list, Outcome::success(json!([a, c])));
}

#[tokio::test]
async fn delete_unknown_id_fails() {
    let server = running_server();
    let payload = fail_payload(call(&server, Methods::ITEM_DELETE, json!({"itemId": "missing"})).await);
    assert!(payload["itemId"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn list_without_callback_disconnects() {
    let server = running_server();
    let disposition = server.handle_request(Methods::ITEM_LIST, None, None).await;
    assert_eq!(disposition, Disposition::Disconnect);
}

// ─────────────────────────────────────────────────────────────────────────────
// Unexpected failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unexpected_service_error_becomes_error_outcome() {
    let server = stub_server(StubService::failing());
    let outcome = call(&server, Methods::ITEM_LIST, json!([])).await;
    assert_eq!(outcome, Outcome::error("storage unavailable"));

    let outcome = call(&server, Methods::ITEM_DELETE, json!(["x"])).await;
    assert_eq!(outcome, Outcome::error("storage unavailable"));
}

#[tokio::test]
async fn panicking_service_becomes_error_outcome() {
    let server = stub_server(StubService::panicking());
    let outcome = call(&server, Methods::ITEM_CREATE, json!({"title": "milk"})).await;
    assert_eq!(outcome, Outcome::error("collection corrupted"));

    // The server keeps serving afterwards
    let outcome = call(&server, Methods::ITEM_READ, json!(["x"])).await;
    assert!(outcome.is_error());
}

#[tokio::test]
async fn panicking_validator_becomes_error_outcome() {
    let exploding = |_: &Value| -> ValidationReport { panic!("schema exploded") };
    let service = ShoppingListService::new(Schemas::new(exploding, exploding));
    let server = ListServer::new(service);
    server.initialize();

    let outcome = call(&server, Methods::ITEM_CREATE, json!([{"title": "milk"}])).await;
    assert_eq!(outcome, Outcome::error("schema exploded"));

    let outcome = call(&server, Methods::ITEM_UPDATE, json!(["x", {"title": "oat milk"}])).await;
    assert_eq!(outcome, Outcome::error("schema exploded"));
    assert!(server.service().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle & unknown methods
// ─────────────────────────────────────────────────────────────────────────────

async fn frame_error_code<H: RequestHandler>(handler: &H, method: &str) -> ProtocolErrorCode {
    let (ack, rx) = capture();
    handler.handle_request(method, None, Some(ack)).await;
    match rx.await.unwrap() {
        Response::Error(e) => e.error.error_code(),
        Response::Success(s) => panic!("expected error frame, got {:?}", s.result),
    }
}

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let server = ListServer::new(ShoppingListService::default());
    assert_eq!(
        frame_error_code(&server, Methods::ITEM_LIST).await,
        ProtocolErrorCode::ServerNotInitialized
    );
}

#[tokio::test]
async fn requests_after_shutdown_are_rejected() {
    let server = running_server();
    server.shutdown();
    assert!(!server.is_running());
    assert_eq!(
        frame_error_code(&server, Methods::ITEM_LIST).await,
        ProtocolErrorCode::ServerShuttingDown
    );
}

#[tokio::test]
async fn unknown_method_is_rejected() {
    let server = running_server();
    assert_eq!(
        frame_error_code(&server, "shoppingListItem/archive").await,
        ProtocolErrorCode::MethodNotFound
    );

    let disposition = server.handle_request("shoppingListItem/archive", None, None).await;
    assert_eq!(disposition, Disposition::Continue);
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn mutations_broadcast_change_notifications() {
    let (tx, mut rx) = broadcast::channel(16);
    let mut server = ListServer::new(ShoppingListService::default());
    server.set_notification_sender(tx);
    server.initialize();

    let item = create(&server, "tea").await;
    let created: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(created["method"], "shoppingListItem/didCreate");
    assert_eq!(created["params"], item);

    call(&server, Methods::ITEM_UPDATE, json!([item["id"], {"completed": true}])).await;
    let updated: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(updated["method"], "shoppingListItem/didUpdate");
    assert_eq!(updated["params"]["completed"], true);

    call(&server, Methods::ITEM_DELETE, json!([item["id"]])).await;
    let deleted: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(deleted["method"], "shoppingListItem/didDelete");
    assert_eq!(deleted["params"]["itemId"], item["id"]);

    // Reads and rejections are silent
    call(&server, Methods::ITEM_LIST, json!([])).await;
    call(&server, Methods::ITEM_CREATE, json!({"title": ""})).await;
    assert!(rx.try_recv().is_err());
}

// ─────────────────────────────────────────────────────────────────────────────
// Log severity
// ─────────────────────────────────────────────────────────────────────────────

/// Records `(level, message)` for every event on the current thread.
#[derive(Clone, Default)]
struct Recorder {
    events: Arc<parking_lot::Mutex<Vec<(Level, String)>>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Recorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().push((*event.metadata().level(), visitor.0));
    }
}

impl Recorder {
    fn take(&self) -> Vec<(Level, String)> {
        std::mem::take(&mut *self.events.lock())
    }

    fn level_of(events: &[(Level, String)], message: &str) -> Option<Level> {
        events.iter().find(|(_, m)| m == message).map(|(level, _)| *level)
    }
}

#[tokio::test]
async fn outcomes_are_logged_at_their_severity() {
    let recorder = Recorder::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let server = running_server();
    let item = create(&server, "milk").await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Request received"), Some(Level::INFO));
    assert_eq!(Recorder::level_of(&events, "Success"), Some(Level::INFO));

    call(&server, Methods::ITEM_CREATE, json!({"title": ""})).await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Rejected: invalid item"), Some(Level::WARN));

    call(&server, Methods::ITEM_READ, json!([""])).await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Rejected: invalid item id"), Some(Level::WARN));

    call(&server, Methods::ITEM_READ, json!(["nope"])).await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Rejected: item not found"), Some(Level::WARN));

    server
        .handle_request(Methods::ITEM_DELETE, Some(json!([item["id"]])), None)
        .await;
    let events = recorder.take();
    assert_eq!(
        Recorder::level_of(&events, "Missing callback, disconnecting"),
        Some(Level::DEBUG)
    );

    let failing = stub_server(StubService::failing());
    call(&failing, Methods::ITEM_LIST, json!([])).await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Unexpected failure"), Some(Level::ERROR));

    let panicking = stub_server(StubService::panicking());
    call(&panicking, Methods::ITEM_LIST, json!([])).await;
    let events = recorder.take();
    assert_eq!(Recorder::level_of(&events, "Operation panicked"), Some(Level::ERROR));
}
