//! Sample application served by the binary.

use std::sync::Arc;
use std::time::Duration;

use mocking_hans::http::middleware::from_fn;
use mocking_hans::{
    AppOptions, Declarations, HandlerError, HandlerResult, HttpContext, MockApp, MockResponse, SharedState,
    Socket, UpgradeEvent, WsConnection,
};
use serde_json::{json, Value};

/// Mock of a toll data collector: transaction lookups over raw websockets,
/// a status API and an event feed.
pub struct DataCollector {
    state: SharedState,
}

impl DataCollector {
    fn files() -> Value {
        json!({
            "files": [
                {
                    "filename": "file1",
                    "created": "2001-12-17T09:30:47Z",
                    "status": "transferred",
                    "history": [{"status": "queued", "time": "2001-12-17T09:30:47Z"}]
                },
                {
                    "filename": "file2",
                    "created": "2001-12-17T09:30:47Z",
                    "status": "queued",
                    "history": [{"status": "transferred", "time": "2001-12-17T09:30:47Z"}]
                }
            ],
            "status": "ok",
            "message": "message1"
        })
    }

    fn transaction() -> Value {
        json!({
            "@begin": "2001-12-17T09:30:47Z",
            "@end": "2001-12-17T09:30:47Z",
            "trafficevent": [{
                "@uuid": "00000000-0000-0000-0000-000000000000",
                "@time": "2001-12-17T09:30:47Z",
                "DeterminedLPN": {"@confidence": 0, "#text": "AB12345"},
                "Classification": [
                    {"@label": "motorbike", "@confidence": 0},
                    {"@label": "van", "@confidence": 0}
                ]
            }]
        })
    }

    async fn status(self: Arc<Self>, _ctx: HttpContext) -> HandlerResult {
        let requests = self.state.update("status_requests", |n| json!(n.as_u64().unwrap_or(0) + 1));
        Ok(MockResponse::json(json!({ "status": "ok", "requests": requests })).into())
    }

    async fn status_xml(self: Arc<Self>, _ctx: HttpContext) -> HandlerResult {
        Ok(MockResponse::xml_from_json_as("status", Self::files()).into())
    }

    async fn publish(self: Arc<Self>, ctx: HttpContext) -> HandlerResult {
        let event: Value = ctx.json()?;
        let delivered = ctx.pubsub().emit("/events", "transaction", event);
        Ok(MockResponse::json(json!({ "delivered": delivered })).into())
    }

    async fn on_feed_connection(self: Arc<Self>, socket: Socket, _data: Value) -> Result<(), HandlerError> {
        tracing::info!(socket = %socket.id(), "Feed subscriber connected");
        socket.emit("files", Self::files())
    }

    async fn on_root_connection(self: Arc<Self>, _event: UpgradeEvent) -> Result<(), HandlerError> {
        tracing::info!("Someone connected to /. Nothing to see here...");
        Ok(())
    }

    async fn on_transaction_request(self: Arc<Self>, mut ws: WsConnection) -> Result<(), HandlerError> {
        while let Some(message) = ws.recv_text().await {
            let message = message?;
            tracing::info!(%message, "Incoming message");
        }
        Ok(())
    }

    async fn on_transaction_response(self: Arc<Self>, mut ws: WsConnection) -> Result<(), HandlerError> {
        // Give the request socket time to connect.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let xml = mocking_hans::http::xml::render("trafficepoch", &Self::transaction());
        ws.send_text(xml).await
    }

    async fn on_files_response(self: Arc<Self>, mut ws: WsConnection) -> Result<(), HandlerError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        ws.send_json(&Self::files()).await
    }
}

impl MockApp for DataCollector {
    fn options() -> AppOptions {
        AppOptions::new("DC", 65000)
            .middleware(from_fn(|req, next| async move {
                let mut res = next.run(req).await;
                res.headers_mut()
                    .insert("x-powered-by", axum::http::HeaderValue::from_static("mocking-hans"));
                res
            }))
            .configure(|state| {
                if let Err(e) = state.set("status_requests", 0) {
                    tracing::warn!(error = %e, "Could not seed state");
                }
            })
    }

    fn declare(app: &mut Declarations<'_, Self>) {
        app.get("/status", "status", Self::status)
            .get("/status.xml", "status_xml", Self::status_xml)
            .post("/events", "publish", Self::publish)
            .socket_in("connection", "/events", "on_feed_connection", Self::on_feed_connection)
            .websocket_observer("connection", "on_root_connection", Self::on_root_connection)
            .websocket(
                "connection",
                "/efkon/no/dc/ctrl/cmd/transactions/get",
                "on_transaction_request",
                Self::on_transaction_request,
            )
            .websocket(
                "connection",
                "/efkon/no/dc/ctrl/cmd/response/transactions-uuid",
                "on_transaction_response",
                Self::on_transaction_response,
            )
            .websocket(
                "connection",
                "/efkon/no/dc/ctrl/cmd/response/files-uuid",
                "on_files_response",
                Self::on_files_response,
            );
    }

    fn create(state: SharedState) -> Self {
        Self { state }
    }
}
